use assert_fs::prelude::*;
use common::Project;
use predicates::{prelude::predicate, str::contains};
use std::io::Read;
use toml::toml;

mod common;

fn read_entry(archive: &mut zip::ZipArchive<std::io::Cursor<Vec<u8>>>, name: &str) -> String {
    let mut text = String::new();
    archive
        .by_name(name)
        .unwrap()
        .read_to_string(&mut text)
        .unwrap();
    text
}

#[test]
fn missing_input_fails() {
    Project::new()
        .run()
        .arg("input/nothing.svg")
        .assert()
        .failure()
        .stderr(contains("does not exist"));
}

#[test]
fn single_file_writes_png() {
    let project = Project::new();
    project.add_file("square.svg");

    project
        .run()
        .args(["input/square.svg", "--width", "50"])
        .assert()
        .success();

    project.dir.child("iconify.zip").assert(predicate::path::missing());

    let image = project.read_png("square.png");
    assert_eq!(image.dimensions(), (50, 50));
    assert_eq!(image.get_pixel(25, 25).0, [255, 0, 0, 255]);
}

#[test]
fn uses_declared_size_without_flags() {
    let project = Project::new();
    project.add_file("wide.svg");

    project.run().arg("input/wide.svg").assert().success();

    assert_eq!(project.read_png("wide.png").dimensions(), (64, 32));
}

#[test]
fn output_directory() {
    let project = Project::new();
    project.add_file("square.svg");

    project
        .run()
        .args(["input/square.svg", "-w", "10", "-o", "out/icons"])
        .assert()
        .success();

    assert_eq!(project.read_png("out/icons/square.png").dimensions(), (10, 10));
}

#[test]
fn batch_with_json_manifest() {
    let project = Project::new();
    project.add_file("square.svg");
    project.add_file("wide.svg");
    project.add_file("offset.svg");

    project
        .run()
        .args(["input", "--manifest", "-w", "80"])
        .assert()
        .success();

    let mut archive = project.read_archive("iconify.zip");
    assert_eq!(archive.len(), 4);

    let manifest: serde_json::Value =
        serde_json::from_str(&read_entry(&mut archive, "manifest.json")).unwrap();
    assert_eq!(
        manifest,
        serde_json::json!({
            "offset": { "width": 80, "height": 40, "left": 0, "top": 20 },
            "square": { "width": 80, "height": 80, "left": 0, "top": 0 },
            "wide": { "width": 80, "height": 40, "left": 0, "top": 20 }
        })
    );

    for name in ["offset.png", "square.png", "wide.png"] {
        assert!(archive.by_name(name).is_ok(), "{name} missing from archive");
    }
}

#[test]
fn extended_lua_manifest_with_color() {
    let project = Project::new();
    project.add_file("offset.svg");

    project
        .run()
        .args(["input/offset.svg", "-m", "-e", "-f", "lua", "-c", "black", "-w", "80"])
        .assert()
        .success();

    let mut archive = project.read_archive("iconify.zip");
    assert_eq!(archive.len(), 2);
    assert_eq!(
        read_entry(&mut archive, "manifest.lua"),
        r##"{["offset"]={color="#000000",width=80,height=80,bbox={width=80,height=40,left=0,top=20}}}"##
    );

    let mut png = Vec::new();
    archive
        .by_name("offset.png")
        .unwrap()
        .read_to_end(&mut png)
        .unwrap();
    let image = image::load_from_memory(&png).unwrap().to_rgba8();
    assert_eq!(image.dimensions(), (80, 80));
    assert_eq!(image.get_pixel(40, 40).0, [0, 0, 0, 255]);
    assert_eq!(image.get_pixel(40, 5).0[3], 0);
}

#[test]
fn failed_file_is_skipped() {
    let project = Project::new();
    project.add_file("square.svg");
    project.add_file("broken.svg");

    project
        .run()
        .args(["input", "-m"])
        .assert()
        .failure()
        .stderr(contains("1 of 2 files failed to render"));

    let mut archive = project.read_archive("iconify.zip");
    assert_eq!(archive.len(), 2);

    let manifest: serde_json::Value =
        serde_json::from_str(&read_entry(&mut archive, "manifest.json")).unwrap();
    assert_eq!(manifest.as_object().unwrap().len(), 1);
    assert!(manifest.get("square").is_some());
}

#[test]
fn config_file_defaults() {
    let project = Project::new();
    project.write_config(toml! {
        width = 20
        manifest = true
        format = "lua"
    });
    project.add_file("square.svg");

    project.run().arg("input/square.svg").assert().success();

    let mut archive = project.read_archive("iconify.zip");
    assert_eq!(
        read_entry(&mut archive, "manifest.lua"),
        r#"{["square"]={width=20,height=20,left=0,top=0}}"#
    );
}

#[test]
fn duplicate_names_keep_the_later_file() {
    let project = Project::new();
    project.add_file_as("square.svg", "a/icon.svg");
    project.add_file_as("wide.svg", "b/icon.svg");

    project
        .run()
        .args(["input/a/icon.svg", "input/b/icon.svg", "-m"])
        .assert()
        .success()
        .stderr(contains("Rendered 2 files"));

    let mut archive = project.read_archive("iconify.zip");
    assert_eq!(archive.len(), 2);

    let manifest: serde_json::Value =
        serde_json::from_str(&read_entry(&mut archive, "manifest.json")).unwrap();
    assert_eq!(
        manifest["icon"],
        serde_json::json!({ "width": 64, "height": 32, "left": 0, "top": 0 })
    );
}

#[test]
fn rejects_unknown_manifest_format() {
    let project = Project::new();
    project.add_file("square.svg");

    project
        .run()
        .args(["input/square.svg", "-m", "-f", "yaml"])
        .assert()
        .failure()
        .stderr(contains("Unsupported manifest format"));
}
