use assert_cmd::cargo::cargo_bin_cmd;
use assert_fs::{fixture::ChildPath, prelude::*, TempDir};
use std::{fs, io::Cursor, path::Path};

pub struct Project {
    pub dir: TempDir,
}

impl Project {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn write_config(&self, contents: toml::Table) {
        self.dir
            .child("iconify.toml")
            .write_str(&contents.to_string())
            .unwrap();
    }

    fn read_test_asset(&self, file_name: &str) -> Vec<u8> {
        let path = Path::new("tests").join("assets").join(file_name);
        fs::read(&path).unwrap()
    }

    pub fn add_file(&self, file_name: &str) -> ChildPath {
        self.add_file_as(file_name, file_name)
    }

    pub fn add_file_as(&self, asset_name: &str, file_name: &str) -> ChildPath {
        let file = self.dir.child("input").child(file_name);
        file.write_binary(&self.read_test_asset(asset_name)).unwrap();
        file
    }

    pub fn run(&self) -> assert_cmd::Command {
        let mut cmd = cargo_bin_cmd!();
        cmd.current_dir(self.dir.path());
        cmd
    }

    pub fn read_png(&self, path: &str) -> image::RgbaImage {
        image::open(self.dir.child(path).path()).unwrap().to_rgba8()
    }

    pub fn read_archive(&self, path: &str) -> zip::ZipArchive<Cursor<Vec<u8>>> {
        let data = fs::read(self.dir.child(path).path()).unwrap();
        zip::ZipArchive::new(Cursor::new(data)).unwrap()
    }
}
