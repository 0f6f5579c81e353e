use anyhow::{bail, Context};
use fs_err::tokio as fs;
use indicatif::MultiProgress;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::{
    archive::Archive,
    codec,
    config::Settings,
    err::format_error_chain,
    manifest::{strip_extension, Manifest},
    progress_bar::ProgressBar,
    render::{render, RenderContext, RenderRequest},
};

pub const ARCHIVE_NAME: &str = "iconify.zip";

/// An SVG file queued for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub name: String,
}

impl SourceFile {
    fn new(path: PathBuf) -> anyhow::Result<Self> {
        let name = path
            .file_name()
            .with_context(|| format!("Failed to get file name of {}", path.display()))?
            .to_string_lossy()
            .to_string();

        Ok(Self { path, name })
    }

    pub fn png_name(&self) -> String {
        format!("{}.png", strip_extension(&self.name))
    }
}

fn is_svg(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"))
}

/// Expands directories into the SVG files below them, sorted by path.
/// Files named directly are taken as they are.
pub fn collect_sources(paths: &[PathBuf]) -> anyhow::Result<Vec<SourceFile>> {
    let mut sources = Vec::new();

    for path in paths {
        if path.is_dir() {
            let mut found = WalkDir::new(path)
                .into_iter()
                .filter_map(Result::ok)
                .filter(|entry| entry.file_type().is_file() && is_svg(entry.path()))
                .map(|entry| entry.into_path())
                .collect::<Vec<_>>();
            found.sort();

            if found.is_empty() {
                warn!("No SVG files found in {}", path.display());
            }

            for file in found {
                sources.push(SourceFile::new(file)?);
            }
        } else if path.is_file() {
            sources.push(SourceFile::new(path.clone())?);
        } else {
            bail!("{} does not exist", path.display());
        }
    }

    Ok(sources)
}

#[derive(Debug)]
pub enum OutputArtifact {
    Image { name: String, data: Vec<u8> },
    Archive { name: String, data: Vec<u8> },
}

impl OutputArtifact {
    pub fn name(&self) -> &str {
        match self {
            Self::Image { name, .. } | Self::Archive { name, .. } => name,
        }
    }

    pub fn data(&self) -> &[u8] {
        match self {
            Self::Image { data, .. } | Self::Archive { data, .. } => data,
        }
    }

    pub async fn save(&self, dir: &Path) -> anyhow::Result<PathBuf> {
        fs::create_dir_all(dir)
            .await
            .context("Failed to create output directory")?;

        let path = dir.join(self.name());
        fs::write(&path, self.data())
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;

        Ok(path)
    }
}

#[derive(Debug)]
pub struct BatchOutcome {
    /// `None` when every file failed.
    pub artifact: Option<OutputArtifact>,
    pub rendered: usize,
    pub failures: Vec<PathBuf>,
}

fn request_for(source: &SourceFile, settings: &Settings) -> RenderRequest {
    RenderRequest::new(source.name.clone())
        .with_size(settings.width, settings.height)
        .with_color(settings.color.clone())
}

async fn render_file(
    context: &mut RenderContext,
    source: &SourceFile,
    settings: &Settings,
    manifest: Option<&mut Manifest>,
) -> anyhow::Result<Vec<u8>> {
    let data = fs::read(&source.path)
        .await
        .with_context(|| format!("Failed to read {}", source.path.display()))?;

    let encoded = render(context, &data, &request_for(source, settings), manifest)
        .await
        .with_context(|| format!("Failed to render {}", source.path.display()))?;

    Ok(codec::decode(&encoded))
}

/// Renders every source. A single file without a manifest becomes a
/// lone PNG; anything else is packed into one archive. Files are
/// rendered strictly one after another through the same context.
pub async fn run(
    context: &mut RenderContext,
    sources: &[SourceFile],
    settings: &Settings,
    multi_progress: &MultiProgress,
) -> anyhow::Result<BatchOutcome> {
    if let [source] = sources {
        if !settings.manifest {
            let data = render_file(context, source, settings, None).await?;
            return Ok(BatchOutcome {
                artifact: Some(OutputArtifact::Image {
                    name: source.png_name(),
                    data,
                }),
                rendered: 1,
                failures: Vec::new(),
            });
        }
    }

    let mut manifest = settings.manifest.then(|| Manifest::new(settings.extended));
    let mut archive = Archive::new();
    let mut failures = Vec::new();
    let mut rendered = 0;

    let progress_bar = ProgressBar::new(multi_progress, "Rendering", sources.len());

    for source in sources {
        progress_bar.set_msg(source.name.as_str());

        let key = strip_extension(&source.name);
        let previous = manifest.as_ref().and_then(|m| m.get(key).cloned());

        match render_file(context, source, settings, manifest.as_mut()).await {
            Ok(data) => {
                archive.add(source.png_name(), data);
                rendered += 1;
            }
            Err(err) => {
                warn!("Skipping {}: {}", source.name, format_error_chain(&err));
                if let Some(manifest) = manifest.as_mut() {
                    manifest.restore(key, previous);
                }
                failures.push(source.path.clone());
            }
        }

        debug_assert!(!context.is_attached());
        progress_bar.inc();
    }

    progress_bar.finish();

    if archive.is_empty() {
        return Ok(BatchOutcome {
            artifact: None,
            rendered,
            failures,
        });
    }

    if let Some(manifest) = &manifest {
        let text = manifest
            .serialize(settings.format)
            .context("Failed to serialize manifest")?;
        debug!("Manifest has {} entries", manifest.len());
        archive.add(settings.format.file_name(), text.into_bytes());
    }

    info!("Packing {} entries into {ARCHIVE_NAME}", archive.len());

    Ok(BatchOutcome {
        artifact: Some(OutputArtifact::Archive {
            name: ARCHIVE_NAME.to_string(),
            data: archive.finish()?,
        }),
        rendered,
        failures,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::ManifestFormat;
    use assert_fs::TempDir;
    use resvg::usvg::fontdb::Database;
    use std::{io::Read, sync::Arc, time::Duration};
    use zip::ZipArchive;

    const ICON: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="24" height="24">
        <circle cx="12" cy="12" r="10"/>
    </svg>"#;

    fn settings(manifest: bool) -> Settings {
        Settings {
            width: Some(16),
            height: Some(16),
            color: None,
            manifest,
            extended: true,
            format: ManifestFormat::Json,
            output: PathBuf::from("."),
            timeout: Duration::from_secs(10),
        }
    }

    fn context() -> RenderContext {
        RenderContext::new(Arc::new(Database::new()), Duration::from_secs(10))
    }

    fn write_sources(dir: &Path, names: &[(&str, &str)]) -> Vec<SourceFile> {
        names
            .iter()
            .map(|(name, content)| {
                let path = dir.join(name);
                std::fs::write(&path, content).unwrap();
                SourceFile::new(path).unwrap()
            })
            .collect()
    }

    #[test]
    fn png_names() {
        let source = SourceFile::new(PathBuf::from("icons/arrow.left.svg")).unwrap();
        assert_eq!(source.name, "arrow.left.svg");
        assert_eq!(source.png_name(), "arrow.left.png");
    }

    #[tokio::test]
    async fn single_file_without_manifest_is_a_png() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().to_path_buf();
        let sources = write_sources(&dir, &[("icon.svg", ICON)]);

        let outcome = run(&mut context(), &sources, &settings(false), &MultiProgress::new())
            .await
            .unwrap();

        match outcome.artifact {
            Some(OutputArtifact::Image { name, data }) => {
                assert_eq!(name, "icon.png");
                assert!(data.starts_with(b"\x89PNG"));
            }
            other => panic!("expected a PNG, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn batch_packs_images_and_manifest() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().to_path_buf();
        let sources = write_sources(&dir, &[("a.svg", ICON), ("b.svg", ICON), ("c.svg", ICON)]);

        let outcome = run(&mut context(), &sources, &settings(true), &MultiProgress::new())
            .await
            .unwrap();
        assert_eq!(outcome.rendered, 3);

        let Some(OutputArtifact::Archive { name, data }) = outcome.artifact else {
            panic!("expected an archive");
        };
        assert_eq!(name, ARCHIVE_NAME);

        let mut zip = ZipArchive::new(std::io::Cursor::new(data)).unwrap();
        assert_eq!(zip.len(), 4);

        let mut text = String::new();
        zip.by_name("manifest.json")
            .unwrap()
            .read_to_string(&mut text)
            .unwrap();
        let manifest: serde_json::Value = serde_json::from_str(&text).unwrap();
        let entries = manifest.as_object().unwrap();
        assert_eq!(entries.len(), 3);
        for key in ["a", "b", "c"] {
            let entry = &entries[key];
            assert!(entry.get("color").is_some());
            assert_eq!(entry["width"], 16);
            assert_eq!(entry["height"], 16);
            for field in ["width", "height", "left", "top"] {
                assert!(entry["bbox"][field].is_u64());
            }
        }
    }

    #[tokio::test]
    async fn failures_are_skipped() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().to_path_buf();
        let sources = write_sources(&dir, &[("good.svg", ICON), ("bad.svg", "<svg")]);

        let outcome = run(&mut context(), &sources, &settings(true), &MultiProgress::new())
            .await
            .unwrap();

        assert_eq!(outcome.rendered, 1);
        assert_eq!(outcome.failures, [dir.join("bad.svg")]);

        let Some(OutputArtifact::Archive { data, .. }) = outcome.artifact else {
            panic!("expected an archive");
        };
        let zip = ZipArchive::new(std::io::Cursor::new(data)).unwrap();
        let mut names: Vec<&str> = zip.file_names().collect();
        names.sort();
        assert_eq!(names, ["good.png", "manifest.json"]);
    }

    #[tokio::test]
    async fn all_failures_produce_nothing() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().to_path_buf();
        let sources = write_sources(&dir, &[("a.svg", "nope"), ("b.svg", "<svg")]);

        let outcome = run(&mut context(), &sources, &settings(false), &MultiProgress::new())
            .await
            .unwrap();

        assert!(outcome.artifact.is_none());
        assert_eq!(outcome.failures.len(), 2);
    }

    #[tokio::test]
    async fn shared_names_count_every_render() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().to_path_buf();
        std::fs::create_dir_all(dir.join("a")).unwrap();
        std::fs::create_dir_all(dir.join("b")).unwrap();
        let sources = write_sources(&dir, &[("a/icon.svg", ICON), ("b/icon.svg", ICON)]);

        let outcome = run(&mut context(), &sources, &settings(true), &MultiProgress::new())
            .await
            .unwrap();
        assert_eq!(outcome.rendered, 2);
        assert!(outcome.failures.is_empty());

        let Some(OutputArtifact::Archive { data, .. }) = outcome.artifact else {
            panic!("expected an archive");
        };
        let zip = ZipArchive::new(std::io::Cursor::new(data)).unwrap();
        assert_eq!(zip.len(), 2);
    }

    #[test]
    fn collects_svgs_from_directories() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().to_path_buf();
        std::fs::create_dir_all(dir.join("nested")).unwrap();
        std::fs::write(dir.join("b.svg"), ICON).unwrap();
        std::fs::write(dir.join("nested/a.SVG"), ICON).unwrap();
        std::fs::write(dir.join("notes.txt"), "").unwrap();

        let sources = collect_sources(&[dir.clone()]).unwrap();
        let names: Vec<&str> = sources.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["b.svg", "a.SVG"]);

        assert!(collect_sources(&[dir.join("missing.svg")]).is_err());
    }
}
