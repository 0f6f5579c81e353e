use anyhow::{bail, Context};
use fs_err::tokio as fs;
use serde::Deserialize;
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{cli::Cli, manifest::ManifestFormat};

pub static FILE_NAME: &str = "iconify.toml";

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const MAX_TIMEOUT_SECS: u64 = 60 * 60;

/// Defaults read from `iconify.toml`. Command-line flags take precedence.
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub color: Option<String>,
    pub manifest: bool,
    pub extended: bool,
    pub format: Option<ManifestFormat>,
    pub output: Option<PathBuf>,
    pub timeout: Option<u64>,
}

impl Config {
    /// Reads `path`, or `iconify.toml` when no path is given. Only an
    /// explicitly named file is required to exist.
    pub async fn read(path: Option<&Path>) -> anyhow::Result<Config> {
        let (path, required) = match path {
            Some(path) => (path, true),
            None => (Path::new(FILE_NAME), false),
        };

        if !required && !path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path)
            .await
            .context("Failed to read config file")?;
        Config::parse(&content)
    }

    pub fn parse(content: &str) -> anyhow::Result<Config> {
        toml::from_str(content).context("Failed to parse config file")
    }
}

/// Settings for one run, after merging flags over the config file.
#[derive(Debug, Clone)]
pub struct Settings {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub color: Option<String>,
    pub manifest: bool,
    pub extended: bool,
    pub format: ManifestFormat,
    pub output: PathBuf,
    pub timeout: Duration,
}

impl Settings {
    pub fn resolve(cli: &Cli, config: Config) -> anyhow::Result<Settings> {
        let width = cli.width.or(config.width);
        let height = cli.height.or(config.height);
        if width == Some(0) || height == Some(0) {
            bail!("Output width and height must be positive");
        }

        let timeout = cli
            .timeout
            .or(config.timeout)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout == 0 {
            bail!("Timeout must be at least one second");
        }
        if timeout > MAX_TIMEOUT_SECS {
            bail!("Timeout must be at most {MAX_TIMEOUT_SECS} seconds");
        }

        Ok(Settings {
            width,
            height: height.or(width),
            color: cli.color.clone().or(config.color).map(|c| resolve_color(&c)),
            manifest: cli.manifest || config.manifest,
            extended: cli.extended || config.extended,
            format: cli.format.or(config.format).unwrap_or_default(),
            output: cli
                .output
                .clone()
                .or(config.output)
                .unwrap_or_else(|| PathBuf::from(".")),
            timeout: Duration::from_secs(timeout),
        })
    }
}

/// Maps the named presets to hex; anything else is used verbatim.
pub fn resolve_color(color: &str) -> String {
    match color {
        "black" => "#000000".to_string(),
        "white" => "#ffffff".to_string(),
        other => other.to_string(),
    }
}
