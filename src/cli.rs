use crate::manifest::ManifestFormat;
use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    version,
    about = "Render SVG icons to PNG, optionally packed into a ZIP with a placement manifest."
)]
pub struct Cli {
    /// SVG files to render, or directories to search for SVG files.
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Output width in pixels.
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
    pub width: Option<u32>,

    /// Output height in pixels. Defaults to the width.
    #[arg(short = 'H', long, value_parser = clap::value_parser!(u32).range(1..))]
    pub height: Option<u32>,

    /// Fill color for every shape: "black", "white" or any CSS color.
    #[arg(short, long)]
    pub color: Option<String>,

    /// Pack the images into iconify.zip together with a manifest.
    #[arg(short, long)]
    pub manifest: bool,

    /// Record the color and canvas size alongside each bounding box.
    #[arg(short, long)]
    pub extended: bool,

    /// Manifest format: "json" or "lua".
    #[arg(short, long)]
    pub format: Option<ManifestFormat>,

    /// Directory the PNG or archive is written to.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Seconds to wait for an SVG to decode before giving up on it.
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Config file to read instead of iconify.toml.
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub verbose: Verbosity<InfoLevel>,
}
