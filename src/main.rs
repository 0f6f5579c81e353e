use anyhow::bail;
use clap::Parser;
use cli::Cli;
use indicatif::MultiProgress;
use log::{info, LevelFilter};
use render::RenderContext;
use resvg::usvg::fontdb;
use std::sync::Arc;

use crate::config::{Config, Settings};

mod archive;
mod batch;
mod cli;
mod codec;
mod config;
mod err;
mod manifest;
mod progress_bar;
mod render;
mod svg;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let mut binding = env_logger::Builder::new();
    let logger = binding
        .filter_level(LevelFilter::Info)
        .filter_module("iconify", args.verbose.log_level_filter())
        .format_timestamp(None)
        .format_module_path(false)
        .build();

    let level = logger.filter();

    let multi_progress = MultiProgress::new();
    indicatif_log_bridge::LogWrapper::new(multi_progress.clone(), logger).try_init()?;

    log::set_max_level(level);

    let config = Config::read(args.config.as_deref()).await?;
    let settings = Settings::resolve(&args, config)?;

    let sources = batch::collect_sources(&args.paths)?;
    if sources.is_empty() {
        bail!("No SVG files to render");
    }

    let font_db = Arc::new({
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        db
    });

    let mut context = RenderContext::new(font_db, settings.timeout);

    let outcome = batch::run(&mut context, &sources, &settings, &multi_progress).await?;

    if let Some(artifact) = &outcome.artifact {
        let path = artifact.save(&settings.output).await?;
        info!("Wrote {}", path.display());
    }

    if !outcome.failures.is_empty() {
        bail!(
            "{} of {} files failed to render",
            outcome.failures.len(),
            sources.len()
        );
    }

    info!("Rendered {} files", outcome.rendered);

    Ok(())
}
