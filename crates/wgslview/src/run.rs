use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;
use wgsl_canvas::{presets, run_viewer};

use crate::cli::Cli;
use crate::config::{self, ViewerFile};

pub fn run(cli: Cli) -> Result<()> {
    if cli.list_presets {
        print_presets();
        return Ok(());
    }

    let file = match cli.config.as_deref() {
        Some(path) => config::load(path)?,
        None => ViewerFile::default(),
    };
    let config = config::resolve(&cli, file)?;
    tracing::info!(
        shader = %config.fragment.describe(),
        width = config.canvas.width,
        height = config.canvas.height,
        pixel_ratio = ?config.canvas.pixel_ratio,
        power = %config.canvas.power_preference,
        watch = config.watch,
        debounce_ms = config.reload_debounce.as_millis() as u64,
        "starting wgslview"
    );

    run_viewer(config).context("viewer stopped with an error")
}

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn print_presets() {
    println!("Built-in shaders:");
    for preset in presets::PRESETS {
        println!("  {:<10} {}", preset.name, preset.summary);
    }
}
