mod app;
mod balance;
mod config;
mod events;
mod hud;
mod input;
mod model;
mod sim;
mod storage;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser, Debug, Clone)]
#[command(name = "bobdays")]
#[command(about = "Keep Bob's health, happiness and imagination alive, one day at a time", long_about = None)]
pub(crate) struct Args {
    /// FPS cap (render rate). The simulation runs at a fixed step.
    #[arg(long)]
    fps: Option<u32>,

    /// Seed for Bob's needy moments
    #[arg(long)]
    seed: Option<u64>,

    /// Balance file (JSON) to use instead of the one in the data dir
    #[arg(long)]
    balance: Option<PathBuf>,

    /// Discard any saved run and start from day 1
    #[arg(long, default_value_t = false)]
    new_game: bool,

    /// Plain white HUD
    #[arg(long, default_value_t = false)]
    no_color: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let paths = config::project_paths()?;
    let _guard = setup_logging(&paths.log_dir)?;
    app::run(&args, paths)
}

/// File-only logging: the HUD owns the terminal.
fn setup_logging(log_dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("could not create log dir {}", log_dir.display()))?;

    let file_appender = tracing_appender::rolling::never(log_dir, "bobdays.log");
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .init();

    tracing::info!(dir = %log_dir.display(), "logging initialized");
    Ok(guard)
}
