pub mod aggregation;
pub mod analysis;
pub mod annotate;
pub mod capture;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod session;
pub mod settings;
pub mod shell;
mod utils;

use anyhow::Context;
use clap::Parser;

pub fn run() -> anyhow::Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args = shell::Args::parse();

    log::info!("FaceSentiment starting up...");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;

    runtime.block_on(shell::run_shell(args))
}
