mod ai;
mod app;
mod cli;
mod config;
mod db;
mod domain;
mod gateway;
mod infrastructure;
mod tasks;

use anyhow::Result;
use clap::Parser;
use infrastructure::{directories, logging, shutdown};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = cli::Cli::parse();

    let config = config::load_config()?;
    let paths = directories::ensure_directories(&config.directories)?;
    logging::init_tracing(&config, &paths)?;

    let shutdown = shutdown::Shutdown::new();
    shutdown::install_signal_handlers(shutdown.clone());

    let check_connectivity = cli.command.needs_connectivity();
    let app = app::ReliefApp::initialize(config, paths, shutdown, check_connectivity).await?;
    app.execute(cli.command).await
}
