//! # League Recalc Binary
//!
//! Loads configuration, initializes logging and dispatches a CLI command.

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use recalc_service::cli::{Cli, CliHandler};
use recalc_service::{initialize_logging, load_config};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref()).context("Failed to load configuration")?;

    initialize_logging(&config.logging)?;
    info!("league-recalc v{}", recalc_service::VERSION);

    let handler = CliHandler::new(config, cli.data_dir).await?;
    handler.handle_command(cli.command).await
}
