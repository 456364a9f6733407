//! guard-cli -- Command-line interface for the DDoS mitigation gateway.
//!
//! Manages the guard-daemon lifecycle, reports module status, and drives
//! manual blocks through the control surface over the pinned eBPF maps.

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod error;
mod output;

use cli::{Cli, Commands};
use error::CliError;
use output::OutputWriter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing with minimal subscriber for CLI
    // Structured JSON would be noisy for interactive use, so we use compact format
    // Logs go to stderr, output goes to stdout
    let log_level = cli.log_level.as_deref().unwrap_or("warn");
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let writer = OutputWriter::new(cli.output);

    let result = run(cli, &writer).await;

    match result {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            // Errors rendered to stderr via tracing
            tracing::error!(error = %e, "command failed");
            std::process::exit(e.exit_code());
        }
    }
}

fn load_config(path: &std::path::Path) -> Result<guard_core::config::GuardConfig, CliError> {
    guard_core::config::GuardConfig::load(path).map_err(|e| CliError::Config(e.to_string()))
}

async fn run(cli: Cli, writer: &OutputWriter) -> Result<(), CliError> {
    match cli.command {
        Commands::Start(args) => commands::start::execute(args, &cli.config).await,
        Commands::Status(args) => commands::status::execute(args, &cli.config, writer).await,
        Commands::Block(args) => {
            let config = load_config(&cli.config)?;
            commands::block::execute(args, &config, writer).await
        }
        Commands::Unblock(args) => {
            let config = load_config(&cli.config)?;
            commands::unblock::execute(args, &config, writer).await
        }
        Commands::Config(args) => commands::config::execute(args, &cli.config, writer).await,
    }
}
