//! Gateway daemon -- main entry point.
//!
//! The daemon orchestrates the DDoS mitigation gateway's modules:
//! - eBPF ingress filter / egress tracker (Linux only)
//! - Event aggregator
//! - Flood heuristic
//!
//! # Usage
//!
//! ```text
//! guard-daemon --config /etc/guard/guard.toml
//! guard-daemon --validate    # validate config and exit
//! guard-daemon --log-level debug --log-format pretty
//! ```

mod cli;
mod health;
mod logging;
mod metrics_server;
mod modules;
mod orchestrator;

use anyhow::Result;
use clap::Parser;

use guard_core::config::LogFormat;

use crate::cli::DaemonCli;
use crate::orchestrator::Orchestrator;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DaemonCli::parse();

    let mut config = if cli.config.exists() {
        guard_core::config::GuardConfig::load(&cli.config)
            .map_err(|e| anyhow::anyhow!("failed to load config from {}: {}", cli.config.display(), e))?
    } else {
        tracing::warn!(path = %cli.config.display(), "config file not found, using defaults");
        guard_core::config::GuardConfig::default()
    };

    // Apply CLI overrides
    if let Some(ref level) = cli.log_level {
        config.general.log_level = level.clone();
    }
    if let Some(ref format) = cli.log_format {
        config.general.log_format = parse_log_format(format)?;
    }
    if let Some(ref pid_file) = cli.pid_file {
        config.general.pid_file = Some(pid_file.clone());
    }

    // Validate-only mode
    if cli.validate {
        return match config.validate() {
            Ok(()) => {
                // tracing may not be initialized yet in validate-only mode.
                let _guard = tracing_subscriber::fmt().with_env_filter("info").try_init();
                tracing::info!("configuration is valid");
                Ok(())
            }
            Err(e) => Err(anyhow::anyhow!("configuration validation failed: {}", e)),
        };
    }

    logging::init_tracing(&config.general)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config_path = %cli.config.display(),
        "guard-daemon starting"
    );

    if config.metrics.enabled {
        metrics_server::install_metrics_recorder(&config.metrics)?;
    }

    let mut orchestrator = Orchestrator::build_from_config(config).await?;
    orchestrator.run().await?;

    tracing::info!("guard-daemon shut down cleanly");
    Ok(())
}

fn parse_log_format(raw: &str) -> Result<LogFormat> {
    match raw.to_ascii_lowercase().as_str() {
        "json" => Ok(LogFormat::Json),
        "pretty" => Ok(LogFormat::Pretty),
        other => Err(anyhow::anyhow!("unknown log format '{}', expected 'json' or 'pretty'", other)),
    }
}
