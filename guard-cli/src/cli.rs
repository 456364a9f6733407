//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::net::Ipv4Addr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// guard -- DDoS mitigation gateway control CLI.
///
/// Use `guard <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "guard", version, about, long_about = None)]
pub struct Cli {
    /// Path to the guard.toml configuration file.
    #[arg(short, long, default_value = "/etc/guard/guard.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table / text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the gateway daemon.
    Start(StartArgs),

    /// Check status of each module and, on Linux, the current block list.
    Status(StatusArgs),

    /// Block a source IP through the control surface.
    Block(BlockArgs),

    /// Remove a block on a source IP.
    Unblock(UnblockArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- start ----

/// Start the gateway daemon.
#[derive(Args, Debug)]
pub struct StartArgs {
    /// Run as a background daemon (default: foreground).
    #[arg(short = 'd', long)]
    pub daemonize: bool,

    /// Override PID file location (daemon mode only).
    #[arg(long)]
    pub pid_file: Option<PathBuf>,
}

// ---- status ----

/// Display module health and uptime.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Show detailed per-module metrics, and list currently blocked IPs
    /// on Linux (via the pinned control-plane maps).
    #[arg(short, long)]
    pub verbose: bool,
}

// ---- block ----

/// Block a source IP.
#[derive(Args, Debug)]
pub struct BlockArgs {
    /// IPv4 address to block.
    pub ip: Ipv4Addr,

    /// Block duration in seconds. Omit for a permanent block.
    #[arg(long)]
    pub duration_secs: Option<u64>,
}

// ---- unblock ----

/// Remove a block on a source IP.
#[derive(Args, Debug)]
pub struct UnblockArgs {
    /// IPv4 address to unblock.
    pub ip: Ipv4Addr,
}

// ---- config ----

/// Manage gateway configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + defaults).
    Show {
        /// Show only a specific section (general, ebpf, aggregator, sync, flood, control, metrics).
        #[arg(long)]
        section: Option<String>,
    },
}
