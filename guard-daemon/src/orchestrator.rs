//! Module orchestration -- assembly, channel wiring, and lifecycle management.
//!
//! The [`Orchestrator`] is the central coordinator of `guard-daemon`. It
//! loads configuration, creates inter-module channels, builds enabled
//! modules, manages startup/shutdown ordering, and runs the main event loop.
//!
//! # Event Flow
//!
//! The eBPF engine is the sole producer of [`RawEvent`]s. Its channel is
//! fanned out by a dedicated task to both downstream consumers, each
//! through its own bounded channel so a slow consumer can never stall the
//! other:
//!
//! ```text
//! EbpfEngine --RawEvent--> engine_rx --[fan-out task]--> agg_tx  --> Aggregator
//!                                                     \-> flood_tx --> FloodHeuristic
//! FloodHeuristic --synthesized Reason::Flood RawEvent-----------------> agg_tx (cloned)
//! ```
//!
//! The fan-out task uses `try_send` on each destination independently and
//! drops the event (counting it) rather than block, so neither consumer's
//! backlog can ever apply backpressure to the kernel-facing engine.
//!
//! # Startup Order (producers before consumers)
//!
//! 1. eBPF Engine (produces `RawEvent`s)
//! 2. Flood Heuristic (consumes `RawEvent`s, produces synthesized ones)
//! 3. Aggregator (consumes `RawEvent`s from both the engine and the flood
//!    heuristic)
//!
//! # Shutdown Order (same as startup - producers first)
//!
//! Stopping the engine first lets the flood heuristic and aggregator drain
//! whatever is already queued before they themselves stop.

use std::path::Path;
use std::time::Instant;

use anyhow::Result;
use tokio::sync::{broadcast, mpsc};

use guard_core::config::GuardConfig;
use guard_core::metrics as m;
use guard_ebpf_engine::RawEvent;

use crate::health::{DaemonHealth, ModuleHealth, aggregate_status};
use crate::modules::ModuleRegistry;

/// Capacity of the channel the eBPF engine feeds into the fan-out task.
const RAW_EVENT_CHANNEL_CAPACITY: usize = 10_000;

/// The main daemon orchestrator.
///
/// Manages the complete lifecycle of all gateway modules: configuration
/// loading, channel wiring, ordered startup, health monitoring, and
/// graceful shutdown.
pub struct Orchestrator {
    /// Loaded and validated configuration.
    config: GuardConfig,
    /// Registry of all module handles (ordered for start/stop).
    modules: ModuleRegistry,
    /// Shutdown broadcast sender (signals all background tasks).
    shutdown_tx: broadcast::Sender<()>,
    /// Daemon start time (for uptime reporting).
    #[allow(dead_code)] // Used in health method
    start_time: Instant,
    /// Fan-out task draining the engine's raw events into the aggregator
    /// and flood heuristic channels. `None` when the eBPF module is
    /// disabled, since there is nothing to fan out.
    fanout_task: Option<tokio::task::JoinHandle<()>>,
}

impl Orchestrator {
    /// Load configuration and build the orchestrator.
    ///
    /// # Arguments
    ///
    /// * `config_path` - Path to the `guard.toml` configuration file
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file cannot be read or parsed
    /// - Configuration validation fails
    /// - Any enabled module fails to initialize
    #[allow(dead_code)] // Public API for tests
    pub async fn build(config_path: &Path) -> Result<Self> {
        let config = GuardConfig::load(config_path).map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;
        Self::build_from_config(config).await
    }

    /// Build from an already-loaded configuration.
    ///
    /// Useful for testing or when config has already been loaded.
    pub async fn build_from_config(config: GuardConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

        tracing::debug!("creating inter-module channels");

        let (engine_tx, engine_rx) = mpsc::channel::<RawEvent>(RAW_EVENT_CHANNEL_CAPACITY);
        let (agg_tx, agg_rx) = mpsc::channel::<RawEvent>(config.aggregator.ring_channel_capacity);
        let (flood_tx, flood_rx) = mpsc::channel::<RawEvent>(config.flood.event_channel_capacity);
        let (shutdown_tx, _) = broadcast::channel(16);

        let mut modules = ModuleRegistry::new();

        // eBPF engine (Linux only) - sole producer.
        #[cfg(target_os = "linux")]
        let ebpf_enabled = {
            if let Some(handle) = crate::modules::ebpf::init(&config, engine_tx.clone())? {
                modules.register(handle);
                true
            } else {
                false
            }
        };
        #[cfg(not(target_os = "linux"))]
        let ebpf_enabled = {
            let _ = engine_tx.clone();
            false
        };
        drop(engine_tx);

        let fanout_task = if ebpf_enabled {
            Some(spawn_fanout(engine_rx, agg_tx.clone(), flood_tx, shutdown_tx.subscribe()))
        } else {
            None
        };

        // Flood heuristic forwards its synthesized events into the
        // aggregator's own ingest channel so they are recorded as attack
        // records alongside the ones observed directly by the engine.
        if let Some(handle) = crate::modules::flood::init(&config, flood_rx, agg_tx.clone())? {
            modules.register(handle);
        }

        if let Some(handle) = crate::modules::aggregator::init(&config, agg_rx)? {
            modules.register(handle);
        }

        tracing::info!(
            total_modules = modules.count(),
            enabled_modules = modules.enabled_count(),
            "orchestrator initialized"
        );

        Ok(Self {
            config,
            modules,
            shutdown_tx,
            start_time: Instant::now(),
            fanout_task,
        })
    }

    /// Start all enabled modules and enter the main event loop.
    ///
    /// This method blocks until a shutdown signal is received.
    /// Modules are started in dependency order (producers first).
    ///
    /// # Shutdown Triggers
    ///
    /// - `SIGTERM` (from systemd, Docker, or `kill`)
    /// - `SIGINT` (Ctrl+C)
    pub async fn run(&mut self) -> Result<()> {
        if let Some(pid_file) = self.config.general.pid_file.as_deref().filter(|p| !p.is_empty()) {
            write_pid_file(Path::new(pid_file))?;
        }

        tracing::info!("starting all enabled modules");
        if let Err(e) = self.modules.start_all().await {
            if let Some(pid_file) = self.config.general.pid_file.as_deref().filter(|p| !p.is_empty()) {
                remove_pid_file(Path::new(pid_file));
            }
            return Err(e);
        }

        tracing::info!("entering main event loop");
        let signal = wait_for_shutdown_signal().await?;
        tracing::info!(signal = signal, "shutdown signal received");

        tracing::info!("broadcasting shutdown signal to all tasks");
        let _ = self.shutdown_tx.send(());

        if let Some(task) = self.fanout_task.take() {
            let _ = task.await;
        }

        self.shutdown().await?;

        if let Some(pid_file) = self.config.general.pid_file.as_deref().filter(|p| !p.is_empty()) {
            remove_pid_file(Path::new(pid_file));
        }

        Ok(())
    }

    /// Perform graceful shutdown of all modules.
    ///
    /// Stops modules in registration order (producers first, consumers last).
    /// This allows consumers to drain remaining events from their channels.
    async fn shutdown(&mut self) -> Result<()> {
        tracing::info!("stopping all modules");
        self.modules.stop_all().await
    }

    /// Get the current aggregated health status.
    #[allow(dead_code)] // Future health endpoint
    pub async fn health(&self) -> DaemonHealth {
        let statuses = self.modules.health_statuses().await;
        let modules: Vec<ModuleHealth> = statuses
            .into_iter()
            .map(|(name, enabled, status)| ModuleHealth { name, enabled, status })
            .collect();

        let overall_status = aggregate_status(&modules);
        let uptime_secs = self.start_time.elapsed().as_secs();

        DaemonHealth {
            status: overall_status,
            uptime_secs,
            modules,
        }
    }

    /// Get a reference to the loaded configuration.
    #[allow(dead_code)] // Public API for introspection
    pub fn config(&self) -> &GuardConfig {
        &self.config
    }
}

/// Drains the engine's raw event channel and tees each event into the
/// aggregator's and flood heuristic's channels. Never blocks: a full
/// destination channel gets the event dropped and counted rather than
/// applying backpressure to the kernel-facing producer.
fn spawn_fanout(
    mut engine_rx: mpsc::Receiver<RawEvent>,
    agg_tx: mpsc::Sender<RawEvent>,
    flood_tx: mpsc::Sender<RawEvent>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                event = engine_rx.recv() => {
                    match event {
                        Some(event) => {
                            if agg_tx.try_send(event).is_err() {
                                metrics::counter!(m::EBPF_RING_EVENTS_DROPPED_TOTAL).increment(1);
                                tracing::debug!("aggregator channel full, dropping event");
                            }
                            if flood_tx.try_send(event).is_err() {
                                metrics::counter!(m::EBPF_RING_EVENTS_DROPPED_TOTAL).increment(1);
                                tracing::debug!("flood heuristic channel full, dropping event");
                            }
                        }
                        None => {
                            tracing::debug!("engine channel closed, exiting fan-out task");
                            break;
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::debug!("fan-out task shutting down");
                    break;
                }
            }
        }
    })
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
///
/// Returns the name of the signal that triggered the shutdown.
///
/// # Errors
///
/// Returns an error if signal handlers cannot be installed.
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm =
        signal(SignalKind::terminate()).map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
    let mut sigint =
        signal(SignalKind::interrupt()).map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Write the current process PID to a file.
///
/// Used to prevent duplicate daemon instances.
///
/// # Errors
///
/// Returns an error if the PID file cannot be written.
fn write_pid_file(path: &Path) -> Result<()> {
    use std::fs::{self, OpenOptions};
    use std::io::{ErrorKind, Write};

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let pid = std::process::id();

    // Atomically create file only if it doesn't exist (eliminates TOCTOU race)
    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            let existing_pid = fs::read_to_string(path).unwrap_or_else(|_| "unknown".to_string());
            return Err(anyhow::anyhow!(
                "PID file {} already exists with PID: {}. Is another instance running?",
                path.display(),
                existing_pid.trim()
            ));
        }
        Err(e) => return Err(e.into()),
    };

    writeln!(file, "{}", pid)?;

    tracing::info!(pid = pid, path = %path.display(), "PID file written");
    Ok(())
}

/// Remove the PID file on daemon shutdown.
///
/// Logs a warning but does not fail if the file cannot be removed.
fn remove_pid_file(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        tracing::warn!(path = %path.display(), error = %e, "failed to remove PID file");
    } else {
        tracing::info!(path = %path.display(), "PID file removed");
    }
}
