//! Flood heuristic module initialization.
//!
//! Wraps [`guard_flood_heuristic::FloodHeuristic`] as a [`ModuleHandle`].
//! Blocks are installed through the control surface over the real pinned
//! maps on Linux; everywhere else (or if the maps aren't pinned because
//! the eBPF engine is disabled) it falls back to a logging-only sink so
//! the heuristic still runs in an observability-only mode.
//!
//! # Channel Wiring
//!
//! ```text
//! orchestrator's fan-out task --RawEvent--> event_rx --> FloodHeuristic
//! FloodHeuristic --synthesized Reason::Flood RawEvent--> forward_tx --> aggregator
//! ```

use std::net::Ipv4Addr;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;

use guard_core::config::GuardConfig;
use guard_core::error::FloodError;
use guard_ebpf_engine::RawEvent;
use guard_flood_heuristic::{BlockSink, FloodHeuristic, FloodHeuristicConfig};

use super::ModuleHandle;

/// Logs the block attempt instead of installing it. Used when no pinned
/// control-plane maps are reachable (eBPF disabled, or running off
/// Linux) so the heuristic keeps tracking and reporting without a
/// kernel path to enforce against.
struct LoggingBlockSink;

impl BlockSink for LoggingBlockSink {
    async fn block(&self, ip: Ipv4Addr, duration: Duration) -> Result<(), FloodError> {
        tracing::warn!(%ip, ?duration, "flood heuristic would block (no control surface attached)");
        Ok(())
    }
}

#[cfg(target_os = "linux")]
mod control_sink {
    use std::net::Ipv4Addr;
    use std::sync::Arc;
    use std::time::{Duration, SystemTime};

    use tokio::sync::Mutex;

    use guard_core::error::FloodError;
    use guard_core::types::Reason;
    use guard_ebpf_engine::{AyaBlockedIps, AyaConfig, AyaGeoAllow, ClockOffset, ControlSurface, PinnedMaps};
    use guard_flood_heuristic::BlockSink;

    /// Installs flood blocks through the real control surface over the
    /// pinned `config`/`blocked_ips`/`geo_allowed` maps.
    pub struct ControlBlockSink {
        surface: Arc<Mutex<ControlSurface<AyaConfig, AyaBlockedIps, AyaGeoAllow>>>,
    }

    impl ControlBlockSink {
        pub fn open(pin_path: &str) -> Result<Self, guard_core::error::ControlError> {
            let PinnedMaps {
                config,
                blocked_ips,
                geo_allowed,
                whitelist: _,
            } = PinnedMaps::open(pin_path)?;
            let clock = ClockOffset::capture(monotonic_now_ns(), SystemTime::now());
            Ok(Self {
                surface: Arc::new(Mutex::new(ControlSurface::new(config, blocked_ips, geo_allowed, clock))),
            })
        }
    }

    impl BlockSink for ControlBlockSink {
        async fn block(&self, ip: Ipv4Addr, duration: Duration) -> Result<(), FloodError> {
            self.surface
                .lock()
                .await
                .add_block(ip, Reason::Flood, Some(duration))
                .map_err(|e| FloodError::ControlFailed(e.to_string()))
        }
    }

    /// `CLOCK_MONOTONIC` at the moment the control surface is opened,
    /// matching the one-time offset capture the eBPF engine itself does
    /// on load.
    fn monotonic_now_ns() -> u64 {
        let mut ts = libc_timespec_zero();
        // SAFETY: `clock_gettime` with `CLOCK_MONOTONIC` only writes to `ts`.
        unsafe {
            libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts);
        }
        ts.tv_sec as u64 * 1_000_000_000 + ts.tv_nsec as u64
    }

    fn libc_timespec_zero() -> libc::timespec {
        libc::timespec { tv_sec: 0, tv_nsec: 0 }
    }
}

/// Initialize the flood heuristic module.
///
/// Returns `None` if the module is disabled in configuration.
pub fn init(
    config: &GuardConfig,
    event_rx: mpsc::Receiver<RawEvent>,
    forward_tx: mpsc::Sender<RawEvent>,
) -> Result<Option<ModuleHandle>> {
    if !config.flood.enabled {
        tracing::info!("flood heuristic disabled in configuration");
        return Ok(None);
    }

    tracing::info!("initializing flood heuristic");

    let heuristic_config = FloodHeuristicConfig {
        level: config.flood.level,
        cleanup_interval_secs: config.flood.cleanup_interval_secs,
        idle_eviction_secs: config.flood.idle_eviction_secs,
    };

    let pipeline: Box<dyn guard_core::pipeline::DynPipeline> = build_pipeline(config, heuristic_config, event_rx, forward_tx);

    let handle = ModuleHandle::new("flood-heuristic", true, pipeline);
    Ok(Some(handle))
}

#[cfg(target_os = "linux")]
fn build_pipeline(
    config: &GuardConfig,
    heuristic_config: FloodHeuristicConfig,
    event_rx: mpsc::Receiver<RawEvent>,
    forward_tx: mpsc::Sender<RawEvent>,
) -> Box<dyn guard_core::pipeline::DynPipeline> {
    if config.ebpf.enabled {
        match control_sink::ControlBlockSink::open(&guard_ebpf_engine::EngineConfig::from_core(&config.ebpf).pin_path()) {
            Ok(sink) => return Box::new(FloodHeuristic::new(heuristic_config, event_rx, forward_tx, sink)),
            Err(e) => {
                tracing::warn!(error = %e, "failed to open pinned control-plane maps, flood heuristic running in log-only mode");
            }
        }
    }
    Box::new(FloodHeuristic::new(heuristic_config, event_rx, forward_tx, LoggingBlockSink))
}

#[cfg(not(target_os = "linux"))]
fn build_pipeline(
    _config: &GuardConfig,
    heuristic_config: FloodHeuristicConfig,
    event_rx: mpsc::Receiver<RawEvent>,
    forward_tx: mpsc::Sender<RawEvent>,
) -> Box<dyn guard_core::pipeline::DynPipeline> {
    Box::new(FloodHeuristic::new(heuristic_config, event_rx, forward_tx, LoggingBlockSink))
}
