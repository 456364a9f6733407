//! eBPF engine module initialization (Linux only).
//!
//! This module is conditionally compiled only on Linux targets.
//! On non-Linux platforms, the eBPF engine is simply not available.
//!
//! # Channel Wiring
//!
//! ```text
//! EbpfEngine --RawEvent--> event_tx --> orchestrator's fan-out task
//!                                       --> aggregator, flood heuristic
//! ```

use anyhow::Result;
use tokio::sync::mpsc;

use guard_core::config::GuardConfig;
use guard_ebpf_engine::{EbpfEngine, EngineConfig, RawEvent};

use super::ModuleHandle;

/// Initialize the eBPF engine module.
///
/// Returns `None` if the eBPF module is disabled in configuration.
///
/// # Arguments
///
/// * `config` - The full daemon configuration
/// * `event_tx` - Sender for ring events, drained by the orchestrator's
///   fan-out task into the aggregator and flood heuristic
pub fn init(config: &GuardConfig, event_tx: mpsc::Sender<RawEvent>) -> Result<Option<ModuleHandle>> {
    if !config.ebpf.enabled {
        tracing::info!("eBPF engine disabled in configuration");
        return Ok(None);
    }

    tracing::info!("initializing eBPF engine");

    let engine_config = EngineConfig::from_core(&config.ebpf);

    let (engine, _unused_rx) = EbpfEngine::builder()
        .config(engine_config)
        .event_sender(event_tx)
        .build()
        .map_err(|e| anyhow::anyhow!("failed to build eBPF engine: {}", e))?;

    let handle = ModuleHandle::new("ebpf-engine", true, Box::new(engine));

    Ok(Some(handle))
}
