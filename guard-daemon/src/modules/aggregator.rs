//! Event aggregator module initialization.
//!
//! Wraps [`guard_aggregator::Aggregator`] as a [`ModuleHandle`]. Persisted
//! attack records and throttled alerts are both logged through `tracing`
//! until an external sink (file, SIEM forwarder) is configured.
//!
//! # Channel Wiring
//!
//! ```text
//! orchestrator's fan-out task --RawEvent--> event_rx --> Aggregator
//! ```

use anyhow::Result;
use tokio::sync::mpsc;

use guard_aggregator::{Aggregator, AggregatorConfig, NullCountryResolver};
use guard_core::config::GuardConfig;
use guard_core::error::AggregatorError;
use guard_core::types::{AlertSummary, AttackRecord};
use guard_ebpf_engine::RawEvent;

use super::ModuleHandle;

/// Logs each persisted batch at `info` level, one line per record.
struct TracingRecordSink;

impl guard_aggregator::RecordSink for TracingRecordSink {
    async fn persist(&self, batch: Vec<AttackRecord>) -> Result<(), AggregatorError> {
        for record in &batch {
            tracing::info!(
                source_ip = %record.source_ip,
                attack_type = %record.attack_type,
                country_code = ?record.country_code,
                pps = record.pps,
                count = record.count,
                action = %record.action,
                "attack record"
            );
        }
        Ok(())
    }
}

/// Logs each throttled alert at `warn` level.
struct TracingNotifier;

impl guard_aggregator::Notifier for TracingNotifier {
    async fn notify(&self, alert: AlertSummary) -> Result<(), AggregatorError> {
        tracing::warn!(
            top_source = %alert.top_source,
            top_source_count = alert.top_source_count,
            dominant_reason = %alert.dominant_reason,
            total_pps = alert.total_pps,
            additional_sources = alert.additional_sources,
            window_secs = alert.window_secs,
            "aggregated attack alert"
        );
        Ok(())
    }
}

/// Initialize the aggregator module.
///
/// Returns `None` if the aggregator is disabled in configuration.
pub fn init(
    config: &GuardConfig,
    event_rx: mpsc::Receiver<RawEvent>,
) -> Result<Option<ModuleHandle>> {
    if !config.aggregator.enabled {
        tracing::info!("aggregator disabled in configuration");
        return Ok(None);
    }

    tracing::info!("initializing aggregator");

    let aggregator_config = AggregatorConfig {
        max_groups: config.aggregator.max_groups,
        flush_interval_secs: config.aggregator.flush_interval_secs,
        alert_interval_secs: config.aggregator.alert_interval_secs,
        persist_chunk_size: config.aggregator.persist_chunk_size,
    };

    let aggregator = Aggregator::new(
        aggregator_config,
        event_rx,
        TracingRecordSink,
        TracingNotifier,
        NullCountryResolver,
    );

    let handle = ModuleHandle::new("aggregator", true, Box::new(aggregator));
    Ok(Some(handle))
}
