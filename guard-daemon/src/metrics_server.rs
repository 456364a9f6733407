//! Prometheus metrics HTTP server.
//!
//! Uses the built-in HTTP listener from `metrics-exporter-prometheus`
//! to expose Prometheus scrape endpoints at `/metrics`.
//!
//! # Usage
//!
//! ```ignore
//! let config = MetricsConfig::default();
//! install_metrics_recorder(&config)?;
//! // After this, all metrics::counter!(), metrics::gauge!(), metrics::histogram!() calls are recorded
//! ```

use std::net::SocketAddr;

use anyhow::Result;
use guard_core::config::MetricsConfig;
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the global metrics recorder and start the HTTP listener.
///
/// This function should be called once per process.
/// After calling this, all `metrics::counter!()`, `metrics::gauge!()`, `metrics::histogram!()`
/// macros will record to the Prometheus format.
///
/// # Errors
///
/// - Socket binding fails
/// - Global recorder is already installed
pub fn install_metrics_recorder(config: &MetricsConfig) -> Result<()> {
    let addr: SocketAddr = config
        .bind_addr
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid metrics bind address '{}': {}", config.bind_addr, e))?;

    if addr.ip().is_unspecified() {
        tracing::warn!(
            bind_addr = %addr,
            "metrics endpoint is exposed on all interfaces; restrict bind_addr in untrusted networks"
        );
    }

    tracing::info!(bind_addr = %addr, "installing Prometheus metrics recorder");

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("failed to install metrics recorder: {}", e))?;

    guard_core::metrics::describe_all();

    tracing::info!(bind_addr = %addr, "Prometheus metrics endpoint active");

    Ok(())
}
