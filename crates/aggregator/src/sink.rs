//! Pluggable outputs the aggregator flushes into: a persistence sink
//! for per-group attack records and a notifier for throttled alerts.
//! Country resolution is its own trait so it can be swapped for a test
//! double and so the lookup happens only at flush time, never per
//! event.

use std::net::Ipv4Addr;

use guard_core::error::AggregatorError;
use guard_core::types::{AlertSummary, AttackRecord};

pub trait RecordSink: Send + Sync {
    fn persist(&self, batch: Vec<AttackRecord>) -> impl std::future::Future<Output = Result<(), AggregatorError>> + Send;
}

pub trait Notifier: Send + Sync {
    fn notify(&self, alert: AlertSummary) -> impl std::future::Future<Output = Result<(), AggregatorError>> + Send;
}

pub trait CountryResolver: Send + Sync {
    fn resolve(&self, ip: Ipv4Addr) -> Option<(String, String)>;
}

/// Resolves nothing — used where geo enrichment isn't configured.
pub struct NullCountryResolver;

impl CountryResolver for NullCountryResolver {
    fn resolve(&self, _ip: Ipv4Addr) -> Option<(String, String)> {
        None
    }
}
