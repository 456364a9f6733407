//! Event Aggregator — groups ring events by `(source_ip, reason)` and
//! flushes persisted attack records and throttled alerts on independent
//! cadences.
//!
//! See [`aggregator::Aggregator`] for the [`guard_core::pipeline::Pipeline`]
//! implementation, [`groups`] for the bounded grouping table, and
//! [`sink`] for the pluggable persistence/notification/geo traits.

mod aggregator;
mod groups;
mod sink;
mod state;

pub use aggregator::{Aggregator, AggregatorConfig};
pub use groups::{GroupKey, GroupStats, GroupTable};
pub use sink::{CountryResolver, Notifier, NullCountryResolver, RecordSink};
pub use state::AggregatorState;
