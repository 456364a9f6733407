//! Event factory functions for E2E tests.
//!
//! Provides convenient constructors for creating test events
//! with sensible defaults.

use std::net::Ipv4Addr;
use std::time::SystemTime;

use guard_core::types::{AlertSummary, AttackRecord, Reason};
use guard_ebpf_engine::RawEvent;

/// Create a test `RawEvent` with configurable source and reason.
#[allow(dead_code)]
pub fn create_test_raw_event(src_addr: Ipv4Addr, reason: Reason, timestamp_ns: u64) -> RawEvent {
    RawEvent {
        src_addr: u32::from(src_addr),
        reason_raw: reason as u32,
        timestamp_ns,
    }
}

/// Create a test `RawEvent` that looks like a rate-limit violation from a
/// fixed source, as the engine would emit under sustained flood traffic.
#[allow(dead_code)]
pub fn create_test_flood_event() -> RawEvent {
    create_test_raw_event(Ipv4Addr::new(203, 0, 113, 50), Reason::Flood, 1)
}

/// Create a test `AttackRecord` with configurable source and attack type.
#[allow(dead_code)]
pub fn create_test_attack_record(source_ip: Ipv4Addr, attack_type: &str) -> AttackRecord {
    AttackRecord {
        timestamp: SystemTime::now(),
        source_ip,
        country_code: None,
        country_name: None,
        attack_type: attack_type.to_owned(),
        pps: 10_000,
        count: 1,
        action: "block".to_owned(),
        details: String::new(),
    }
}

/// Create a test `AlertSummary` suitable for exercising a throttled notifier.
#[allow(dead_code)]
pub fn create_test_alert_summary(top_source: Ipv4Addr, total_pps: u64) -> AlertSummary {
    AlertSummary {
        window_start: SystemTime::now(),
        window_secs: 10,
        top_source,
        top_source_count: total_pps / 2,
        dominant_reason: Reason::Flood.attack_type().to_owned(),
        total_pps,
        additional_sources: 0,
    }
}
