//! Centralized Prometheus metric name/label constants.
//!
//! Every module records through these constants with `metrics::counter!`,
//! `gauge!`, `histogram!` so the name and its description live in one
//! place.
//!
//! # Naming convention
//!
//! - prefix: `guard_`
//! - module: `ebpf_`, `aggregator_`, `sync_`, `flood_`
//! - suffix: `_total` (counter), `_seconds` (histogram), none (gauge)

// ─── label keys ──────────────────────────────────────────────────────

pub const LABEL_REASON: &str = "reason";
pub const LABEL_PROTOCOL: &str = "protocol";
pub const LABEL_RESULT: &str = "result";

// ─── ebpf engine ─────────────────────────────────────────────────────

pub const EBPF_PACKETS_TOTAL: &str = "guard_ebpf_packets_total";
pub const EBPF_BYTES_TOTAL: &str = "guard_ebpf_bytes_total";
pub const EBPF_PACKETS_BLOCKED_TOTAL: &str = "guard_ebpf_packets_blocked_total";
pub const EBPF_PACKETS_ALLOWED_TOTAL: &str = "guard_ebpf_packets_allowed_total";
pub const EBPF_PACKETS_RATE_LIMITED_TOTAL: &str = "guard_ebpf_packets_rate_limited_total";
pub const EBPF_PACKETS_WHITELIST_HIT_TOTAL: &str = "guard_ebpf_packets_whitelist_hit_total";
pub const EBPF_PACKETS_GEOIP_BLOCKED_TOTAL: &str = "guard_ebpf_packets_geoip_blocked_total";
pub const EBPF_PACKETS_INVALID_TOTAL: &str = "guard_ebpf_packets_invalid_total";
pub const EBPF_PACKETS_PER_SECOND: &str = "guard_ebpf_packets_per_second";
pub const EBPF_BITS_PER_SECOND: &str = "guard_ebpf_bits_per_second";
pub const EBPF_RING_EVENTS_DROPPED_TOTAL: &str = "guard_ebpf_ring_events_dropped_total";
pub const EBPF_ATTACH_DURATION_SECONDS: &str = "guard_ebpf_attach_duration_seconds";

// ─── aggregator ──────────────────────────────────────────────────────

pub const AGGREGATOR_EVENTS_RECEIVED_TOTAL: &str = "guard_aggregator_events_received_total";
pub const AGGREGATOR_GROUPS_DROPPED_TOTAL: &str = "guard_aggregator_groups_dropped_total";
pub const AGGREGATOR_RECORDS_PERSISTED_TOTAL: &str = "guard_aggregator_records_persisted_total";
pub const AGGREGATOR_PERSIST_FAILURES_TOTAL: &str = "guard_aggregator_persist_failures_total";
pub const AGGREGATOR_ALERTS_SENT_TOTAL: &str = "guard_aggregator_alerts_sent_total";
pub const AGGREGATOR_ACTIVE_GROUPS: &str = "guard_aggregator_active_groups";
pub const AGGREGATOR_FLUSH_DURATION_SECONDS: &str = "guard_aggregator_flush_duration_seconds";

// ─── map synchronizer ────────────────────────────────────────────────

pub const SYNC_WHITELIST_ENTRIES: &str = "guard_sync_whitelist_entries";
pub const SYNC_GEO_ALLOW_ENTRIES: &str = "guard_sync_geo_allow_entries";
pub const SYNC_GEO_ALLOW_TRUNCATED_TOTAL: &str = "guard_sync_geo_allow_truncated_total";
pub const SYNC_FAILURES_TOTAL: &str = "guard_sync_failures_total";

// ─── flood heuristic ─────────────────────────────────────────────────

pub const FLOOD_VIOLATIONS_TOTAL: &str = "guard_flood_violations_total";
pub const FLOOD_BLOCKS_TOTAL: &str = "guard_flood_blocks_total";
pub const FLOOD_TRACKED_IPS: &str = "guard_flood_tracked_ips";
pub const FLOOD_EVENTS_DROPPED_TOTAL: &str = "guard_flood_events_dropped_total";

// ─── control surface ─────────────────────────────────────────────────

pub const CONTROL_BLOCKS_ADDED_TOTAL: &str = "guard_control_blocks_added_total";
pub const CONTROL_BLOCKS_REMOVED_TOTAL: &str = "guard_control_blocks_removed_total";

pub const LATENCY_BUCKETS: [f64; 9] = [
    0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0,
];

/// Registers Prometheus HELP text for every metric above. Call once,
/// after the global recorder is installed — normally from
/// `guard-daemon`'s startup path.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge, describe_histogram};

    describe_counter!(EBPF_PACKETS_TOTAL, "Total packets seen by the ingress filter");
    describe_counter!(EBPF_BYTES_TOTAL, "Total bytes seen by the ingress filter");
    describe_counter!(EBPF_PACKETS_BLOCKED_TOTAL, "Packets dropped by the ingress filter");
    describe_counter!(EBPF_PACKETS_ALLOWED_TOTAL, "Packets allowed through the ingress filter");
    describe_counter!(
        EBPF_PACKETS_RATE_LIMITED_TOTAL,
        "Packets dropped for exceeding the per-IP rate limit"
    );
    describe_counter!(
        EBPF_PACKETS_WHITELIST_HIT_TOTAL,
        "Packets short-circuited by a whitelist match"
    );
    describe_counter!(
        EBPF_PACKETS_GEOIP_BLOCKED_TOTAL,
        "Packets flagged by the geo-allow check"
    );
    describe_counter!(EBPF_PACKETS_INVALID_TOTAL, "Packets that failed to parse");
    describe_gauge!(EBPF_PACKETS_PER_SECOND, "Current ingress packet rate");
    describe_gauge!(EBPF_BITS_PER_SECOND, "Current ingress bit rate");
    describe_counter!(
        EBPF_RING_EVENTS_DROPPED_TOTAL,
        "Ring events dropped because the reader or aggregator channel was full"
    );
    describe_histogram!(EBPF_ATTACH_DURATION_SECONDS, "Time to attach kernel programs");

    describe_counter!(
        AGGREGATOR_EVENTS_RECEIVED_TOTAL,
        "Ring events received by the aggregator"
    );
    describe_counter!(
        AGGREGATOR_GROUPS_DROPPED_TOTAL,
        "Events dropped because the aggregation map was at capacity"
    );
    describe_counter!(
        AGGREGATOR_RECORDS_PERSISTED_TOTAL,
        "Attack records written to the record sink"
    );
    describe_counter!(AGGREGATOR_PERSIST_FAILURES_TOTAL, "Persistence batch failures");
    describe_counter!(AGGREGATOR_ALERTS_SENT_TOTAL, "Throttled alerts sent to the notifier");
    describe_gauge!(AGGREGATOR_ACTIVE_GROUPS, "Current number of (src,reason) groups tracked");
    describe_histogram!(AGGREGATOR_FLUSH_DURATION_SECONDS, "Time spent flushing a batch");

    describe_gauge!(SYNC_WHITELIST_ENTRIES, "Current whitelist entry count");
    describe_gauge!(SYNC_GEO_ALLOW_ENTRIES, "Current geo-allow entry count");
    describe_counter!(SYNC_GEO_ALLOW_TRUNCATED_TOTAL, "Geo-allow entries dropped at the cap");
    describe_counter!(SYNC_FAILURES_TOTAL, "Synchronizer write/fetch failures");

    describe_counter!(FLOOD_VIOLATIONS_TOTAL, "Flood heuristic threshold crossings");
    describe_counter!(FLOOD_BLOCKS_TOTAL, "IPs blocked by the flood heuristic");
    describe_gauge!(FLOOD_TRACKED_IPS, "Current number of IPs tracked by the flood heuristic");
    describe_counter!(FLOOD_EVENTS_DROPPED_TOTAL, "Flood events dropped at the channel bound");

    describe_counter!(CONTROL_BLOCKS_ADDED_TOTAL, "Blocks added via the control surface");
    describe_counter!(CONTROL_BLOCKS_REMOVED_TOTAL, "Blocks removed via the control surface");
}
