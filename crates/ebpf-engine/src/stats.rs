//! Snapshot Collector — periodic sampler over the per-CPU global
//! counters, summing across CPUs and computing reset-safe rate deltas.
//!
//! Per-CPU counters are mapped onto one cache-aligned slot per core by
//! the kernel, per the per-CPU-arrays redesign flag: the hot path never
//! touches a shared atomic. This module owns the one place userspace is
//! allowed to sum them.

use std::time::{Duration, Instant};

use guard_ebpf_common::{
    GLOBAL_IDX_ALLOWED, GLOBAL_IDX_BLOCKED, GLOBAL_IDX_GEOIP_BLOCKED, GLOBAL_IDX_INVALID,
    GLOBAL_IDX_RATE_LIMITED, GLOBAL_IDX_TOTAL_BYTES, GLOBAL_IDX_TOTAL_PACKETS,
    GLOBAL_IDX_WHITELIST_HIT, GLOBAL_STATS_ENTRIES,
};

/// Raw per-CPU-summed counter values read straight from `global_stats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawGlobalCounters {
    pub total_packets: u64,
    pub total_bytes: u64,
    pub blocked: u64,
    pub allowed: u64,
    pub rate_limited: u64,
    pub whitelist_hit: u64,
    pub geoip_blocked: u64,
    pub invalid: u64,
}

impl RawGlobalCounters {
    /// Builds from a slice already summed across CPUs, indexed exactly
    /// as the kernel program's `GLOBAL_IDX_*` constants.
    pub fn from_summed_slots(slots: &[u64]) -> Self {
        debug_assert!(slots.len() >= GLOBAL_STATS_ENTRIES as usize);
        Self {
            total_packets: slots[GLOBAL_IDX_TOTAL_PACKETS as usize],
            total_bytes: slots[GLOBAL_IDX_TOTAL_BYTES as usize],
            blocked: slots[GLOBAL_IDX_BLOCKED as usize],
            allowed: slots[GLOBAL_IDX_ALLOWED as usize],
            rate_limited: slots[GLOBAL_IDX_RATE_LIMITED as usize],
            whitelist_hit: slots[GLOBAL_IDX_WHITELIST_HIT as usize],
            geoip_blocked: slots[GLOBAL_IDX_GEOIP_BLOCKED as usize],
            invalid: slots[GLOBAL_IDX_INVALID as usize],
        }
    }
}

/// Derived traffic rates between two snapshots.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrafficRate {
    pub pps: f64,
    pub bps: f64,
}

/// Tracks the previous sample and turns raw counters into rates,
/// treating any negative delta (a deliberate `reset_stats()` or a
/// counter wraparound) as a reset: the baseline restarts from the
/// post-reset value rather than reporting a negative rate.
pub struct TrafficStats {
    prev: RawGlobalCounters,
    prev_at: Instant,
}

impl TrafficStats {
    pub fn new(initial: RawGlobalCounters) -> Self {
        Self {
            prev: initial,
            prev_at: Instant::now(),
        }
    }

    /// Folds in a new sample, returning the rate for the elapsed
    /// interval. `now` is pluggable so tests don't depend on real time.
    pub fn update_at(&mut self, current: RawGlobalCounters, now: Instant) -> TrafficRate {
        let elapsed = now.duration_since(self.prev_at).max(Duration::from_millis(1));
        let elapsed_secs = elapsed.as_secs_f64();

        let (packets_delta, bytes_delta) = if current.total_packets < self.prev.total_packets {
            // Reset: report the post-reset value over the elapsed
            // interval rather than a negative delta.
            (current.total_packets, current.total_bytes)
        } else {
            (
                current.total_packets - self.prev.total_packets,
                current.total_bytes.saturating_sub(self.prev.total_bytes),
            )
        };

        self.prev = current;
        self.prev_at = now;

        TrafficRate {
            pps: packets_delta as f64 / elapsed_secs,
            bps: (bytes_delta as f64 * 8.0) / elapsed_secs,
        }
    }

    pub fn update(&mut self, current: RawGlobalCounters) -> TrafficRate {
        self.update_at(current, Instant::now())
    }
}

/// Per-IP stats summed across CPUs. `packets`/`bytes` are summed;
/// `last_seen_ns` takes the maximum across CPUs, never the sum (§3
/// invariant).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SummedIpStats {
    pub packets: u64,
    pub bytes: u64,
    pub last_seen_ns: u64,
}

pub fn sum_per_cpu_ip_stats(per_cpu: &[(u64, u64, u64)]) -> SummedIpStats {
    let mut out = SummedIpStats::default();
    for &(packets, bytes, last_seen_ns) in per_cpu {
        out.packets += packets;
        out.bytes += bytes;
        out.last_seen_ns = out.last_seen_ns.max(last_seen_ns);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counters(total_packets: u64, total_bytes: u64) -> RawGlobalCounters {
        RawGlobalCounters {
            total_packets,
            total_bytes,
            ..Default::default()
        }
    }

    #[test]
    fn rate_is_nonnegative_after_a_reset() {
        let mut stats = TrafficStats::new(counters(10_000, 1_000_000));
        let t0 = Instant::now();
        let rate = stats.update_at(counters(50, 5_000), t0 + Duration::from_secs(1));
        assert!(rate.pps >= 0.0);
        assert_eq!(rate.pps, 50.0);
    }

    #[test]
    fn rate_reflects_delta_over_elapsed_time() {
        let mut stats = TrafficStats::new(counters(0, 0));
        let t0 = Instant::now();
        let rate = stats.update_at(counters(200, 0), t0 + Duration::from_secs(2));
        assert_eq!(rate.pps, 100.0);
    }

    #[test]
    fn per_cpu_ip_stats_sum_counts_and_max_last_seen() {
        let summed = sum_per_cpu_ip_stats(&[(10, 1000, 5), (20, 2000, 9), (0, 0, 3)]);
        assert_eq!(summed.packets, 30);
        assert_eq!(summed.bytes, 3000);
        assert_eq!(summed.last_seen_ns, 9);
    }
}
