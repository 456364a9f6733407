//! Per-IP flood tracker: a 1-second sliding window over
//! connection/packet/byte counts, with a violation counter that
//! escalates to a timed block once the level's threshold is crossed.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::time::{Duration, Instant};

use crate::levels::LevelThresholds;

#[derive(Debug, Clone, Copy)]
struct IpRecord {
    window_start: Instant,
    conns: u64,
    packets: u64,
    bytes: u64,
    violations: u32,
    blocked_until: Option<Instant>,
    last_seen: Instant,
}

impl IpRecord {
    fn new(now: Instant) -> Self {
        Self {
            window_start: now,
            conns: 0,
            packets: 0,
            bytes: 0,
            violations: 0,
            blocked_until: None,
            last_seen: now,
        }
    }
}

const WINDOW: Duration = Duration::from_secs(1);

/// Outcome of a single `observe()` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Under every threshold, or already blocked.
    Ok,
    /// A threshold was crossed but the violation count hasn't reached
    /// the block trigger yet.
    Violation,
    /// This call crossed the violation trigger — caller should install
    /// a kernel block for `duration`.
    Block { duration: Duration },
}

pub struct FloodTracker {
    records: HashMap<Ipv4Addr, IpRecord>,
    thresholds: LevelThresholds,
}

impl FloodTracker {
    pub fn new(thresholds: LevelThresholds) -> Self {
        Self {
            records: HashMap::new(),
            thresholds,
        }
    }

    pub fn set_thresholds(&mut self, thresholds: LevelThresholds) {
        self.thresholds = thresholds;
    }

    pub fn tracked_ips(&self) -> usize {
        self.records.len()
    }

    /// Folds in one observation (e.g. a single packet, or a batch) for
    /// `ip`. `new_conns` is the number of new connections observed in
    /// this call (0 for a plain packet).
    pub fn observe(&mut self, ip: Ipv4Addr, new_conns: u64, packets: u64, bytes: u64, now: Instant) -> Verdict {
        let record = self.records.entry(ip).or_insert_with(|| IpRecord::new(now));
        record.last_seen = now;

        if let Some(until) = record.blocked_until {
            if now < until {
                return Verdict::Ok;
            }
            record.blocked_until = None;
        }

        if now.duration_since(record.window_start) >= WINDOW {
            let exceeded = record.conns > self.thresholds.conns_per_sec
                || record.packets > self.thresholds.packets_per_sec
                || record.bytes > self.thresholds.bytes_per_sec;

            record.window_start = now;
            record.conns = 0;
            record.packets = 0;
            record.bytes = 0;

            if exceeded {
                record.violations += 1;
                if record.violations >= self.thresholds.violations_to_block {
                    record.violations = 0;
                    // The window this observation would have landed in
                    // belongs to a now-blocked IP; don't seed the fresh
                    // window with it.
                    record.blocked_until = Some(now + self.thresholds.block_duration);
                    return Verdict::Block {
                        duration: self.thresholds.block_duration,
                    };
                }
                record.conns += new_conns;
                record.packets += packets;
                record.bytes += bytes;
                return Verdict::Violation;
            }
        }

        record.conns += new_conns;
        record.packets += packets;
        record.bytes += bytes;
        Verdict::Ok
    }

    /// Evicts records idle for longer than `idle_for`, and clears
    /// expired blocks on the rest so a stale `blocked_until` doesn't
    /// linger in memory once the kernel-side block has already lapsed.
    pub fn cleanup(&mut self, now: Instant, idle_for: Duration) {
        self.records.retain(|_, r| now.duration_since(r.last_seen) < idle_for);
        for record in self.records.values_mut() {
            if let Some(until) = record.blocked_until {
                if now >= until {
                    record.blocked_until = None;
                }
            }
        }
    }
}
