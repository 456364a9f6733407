//! Per-[`ProtectionLevel`] threshold table.

use std::time::Duration;

use guard_core::config::ProtectionLevel;

#[derive(Debug, Clone, Copy)]
pub struct LevelThresholds {
    pub conns_per_sec: u64,
    pub packets_per_sec: u64,
    pub bytes_per_sec: u64,
    pub violations_to_block: u32,
    pub block_duration: Duration,
}

pub fn thresholds_for(level: ProtectionLevel) -> LevelThresholds {
    match level {
        ProtectionLevel::Low => LevelThresholds {
            conns_per_sec: 100,
            packets_per_sec: 50_000,
            bytes_per_sec: 100 * 1_000_000,
            violations_to_block: 10,
            block_duration: Duration::from_secs(5 * 60),
        },
        ProtectionLevel::Standard => LevelThresholds {
            conns_per_sec: 50,
            packets_per_sec: 30_000,
            bytes_per_sec: 50 * 1_000_000,
            violations_to_block: 5,
            block_duration: Duration::from_secs(10 * 60),
        },
        ProtectionLevel::High => LevelThresholds {
            conns_per_sec: 20,
            packets_per_sec: 20_000,
            bytes_per_sec: 20 * 1_000_000,
            violations_to_block: 3,
            block_duration: Duration::from_secs(30 * 60),
        },
    }
}
