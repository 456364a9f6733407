//! Domain types shared across the control plane.

use std::net::Ipv4Addr;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// Reason a packet was dropped or otherwise flagged by the ingress filter.
///
/// Numeric values match the wire encoding used in Ring Events and must
/// not be renumbered without updating the kernel program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum Reason {
    Manual = 1,
    RateLimit = 2,
    GeoIp = 3,
    Flood = 4,
    Invalid = 5,
}

impl Reason {
    pub fn from_u32(v: u32) -> Option<Self> {
        match v {
            1 => Some(Self::Manual),
            2 => Some(Self::RateLimit),
            3 => Some(Self::GeoIp),
            4 => Some(Self::Flood),
            5 => Some(Self::Invalid),
            _ => None,
        }
    }

    /// The `attack_type` string recorded on a persisted attack record.
    pub fn attack_type(self) -> &'static str {
        match self {
            Self::Manual => "manual_block",
            Self::RateLimit => "rate_limit_violation",
            Self::GeoIp => "geoip_violation",
            Self::Flood => "flood_violation",
            Self::Invalid => "invalid_packet",
        }
    }
}

/// Result of a `lookup_blocked` call on the Control Surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockInfo {
    pub ip: Ipv4Addr,
    pub reason: Reason,
    /// Wall-clock expiry, `None` for a permanent block.
    pub expires_at: Option<SystemTime>,
    /// Remaining TTL in seconds: `-1` permanent, `0` present-but-expired.
    pub ttl_seconds: i64,
}

/// A single aggregated attack record handed to the external record sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackRecord {
    pub timestamp: SystemTime,
    pub source_ip: Ipv4Addr,
    pub country_code: Option<String>,
    pub country_name: Option<String>,
    pub attack_type: String,
    pub pps: u64,
    pub count: u64,
    pub action: String,
    pub details: String,
}

/// A throttled, human-facing alert emitted once per alert window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertSummary {
    pub window_start: SystemTime,
    pub window_secs: u64,
    pub top_source: Ipv4Addr,
    pub top_source_count: u64,
    pub dominant_reason: String,
    pub total_pps: u64,
    pub additional_sources: u64,
}
