//! Kernel/userspace shared map types.
//!
//! `#![no_std]` so the same crate compiles for the `bpfel-unknown-none`
//! kernel target and for the host userspace control plane. Every type
//! here is `#[repr(C)]` with explicit padding so the memory layout is
//! identical on both sides of the map.
//!
//! # Map selection rationale
//! - **LpmTrie** (`blocked_ips`, `white_list`, `geo_allowed`): longest-
//!   prefix-match over CIDR keys, the natural structure for IP-range
//!   allow/deny decisions.
//! - **LruHashMap** (`ip_stats`): bounded by construction — eviction
//!   under memory pressure is expected and desired over an unbounded
//!   map that OOMs under a distributed attack.
//! - **HashMap** (`port_stats`, `active_connections`): exact-match O(1)
//!   lookup, no ordering requirement.
//! - **PerCpuArray** (`global_stats`, per-IP/per-port counters): no
//!   hot-path atomic contention; userspace sums across CPUs on read.
//! - **Array** (`config`): fixed small index space, read every packet.
//! - **RingBuf** (`events`): single-producer, low-overhead variable
//!   framing, the modern replacement for `PerfEventArray`.

#![cfg_attr(not(test), no_std)]

// ─── pinned map filenames (binary-exact, see EXTERNAL INTERFACES) ────

pub const MAP_IP_STATS: &str = "ip_stats";
pub const MAP_BLOCKED_IPS: &str = "blocked_ips";
pub const MAP_WHITE_LIST: &str = "white_list";
pub const MAP_GEO_ALLOWED: &str = "geo_allowed";
pub const MAP_PORT_STATS: &str = "port_stats";
pub const MAP_GLOBAL_STATS: &str = "global_stats";
pub const MAP_CONFIG: &str = "config";
pub const MAP_ACTIVE_CONNECTIONS: &str = "active_connections";
pub const MAP_EVENTS: &str = "events";

// ─── protocol numbers ─────────────────────────────────────────────────

pub const PROTO_ICMP: u8 = 1;
pub const PROTO_TCP: u8 = 6;
pub const PROTO_UDP: u8 = 17;

// ─── drop/reason codes (Ingress Decision reasons, §3) ─────────────────

pub const REASON_MANUAL: u32 = 1;
pub const REASON_RATE_LIMIT: u32 = 2;
pub const REASON_GEOIP: u32 = 3;
pub const REASON_FLOOD: u32 = 4;
pub const REASON_INVALID: u32 = 5;

// ─── global_stats PerCpuArray indices ──────────────────────────────────

pub const GLOBAL_IDX_TOTAL_PACKETS: u32 = 0;
pub const GLOBAL_IDX_TOTAL_BYTES: u32 = 1;
pub const GLOBAL_IDX_BLOCKED: u32 = 2;
pub const GLOBAL_IDX_ALLOWED: u32 = 3;
pub const GLOBAL_IDX_RATE_LIMITED: u32 = 4;
pub const GLOBAL_IDX_WHITELIST_HIT: u32 = 5;
pub const GLOBAL_IDX_GEOIP_BLOCKED: u32 = 6;
pub const GLOBAL_IDX_INVALID: u32 = 7;
pub const GLOBAL_STATS_ENTRIES: u32 = 8;

// ─── config Array indices ──────────────────────────────────────────────

pub const CONFIG_IDX_HARD_BLOCKING: u32 = 0;
pub const CONFIG_IDX_RATE_LIMIT_PPS: u32 = 1;
pub const CONFIG_IDX_MAINTENANCE_MODE: u32 = 2;
pub const CONFIG_ENTRIES: u32 = 3;

// ─── bounds ─────────────────────────────────────────────────────────

pub const IP_STATS_MAX_ENTRIES: u32 = 100_000;
pub const PORT_STATS_MAX_ENTRIES: u32 = 65_536;
pub const ACTIVE_CONNECTIONS_MAX_ENTRIES: u32 = 200_000;
/// Lazily-reaped TTL for an Active Connection entry (§4.2).
pub const ACTIVE_CONNECTION_TTL_SECS: u64 = 300;

/// LPM key shared by the blocklist, whitelist and geo-allow tries.
///
/// `prefix_len` is in `[0, 32]`. `data` holds the IPv4 address in
/// network-byte-order octets — this exact layout (a `u32` length
/// followed by 4 address bytes) is required by `aya`'s LPM trie and is
/// the byte-exactness invariant checked in tests.
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "user", derive(Debug, Hash))]
pub struct LpmKey {
    pub prefix_len: u32,
    pub data: [u8; 4],
}

impl LpmKey {
    pub const fn new(prefix_len: u32, data: [u8; 4]) -> Self {
        Self { prefix_len, data }
    }

    /// A host-order `u32` IPv4 address as a `/32` key.
    pub const fn host(addr: u32) -> Self {
        Self {
            prefix_len: 32,
            data: addr.to_be_bytes(),
        }
    }
}

#[cfg(feature = "user")]
unsafe impl aya::Pod for LpmKey {}

/// `blocked_ips` value.
///
/// `expires_at_ns == 0` means permanent. `expires_at_ns` is a
/// **monotonic** nanosecond stamp from the kernel boot clock; userspace
/// converts to wall time with a one-time boot-time offset (§9).
#[repr(C)]
#[derive(Clone, Copy)]
#[cfg_attr(feature = "user", derive(Debug))]
pub struct BlockValue {
    pub expires_at_ns: u64,
    pub reason: u32,
    pub _pad: u32,
}

#[cfg(feature = "user")]
unsafe impl aya::Pod for BlockValue {}

impl BlockValue {
    pub const fn permanent(reason: u32) -> Self {
        Self {
            expires_at_ns: 0,
            reason,
            _pad: 0,
        }
    }

    pub const fn is_permanent(&self) -> bool {
        self.expires_at_ns == 0
    }
}

/// `white_list` value — a single flag byte (non-zero means present).
#[repr(C)]
#[derive(Clone, Copy)]
#[cfg_attr(feature = "user", derive(Debug))]
pub struct WhitelistValue {
    pub flag: u8,
    pub _pad: [u8; 3],
}

#[cfg(feature = "user")]
unsafe impl aya::Pod for WhitelistValue {}

impl WhitelistValue {
    pub const PRESENT: Self = Self {
        flag: 1,
        _pad: [0; 3],
    };
}

/// `geo_allowed` value — ISO 3166-1 alpha-2 country code packed as
/// `(c0 << 8) | c1`, both uppercase ASCII.
#[repr(C)]
#[derive(Clone, Copy)]
#[cfg_attr(feature = "user", derive(Debug))]
pub struct GeoAllowValue {
    pub country_code: u32,
}

#[cfg(feature = "user")]
unsafe impl aya::Pod for GeoAllowValue {}

impl GeoAllowValue {
    pub fn pack(country: [u8; 2]) -> Self {
        Self {
            country_code: ((country[0] as u32) << 8) | country[1] as u32,
        }
    }

    pub fn unpack(&self) -> [u8; 2] {
        [(self.country_code >> 8) as u8, self.country_code as u8]
    }
}

/// `ip_stats` per-CPU value, keyed by raw 4-byte source address (host
/// order `u32`). Userspace sums `packets`/`bytes` across CPUs and takes
/// the *maximum* `last_seen_ns`, never the sum (§3 invariant).
#[repr(C)]
#[derive(Clone, Copy)]
#[cfg_attr(feature = "user", derive(Debug))]
pub struct IpStatsValue {
    pub packets: u64,
    pub bytes: u64,
    pub last_seen_ns: u64,
    pub blocked_flag: u32,
    /// 1-second bucket start (monotonic ns) for the rate-limit window.
    pub window_start_ns: u64,
    /// Packet count within the current window.
    pub window_count: u32,
    pub _pad: u32,
}

#[cfg(feature = "user")]
unsafe impl aya::Pod for IpStatsValue {}

impl IpStatsValue {
    pub const fn zeroed() -> Self {
        Self {
            packets: 0,
            bytes: 0,
            last_seen_ns: 0,
            blocked_flag: 0,
            window_start_ns: 0,
            window_count: 0,
            _pad: 0,
        }
    }
}

/// `port_stats` per-CPU value, keyed by destination port (`u16`).
#[repr(C)]
#[derive(Clone, Copy)]
#[cfg_attr(feature = "user", derive(Debug))]
pub struct PortStatsValue {
    pub packets: u64,
    pub bytes: u64,
}

#[cfg(feature = "user")]
unsafe impl aya::Pod for PortStatsValue {}

impl PortStatsValue {
    pub const fn zeroed() -> Self {
        Self { packets: 0, bytes: 0 }
    }
}

/// `active_connections` key — outbound 5-tuple, written by the egress
/// tracker and read by the ingress filter to permit return traffic.
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "user", derive(Debug, Hash))]
pub struct ConnKey {
    pub src_addr: u32,
    pub dst_addr: u32,
    pub src_port: u16,
    pub dst_port: u16,
    pub proto: u8,
    pub _pad: [u8; 3],
}

#[cfg(feature = "user")]
unsafe impl aya::Pod for ConnKey {}

/// `active_connections` value.
#[repr(C)]
#[derive(Clone, Copy)]
#[cfg_attr(feature = "user", derive(Debug))]
pub struct ConnValue {
    pub created_ns: u64,
    pub last_ns: u64,
}

#[cfg(feature = "user")]
unsafe impl aya::Pod for ConnValue {}

/// `events` RingBuf record — fixed 16 bytes, little-endian, packed.
#[repr(C, packed)]
#[derive(Clone, Copy)]
#[cfg_attr(feature = "user", derive(Debug))]
pub struct RingEvent {
    pub src_addr: u32,
    pub reason: u32,
    pub timestamp_ns: u64,
}

#[cfg(feature = "user")]
unsafe impl aya::Pod for RingEvent {}

impl RingEvent {
    pub const WIRE_SIZE: usize = 16;

    pub const fn new(src_addr: u32, reason: u32, timestamp_ns: u64) -> Self {
        Self {
            src_addr,
            reason,
            timestamp_ns,
        }
    }
}
