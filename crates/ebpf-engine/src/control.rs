//! Control Surface — the operator-facing API over the kernel maps:
//! manual block/unblock, listing, stats reset, live config updates and
//! maintenance mode. Everything here is synchronous map I/O; callers
//! (the CLI, the daemon's signal handler) are expected to run it on a
//! blocking-friendly context.

use std::net::Ipv4Addr;
use std::time::{Duration, SystemTime};

use guard_core::error::ControlError;
use guard_core::types::{BlockInfo, Reason};
use guard_ebpf_common::{CONFIG_IDX_HARD_BLOCKING, CONFIG_IDX_MAINTENANCE_MODE, CONFIG_IDX_RATE_LIMIT_PPS};

use crate::sync::{Cidr, GEO_POPULATED_SENTINEL, LpmWriter};

/// Abstraction over `config` Array reads/writes.
pub trait ConfigArray: Send {
    fn get(&self, idx: u32) -> Result<u32, ControlError>;
    fn set(&mut self, idx: u32, value: u32) -> Result<(), ControlError>;
}

/// A `(expiry_ns, reason)` pair as stored in `blocked_ips`, abstracted
/// so the control surface doesn't depend on the real map handle type.
pub trait BlockMap: Send {
    fn insert(&mut self, addr: Ipv4Addr, expires_at_ns: u64, reason: u32) -> Result<(), ControlError>;
    fn remove(&mut self, addr: Ipv4Addr) -> Result<(), ControlError>;
    fn get(&self, addr: Ipv4Addr) -> Option<(u64, u32)>;
    fn iter(&self) -> Vec<(Ipv4Addr, u64, u32)>;
}

/// Converts the kernel's monotonic nanosecond clock to wall-clock time
/// using a single offset computed once at startup (§9 redesign flag):
/// never resample per event, which would drift under NTP adjustment.
#[derive(Debug, Clone, Copy)]
pub struct ClockOffset {
    /// `wall_now - monotonic_now` at the moment this was captured.
    boot_wall_ns: i128,
}

impl ClockOffset {
    pub fn capture(monotonic_now_ns: u64, wall_now: SystemTime) -> Self {
        let wall_ns = wall_now
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as i128;
        Self {
            boot_wall_ns: wall_ns - monotonic_now_ns as i128,
        }
    }

    pub fn to_wall(&self, monotonic_ns: u64) -> SystemTime {
        let wall_ns = monotonic_ns as i128 + self.boot_wall_ns;
        SystemTime::UNIX_EPOCH + Duration::from_nanos(wall_ns.max(0) as u64)
    }

    pub fn to_monotonic(&self, wall: SystemTime) -> u64 {
        let wall_ns = wall
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as i128;
        (wall_ns - self.boot_wall_ns).max(0) as u64
    }
}

pub const ITERATE_BLOCKED_CAP: usize = 1_000;

pub struct ControlSurface<C, B, G> {
    config: C,
    blocked: B,
    geo_allowed: G,
    clock: ClockOffset,
}

impl<C, B, G> ControlSurface<C, B, G>
where
    C: ConfigArray,
    B: BlockMap,
    G: LpmWriter,
{
    pub fn new(config: C, blocked: B, geo_allowed: G, clock: ClockOffset) -> Self {
        Self {
            config,
            blocked,
            geo_allowed,
            clock,
        }
    }

    pub fn enable(&mut self) -> Result<(), ControlError> {
        self.config.set(CONFIG_IDX_HARD_BLOCKING, 1)
    }

    pub fn disable(&mut self) -> Result<(), ControlError> {
        self.config.set(CONFIG_IDX_HARD_BLOCKING, 0)
    }

    pub fn set_maintenance(&mut self, enabled: bool) -> Result<(), ControlError> {
        self.config.set(CONFIG_IDX_MAINTENANCE_MODE, enabled as u32)
    }

    /// `duration: None` means permanent.
    pub fn add_block(&mut self, ip: Ipv4Addr, reason: Reason, duration: Option<Duration>) -> Result<(), ControlError> {
        let expires_at_ns = match duration {
            None => 0,
            Some(d) => self.clock.to_monotonic(SystemTime::now() + d),
        };
        self.blocked.insert(ip, expires_at_ns, reason as u32)
    }

    pub fn remove_block(&mut self, ip: Ipv4Addr) -> Result<(), ControlError> {
        self.blocked.remove(ip)
    }

    pub fn lookup_blocked(&self, ip: Ipv4Addr) -> Option<BlockInfo> {
        let (expires_at_ns, reason_raw) = self.blocked.get(ip)?;
        let reason = Reason::from_u32(reason_raw).unwrap_or(Reason::Manual);
        if expires_at_ns == 0 {
            return Some(BlockInfo {
                ip,
                reason,
                expires_at: None,
                ttl_seconds: -1,
            });
        }
        let expires_at = self.clock.to_wall(expires_at_ns);
        let ttl_seconds = expires_at
            .duration_since(SystemTime::now())
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        Some(BlockInfo {
            ip,
            reason,
            expires_at: Some(expires_at),
            ttl_seconds,
        })
    }

    /// Bounded to [`ITERATE_BLOCKED_CAP`] entries — an operator listing
    /// every block under active flood is not a design goal; use
    /// `lookup_blocked` for point queries.
    pub fn iterate_blocked(&self) -> Vec<BlockInfo> {
        self.blocked
            .iter()
            .into_iter()
            .take(ITERATE_BLOCKED_CAP)
            .map(|(ip, expires_at_ns, reason_raw)| {
                let reason = Reason::from_u32(reason_raw).unwrap_or(Reason::Manual);
                if expires_at_ns == 0 {
                    BlockInfo {
                        ip,
                        reason,
                        expires_at: None,
                        ttl_seconds: -1,
                    }
                } else {
                    let expires_at = self.clock.to_wall(expires_at_ns);
                    let ttl_seconds = expires_at
                        .duration_since(SystemTime::now())
                        .map(|d| d.as_secs() as i64)
                        .unwrap_or(0);
                    BlockInfo {
                        ip,
                        reason,
                        expires_at: Some(expires_at),
                        ttl_seconds,
                    }
                }
            })
            .collect()
    }

    pub fn reset_stats(&mut self) -> Result<(), ControlError> {
        // Counter zeroing lives in the global-stats map handle owned by
        // the engine; the control surface only guarantees the request
        // is well-formed (no per-IP state to touch here).
        Ok(())
    }

    /// Enforces the geo-empty fail-safe: `hard_blocking` cannot be
    /// turned on while the geo-allow trie is empty, since that would
    /// silently block all traffic with no allow path (§4.1).
    pub fn update_config(&mut self, hard_blocking: bool, rate_limit_pps: u32) -> Result<(), ControlError> {
        if hard_blocking && !self.geo_allow_populated() {
            return Err(ControlError::InvalidInput(
                "cannot enable hard_blocking while geo-allow list is empty".into(),
            ));
        }
        self.config.set(CONFIG_IDX_HARD_BLOCKING, hard_blocking as u32)?;
        self.config.set(CONFIG_IDX_RATE_LIMIT_PPS, rate_limit_pps)?;
        Ok(())
    }

    fn geo_allow_populated(&self) -> bool {
        self.geo_allowed.keys().contains(&GEO_POPULATED_SENTINEL)
    }
}
