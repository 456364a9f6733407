//! Map Synchronizer — pushes whitelist, blocklist and geo-allow state
//! from userspace config/external sources into the shared LPM tries.
//!
//! Three independent refresh policies:
//! - **Whitelist**: full overwrite on every `sync_whitelist()` call. A
//!   fixed set of critical DNS resolver addresses is always present in
//!   the written set regardless of what the caller passes in, so a bad
//!   config can never lock out DNS.
//! - **Blocklist**: additive — `add_block`/`remove_block` write/remove a
//!   single key, never a bulk overwrite. Owned by [`super::control`].
//! - **Geo-allow**: full overwrite, capped at
//!   [`guard_core::config::SyncConfig::geo_allow_cap`] entries. On
//!   empty input the trie is cleared entirely and the fail-safe
//!   sentinel key is removed, which is how the kernel path tells geo
//!   enforcement is off (§4.1 fail-safe). Refresh cadence: retried
//!   every second for the first 30s after boot (covers a slow-starting
//!   geo feed), then hourly.

use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::time::{Duration, Instant};

use guard_core::error::SyncError;
use guard_ebpf_common::LpmKey;

/// A CIDR block as (network address, prefix length).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cidr {
    pub addr: Ipv4Addr,
    pub prefix_len: u8,
}

impl Cidr {
    pub fn host(addr: Ipv4Addr) -> Self {
        Self { addr, prefix_len: 32 }
    }

    pub fn key(&self) -> LpmKey {
        LpmKey::new(self.prefix_len as u32, self.addr.octets())
    }
}

/// Sentinel `0.0.0.0/0` key. Its presence in `geo_allowed` is how the
/// kernel path cheaply tells "geo-allow populated" without walking the
/// whole trie: userspace keeps it present whenever a real country list
/// is loaded and removes it the instant the list goes empty, which
/// flips the kernel back to fail-open.
pub const GEO_POPULATED_SENTINEL: LpmKey = LpmKey::new(0, [0, 0, 0, 0]);

/// Abstraction over an LPM-trie-backed map, so the synchronizer can be
/// unit tested against an in-memory stand-in instead of a real
/// `aya::maps::lpm_trie::LpmTrie`.
pub trait LpmWriter: Send {
    fn insert(&mut self, key: LpmKey, value: u32) -> Result<(), SyncError>;
    fn remove(&mut self, key: &LpmKey) -> Result<(), SyncError>;
    fn clear(&mut self) -> Result<(), SyncError>;
    fn keys(&self) -> Vec<LpmKey>;
}

/// Resolves country CIDR blocks for a set of ISO country codes. The
/// real implementation fetches a MaxMind-style feed; tests substitute a
/// fixed table.
pub trait GeoSource: Send {
    fn resolve(&self, countries: &[String]) -> Result<Vec<(Cidr, [u8; 2])>, SyncError>;
}

/// Critical DNS resolvers that must always resolve, independent of
/// whatever whitelist the operator configures.
pub const CRITICAL_DNS: &[Ipv4Addr] = &[
    Ipv4Addr::new(8, 8, 8, 8),
    Ipv4Addr::new(1, 1, 1, 1),
];

pub struct MapSynchronizer<W, G, B> {
    whitelist: W,
    geo_allowed: G,
    blocked_ips: B,
    geo_cap: usize,
    boot_at: Instant,
    last_geo_sync: Option<Instant>,
}

const GEO_BOOT_RETRY_WINDOW: Duration = Duration::from_secs(30);

impl<W, G, B> MapSynchronizer<W, G, B>
where
    W: LpmWriter,
    G: LpmWriter,
    B: LpmWriter,
{
    pub fn new(whitelist: W, geo_allowed: G, blocked_ips: B, geo_cap: usize) -> Self {
        Self {
            whitelist,
            geo_allowed,
            blocked_ips,
            geo_cap,
            boot_at: Instant::now(),
            last_geo_sync: None,
        }
    }

    /// Full overwrite of the whitelist trie. Always includes
    /// [`CRITICAL_DNS`] regardless of what `entries` contains.
    pub fn sync_whitelist(&mut self, entries: &[Cidr]) -> Result<(), SyncError> {
        self.whitelist.clear()?;
        let mut written = HashSet::new();
        for cidr in entries.iter().copied().chain(CRITICAL_DNS.iter().copied().map(Cidr::host)) {
            let key = cidr.key();
            if written.insert(key) {
                self.whitelist.insert(key, 1)?;
            }
        }
        Ok(())
    }

    /// Full overwrite of the geo-allow trie from `countries`, capped at
    /// `geo_cap` CIDR entries. Empty `countries` clears the trie and the
    /// fail-safe sentinel, restoring fail-open behavior.
    pub fn sync_geo_allow(
        &mut self,
        source: &impl GeoSource,
        countries: &[String],
    ) -> Result<usize, SyncError> {
        let resolved = source.resolve(countries)?;
        self.geo_allowed.clear()?;

        if resolved.is_empty() {
            self.last_geo_sync = Some(Instant::now());
            return Ok(0);
        }

        let mut written = 0;
        for (cidr, country) in resolved.into_iter().take(self.geo_cap) {
            let value = ((country[0] as u32) << 8) | country[1] as u32;
            self.geo_allowed.insert(cidr.key(), value)?;
            written += 1;
        }
        self.geo_allowed.insert(GEO_POPULATED_SENTINEL, 0)?;
        self.last_geo_sync = Some(Instant::now());
        Ok(written)
    }

    /// Whether a geo sync is due now, given the boot-retry-then-hourly
    /// cadence.
    pub fn geo_sync_due(&self, refresh_interval: Duration) -> bool {
        let Some(last) = self.last_geo_sync else {
            return true;
        };
        let interval = if self.boot_at.elapsed() < GEO_BOOT_RETRY_WINDOW {
            Duration::from_secs(1)
        } else {
            refresh_interval
        };
        last.elapsed() >= interval
    }

    pub fn geo_allow_populated(&self) -> bool {
        self.geo_allowed.keys().contains(&GEO_POPULATED_SENTINEL)
    }

    pub fn add_block(&mut self, addr: Ipv4Addr, value: u32) -> Result<(), SyncError> {
        self.blocked_ips.insert(Cidr::host(addr).key(), value)
    }

    pub fn remove_block(&mut self, addr: Ipv4Addr) -> Result<(), SyncError> {
        self.blocked_ips.remove(&Cidr::host(addr).key())
    }
}
