//! Real pinned-map adapters (Linux only) — opens the maps the loaded
//! program pinned under `<bpf_fs_root>/guard/` independently of the
//! `aya::Ebpf` handle that loaded them, so the control surface and map
//! synchronizer can run in a process that never itself attaches a
//! program (the CLI, or a daemon restarted without reloading eBPF).

use std::net::Ipv4Addr;

use aya::maps::lpm_trie::{Key as AyaKey, LpmTrie};
use aya::maps::{Array, MapData};

use guard_core::error::{ControlError, SyncError};
use guard_ebpf_common::{BlockValue, GeoAllowValue, LpmKey, WhitelistValue};

use crate::control::{BlockMap, ConfigArray};
use crate::sync::{Cidr, LpmWriter};

fn pinned(pin_path: &str, map_name: &str) -> std::io::Result<MapData> {
    MapData::from_pin(format!("{pin_path}/{map_name}"))
}

fn to_aya_key(key: LpmKey) -> AyaKey<[u8; 4]> {
    AyaKey::new(key.prefix_len, key.data)
}

fn from_aya_key(key: &AyaKey<[u8; 4]>) -> LpmKey {
    LpmKey::new(key.prefix_len, key.data)
}

/// `white_list` LPM trie. The synchronizer only ever stores a presence
/// flag, so the generic `u32` value is truncated to `WhitelistValue`'s
/// single byte on write.
pub struct AyaWhitelist(LpmTrie<MapData, [u8; 4], WhitelistValue>);

impl AyaWhitelist {
    pub fn open(pin_path: &str) -> Result<Self, SyncError> {
        let data = pinned(pin_path, guard_ebpf_common::MAP_WHITE_LIST)
            .map_err(|e| SyncError::MapWriteFailed(format!("open white_list: {e}")))?;
        let trie = LpmTrie::try_from(data).map_err(|e| SyncError::MapWriteFailed(format!("white_list: {e}")))?;
        Ok(Self(trie))
    }
}

impl LpmWriter for AyaWhitelist {
    fn insert(&mut self, key: LpmKey, value: u32) -> Result<(), SyncError> {
        let flag = if value == 0 {
            WhitelistValue { flag: 0, _pad: [0; 3] }
        } else {
            WhitelistValue::PRESENT
        };
        self.0
            .insert(&to_aya_key(key), flag, 0)
            .map_err(|e| SyncError::MapWriteFailed(format!("white_list insert: {e}")))
    }

    fn remove(&mut self, key: &LpmKey) -> Result<(), SyncError> {
        self.0
            .remove(&to_aya_key(*key))
            .map_err(|e| SyncError::MapWriteFailed(format!("white_list remove: {e}")))
    }

    fn clear(&mut self) -> Result<(), SyncError> {
        for key in self.keys() {
            LpmWriter::remove(self, &key)?;
        }
        Ok(())
    }

    fn keys(&self) -> Vec<LpmKey> {
        self.0
            .iter()
            .filter_map(|entry| entry.ok())
            .map(|(key, _value)| from_aya_key(&key))
            .collect()
    }
}

/// `geo_allowed` LPM trie; the generic `u32` value round-trips exactly
/// into `GeoAllowValue`'s packed country code.
pub struct AyaGeoAllow(LpmTrie<MapData, [u8; 4], GeoAllowValue>);

impl AyaGeoAllow {
    pub fn open(pin_path: &str) -> Result<Self, SyncError> {
        let data = pinned(pin_path, guard_ebpf_common::MAP_GEO_ALLOWED)
            .map_err(|e| SyncError::MapWriteFailed(format!("open geo_allowed: {e}")))?;
        let trie = LpmTrie::try_from(data).map_err(|e| SyncError::MapWriteFailed(format!("geo_allowed: {e}")))?;
        Ok(Self(trie))
    }
}

impl LpmWriter for AyaGeoAllow {
    fn insert(&mut self, key: LpmKey, value: u32) -> Result<(), SyncError> {
        self.0
            .insert(&to_aya_key(key), GeoAllowValue { country_code: value }, 0)
            .map_err(|e| SyncError::MapWriteFailed(format!("geo_allowed insert: {e}")))
    }

    fn remove(&mut self, key: &LpmKey) -> Result<(), SyncError> {
        self.0
            .remove(&to_aya_key(*key))
            .map_err(|e| SyncError::MapWriteFailed(format!("geo_allowed remove: {e}")))
    }

    fn clear(&mut self) -> Result<(), SyncError> {
        for key in self.keys() {
            LpmWriter::remove(self, &key)?;
        }
        Ok(())
    }

    fn keys(&self) -> Vec<LpmKey> {
        self.0
            .iter()
            .filter_map(|entry| entry.ok())
            .map(|(key, _value)| from_aya_key(&key))
            .collect()
    }
}

/// `blocked_ips` LPM trie, addressed by `Ipv4Addr` rather than raw
/// `LpmKey` at this layer — every entry is a `/32` host key.
pub struct AyaBlockedIps(LpmTrie<MapData, [u8; 4], BlockValue>);

impl AyaBlockedIps {
    pub fn open(pin_path: &str) -> Result<Self, ControlError> {
        let data = pinned(pin_path, guard_ebpf_common::MAP_BLOCKED_IPS)
            .map_err(|e| ControlError::KernelError(format!("open blocked_ips: {e}")))?;
        let trie = LpmTrie::try_from(data).map_err(|e| ControlError::KernelError(format!("blocked_ips: {e}")))?;
        Ok(Self(trie))
    }
}

impl BlockMap for AyaBlockedIps {
    fn insert(&mut self, addr: Ipv4Addr, expires_at_ns: u64, reason: u32) -> Result<(), ControlError> {
        let key = to_aya_key(Cidr::host(addr).key());
        self.0
            .insert(&key, BlockValue { expires_at_ns, reason, _pad: 0 }, 0)
            .map_err(|e| ControlError::KernelError(format!("blocked_ips insert: {e}")))
    }

    fn remove(&mut self, addr: Ipv4Addr) -> Result<(), ControlError> {
        let key = to_aya_key(Cidr::host(addr).key());
        self.0
            .remove(&key)
            .map_err(|e| ControlError::KernelError(format!("blocked_ips remove: {e}")))
    }

    fn get(&self, addr: Ipv4Addr) -> Option<(u64, u32)> {
        let key = to_aya_key(Cidr::host(addr).key());
        self.0.get(&key, 0).ok().map(|v| (v.expires_at_ns, v.reason))
    }

    fn iter(&self) -> Vec<(Ipv4Addr, u64, u32)> {
        self.0
            .iter()
            .filter_map(|entry| entry.ok())
            .map(|(key, value)| {
                let addr = Ipv4Addr::from(key.data);
                (addr, value.expires_at_ns, value.reason)
            })
            .collect()
    }
}

/// Lets [`crate::sync::MapSynchronizer`] address the same map through
/// its additive, value-only `LpmWriter` view — a permanent block with
/// `value` as the reason code, used for config-file-defined static
/// blocks rather than the TTL-aware path [`ControlSurface`] drives.
///
/// [`ControlSurface`]: crate::control::ControlSurface
impl LpmWriter for AyaBlockedIps {
    fn insert(&mut self, key: LpmKey, value: u32) -> Result<(), SyncError> {
        self.0
            .insert(&to_aya_key(key), BlockValue { expires_at_ns: 0, reason: value, _pad: 0 }, 0)
            .map_err(|e| SyncError::MapWriteFailed(format!("blocked_ips insert: {e}")))
    }

    fn remove(&mut self, key: &LpmKey) -> Result<(), SyncError> {
        self.0
            .remove(&to_aya_key(*key))
            .map_err(|e| SyncError::MapWriteFailed(format!("blocked_ips remove: {e}")))
    }

    fn clear(&mut self) -> Result<(), SyncError> {
        for key in LpmWriter::keys(self) {
            LpmWriter::remove(self, &key)?;
        }
        Ok(())
    }

    fn keys(&self) -> Vec<LpmKey> {
        self.0
            .iter()
            .filter_map(|entry| entry.ok())
            .map(|(key, _value)| from_aya_key(&key))
            .collect()
    }
}

/// `config` Array, indexed by the `CONFIG_IDX_*` constants.
pub struct AyaConfig(Array<MapData, u32>);

impl AyaConfig {
    pub fn open(pin_path: &str) -> Result<Self, ControlError> {
        let data = pinned(pin_path, guard_ebpf_common::MAP_CONFIG)
            .map_err(|e| ControlError::KernelError(format!("open config: {e}")))?;
        let array = Array::try_from(data).map_err(|e| ControlError::KernelError(format!("config: {e}")))?;
        Ok(Self(array))
    }
}

impl ConfigArray for AyaConfig {
    fn get(&self, idx: u32) -> Result<u32, ControlError> {
        self.0.get(&idx, 0).map_err(|e| ControlError::KernelError(format!("config get: {e}")))
    }

    fn set(&mut self, idx: u32, value: u32) -> Result<(), ControlError> {
        self.0
            .set(idx, value, 0)
            .map_err(|e| ControlError::KernelError(format!("config set: {e}")))
    }
}

/// Bundle of every pinned map the control plane needs, opened once at
/// daemon startup (or by the CLI against a running daemon's pins).
pub struct PinnedMaps {
    pub whitelist: AyaWhitelist,
    pub geo_allowed: AyaGeoAllow,
    pub blocked_ips: AyaBlockedIps,
    pub config: AyaConfig,
}

impl PinnedMaps {
    pub fn open(pin_path: &str) -> Result<Self, ControlError> {
        Ok(Self {
            whitelist: AyaWhitelist::open(pin_path)
                .map_err(|e| ControlError::KernelError(format!("whitelist: {e}")))?,
            geo_allowed: AyaGeoAllow::open(pin_path)
                .map_err(|e| ControlError::KernelError(format!("geo_allowed: {e}")))?,
            blocked_ips: AyaBlockedIps::open(pin_path)?,
            config: AyaConfig::open(pin_path)?,
        })
    }
}
