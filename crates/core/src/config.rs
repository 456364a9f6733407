//! Gateway configuration — loaded from `guard.toml`, overridable by CLI
//! flags and `GUARD_*` environment variables at the daemon boundary.

use std::net::Ipv4Addr;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Root configuration document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    pub general: GeneralConfig,
    pub ebpf: EbpfConfig,
    pub aggregator: AggregatorConfig,
    pub sync: SyncConfig,
    pub flood: FloodConfig,
    pub control: ControlConfig,
    pub metrics: MetricsConfig,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            ebpf: EbpfConfig::default(),
            aggregator: AggregatorConfig::default(),
            sync: SyncConfig::default(),
            flood: FloodConfig::default(),
            control: ControlConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl GuardConfig {
    /// Loads and parses a TOML config file, then runs [`Self::validate`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;
        let cfg: Self = toml::from_str(&raw).map_err(|e| ConfigError::ParseFailed {
            reason: e.to_string(),
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Cross-field validation beyond what serde/toml can express.
    ///
    /// This does not enforce the geo-empty/hard-blocking fail-safe — that
    /// is a runtime invariant owned by the control surface, not a static
    /// property of the config file.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ebpf.rate_limit_pps > 100_000_000 {
            return Err(ConfigError::InvalidValue {
                field: "ebpf.rate_limit_pps".into(),
                reason: "out of range".into(),
            });
        }
        if self.aggregator.max_groups == 0 {
            return Err(ConfigError::InvalidValue {
                field: "aggregator.max_groups".into(),
                reason: "must be non-zero".into(),
            });
        }
        if self.aggregator.flush_interval_secs == 0 || self.aggregator.alert_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "aggregator.{flush,alert}_interval_secs".into(),
                reason: "must be non-zero".into(),
            });
        }
        if self.sync.geo_allow_cap == 0 {
            return Err(ConfigError::InvalidValue {
                field: "sync.geo_allow_cap".into(),
                reason: "must be non-zero".into(),
            });
        }
        for (ip, _) in &self.sync.whitelist {
            if ip.parse::<Ipv4Addr>().is_err() {
                return Err(ConfigError::InvalidValue {
                    field: "sync.whitelist".into(),
                    reason: format!("'{ip}' is not a valid IPv4 literal"),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub log_level: String,
    pub log_format: LogFormat,
    pub pid_file: Option<String>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
            log_format: LogFormat::Pretty,
            pid_file: Some("/run/guard-daemon.pid".into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EbpfConfig {
    /// Enable the ingress/egress filter module at all.
    pub enabled: bool,
    /// WAN-facing interface the XDP and TC programs attach to.
    pub interface: String,
    /// Filesystem root under which `<bpf-fs-root>/<product>/` is pinned.
    pub bpf_fs_root: String,
    pub hard_blocking: bool,
    pub rate_limit_pps: u32,
    pub rate_limit_block_secs: u64,
    pub maintenance_mode: bool,
}

impl Default for EbpfConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interface: "eth0".into(),
            bpf_fs_root: "/sys/fs/bpf".into(),
            hard_blocking: true,
            rate_limit_pps: 0,
            rate_limit_block_secs: 60,
            maintenance_mode: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    pub enabled: bool,
    pub max_groups: usize,
    pub flush_interval_secs: u64,
    pub alert_interval_secs: u64,
    pub persist_chunk_size: usize,
    pub ring_channel_capacity: usize,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_groups: 50_000,
            flush_interval_secs: 3,
            alert_interval_secs: 10,
            persist_chunk_size: 100,
            ring_channel_capacity: 10_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// User-configured allow CIDRs, in addition to the fixed critical-DNS set.
    pub whitelist: Vec<(String, u8)>,
    pub geo_allow_cap: usize,
    pub geo_boot_retry_secs: u64,
    pub geo_boot_retry_window_secs: u64,
    pub geo_refresh_interval_secs: u64,
    pub geo_license_key: Option<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            whitelist: Vec::new(),
            geo_allow_cap: 1_000_000,
            geo_boot_retry_secs: 1,
            geo_boot_retry_window_secs: 30,
            geo_refresh_interval_secs: 3_600,
            geo_license_key: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtectionLevel {
    Low,
    Standard,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FloodConfig {
    pub enabled: bool,
    pub level: ProtectionLevel,
    pub cleanup_interval_secs: u64,
    pub idle_eviction_secs: u64,
    pub event_channel_capacity: usize,
}

impl Default for FloodConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: ProtectionLevel::Standard,
            cleanup_interval_secs: 60,
            idle_eviction_secs: 3_600,
            event_channel_capacity: 1_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    pub stats_reset_interval_hours: u64,
    pub iterate_page_cap: usize,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            stats_reset_interval_hours: 24,
            iterate_page_cap: 1_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub bind_addr: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_addr: "127.0.0.1:9898".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(GuardConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_zero_max_groups() {
        let mut cfg = GuardConfig::default();
        cfg.aggregator.max_groups = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_invalid_whitelist_literal() {
        let mut cfg = GuardConfig::default();
        cfg.sync.whitelist.push(("not-an-ip".into(), 32));
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn load_missing_file_reports_not_found() {
        let err = GuardConfig::load("/nonexistent/guard.toml").unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }

    #[test]
    fn load_roundtrips_through_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("guard.toml");
        std::fs::write(&path, toml::to_string(&GuardConfig::default()).unwrap()).unwrap();
        let loaded = GuardConfig::load(&path).unwrap();
        assert_eq!(loaded.ebpf.interface, "eth0");
    }
}
