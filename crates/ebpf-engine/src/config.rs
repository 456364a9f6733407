//! Engine-facing configuration — a thin extension of
//! [`guard_core::config::EbpfConfig`] with the attachment details the
//! engine itself needs (pin path derivation, attach mode preference)
//! that don't belong in the operator-facing TOML schema.

use guard_core::config::EbpfConfig;

/// Engine configuration: `base` is what the operator sets in
/// `guard.toml`; the rest is derived once at construction time.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub base: EbpfConfig,
}

impl EngineConfig {
    pub fn from_core(config: &EbpfConfig) -> Self {
        Self { base: config.clone() }
    }

    /// Directory under which this gateway's maps are pinned:
    /// `<bpf_fs_root>/guard/`.
    pub fn pin_path(&self) -> String {
        format!("{}/guard", self.base.bpf_fs_root.trim_end_matches('/'))
    }
}
