//! Test configuration builder for E2E tests.
//!
//! Provides [`TestConfigBuilder`] for creating `GuardConfig` instances
//! with fine-grained control over which modules are enabled and with what settings.

use std::io::Write;
use std::path::PathBuf;

use guard_core::config::GuardConfig;

/// Builder for constructing test-friendly `GuardConfig` instances.
///
/// By default, all modules are **disabled** and settings use safe test defaults
/// (e.g., no PID file).
///
/// # Example
///
/// ```ignore
/// let config = TestConfigBuilder::new()
///     .aggregator(true)
///     .flood(true)
///     .build();
/// ```
#[allow(dead_code)]
pub struct TestConfigBuilder {
    config: GuardConfig,
}

#[allow(dead_code)]
impl TestConfigBuilder {
    /// Create a new builder with all modules disabled and test-safe defaults.
    pub fn new() -> Self {
        let mut config = GuardConfig::default();

        // No PID file in tests.
        config.general.pid_file = None;

        // Disable all modules by default.
        config.ebpf.enabled = false;
        config.aggregator.enabled = false;
        config.flood.enabled = false;

        Self { config }
    }

    /// Enable or disable the eBPF engine module.
    pub fn ebpf(mut self, enabled: bool) -> Self {
        self.config.ebpf.enabled = enabled;
        if enabled {
            self.config.ebpf.interface = "eth0".to_owned();
        }
        self
    }

    /// Enable or disable the aggregator module.
    pub fn aggregator(mut self, enabled: bool) -> Self {
        self.config.aggregator.enabled = enabled;
        self
    }

    /// Enable or disable the flood heuristic module.
    pub fn flood(mut self, enabled: bool) -> Self {
        self.config.flood.enabled = enabled;
        self
    }

    /// Set the log level.
    pub fn log_level(mut self, level: &str) -> Self {
        self.config.general.log_level = level.to_owned();
        self
    }

    /// Set the PID file path.
    pub fn pid_file(mut self, path: &str) -> Self {
        self.config.general.pid_file = Some(path.to_owned());
        self
    }

    /// Set the aggregator's flush interval.
    pub fn aggregator_flush_interval_secs(mut self, secs: u64) -> Self {
        self.config.aggregator.flush_interval_secs = secs;
        self
    }

    /// Set the eBPF interface.
    pub fn ebpf_interface(mut self, interface: &str) -> Self {
        self.config.ebpf.interface = interface.to_owned();
        self
    }

    /// Get mutable access to the underlying config for advanced customization.
    pub fn config_mut(&mut self) -> &mut GuardConfig {
        &mut self.config
    }

    /// Build and return the `GuardConfig`.
    ///
    /// Note: This does NOT call `validate()`. Call `build_validated()` if you
    /// need a validated config.
    pub fn build(self) -> GuardConfig {
        self.config
    }

    /// Build, validate, and return the `GuardConfig`.
    ///
    /// # Panics
    ///
    /// Panics if the configuration fails validation.
    pub fn build_validated(self) -> GuardConfig {
        let config = self.config;
        config.validate().expect("TestConfigBuilder produced invalid config");
        config
    }
}

impl Default for TestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Write a `GuardConfig` to a temporary TOML file and return its path.
///
/// Uses `tempfile::NamedTempFile` which is automatically cleaned up on drop.
/// The caller must keep the returned `NamedTempFile` alive for the duration of the test.
///
/// # Panics
///
/// Panics if serialization or file writing fails.
#[allow(dead_code)]
pub fn write_config_to_tempfile(config: &GuardConfig) -> (tempfile::NamedTempFile, PathBuf) {
    let toml_str = toml::to_string_pretty(config).expect("failed to serialize config to TOML");
    let mut file = tempfile::NamedTempFile::new().expect("failed to create temp file");
    file.write_all(toml_str.as_bytes()).expect("failed to write config to temp file");
    file.flush().expect("failed to flush temp file");
    let path = file.path().to_path_buf();
    (file, path)
}
