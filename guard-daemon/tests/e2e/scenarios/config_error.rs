//! Invalid configuration -> appropriate error messages.
//!
//! Validates that bad configuration is rejected with clear,
//! actionable error messages pointing to the problematic field.

use crate::helpers::config::*;

use guard_core::config::GuardConfig;

/// Malformed TOML syntax -> parse error.
#[tokio::test]
async fn test_e2e_invalid_toml_syntax() {
    let temp_dir = tempfile::TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("guard.toml");
    std::fs::write(&path, "invalid = [[[toml").expect("should write file");

    let result = GuardConfig::load(&path);

    assert!(result.is_err(), "malformed TOML should fail to parse");
    let err = result.unwrap_err().to_string();
    assert!(err.to_lowercase().contains("pars"), "error should mention parsing, got: {err}");
}

/// Zero `max_groups` -> validation error naming the field.
#[tokio::test]
async fn test_e2e_invalid_max_groups() {
    let mut builder = TestConfigBuilder::new().aggregator(true);
    builder.config_mut().aggregator.max_groups = 0;
    let config = builder.build();

    let result = config.validate();

    assert!(result.is_err(), "zero max_groups should fail validation");
    let err = result.unwrap_err().to_string();
    assert!(err.contains("max_groups"), "error should mention the field name, got: {err}");
}

/// Zero flush interval -> validation error.
#[tokio::test]
async fn test_e2e_invalid_flush_interval() {
    let mut builder = TestConfigBuilder::new().aggregator(true);
    builder.config_mut().aggregator.flush_interval_secs = 0;
    let config = builder.build();

    let result = config.validate();

    assert!(result.is_err(), "zero flush_interval_secs should fail validation");
    let err = result.unwrap_err().to_string();
    assert!(err.contains("interval"), "error should mention the interval field, got: {err}");
}

/// Non-IPv4 whitelist entry when eBPF is enabled -> clear error.
#[tokio::test]
async fn test_e2e_invalid_whitelist_entry() {
    let mut builder = TestConfigBuilder::new().ebpf(true);
    builder.config_mut().sync.whitelist.push(("not-an-ip".to_owned(), 24));
    let config = builder.build();

    let result = config.validate();

    assert!(result.is_err(), "non-IPv4 whitelist literal should fail validation");
    let err = result.unwrap_err().to_string();
    assert!(err.contains("whitelist"), "error should mention 'whitelist', got: {err}");
}

/// Non-existent config file path -> FileNotFound error.
#[tokio::test]
async fn test_e2e_nonexistent_config_path() {
    let result = GuardConfig::load("/nonexistent/guard.toml");

    assert!(result.is_err(), "missing config file should fail to load");
    let err = result.unwrap_err().to_string();
    assert!(err.to_lowercase().contains("not found"), "error should mention the file was not found, got: {err}");
}

/// Empty config file -> all defaults applied, validation passes.
#[tokio::test]
async fn test_e2e_empty_config_uses_defaults() {
    let temp_dir = tempfile::TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("guard.toml");
    std::fs::write(&path, "").expect("should write empty file");

    let config = GuardConfig::load(&path).expect("empty config should load with defaults");

    assert!(config.ebpf.enabled);
    assert!(config.aggregator.enabled);
    assert!(config.flood.enabled);
    assert!(config.sync.whitelist.is_empty());
}

/// Zero `geo_allow_cap` -> validation error.
#[tokio::test]
async fn test_e2e_invalid_geo_allow_cap() {
    let mut builder = TestConfigBuilder::new();
    builder.config_mut().sync.geo_allow_cap = 0;
    let config = builder.build();

    let result = config.validate();

    assert!(result.is_err(), "zero geo_allow_cap should fail validation");
    let err = result.unwrap_err().to_string();
    assert!(err.contains("geo_allow_cap"), "error should mention 'geo_allow_cap', got: {err}");
}

/// Out-of-range `rate_limit_pps` when eBPF is enabled -> clear error.
#[tokio::test]
async fn test_e2e_rate_limit_out_of_range() {
    let mut builder = TestConfigBuilder::new().ebpf(true);
    builder.config_mut().ebpf.rate_limit_pps = 999_999_999;
    let config = builder.build();

    let result = config.validate();

    assert!(result.is_err(), "out-of-range rate_limit_pps should fail validation");
    let err = result.unwrap_err().to_string();
    assert!(err.contains("rate_limit_pps"), "error should mention 'rate_limit_pps', got: {err}");
}
