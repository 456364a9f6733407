//! Configuration loading -> Orchestrator initialization -> health check.
//!
//! Validates the complete daemon startup lifecycle from config file
//! through module initialization to health check reporting.

use crate::helpers::config::*;

use guard_core::config::GuardConfig;
use guard_daemon::orchestrator::Orchestrator;

/// Valid guard.toml -> Orchestrator::build() succeeds.
#[tokio::test]
async fn test_e2e_config_load_and_init() {
    let config = TestConfigBuilder::new().aggregator(true).build_validated();
    let (_tmp, path) = write_config_to_tempfile(&config);

    let orchestrator = Orchestrator::build(&path).await.expect("orchestrator should build from file");

    assert!(orchestrator.config().aggregator.enabled);
    assert!(!orchestrator.config().ebpf.enabled);
}

/// All enabled modules start successfully -> health_check() == Healthy.
#[tokio::test]
async fn test_e2e_all_modules_health_check() {
    let config = TestConfigBuilder::new().aggregator(true).flood(true).build_validated();

    let orchestrator = Orchestrator::build_from_config(config).await.expect("orchestrator should build");

    let health = orchestrator.health().await;
    assert!(health.status.is_healthy(), "all registered modules should be healthy before start");
    assert_eq!(health.modules.len(), 2);
}

/// Partial config (only `[general]` section) -> defaults fill in correctly.
#[tokio::test]
async fn test_e2e_partial_config_defaults() {
    let toml_str = r#"
[general]
log_level = "debug"
"#;
    let temp_dir = tempfile::TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("guard.toml");
    std::fs::write(&path, toml_str).expect("should write config");

    let config = GuardConfig::load(&path).expect("should load partial config");
    assert_eq!(config.general.log_level, "debug");
    // ebpf/aggregator/flood all default to enabled.
    assert!(config.ebpf.enabled);
    assert!(config.aggregator.enabled);
    assert!(config.flood.enabled);

    let mut runtime_config = config;
    runtime_config.ebpf.enabled = false; // no interface available in CI
    let orchestrator = Orchestrator::build_from_config(runtime_config).await;
    assert!(orchestrator.is_ok(), "partial config should build successfully with defaults filled in");
}

/// `build_validated()` panics when a builder-produced config violates a
/// cross-field invariant -- mirrors the guard against shipping an
/// aggregator with zero capacity.
#[tokio::test]
#[should_panic(expected = "TestConfigBuilder produced invalid config")]
async fn test_e2e_invalid_config_fails_validation() {
    let mut builder = TestConfigBuilder::new().aggregator(true);
    builder.config_mut().aggregator.max_groups = 0;
    let _ = builder.build_validated();
}

/// Config round-tripped through a tempfile produces identical values to the
/// in-memory config it was serialized from.
#[tokio::test]
async fn test_e2e_config_from_file_roundtrip() {
    let config = TestConfigBuilder::new()
        .aggregator(true)
        .aggregator_flush_interval_secs(7)
        .log_level("trace")
        .build_validated();

    let (_tmp, path) = write_config_to_tempfile(&config);
    let reloaded = GuardConfig::load(&path).expect("should reload config from file");

    assert_eq!(reloaded.general.log_level, "trace");
    assert_eq!(reloaded.aggregator.flush_interval_secs, 7);
    assert!(reloaded.aggregator.enabled);
}

/// `DaemonHealth` uptime never decreases across consecutive checks.
#[tokio::test]
async fn test_e2e_health_uptime_tracking() {
    let config = TestConfigBuilder::new().build_validated();
    let orchestrator = Orchestrator::build_from_config(config).await.expect("orchestrator should build");

    let uptime1 = orchestrator.health().await.uptime_secs;
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    let uptime2 = orchestrator.health().await.uptime_secs;

    assert!(uptime2 >= uptime1);
}
