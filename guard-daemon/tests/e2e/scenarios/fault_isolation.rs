//! Module fault isolation E2E tests.
//!
//! Validates that individual module failures do not cascade to
//! other modules, and that health reporting correctly reflects
//! degraded states.

use crate::helpers::mock_pipeline::*;

use guard_core::pipeline::HealthStatus;
use guard_daemon::health::{ModuleHealth, aggregate_status};
use guard_daemon::modules::{ModuleHandle, ModuleRegistry};

/// One module fails to start -> start_all() returns error.
/// Already-started modules should be cleaned up by caller.
#[tokio::test]
async fn test_e2e_one_module_start_failure_others_stop() {
    let healthy_first = MockPipeline::healthy("producer");
    let failing = MockPipeline::failing_start("consumer-a", "boom");
    let healthy_third = MockPipeline::healthy("consumer-b");

    let first_started = healthy_first.started.clone();
    let third_started = healthy_third.started.clone();

    let mut registry = ModuleRegistry::new();
    registry.register(ModuleHandle::new("producer", true, Box::new(healthy_first)));
    registry.register(ModuleHandle::new("consumer-a", true, Box::new(failing)));
    registry.register(ModuleHandle::new("consumer-b", true, Box::new(healthy_third)));

    let result = registry.start_all().await;

    assert!(result.is_err(), "start_all should fail when a module fails to start");
    assert!(first_started.load(std::sync::atomic::Ordering::SeqCst), "module before the failure should have started");
    assert!(
        !third_started.load(std::sync::atomic::Ordering::SeqCst),
        "module after the failure should not have started"
    );
}

/// One module Degraded -> other modules remain Healthy.
/// DaemonHealth aggregates to Degraded.
#[tokio::test]
async fn test_e2e_runtime_module_degraded_others_healthy() {
    let modules = vec![
        ModuleHealth {
            name: "aggregator".into(),
            enabled: true,
            status: HealthStatus::Healthy,
        },
        ModuleHealth {
            name: "flood-heuristic".into(),
            enabled: true,
            status: HealthStatus::Degraded("event channel nearly full".into()),
        },
        ModuleHealth {
            name: "ebpf-engine".into(),
            enabled: true,
            status: HealthStatus::Healthy,
        },
    ];

    let aggregated = aggregate_status(&modules);
    assert!(matches!(aggregated, HealthStatus::Degraded(_)));
}

/// Producer channel closes (sender dropped) -> consumer handles gracefully.
#[tokio::test]
async fn test_e2e_channel_sender_dropped_receiver_handles() {
    let (tx, mut rx) = tokio::sync::mpsc::channel::<guard_ebpf_engine::RawEvent>(4);
    drop(tx);

    let result = rx.recv().await;
    assert!(result.is_none(), "receiver should observe channel closure without panicking");
}

/// One module fails to stop -> stop_all() logs error and continues.
#[tokio::test]
async fn test_e2e_stop_failure_continues_others() {
    let healthy_first = MockPipeline::healthy("producer");
    let failing = MockPipeline::failing_stop("consumer-a", "stop boom");
    let healthy_third = MockPipeline::healthy("consumer-b");

    let third_stopped = healthy_third.stopped.clone();

    let mut registry = ModuleRegistry::new();
    registry.register(ModuleHandle::new("producer", true, Box::new(healthy_first)));
    registry.register(ModuleHandle::new("consumer-a", true, Box::new(failing)));
    registry.register(ModuleHandle::new("consumer-b", true, Box::new(healthy_third)));

    registry.start_all().await.expect("all modules should start successfully");
    let result = registry.stop_all().await;

    assert!(result.is_err(), "stop_all should surface the failing module's error");
    assert!(
        third_stopped.load(std::sync::atomic::Ordering::SeqCst),
        "module after the failing one should still be stopped"
    );
}

/// Health aggregation: Unhealthy + Degraded + Healthy -> Unhealthy.
#[tokio::test]
async fn test_e2e_health_aggregation_worst_case() {
    let modules = vec![
        ModuleHealth {
            name: "aggregator".into(),
            enabled: true,
            status: HealthStatus::Healthy,
        },
        ModuleHealth {
            name: "flood-heuristic".into(),
            enabled: true,
            status: HealthStatus::Degraded("slow".into()),
        },
        ModuleHealth {
            name: "ebpf-engine".into(),
            enabled: true,
            status: HealthStatus::Unhealthy("attach failed".into()),
        },
    ];

    let aggregated = aggregate_status(&modules);
    match aggregated {
        HealthStatus::Unhealthy(reason) => assert!(reason.contains("ebpf-engine")),
        other => panic!("expected Unhealthy, got {:?}", other),
    }
}

/// Health aggregation: all Healthy -> Healthy.
#[tokio::test]
async fn test_e2e_health_aggregation_all_healthy() {
    let modules = vec![
        ModuleHealth {
            name: "aggregator".into(),
            enabled: true,
            status: HealthStatus::Healthy,
        },
        ModuleHealth {
            name: "flood-heuristic".into(),
            enabled: true,
            status: HealthStatus::Healthy,
        },
        ModuleHealth {
            name: "ebpf-engine".into(),
            enabled: true,
            status: HealthStatus::Healthy,
        },
    ];

    assert!(matches!(aggregate_status(&modules), HealthStatus::Healthy));
}

/// Disabled modules do not affect health aggregation.
#[tokio::test]
async fn test_e2e_disabled_modules_excluded_from_health() {
    let modules = vec![ModuleHealth {
        name: "ebpf-engine".into(),
        enabled: false,
        status: HealthStatus::Unhealthy("would be unhealthy if enabled".into()),
    }];

    assert!(matches!(aggregate_status(&modules), HealthStatus::Healthy));
}
