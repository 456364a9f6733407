//! Graceful shutdown order verification.
//!
//! Validates that modules are stopped in registration order (producers
//! first, consumers last) and that slow or failing modules don't
//! prevent the rest of the registry from shutting down.

use std::sync::atomic::Ordering;
use std::time::Duration;

use crate::helpers::mock_pipeline::*;

use guard_daemon::modules::{ModuleHandle, ModuleRegistry};

/// Modules stop in registration order (producers first).
#[tokio::test]
async fn test_e2e_shutdown_order_producers_first() {
    let tracker = StopOrderTracker::new();

    let ebpf = MockPipeline::healthy("ebpf-engine").with_stop_order(tracker.clone());
    let flood = MockPipeline::healthy("flood-heuristic").with_stop_order(tracker.clone());
    let aggregator = MockPipeline::healthy("aggregator").with_stop_order(tracker.clone());

    let mut registry = ModuleRegistry::new();
    registry.register(ModuleHandle::new("ebpf-engine", true, Box::new(ebpf)));
    registry.register(ModuleHandle::new("flood-heuristic", true, Box::new(flood)));
    registry.register(ModuleHandle::new("aggregator", true, Box::new(aggregator)));

    registry.start_all().await.expect("all modules should start");
    registry.stop_all().await.expect("all modules should stop");

    let log = tracker.get_log().await;
    let names: Vec<&str> = log.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, vec!["ebpf-engine", "flood-heuristic", "aggregator"]);
}

/// Pending events in a channel are drained during shutdown, then the
/// receiver observes closure once the sender is dropped.
#[tokio::test]
async fn test_e2e_shutdown_drains_pending_events() {
    let (tx, mut rx) = tokio::sync::mpsc::channel::<guard_ebpf_engine::RawEvent>(8);

    for i in 0..3u32 {
        tx.send(crate::helpers::events::create_test_raw_event(
            std::net::Ipv4Addr::new(10, 0, 0, i as u8),
            guard_core::types::Reason::Manual,
            i as u64,
        ))
        .await
        .expect("should enqueue event");
    }
    drop(tx);

    let mut drained = 0;
    while rx.recv().await.is_some() {
        drained += 1;
    }
    assert_eq!(drained, 3, "all pending events should be drained before closure");
}

/// A slow module's stop delay does not block the registry from completing,
/// and both it and a normal module are confirmed stopped.
#[tokio::test]
async fn test_e2e_shutdown_timeout_handling() {
    let slow = MockPipeline::healthy("slow-consumer").with_stop_delay(Duration::from_millis(200));
    let normal = MockPipeline::healthy("fast-consumer");

    let slow_stopped = slow.stopped.clone();
    let normal_stopped = normal.stopped.clone();

    let mut registry = ModuleRegistry::new();
    registry.register(ModuleHandle::new("slow-consumer", true, Box::new(slow)));
    registry.register(ModuleHandle::new("fast-consumer", true, Box::new(normal)));

    registry.start_all().await.expect("modules should start");

    let started = std::time::Instant::now();
    registry.stop_all().await.expect("modules should stop despite the delay");
    let elapsed = started.elapsed();

    assert!(elapsed >= Duration::from_millis(200), "stop_all should wait for the slow module");
    assert!(slow_stopped.load(Ordering::SeqCst));
    assert!(normal_stopped.load(Ordering::SeqCst));
}

/// One module fails to stop -> the rest still stop and the error surfaces.
#[tokio::test]
async fn test_e2e_shutdown_partial_failure_continues() {
    let healthy_a = MockPipeline::healthy("producer");
    let failing = MockPipeline::failing_stop("middle", "stop boom");
    let healthy_b = MockPipeline::healthy("consumer");

    let a_stopped = healthy_a.stopped.clone();
    let b_stopped = healthy_b.stopped.clone();

    let mut registry = ModuleRegistry::new();
    registry.register(ModuleHandle::new("producer", true, Box::new(healthy_a)));
    registry.register(ModuleHandle::new("middle", true, Box::new(failing)));
    registry.register(ModuleHandle::new("consumer", true, Box::new(healthy_b)));

    registry.start_all().await.expect("modules should start");
    let result = registry.stop_all().await;

    assert!(result.is_err(), "stop_all should surface the failing module's error");
    assert!(a_stopped.load(Ordering::SeqCst));
    assert!(b_stopped.load(Ordering::SeqCst));
}

/// Calling stop_all() twice is safe: the second call is a no-op success.
#[tokio::test]
async fn test_e2e_shutdown_stop_twice_safe() {
    let pipeline = MockPipeline::healthy("aggregator");
    let stopped = pipeline.stopped.clone();

    let mut registry = ModuleRegistry::new();
    registry.register(ModuleHandle::new("aggregator", true, Box::new(pipeline)));

    registry.start_all().await.expect("module should start");
    registry.stop_all().await.expect("first stop_all should succeed");
    assert!(stopped.load(Ordering::SeqCst));

    registry.stop_all().await.expect("second stop_all should still succeed");
}
