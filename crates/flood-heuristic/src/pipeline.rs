//! Wires [`FloodTracker`] into the module lifecycle: consumes ring
//! events from the eBPF engine, evaluates them against the configured
//! protection level, installs kernel blocks through [`BlockSink`] and
//! forwards a synthesized `Reason::Flood` event for every triggered
//! block into the same channel the aggregator drains.

use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, mpsc, Mutex};
use tracing::{info, warn};

use guard_core::config::ProtectionLevel;
use guard_core::error::{FloodError, GuardError, PipelineError};
use guard_core::pipeline::{HealthStatus, Pipeline};
use guard_ebpf_engine::{guard_ebpf_common, RawEvent};

use crate::levels::thresholds_for;
use crate::tracker::{FloodTracker, Verdict};

/// Installs a kernel-side block once the tracker escalates an IP.
/// Implemented against [`guard_ebpf_engine::control::ControlSurface`]
/// in the daemon; tests substitute a recording double.
pub trait BlockSink: Send + Sync {
    fn block(&self, ip: Ipv4Addr, duration: Duration) -> impl std::future::Future<Output = Result<(), FloodError>> + Send;
}

pub struct FloodHeuristicConfig {
    pub level: ProtectionLevel,
    pub cleanup_interval_secs: u64,
    pub idle_eviction_secs: u64,
}

struct Shared<B> {
    tracker: Mutex<FloodTracker>,
    block_sink: B,
    dropped: AtomicUsize,
}

/// Consumes raw ring events and produces synthesized flood events on
/// `forward_tx` when it blocks an IP.
pub struct FloodHeuristic<B> {
    config: FloodHeuristicConfig,
    event_rx: Option<mpsc::Receiver<RawEvent>>,
    forward_tx: mpsc::Sender<RawEvent>,
    shared: Arc<Shared<B>>,
    shutdown_tx: broadcast::Sender<()>,
    tasks: Vec<tokio::task::JoinHandle<()>>,
    running: bool,
}

impl<B> FloodHeuristic<B>
where
    B: BlockSink + 'static,
{
    pub fn new(
        config: FloodHeuristicConfig,
        event_rx: mpsc::Receiver<RawEvent>,
        forward_tx: mpsc::Sender<RawEvent>,
        block_sink: B,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            shared: Arc::new(Shared {
                tracker: Mutex::new(FloodTracker::new(thresholds_for(config.level))),
                block_sink,
                dropped: AtomicUsize::new(0),
            }),
            config,
            event_rx: Some(event_rx),
            forward_tx,
            shutdown_tx,
            tasks: Vec::new(),
            running: false,
        }
    }

    pub fn dropped(&self) -> usize {
        self.shared.dropped.load(Ordering::Relaxed)
    }

    fn spawn_observer(&mut self) {
        let mut rx = self.event_rx.take().expect("observer spawned once per instance");
        let shared = Arc::clone(&self.shared);
        let forward_tx = self.forward_tx.clone();
        let mut shutdown = self.shutdown_tx.subscribe();

        let handle = tokio::spawn(async move {
            info!("flood heuristic observer task started");
            loop {
                tokio::select! {
                    maybe_event = rx.recv() => {
                        let Some(event) = maybe_event else { break };
                        let ip = Ipv4Addr::from(event.src_addr);
                        let verdict = shared.tracker.lock().await.observe(ip, 0, 1, 0, Instant::now());
                        if let Verdict::Block { duration } = verdict {
                            if let Err(e) = shared.block_sink.block(ip, duration).await {
                                warn!(error = %e, %ip, "failed to install flood block");
                                continue;
                            }
                            let flood_event = RawEvent {
                                src_addr: event.src_addr,
                                reason_raw: guard_ebpf_common::REASON_FLOOD,
                                timestamp_ns: event.timestamp_ns,
                            };
                            if forward_tx.try_send(flood_event).is_err() {
                                shared.dropped.fetch_add(1, Ordering::Relaxed);
                            }
                        }
                    }
                    _ = shutdown.recv() => break,
                }
            }
            info!("flood heuristic observer task stopped");
        });

        self.tasks.push(handle);
    }

    fn spawn_cleanup_ticker(&mut self) {
        let shared = Arc::clone(&self.shared);
        let interval_secs = self.config.cleanup_interval_secs;
        let idle_for = Duration::from_secs(self.config.idle_eviction_secs);
        let mut shutdown = self.shutdown_tx.subscribe();

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        shared.tracker.lock().await.cleanup(Instant::now(), idle_for);
                    }
                    _ = shutdown.recv() => break,
                }
            }
        });

        self.tasks.push(handle);
    }
}

impl<B> Pipeline for FloodHeuristic<B>
where
    B: BlockSink + 'static,
{
    async fn start(&mut self) -> Result<(), GuardError> {
        if self.running {
            return Err(PipelineError::AlreadyRunning.into());
        }
        if self.event_rx.is_none() {
            return Err(FloodError::ChannelFull.into());
        }
        self.spawn_observer();
        self.spawn_cleanup_ticker();
        self.running = true;
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), GuardError> {
        if !self.running {
            return Err(PipelineError::NotRunning.into());
        }
        let _ = self.shutdown_tx.send(());
        for task in self.tasks.drain(..) {
            task.abort();
        }
        self.running = false;
        Ok(())
    }

    async fn health_check(&self) -> HealthStatus {
        if !self.running {
            return HealthStatus::Unhealthy("not running".into());
        }
        HealthStatus::Healthy
    }
}
