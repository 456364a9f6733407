//! Event Aggregator — groups ring events by `(source_ip, reason)`,
//! flushing persisted attack records on a short cadence and a
//! throttled human-facing alert on a longer one.
//!
//! Two independent ticks drive the same group table:
//! - **flush** (`flush_interval_secs`, default 3s): drains groups into
//!   `AttackRecord`s, persisted in chunks of at most
//!   `persist_chunk_size` so one slow sink call doesn't hold the whole
//!   batch hostage.
//! - **alert** (`alert_interval_secs`, default 10s): summarizes the
//!   single largest group since the last alert into one
//!   `AlertSummary`, swapping the "top group so far" tracker out before
//!   the notifier call so a slow notifier never blocks new events from
//!   updating it.
//!
//! Country resolution happens only at flush time, once per record —
//! never per incoming event.

use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use tokio::sync::{broadcast, mpsc, Mutex};
use tracing::{info, warn};

use guard_core::error::{AggregatorError, GuardError, PipelineError};
use guard_core::pipeline::{HealthStatus, Pipeline};
use guard_core::types::AttackRecord;
use guard_ebpf_engine::RawEvent;

use crate::groups::{GroupKey, GroupStats, GroupTable};
use crate::sink::{CountryResolver, Notifier, RecordSink};
use crate::state::{AggregatorState, StateCell};

pub struct AggregatorConfig {
    pub max_groups: usize,
    pub flush_interval_secs: u64,
    pub alert_interval_secs: u64,
    pub persist_chunk_size: usize,
}

struct Shared<S, N, C> {
    table: Mutex<GroupTable>,
    top_group: Mutex<Option<(GroupKey, GroupStats)>>,
    sink: S,
    notifier: N,
    resolver: C,
    state: StateCell,
    events_received: AtomicU64,
}

pub struct Aggregator<S, N, C> {
    config: AggregatorConfig,
    event_rx: Option<mpsc::Receiver<RawEvent>>,
    shared: Arc<Shared<S, N, C>>,
    shutdown_tx: broadcast::Sender<()>,
    tasks: Vec<tokio::task::JoinHandle<()>>,
    running: bool,
}

impl<S, N, C> Aggregator<S, N, C>
where
    S: RecordSink + 'static,
    N: Notifier + 'static,
    C: CountryResolver + 'static,
{
    pub fn new(config: AggregatorConfig, event_rx: mpsc::Receiver<RawEvent>, sink: S, notifier: N, resolver: C) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            shared: Arc::new(Shared {
                table: Mutex::new(GroupTable::new(config.max_groups)),
                top_group: Mutex::new(None),
                sink,
                notifier,
                resolver,
                state: StateCell::new(),
                events_received: AtomicU64::new(0),
            }),
            config,
            event_rx: Some(event_rx),
            shutdown_tx,
            tasks: Vec::new(),
            running: false,
        }
    }

    pub fn events_received(&self) -> u64 {
        self.shared.events_received.load(Ordering::Relaxed)
    }

    fn spawn_collector(&mut self) {
        let mut rx = self
            .event_rx
            .take()
            .expect("collector can only be spawned once per Aggregator instance");
        let shared = Arc::clone(&self.shared);
        let mut shutdown = self.shutdown_tx.subscribe();

        let handle = tokio::spawn(async move {
            info!("aggregator collector task started");
            loop {
                tokio::select! {
                    maybe_event = rx.recv() => {
                        let Some(event) = maybe_event else { break };
                        shared.state.set(AggregatorState::Collecting);
                        shared.events_received.fetch_add(1, Ordering::Relaxed);
                        let Some(reason) = event.reason() else { continue };
                        let key = GroupKey {
                            source_ip: Ipv4Addr::from(event.src_addr),
                            reason,
                        };
                        let at = SystemTime::now();
                        let updated = shared.table.lock().await.record(key, at);

                        if let Some(stats) = updated {
                            let mut top = shared.top_group.lock().await;
                            let beats_current = top.as_ref().map(|(_, t)| stats.count > t.count).unwrap_or(true);
                            if beats_current {
                                *top = Some((key, stats));
                            }
                        }
                        shared.state.set(AggregatorState::Idle);
                    }
                    _ = shutdown.recv() => break,
                }
            }
            info!("aggregator collector task stopped");
        });

        self.tasks.push(handle);
    }

    fn spawn_flush_ticker(&mut self) {
        let shared = Arc::clone(&self.shared);
        let interval_secs = self.config.flush_interval_secs;
        let chunk_size = self.config.persist_chunk_size;
        let mut shutdown = self.shutdown_tx.subscribe();

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(std::time::Duration::from_secs(interval_secs));
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        flush_once(&shared, chunk_size, interval_secs).await;
                    }
                    _ = shutdown.recv() => break,
                }
            }
        });

        self.tasks.push(handle);
    }

    fn spawn_alert_ticker(&mut self) {
        let shared = Arc::clone(&self.shared);
        let interval_secs = self.config.alert_interval_secs;
        let flush_interval_secs = self.config.flush_interval_secs;
        let mut shutdown = self.shutdown_tx.subscribe();

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(std::time::Duration::from_secs(interval_secs));
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        alert_once(&shared, interval_secs, flush_interval_secs).await;
                    }
                    _ = shutdown.recv() => break,
                }
            }
        });

        self.tasks.push(handle);
    }
}

async fn flush_once<S, N, C>(shared: &Shared<S, N, C>, chunk_size: usize, flush_interval_secs: u64)
where
    S: RecordSink,
    N: Notifier,
    C: CountryResolver,
{
    shared.state.set(AggregatorState::Flushing);
    let drained = shared.table.lock().await.drain();
    if drained.is_empty() {
        shared.state.set(AggregatorState::Idle);
        return;
    }

    let records: Vec<AttackRecord> = drained
        .into_iter()
        .map(|(key, stats)| {
            let country = shared.resolver.resolve(key.source_ip);
            AttackRecord {
                timestamp: stats.first_seen,
                source_ip: key.source_ip,
                country_code: country.as_ref().map(|(c, _)| c.clone()),
                country_name: country.map(|(_, n)| n),
                attack_type: key.reason.attack_type().to_string(),
                pps: stats.pps(flush_interval_secs),
                count: stats.count,
                action: "blocked".to_string(),
                details: String::new(),
            }
        })
        .collect();

    for chunk in records.chunks(chunk_size.max(1)) {
        if let Err(e) = shared.sink.persist(chunk.to_vec()).await {
            warn!(error = %e, "failed to persist attack record batch");
        }
    }
    shared.state.set(AggregatorState::Idle);
}

async fn alert_once<S, N, C>(shared: &Shared<S, N, C>, window_secs: u64, flush_interval_secs: u64)
where
    S: RecordSink,
    N: Notifier,
    C: CountryResolver,
{
    let swapped = {
        let mut top = shared.top_group.lock().await;
        top.take()
    };
    let Some((key, stats)) = swapped else { return };

    let summary = guard_core::types::AlertSummary {
        window_start: stats.first_seen,
        window_secs,
        top_source: key.source_ip,
        top_source_count: stats.count,
        dominant_reason: key.reason.attack_type().to_string(),
        total_pps: stats.pps(flush_interval_secs),
        additional_sources: 0,
    };

    if let Err(e) = shared.notifier.notify(summary).await {
        warn!(error = %e, "failed to send alert");
    }
}

impl<S, N, C> Pipeline for Aggregator<S, N, C>
where
    S: RecordSink + 'static,
    N: Notifier + 'static,
    C: CountryResolver + 'static,
{
    async fn start(&mut self) -> Result<(), GuardError> {
        if self.running {
            return Err(PipelineError::AlreadyRunning.into());
        }
        if self.event_rx.is_none() {
            return Err(AggregatorError::SinkFailed("aggregator already consumed its event receiver".into()).into());
        }
        self.spawn_collector();
        self.spawn_flush_ticker();
        self.spawn_alert_ticker();
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
        flush_once(&self.shared, self.config.persist_chunk_size, self.config.flush_interval_secs).await;
        self.running = false;
        Ok(())
    }

    async fn health_check(&self) -> HealthStatus {
        if !self.running {
            return HealthStatus::Unhealthy("not running".into());
        }
        match self.shared.state.get() {
            AggregatorState::Idle | AggregatorState::Collecting => HealthStatus::Healthy,
            AggregatorState::Flushing => HealthStatus::Degraded("flush in progress".into()),
        }
    }
}
