//! eBPF Engine — loads and attaches the XDP ingress filter and TC
//! egress tracker, wires the shared pinned maps to the synchronizer,
//! control surface and snapshot collector, and drains the event ring
//! into the aggregator/flood-heuristic channel.
//!
//! Built with [`EbpfEngineBuilder`] and driven through [`Pipeline`].
//!
//! ```text
//! ┌──────────────┐     ┌─────────────┐     ┌──────────────┐
//! │ XDP ingress  │────▶│ RingBuf     │────▶│ ring::reader │──▶ mpsc -> aggregator
//! │ TC egress    │     │ (events)    │     │ task         │
//! └──────┬───────┘     └─────────────┘     └──────────────┘
//!        │
//!        ▼
//! shared pinned maps (ip_stats, blocked_ips, white_list, geo_allowed,
//! port_stats, global_stats, config, active_connections)
//! ```

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, Mutex};
use tracing::info;

use guard_core::config::EbpfConfig;
use guard_core::error::{EbpfError, GuardError, PipelineError};
use guard_core::pipeline::{HealthStatus, Pipeline};

use crate::attach::{AttachMode, EgressAttach, EgressAttachment};
use crate::config::EngineConfig;
use crate::ring::RawEvent;
use crate::stats::{RawGlobalCounters, TrafficStats};

/// eBPF engine — owns the loaded kernel programs and their background
/// tasks. On non-Linux targets every start attempt reports
/// [`EbpfError::Unsupported`] and the engine stays in a degraded,
/// observability-only state.
pub struct EbpfEngine {
    config: EngineConfig,
    event_tx: mpsc::Sender<RawEvent>,
    running: bool,
    stats: Arc<Mutex<TrafficStats>>,
    egress: EgressAttach,
    shutdown_tx: broadcast::Sender<()>,
    #[cfg(target_os = "linux")]
    bpf: Option<aya::Ebpf>,
    tasks: Vec<tokio::task::JoinHandle<()>>,
}

pub struct EbpfEngineBuilder {
    config: Option<EngineConfig>,
    event_tx: Option<mpsc::Sender<RawEvent>>,
    channel_capacity: usize,
}

impl EbpfEngineBuilder {
    fn new() -> Self {
        Self {
            config: None,
            event_tx: None,
            channel_capacity: 10_000,
        }
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Supplies an external channel (typically the aggregator/flood
    /// heuristic's shared ingest channel) instead of an internally
    /// created one.
    pub fn event_sender(mut self, tx: mpsc::Sender<RawEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    pub fn channel_capacity(mut self, cap: usize) -> Self {
        self.channel_capacity = cap;
        self
    }

    pub fn build(self) -> Result<(EbpfEngine, Option<mpsc::Receiver<RawEvent>>), GuardError> {
        let config = self
            .config
            .ok_or_else(|| PipelineError::InitFailed("config is required".to_owned()))?;

        if self.channel_capacity == 0 {
            return Err(PipelineError::InitFailed("channel_capacity must be greater than 0".to_owned()).into());
        }

        let (event_tx, event_rx) = match self.event_tx {
            Some(tx) => (tx, None),
            None => {
                let (tx, rx) = mpsc::channel(self.channel_capacity);
                (tx, Some(rx))
            }
        };

        let pin_path = config.pin_path();
        let (shutdown_tx, _) = broadcast::channel(1);

        let engine = EbpfEngine {
            config,
            event_tx,
            running: false,
            stats: Arc::new(Mutex::new(TrafficStats::new(RawGlobalCounters::default()))),
            egress: EgressAttach::unattached(pin_path),
            shutdown_tx,
            #[cfg(target_os = "linux")]
            bpf: None,
            tasks: Vec::new(),
        };

        Ok((engine, event_rx))
    }
}

impl EbpfEngine {
    pub fn builder() -> EbpfEngineBuilder {
        EbpfEngineBuilder::new()
    }

    pub fn stats(&self) -> Arc<Mutex<TrafficStats>> {
        Arc::clone(&self.stats)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn attach_mode(&self) -> &AttachMode {
        self.egress.mode()
    }

    #[cfg(target_os = "linux")]
    fn load_and_attach(&mut self) -> Result<(), GuardError> {
        use aya::programs::{tc, SchedClassifier, TcAttachType, Xdp, XdpFlags};
        use aya::Ebpf;

        let ebpf_path = std::env::var("GUARD_EBPF_PATH")
            .unwrap_or_else(|_| "target/bpfel-unknown-none/release/guard-ebpf".to_owned());

        let ebpf_data = std::fs::read(&ebpf_path)
            .map_err(|e| EbpfError::FatalInit(format!("failed to read eBPF binary at {ebpf_path}: {e}")))?;

        let mut bpf = Ebpf::load(&ebpf_data)
            .map_err(|e| EbpfError::FatalInit(format!("failed to load eBPF object: {e}")))?;

        let xdp: &mut Xdp = bpf
            .program_mut("guard_ingress")
            .ok_or_else(|| EbpfError::FatalInit("XDP program 'guard_ingress' not found".into()))?
            .try_into()
            .map_err(|e| EbpfError::FatalInit(format!("not an XDP program: {e}")))?;
        xdp.load()
            .map_err(|e| EbpfError::FatalInit(format!("failed to load XDP program: {e}")))?;
        xdp.attach(&self.config.base.interface, XdpFlags::default())
            .map_err(|e| {
                EbpfError::FatalInit(format!(
                    "failed to attach XDP to interface '{}': {e}",
                    self.config.base.interface
                ))
            })?;

        let tc_result: Result<(), GuardError> = (|| {
            let _ = tc::qdisc_add_clsact(&self.config.base.interface);
            let egress: &mut SchedClassifier = bpf
                .program_mut("guard_egress")
                .ok_or_else(|| EbpfError::FatalInit("TC program 'guard_egress' not found".into()))?
                .try_into()
                .map_err(|e| EbpfError::FatalInit(format!("not a classifier program: {e}")))?;
            egress
                .load()
                .map_err(|e| EbpfError::FatalInit(format!("failed to load TC program: {e}")))?;
            egress
                .attach(&self.config.base.interface, TcAttachType::Egress)
                .map_err(|e| EbpfError::FatalInit(format!("failed to attach TC egress: {e}")))?;
            Ok(())
        })();

        self.egress = match tc_result {
            Ok(()) => EgressAttach::attach_tcx(self.config.pin_path())?,
            Err(e) => {
                tracing::warn!(error = %e, "TC egress attach failed, running ingress-only");
                EgressAttach::unattached(self.config.pin_path())
            }
        };

        self.bpf = Some(bpf);
        Ok(())
    }

    #[cfg(not(target_os = "linux"))]
    fn load_and_attach(&mut self) -> Result<(), GuardError> {
        Err(EbpfError::Unsupported("eBPF is only supported on Linux".into()).into())
    }

    #[cfg(target_os = "linux")]
    fn detach(&mut self) -> Result<(), GuardError> {
        self.egress.close().map_err(GuardError::from)?;
        if let Some(bpf) = self.bpf.take() {
            drop(bpf);
        }
        Ok(())
    }

    #[cfg(not(target_os = "linux"))]
    fn detach(&mut self) -> Result<(), GuardError> {
        self.egress.close().map_err(GuardError::from)
    }

    #[cfg(target_os = "linux")]
    fn spawn_event_reader(&mut self) -> Result<(), GuardError> {
        use aya::maps::RingBuf;
        use guard_ebpf_common::{RingEvent, MAP_EVENTS};
        use metrics::counter;

        let Some(ref mut bpf) = self.bpf else {
            return Ok(());
        };
        let mut ringbuf = RingBuf::try_from(
            bpf.take_map(MAP_EVENTS)
                .ok_or_else(|| EbpfError::FatalInit(format!("map '{MAP_EVENTS}' not found")))?,
        )
        .map_err(|e| EbpfError::FatalInit(format!("failed to get events ringbuf: {e}")))?;

        let tx = self.event_tx.clone();
        let shutdown_rx = self.shutdown_tx.subscribe();

        let handle = tokio::spawn(async move {
            info!("event ring reader task started");
            let next = move || {
                ringbuf.next().map(|item| {
                    let mut buf = [0u8; RingEvent::WIRE_SIZE];
                    let len = item.len().min(RingEvent::WIRE_SIZE);
                    buf[..len].copy_from_slice(&item[..len]);
                    buf
                })
            };
            crate::ring::run_reader(next, tx, shutdown_rx, || {
                counter!(guard_core::metrics::EBPF_RING_EVENTS_DROPPED_TOTAL).increment(1);
            })
            .await;
            info!("event ring reader task stopped");
        });

        self.tasks.push(handle);
        Ok(())
    }

    #[cfg(not(target_os = "linux"))]
    fn spawn_event_reader(&mut self) -> Result<(), GuardError> {
        Ok(())
    }

    #[cfg(target_os = "linux")]
    fn spawn_stats_poller(&mut self) -> Result<(), GuardError> {
        use aya::maps::PerCpuArray;
        use guard_ebpf_common::{MAP_GLOBAL_STATS, GLOBAL_STATS_ENTRIES};

        let Some(ref mut bpf) = self.bpf else {
            return Ok(());
        };
        let map = PerCpuArray::<_, u64>::try_from(
            bpf.take_map(MAP_GLOBAL_STATS)
                .ok_or_else(|| EbpfError::FatalInit(format!("map '{MAP_GLOBAL_STATS}' not found")))?,
        )
        .map_err(|e| EbpfError::FatalInit(format!("failed to get global_stats map: {e}")))?;

        let stats = Arc::clone(&self.stats);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        let handle = tokio::spawn(async move {
            info!("stats poller task started");
            let mut interval = tokio::time::interval(std::time::Duration::from_secs(1));
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let mut slots = vec![0u64; GLOBAL_STATS_ENTRIES as usize];
                        for idx in 0..GLOBAL_STATS_ENTRIES {
                            if let Ok(per_cpu) = map.get(&idx, 0) {
                                slots[idx as usize] = per_cpu.iter().sum();
                            }
                        }
                        let current = RawGlobalCounters::from_summed_slots(&slots);
                        stats.lock().await.update(current);
                    }
                    _ = shutdown_rx.recv() => break,
                }
            }
            info!("stats poller task stopped");
        });

        self.tasks.push(handle);
        Ok(())
    }

    #[cfg(not(target_os = "linux"))]
    fn spawn_stats_poller(&mut self) -> Result<(), GuardError> {
        Ok(())
    }

    fn initialize_post_attach(&mut self) -> Result<(), GuardError> {
        self.spawn_event_reader()?;
        self.spawn_stats_poller()?;
        Ok(())
    }
}

impl Pipeline for EbpfEngine {
    /// Loads and attaches both kernel programs, then spawns the
    /// background tasks. Any failure after a successful attach rolls
    /// back: spawned tasks are aborted and the programs detached before
    /// the error is returned.
    async fn start(&mut self) -> Result<(), GuardError> {
        if self.running {
            return Err(PipelineError::AlreadyRunning.into());
        }

        info!(interface = self.config.base.interface.as_str(), "starting eBPF engine");

        self.load_and_attach()?;

        if let Err(e) = self.initialize_post_attach() {
            tracing::error!(error = %e, "failed to initialize engine, rolling back");
            for task in self.tasks.drain(..) {
                task.abort();
            }
            if let Err(detach_err) = self.detach() {
                tracing::error!(error = %detach_err, "failed to detach during rollback");
            }
            return Err(e);
        }

        self.running = true;
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), GuardError> {
        if !self.running {
            return Err(PipelineError::NotRunning.into());
        }

        info!("stopping eBPF engine");
        let _ = self.shutdown_tx.send(());
        for task in self.tasks.drain(..) {
            task.abort();
        }
        self.detach()?;
        self.running = false;
        Ok(())
    }

    async fn health_check(&self) -> HealthStatus {
        if !self.running {
            return HealthStatus::Unhealthy("not running".to_owned());
        }
        match self.egress.mode() {
            AttachMode::Unattached => HealthStatus::Degraded("egress tracker unattached, ingress-only".into()),
            _ => HealthStatus::Healthy,
        }
    }
}
