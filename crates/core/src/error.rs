//! Error taxonomy shared across the gateway.
//!
//! `GuardError` is the top-level type surfaced across crate boundaries;
//! each domain gets its own `thiserror` enum so call sites can match on
//! the kind that matters to them without downcasting.

/// Top-level error rolled up from every domain.
#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("ebpf error: {0}")]
    Ebpf(#[from] EbpfError),

    #[error("aggregator error: {0}")]
    Aggregator(#[from] AggregatorError),

    #[error("sync error: {0}")]
    Sync(#[from] SyncError),

    #[error("control error: {0}")]
    Control(#[from] ControlError),

    #[error("flood heuristic error: {0}")]
    Flood(#[from] FloodError),

    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Errors from the kernel-path filter and its attachment/control layer.
///
/// Mirrors the kinds named in the error handling design: `InvalidInput`
/// and `KernelError` are surfaced to callers, `NotAvailable` is returned
/// as a distinguishable no-op, `Capacity` and `Transient` never escape
/// this crate (they are recovered locally), `FatalInit` is logged and
/// the affected subsystem degrades rather than aborting.
#[derive(Debug, thiserror::Error)]
pub enum EbpfError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("filter not available: {0}")]
    NotAvailable(String),

    #[error("kernel operation failed: {0}")]
    KernelError(String),

    #[error("operation not supported on this platform: {0}")]
    Unsupported(String),

    #[error("fatal init failure: {0}")]
    FatalInit(String),
}

#[derive(Debug, thiserror::Error)]
pub enum AggregatorError {
    #[error("persistence sink rejected batch: {0}")]
    SinkFailed(String),

    #[error("notifier failed: {0}")]
    NotifierFailed(String),
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("geo data source failed: {0}")]
    GeoFetchFailed(String),

    #[error("map write failed during sync: {0}")]
    MapWriteFailed(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error("filter not available: {0}")]
    NotAvailable(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("kernel operation failed: {0}")]
    KernelError(String),

    #[error("operation not supported: {0}")]
    Unsupported(String),
}

#[derive(Debug, thiserror::Error)]
pub enum FloodError {
    #[error("tracker channel full, event dropped")]
    ChannelFull,

    #[error("failed to install block via control surface: {0}")]
    ControlFailed(String),
}

/// Module lifecycle errors, used by the `Pipeline` trait across all
/// long-running components (ebpf engine, aggregator, flood heuristic).
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("channel send failed: {0}")]
    ChannelSend(String),

    #[error("channel receive failed: {0}")]
    ChannelRecv(String),

    #[error("pipeline init failed: {0}")]
    InitFailed(String),

    #[error("pipeline already running")]
    AlreadyRunning,

    #[error("pipeline not running")]
    NotRunning,
}
