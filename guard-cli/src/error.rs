//! CLI-specific error types and exit code mapping

use guard_core::error::GuardError;

/// CLI-specific error type.
///
/// Each variant carries enough context for a user-friendly message.
/// The `exit_code()` method maps errors to standard Unix exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// Cannot connect to the daemon (e.g., for `status`).
    #[error("daemon not reachable: {0}")]
    #[allow(dead_code)] // Reserved for future use with daemon health API
    DaemonUnavailable(String),

    /// The control surface over the pinned maps could not be reached
    /// (eBPF disabled, not running on Linux, or programs not loaded).
    #[error("control surface unavailable: {0}")]
    ControlUnavailable(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from guard-core.
    #[error("{0}")]
    Core(#[from] GuardError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                      |
    /// |------|------------------------------|
    /// | 0    | Success                      |
    /// | 1    | General / command error     |
    /// | 2    | Configuration error          |
    /// | 3    | Daemon unreachable           |
    /// | 5    | Control surface unreachable  |
    /// | 10   | IO error                     |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::DaemonUnavailable(_) => 3,
            Self::ControlUnavailable(_) => 5,
            Self::Io(_) => 10,
            Self::JsonSerialize(_) | Self::Command(_) | Self::Core(_) => 1,
        }
    }
}
