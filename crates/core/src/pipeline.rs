//! Pipeline trait — the module lifecycle interface every long-running
//! component implements, and its dyn-compatible counterpart.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::error::GuardError;

/// dyn-compatible future alias.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Lifecycle interface implemented by every long-running module (ebpf
/// engine, aggregator, flood heuristic). `guard-daemon` uses this to
/// start/stop modules in dependency order and poll their health.
pub trait Pipeline: Send + Sync {
    /// Starts the module: resource init, worker spawn, channel wiring.
    /// Returns `PipelineError::AlreadyRunning` if already started.
    fn start(&mut self) -> impl std::future::Future<Output = Result<(), GuardError>> + Send;

    /// Stops the module, draining in-flight work before returning.
    fn stop(&mut self) -> impl std::future::Future<Output = Result<(), GuardError>> + Send;

    /// Reports current health; polled periodically by the daemon.
    fn health_check(&self) -> impl std::future::Future<Output = HealthStatus> + Send;
}

/// Object-safe counterpart of [`Pipeline`].
///
/// `Pipeline` uses RPITIT and so cannot be made into a `dyn` trait
/// object directly; any `Pipeline` implementation gets `DynPipeline`
/// for free via the blanket impl below, letting the daemon hold
/// `Vec<Box<dyn DynPipeline>>`.
pub trait DynPipeline: Send + Sync {
    fn start(&mut self) -> BoxFuture<'_, Result<(), GuardError>>;
    fn stop(&mut self) -> BoxFuture<'_, Result<(), GuardError>>;
    fn health_check(&self) -> BoxFuture<'_, HealthStatus>;
}

impl<T: Pipeline> DynPipeline for T {
    fn start(&mut self) -> BoxFuture<'_, Result<(), GuardError>> {
        Box::pin(Pipeline::start(self))
    }

    fn stop(&mut self) -> BoxFuture<'_, Result<(), GuardError>> {
        Box::pin(Pipeline::stop(self))
    }

    fn health_check(&self) -> BoxFuture<'_, HealthStatus> {
        Box::pin(Pipeline::health_check(self))
    }
}

/// Current operating state of a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    Healthy,
    /// Degraded but still serving (e.g. egress tracker unattached).
    Degraded(String),
    Unhealthy(String),
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }

    pub fn is_unhealthy(&self) -> bool {
        matches!(self, Self::Unhealthy(_))
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Degraded(reason) => write!(f, "degraded: {reason}"),
            Self::Unhealthy(reason) => write!(f, "unhealthy: {reason}"),
        }
    }
}
