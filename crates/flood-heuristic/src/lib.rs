//! Flood Heuristic — per-IP connection/packet/byte rate tracking with
//! protection-level thresholds, escalating repeat offenders to a timed
//! kernel block.
//!
//! See [`tracker::FloodTracker`] for the sliding-window state machine,
//! [`levels`] for the threshold table, and [`pipeline::FloodHeuristic`]
//! for the [`guard_core::pipeline::Pipeline`] implementation that wires
//! it into the running daemon.

mod levels;
mod pipeline;
mod tracker;

pub use levels::{thresholds_for, LevelThresholds};
pub use pipeline::{BlockSink, FloodHeuristic, FloodHeuristicConfig};
pub use tracker::{FloodTracker, Verdict};
