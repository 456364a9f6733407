//! Aggregator lifecycle state, exposed through `health_check` so the
//! daemon can tell a momentarily-busy flush from an actually-stuck
//! aggregator.

use std::sync::atomic::{AtomicU8, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregatorState {
    Idle,
    Collecting,
    Flushing,
}

impl AggregatorState {
    fn to_raw(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Collecting => 1,
            Self::Flushing => 2,
        }
    }

    fn from_raw(v: u8) -> Self {
        match v {
            1 => Self::Collecting,
            2 => Self::Flushing,
            _ => Self::Idle,
        }
    }
}

/// Shared, lock-free state cell readable from `health_check` while the
/// collector task owns the write side.
#[derive(Default)]
pub struct StateCell(AtomicU8);

impl StateCell {
    pub fn new() -> Self {
        Self(AtomicU8::new(AggregatorState::Idle.to_raw()))
    }

    pub fn set(&self, state: AggregatorState) {
        self.0.store(state.to_raw(), Ordering::Relaxed);
    }

    pub fn get(&self) -> AggregatorState {
        AggregatorState::from_raw(self.0.load(Ordering::Relaxed))
    }
}
