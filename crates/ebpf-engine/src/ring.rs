//! Event Ring reader — drains the kernel's `events` RingBuf on a
//! dedicated task and forwards each record into a bounded channel feeding
//! the aggregator and flood heuristic.
//!
//! The reader never blocks the kernel producer: it reads in a tight
//! loop while records are available and only yields (via a short sleep
//! with exponential backoff, capped) once the ring reports empty. On a
//! full downstream channel it drops the record and increments a
//! counter rather than awaiting channel capacity.

use std::time::Duration;

use guard_core::types::Reason;
use tokio::sync::mpsc;
use tokio::time::sleep;

use guard_ebpf_common::RingEvent;

/// A kernel drop event converted to a monotonic-ns-stamped value,
/// deserialized from the raw 16-byte wire record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawEvent {
    pub src_addr: u32,
    pub reason_raw: u32,
    pub timestamp_ns: u64,
}

impl RawEvent {
    pub fn reason(&self) -> Option<Reason> {
        Reason::from_u32(self.reason_raw)
    }
}

const BACKOFF_START: Duration = Duration::from_micros(50);
const BACKOFF_MAX: Duration = Duration::from_millis(20);

/// Polls `next` for wire-format records, deserializes them and pushes
/// onto `tx`. Returns once `next` yields `None` permanently (ring
/// closed) or the shutdown signal fires.
///
/// `next` abstracts over `aya::maps::RingBuf::next`, letting this loop
/// be unit tested without a real kernel map.
pub async fn run_reader<F>(
    mut next: F,
    tx: mpsc::Sender<RawEvent>,
    mut shutdown: tokio::sync::broadcast::Receiver<()>,
    dropped_counter: impl Fn() + Send + 'static,
) where
    F: FnMut() -> Option<[u8; RingEvent::WIRE_SIZE]> + Send,
{
    let mut backoff = BACKOFF_START;
    loop {
        if shutdown.try_recv().is_ok() {
            return;
        }
        match next() {
            Some(raw) => {
                backoff = BACKOFF_START;
                let event = decode(raw);
                if tx.try_send(event).is_err() {
                    dropped_counter();
                }
            }
            None => {
                tokio::select! {
                    _ = sleep(backoff) => {
                        backoff = (backoff * 2).min(BACKOFF_MAX);
                    }
                    _ = shutdown.recv() => return,
                }
            }
        }
    }
}

fn decode(raw: [u8; RingEvent::WIRE_SIZE]) -> RawEvent {
    RawEvent {
        src_addr: u32::from_le_bytes(raw[0..4].try_into().unwrap()),
        reason_raw: u32::from_le_bytes(raw[4..8].try_into().unwrap()),
        timestamp_ns: u64::from_le_bytes(raw[8..16].try_into().unwrap()),
    }
}
