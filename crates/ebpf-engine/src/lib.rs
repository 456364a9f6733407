//! Kernel-path attach/control layer for the DDoS gateway.
//!
//! # Modules
//! - [`attach`]: typed dispatch over the egress attachment flavor (TCX,
//!   legacy tc, unattached)
//! - [`config`]: engine-facing extension of `guard_core::config::EbpfConfig`
//! - [`control`]: operator-facing control surface (block/unblock/list/config)
//! - [`engine`]: `EbpfEngine` — loads and attaches the kernel programs,
//!   implements [`guard_core::pipeline::Pipeline`]
//! - [`maps`] (Linux only): real pinned-map adapters wiring
//!   [`control::ControlSurface`] and [`sync::MapSynchronizer`] to the
//!   running program's bpffs pins
//! - [`ring`]: event ring reader task
//! - [`stats`]: per-CPU global counter snapshot collector
//! - [`sync`]: whitelist/blocklist/geo-allow map synchronizer
//!
//! Kernel/userspace shared types live in [`guard_ebpf_common`].

pub mod attach;
pub mod config;
pub mod control;
pub mod engine;
#[cfg(target_os = "linux")]
pub mod maps;
pub mod ring;
pub mod stats;
pub mod sync;

pub use attach::{AttachMode, EgressAttach, EgressAttachment};
pub use config::EngineConfig;
pub use control::{ClockOffset, ControlSurface};
pub use engine::{EbpfEngine, EbpfEngineBuilder};
#[cfg(target_os = "linux")]
pub use maps::{AyaBlockedIps, AyaConfig, AyaGeoAllow, AyaWhitelist, PinnedMaps};
pub use ring::{run_reader, RawEvent};
pub use stats::{RawGlobalCounters, SummedIpStats, TrafficRate, TrafficStats};
pub use sync::{Cidr, MapSynchronizer};

pub use guard_ebpf_common;
