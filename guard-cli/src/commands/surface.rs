//! Opens the operator control surface over the pinned `bpffs` maps.
//!
//! A CLI invocation is a separate process from the daemon, so it captures
//! its own [`ClockOffset`] rather than sharing the daemon's -- the pinned
//! maps themselves are the only thing the two processes actually share.
//! Mirrors guard-daemon's `modules::flood::control_sink::ControlBlockSink`.

use guard_core::config::EbpfConfig;

use crate::error::CliError;

#[cfg(target_os = "linux")]
pub type GatewaySurface =
    guard_ebpf_engine::ControlSurface<guard_ebpf_engine::AyaConfig, guard_ebpf_engine::AyaBlockedIps, guard_ebpf_engine::AyaGeoAllow>;

#[cfg(target_os = "linux")]
pub fn open(ebpf: &EbpfConfig) -> Result<GatewaySurface, CliError> {
    use std::time::SystemTime;

    use guard_ebpf_engine::{ClockOffset, ControlSurface, EngineConfig, PinnedMaps};

    if !ebpf.enabled {
        return Err(CliError::ControlUnavailable("eBPF engine is disabled in configuration".into()));
    }

    let pin_path = EngineConfig::from_core(ebpf).pin_path();
    let PinnedMaps {
        config,
        blocked_ips,
        geo_allowed,
        whitelist: _,
    } = PinnedMaps::open(&pin_path).map_err(|e| CliError::ControlUnavailable(e.to_string()))?;
    let clock = ClockOffset::capture(monotonic_now_ns(), SystemTime::now());
    Ok(ControlSurface::new(config, blocked_ips, geo_allowed, clock))
}

#[cfg(target_os = "linux")]
fn monotonic_now_ns() -> u64 {
    let mut ts = libc::timespec { tv_sec: 0, tv_nsec: 0 };
    // SAFETY: `clock_gettime` with `CLOCK_MONOTONIC` only writes to `ts`.
    unsafe {
        libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts);
    }
    ts.tv_sec as u64 * 1_000_000_000 + ts.tv_nsec as u64
}

#[cfg(not(target_os = "linux"))]
pub fn open(_ebpf: &EbpfConfig) -> Result<std::convert::Infallible, CliError> {
    Err(CliError::ControlUnavailable("control surface requires Linux".into()))
}
