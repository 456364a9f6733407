//! `guard status` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, warn};

use guard_core::config::GuardConfig;

use crate::cli::StatusArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `status` command.
pub async fn execute(args: StatusArgs, config_path: &Path, writer: &OutputWriter) -> Result<(), CliError> {
    let config = GuardConfig::load(config_path).map_err(|e| CliError::Config(e.to_string()))?;

    let report = build_status_report(&config, args.verbose);

    writer.render(&report)?;

    Ok(())
}

/// Build a status report from configuration and daemon state.
///
/// Queries daemon liveness via PID file and constructs module-level health
/// information based on which modules are enabled in configuration. When
/// `verbose` is set and the process is on Linux, also lists currently
/// blocked IPs read straight from the pinned control-plane maps.
fn build_status_report(config: &GuardConfig, verbose: bool) -> StatusReport {
    let pid_file = config.general.pid_file.as_deref().unwrap_or("/run/guard-daemon.pid");
    let (daemon_running, uptime_secs) = check_daemon_status(pid_file);

    let mut modules = Vec::new();

    if config.ebpf.enabled {
        modules.push(ModuleStatus {
            name: "ebpf-engine".to_owned(),
            enabled: true,
            health: if daemon_running { "running".to_owned() } else { "stopped".to_owned() },
            details: verbose.then(|| {
                format!(
                    "interface={}, hard_blocking={}, rate_limit_pps={}",
                    config.ebpf.interface, config.ebpf.hard_blocking, config.ebpf.rate_limit_pps
                )
            }),
        });
    }

    if config.aggregator.enabled {
        modules.push(ModuleStatus {
            name: "aggregator".to_owned(),
            enabled: true,
            health: if daemon_running { "running".to_owned() } else { "stopped".to_owned() },
            details: verbose.then(|| {
                format!(
                    "max_groups={}, flush_interval_secs={}",
                    config.aggregator.max_groups, config.aggregator.flush_interval_secs
                )
            }),
        });
    }

    if config.flood.enabled {
        modules.push(ModuleStatus {
            name: "flood-heuristic".to_owned(),
            enabled: true,
            health: if daemon_running { "running".to_owned() } else { "stopped".to_owned() },
            details: verbose.then(|| format!("level={:?}", config.flood.level)),
        });
    }

    let blocked_ips = if verbose { list_blocked_ips(config) } else { Vec::new() };

    StatusReport {
        daemon_running,
        uptime_secs,
        modules,
        blocked_ips,
    }
}

/// Best-effort listing of currently blocked IPs via the pinned control-plane
/// maps. Returns an empty list (rather than an error) if the maps aren't
/// reachable -- `status` should still report module health even when the
/// kernel-path isn't attached.
#[cfg(target_os = "linux")]
fn list_blocked_ips(config: &GuardConfig) -> Vec<BlockedIpEntry> {
    match super::surface::open(&config.ebpf) {
        Ok(control) => control
            .iterate_blocked()
            .into_iter()
            .map(|info| BlockedIpEntry {
                ip: info.ip.to_string(),
                reason: format!("{:?}", info.reason),
                ttl_seconds: info.ttl_seconds,
            })
            .collect(),
        Err(e) => {
            debug!(error = %e, "control surface unavailable, skipping blocked-ip listing");
            Vec::new()
        }
    }
}

#[cfg(not(target_os = "linux"))]
fn list_blocked_ips(_config: &GuardConfig) -> Vec<BlockedIpEntry> {
    Vec::new()
}

/// Check if daemon is running by reading PID file and checking process existence.
fn check_daemon_status(pid_file: &str) -> (bool, Option<u64>) {
    let pid_path = std::path::Path::new(pid_file);

    // Read PID file directly without exists() check to avoid TOCTOU race.
    let pid_content = match std::fs::read_to_string(pid_path) {
        Ok(content) => content,
        Err(e) => {
            if e.kind() == std::io::ErrorKind::NotFound {
                debug!(pid_file, "pid file does not exist");
            } else {
                warn!(pid_file, error = %e, "failed to read pid file");
            }
            return (false, None);
        }
    };

    let pid = match pid_content.trim().parse::<u32>() {
        Ok(p) => p,
        Err(e) => {
            warn!(pid_file, error = %e, "failed to parse pid");
            return (false, None);
        }
    };

    let is_running = is_process_alive(pid);

    // Uptime estimation is not trivial without a health API endpoint.
    (is_running, None)
}

/// Check if a process with the given PID is alive.
#[cfg(unix)]
fn is_process_alive(pid: u32) -> bool {
    use std::io::ErrorKind;

    let pid_t = match libc::pid_t::try_from(pid) {
        Ok(p) => p,
        Err(_) => {
            warn!(pid, "PID exceeds platform pid_t range");
            return false;
        }
    };

    // SAFETY: kill(2) with signal 0 only checks existence, no side effects.
    let result = unsafe { libc::kill(pid_t, 0) };

    if result == 0 {
        true
    } else {
        match std::io::Error::last_os_error().kind() {
            ErrorKind::PermissionDenied => true,
            _ => false,
        }
    }
}

#[cfg(not(unix))]
fn is_process_alive(_pid: u32) -> bool {
    warn!("process liveness check not supported on this platform");
    false
}

/// Status report containing daemon state and module health.
#[derive(Serialize)]
pub struct StatusReport {
    pub daemon_running: bool,
    pub uptime_secs: Option<u64>,
    pub modules: Vec<ModuleStatus>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub blocked_ips: Vec<BlockedIpEntry>,
}

/// Health status of a single module.
#[derive(Serialize)]
pub struct ModuleStatus {
    pub name: String,
    pub enabled: bool,
    /// Health state: "running" | "stopped" | "degraded".
    pub health: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Serialize)]
pub struct BlockedIpEntry {
    pub ip: String,
    pub reason: String,
    pub ttl_seconds: i64,
}

impl Render for StatusReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        if self.daemon_running {
            writeln!(
                w,
                "Daemon: {} (uptime: {})",
                "running".green().bold(),
                self.uptime_secs.map(|s| format!("{}s", s)).unwrap_or_else(|| "unknown".to_owned())
            )?;
        } else {
            writeln!(w, "Daemon: {}", "not running".red().bold())?;
        }

        writeln!(w)?;
        writeln!(w, "{:<20} {:<10} Health", "Module", "Enabled")?;
        writeln!(w, "{}", "-".repeat(60))?;

        for m in &self.modules {
            let enabled_str = if m.enabled { "yes" } else { "no" };
            let health_colored = match m.health.as_str() {
                "running" => m.health.green(),
                "stopped" => m.health.yellow(),
                _ => m.health.normal(),
            };

            writeln!(w, "{:<20} {:<10} {}", m.name, enabled_str, health_colored)?;

            if let Some(details) = &m.details {
                writeln!(w, "  {}", details.dimmed())?;
            }
        }

        if !self.blocked_ips.is_empty() {
            writeln!(w)?;
            writeln!(w, "Blocked IPs ({}):", self.blocked_ips.len())?;
            for entry in &self.blocked_ips {
                let ttl = if entry.ttl_seconds < 0 { "permanent".to_owned() } else { format!("{}s", entry.ttl_seconds) };
                writeln!(w, "  {:<16} {:<10} {}", entry.ip, entry.reason, ttl)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_report(daemon_running: bool, uptime_secs: Option<u64>) -> StatusReport {
        StatusReport {
            daemon_running,
            uptime_secs,
            modules: Vec::new(),
            blocked_ips: Vec::new(),
        }
    }

    #[test]
    fn test_status_report_render_text_daemon_running() {
        let report = empty_report(true, Some(3600));
        let mut buffer = Vec::new();
        report.render_text(&mut buffer).expect("text rendering should succeed");
        let output = String::from_utf8(buffer).expect("valid UTF-8");
        assert!(output.contains("running"));
        assert!(output.contains("3600s"));
    }

    #[test]
    fn test_status_report_render_text_daemon_stopped() {
        let report = empty_report(false, None);
        let mut buffer = Vec::new();
        report.render_text(&mut buffer).expect("text rendering should succeed");
        let output = String::from_utf8(buffer).expect("valid UTF-8");
        assert!(output.contains("not running"));
    }

    #[test]
    fn test_status_report_render_text_with_modules() {
        let mut report = empty_report(true, Some(100));
        report.modules = vec![
            ModuleStatus {
                name: "ebpf-engine".to_owned(),
                enabled: true,
                health: "running".to_owned(),
                details: Some("interface=eth0".to_owned()),
            },
            ModuleStatus {
                name: "aggregator".to_owned(),
                enabled: true,
                health: "running".to_owned(),
                details: None,
            },
        ];

        let mut buffer = Vec::new();
        report.render_text(&mut buffer).expect("text rendering should succeed");
        let output = String::from_utf8(buffer).expect("valid UTF-8");
        assert!(output.contains("ebpf-engine"));
        assert!(output.contains("aggregator"));
        assert!(output.contains("interface=eth0"));
    }

    #[test]
    fn test_status_report_renders_blocked_ips() {
        let mut report = empty_report(true, Some(100));
        report.blocked_ips = vec![
            BlockedIpEntry {
                ip: "198.51.100.1".into(),
                reason: "Manual".into(),
                ttl_seconds: -1,
            },
            BlockedIpEntry {
                ip: "198.51.100.2".into(),
                reason: "RateLimit".into(),
                ttl_seconds: 300,
            },
        ];

        let mut buffer = Vec::new();
        report.render_text(&mut buffer).expect("text rendering should succeed");
        let output = String::from_utf8(buffer).expect("valid UTF-8");
        assert!(output.contains("198.51.100.1"));
        assert!(output.contains("permanent"));
        assert!(output.contains("300s"));
    }

    #[test]
    fn test_status_report_json_serialization() {
        let mut report = empty_report(true, Some(500));
        report.modules = vec![ModuleStatus {
            name: "test-module".to_owned(),
            enabled: true,
            health: "running".to_owned(),
            details: Some("test=value".to_owned()),
        }];

        let json = serde_json::to_string(&report).expect("JSON serialization should succeed");
        let parsed: serde_json::Value = serde_json::from_str(&json).expect("should parse JSON");

        assert_eq!(parsed["daemon_running"].as_bool(), Some(true));
        assert_eq!(parsed["uptime_secs"].as_u64(), Some(500));
        assert_eq!(parsed["modules"].as_array().expect("should be array").len(), 1);
        assert!(parsed.get("blocked_ips").is_none(), "empty blocked_ips should be skipped");
    }

    #[test]
    fn test_module_status_json_structure() {
        let module = ModuleStatus {
            name: "test".to_owned(),
            enabled: true,
            health: "running".to_owned(),
            details: Some("key=value".to_owned()),
        };

        let json = serde_json::to_string(&module).expect("JSON serialization should succeed");
        let parsed: serde_json::Value = serde_json::from_str(&json).expect("should parse JSON");

        assert_eq!(parsed["name"].as_str(), Some("test"));
        assert_eq!(parsed["enabled"].as_bool(), Some(true));
        assert_eq!(parsed["health"].as_str(), Some("running"));
        assert_eq!(parsed["details"].as_str(), Some("key=value"));
    }

    #[test]
    fn test_module_status_without_details() {
        let module = ModuleStatus {
            name: "test".to_owned(),
            enabled: false,
            health: "stopped".to_owned(),
            details: None,
        };

        let json = serde_json::to_string(&module).expect("JSON serialization should succeed");
        let parsed: serde_json::Value = serde_json::from_str(&json).expect("should parse JSON");

        assert!(parsed.get("details").is_none(), "details should be skipped when None");
    }

    #[test]
    fn test_status_report_daemon_running_no_uptime() {
        let report = empty_report(true, None);
        let mut buffer = Vec::new();
        report.render_text(&mut buffer).expect("text rendering should succeed");
        let output = String::from_utf8(buffer).expect("valid UTF-8");
        assert!(output.contains("unknown"));
    }

    #[test]
    fn test_status_report_all_modules_enabled() {
        let mut report = empty_report(true, Some(1000));
        for name in ["ebpf-engine", "aggregator", "flood-heuristic"] {
            report.modules.push(ModuleStatus {
                name: name.to_owned(),
                enabled: true,
                health: "running".to_owned(),
                details: None,
            });
        }

        let mut buffer = Vec::new();
        report.render_text(&mut buffer).expect("text rendering should succeed");
        let output = String::from_utf8(buffer).expect("valid UTF-8");
        assert!(output.contains("ebpf-engine"));
        assert!(output.contains("aggregator"));
        assert!(output.contains("flood-heuristic"));
    }

    #[test]
    fn test_status_report_mixed_health_states() {
        let mut report = empty_report(true, Some(50));
        report.modules = vec![
            ModuleStatus {
                name: "module1".to_owned(),
                enabled: true,
                health: "running".to_owned(),
                details: None,
            },
            ModuleStatus {
                name: "module2".to_owned(),
                enabled: false,
                health: "stopped".to_owned(),
                details: None,
            },
            ModuleStatus {
                name: "module3".to_owned(),
                enabled: true,
                health: "degraded".to_owned(),
                details: Some("warning: high memory usage".to_owned()),
            },
        ];

        let mut buffer = Vec::new();
        report.render_text(&mut buffer).expect("text rendering should succeed");
        let output = String::from_utf8(buffer).expect("valid UTF-8");
        assert!(output.contains("running"));
        assert!(output.contains("stopped"));
        assert!(output.contains("degraded"));
    }

    #[test]
    fn test_check_daemon_status_no_pid_file() {
        let (running, uptime) = check_daemon_status("/nonexistent/path/to/pid/file.pid");
        assert!(!running, "should report not running when PID file missing");
        assert!(uptime.is_none());
    }

    #[test]
    fn test_status_report_large_uptime() {
        let report = empty_report(true, Some(86400 * 30));
        let mut buffer = Vec::new();
        report.render_text(&mut buffer).expect("text rendering should succeed");
        let output = String::from_utf8(buffer).expect("valid UTF-8");
        assert!(output.contains("2592000s"));
    }

    #[test]
    fn test_module_status_long_details() {
        let long_details = "key1=value1, key2=value2, key3=value3, ".repeat(10);
        let mut report = empty_report(true, Some(100));
        report.modules = vec![ModuleStatus {
            name: "test".to_owned(),
            enabled: true,
            health: "running".to_owned(),
            details: Some(long_details),
        }];

        let mut buffer = Vec::new();
        report.render_text(&mut buffer).expect("long details should render");
        let output = String::from_utf8(buffer).expect("valid UTF-8");
        assert!(output.contains("key1=value1"));
    }

    #[test]
    fn test_status_report_unicode_module_name() {
        let mut report = empty_report(true, Some(100));
        report.modules = vec![ModuleStatus {
            name: "モジュール-日本語".to_owned(),
            enabled: true,
            health: "running".to_owned(),
            details: None,
        }];

        let mut buffer = Vec::new();
        report.render_text(&mut buffer).expect("unicode module name should render");
        let output = String::from_utf8(buffer).expect("valid UTF-8");
        assert!(output.contains("モジュール"));
    }

    #[test]
    fn test_status_report_empty_modules() {
        let report = empty_report(false, None);
        let json = serde_json::to_string(&report).expect("JSON serialization should succeed");
        let parsed: serde_json::Value = serde_json::from_str(&json).expect("should parse JSON");
        assert_eq!(parsed["modules"].as_array().expect("should be array").len(), 0);
    }

    #[test]
    fn test_module_status_disabled_module() {
        let mut report = empty_report(true, Some(100));
        report.modules = vec![ModuleStatus {
            name: "disabled-module".to_owned(),
            enabled: false,
            health: "stopped".to_owned(),
            details: None,
        }];

        let mut buffer = Vec::new();
        report.render_text(&mut buffer).expect("disabled module should render");
        let output = String::from_utf8(buffer).expect("valid UTF-8");
        assert!(output.contains("no"));
    }
}
