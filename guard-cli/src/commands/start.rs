//! `guard start` command handler

use std::path::Path;
use std::process::{Command, Stdio};

use tracing::info;

use crate::cli::StartArgs;
use crate::error::CliError;

/// Execute the `start` command.
///
/// In foreground mode, spawns `guard-daemon` and replaces the current process.
/// In daemon mode (`-d`), spawns `guard-daemon` as a detached background process.
pub async fn execute(args: StartArgs, config_path: &Path) -> Result<(), CliError> {
    if !config_path.exists() {
        return Err(CliError::Config(format!(
            "configuration file not found: {}",
            config_path.display()
        )));
    }

    info!(daemonize = args.daemonize, config = %config_path.display(), "starting guard");

    if args.daemonize {
        start_daemon(config_path, args.pid_file.as_deref())?;
    } else {
        start_foreground(config_path)?;
    }

    Ok(())
}

/// Start daemon in foreground mode by exec-ing the guard-daemon binary.
///
/// Replaces the current CLI process with `guard-daemon` using `exec(2)` on Unix.
/// On success, this function never returns (process is replaced).
///
/// # Errors
///
/// Returns `CliError::Command` if exec fails (binary not found, permissions, etc.)
fn start_foreground(config_path: &Path) -> Result<(), CliError> {
    let mut cmd = Command::new("guard-daemon");
    cmd.arg("--config").arg(config_path);

    info!("executing guard-daemon in foreground mode");

    let err = CommandExecExt::exec(&mut cmd);

    Err(CliError::Command(format!("failed to execute guard-daemon: {}", err)))
}

/// Start daemon in background mode.
///
/// Spawns `guard-daemon` as a detached background process with stdio redirected to `/dev/null`.
/// Waits 200ms and checks if the child process is still alive to detect immediate crashes.
///
/// # Errors
///
/// Returns `CliError::Command` if spawn fails or the daemon exits immediately.
fn start_daemon(config_path: &Path, pid_file: Option<&Path>) -> Result<(), CliError> {
    let mut cmd = Command::new("guard-daemon");
    cmd.arg("--config").arg(config_path);

    if let Some(pid_file_path) = pid_file {
        cmd.arg("--pid-file").arg(pid_file_path);
    }

    cmd.stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::null());

    info!("spawning guard-daemon in background mode");

    let mut child = cmd
        .spawn()
        .map_err(|e| CliError::Command(format!("failed to spawn guard-daemon: {}", e)))?;

    let pid = child.id();
    info!(pid = pid, "daemon spawned, verifying startup");

    std::thread::sleep(std::time::Duration::from_millis(200));

    match child.try_wait() {
        Ok(Some(status)) => Err(CliError::Command(format!("daemon exited immediately with status: {}", status))),
        Ok(None) => {
            info!(pid = pid, "daemon started successfully");
            Ok(())
        }
        Err(e) => Err(CliError::Command(format!("failed to check daemon status: {}", e))),
    }
}

#[cfg(unix)]
use std::os::unix::process::CommandExt;

#[cfg(unix)]
trait CommandExecExt {
    fn exec(&mut self) -> std::io::Error;
}

#[cfg(unix)]
impl CommandExecExt for Command {
    fn exec(&mut self) -> std::io::Error {
        CommandExt::exec(self)
    }
}

#[cfg(not(unix))]
trait CommandExecExt {
    fn exec(&mut self) -> std::io::Error;
}

#[cfg(not(unix))]
impl CommandExecExt for Command {
    fn exec(&mut self) -> std::io::Error {
        std::io::Error::new(std::io::ErrorKind::Unsupported, "exec not supported on this platform")
    }
}
