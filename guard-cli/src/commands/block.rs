//! `guard block` command handler

use std::io::Write;
#[cfg(target_os = "linux")]
use std::time::Duration;

use serde::Serialize;
#[cfg(target_os = "linux")]
use tracing::info;

use guard_core::config::GuardConfig;
#[cfg(target_os = "linux")]
use guard_core::types::Reason;

use crate::cli::BlockArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

use super::surface;

#[derive(Serialize)]
pub struct BlockOutcome {
    pub ip: String,
    pub duration_secs: Option<u64>,
    pub permanent: bool,
}

impl Render for BlockOutcome {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        if self.permanent {
            writeln!(w, "blocked {} (permanent)", self.ip)
        } else {
            writeln!(w, "blocked {} for {}s", self.ip, self.duration_secs.unwrap_or(0))
        }
    }
}

#[cfg(target_os = "linux")]
pub async fn execute(args: BlockArgs, config: &GuardConfig, writer: &OutputWriter) -> Result<(), CliError> {
    let mut control = surface::open(&config.ebpf)?;

    let duration = args.duration_secs.map(Duration::from_secs);
    control
        .add_block(args.ip, Reason::Manual, duration)
        .map_err(|e| CliError::ControlUnavailable(e.to_string()))?;

    info!(ip = %args.ip, duration_secs = ?args.duration_secs, "installed manual block");

    writer.render(&BlockOutcome {
        ip: args.ip.to_string(),
        duration_secs: args.duration_secs,
        permanent: args.duration_secs.is_none(),
    })
}

#[cfg(not(target_os = "linux"))]
pub async fn execute(_args: BlockArgs, _config: &GuardConfig, _writer: &OutputWriter) -> Result<(), CliError> {
    Err(CliError::ControlUnavailable("control surface requires Linux".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_text_permanent_block() {
        let outcome = BlockOutcome {
            ip: "198.51.100.1".into(),
            duration_secs: None,
            permanent: true,
        };
        let mut buf = Vec::new();
        outcome.render_text(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("permanent"));
        assert!(text.contains("198.51.100.1"));
    }

    #[test]
    fn render_text_timed_block() {
        let outcome = BlockOutcome {
            ip: "198.51.100.2".into(),
            duration_secs: Some(300),
            permanent: false,
        };
        let mut buf = Vec::new();
        outcome.render_text(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("300s"));
    }
}
