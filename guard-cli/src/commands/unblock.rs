//! `guard unblock` command handler

use std::io::Write;

use serde::Serialize;
#[cfg(target_os = "linux")]
use tracing::info;

use guard_core::config::GuardConfig;

use crate::cli::UnblockArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

use super::surface;

#[derive(Serialize)]
pub struct UnblockOutcome {
    pub ip: String,
}

impl Render for UnblockOutcome {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        writeln!(w, "unblocked {}", self.ip)
    }
}

#[cfg(target_os = "linux")]
pub async fn execute(args: UnblockArgs, config: &GuardConfig, writer: &OutputWriter) -> Result<(), CliError> {
    let mut control = surface::open(&config.ebpf)?;

    control
        .remove_block(args.ip)
        .map_err(|e| CliError::ControlUnavailable(e.to_string()))?;

    info!(ip = %args.ip, "removed block");

    writer.render(&UnblockOutcome { ip: args.ip.to_string() })
}

#[cfg(not(target_os = "linux"))]
pub async fn execute(_args: UnblockArgs, _config: &GuardConfig, _writer: &OutputWriter) -> Result<(), CliError> {
    Err(CliError::ControlUnavailable("control surface requires Linux".into()))
}
