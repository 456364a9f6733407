//! `guard config` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use guard_core::config::GuardConfig;

use crate::cli::{ConfigAction, ConfigArgs};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `config` command.
pub async fn execute(args: ConfigArgs, config_path: &Path, writer: &OutputWriter) -> Result<(), CliError> {
    match args.action {
        ConfigAction::Validate => execute_validate(config_path, writer).await,
        ConfigAction::Show { section } => execute_show(config_path, section, writer).await,
    }
}

/// Execute the config validate subcommand.
///
/// Attempts to load and validate the configuration file, reporting any errors.
async fn execute_validate(config_path: &Path, writer: &OutputWriter) -> Result<(), CliError> {
    info!(path = %config_path.display(), "validating configuration");

    let result = GuardConfig::load(config_path);

    let report = match result {
        Ok(_) => ConfigValidationReport {
            source: config_path.display().to_string(),
            valid: true,
            errors: Vec::new(),
        },
        Err(e) => ConfigValidationReport {
            source: config_path.display().to_string(),
            valid: false,
            errors: vec![e.to_string()],
        },
    };

    writer.render(&report)?;

    if !report.valid {
        return Err(CliError::Config("configuration is invalid".to_owned()));
    }

    Ok(())
}

/// Execute the config show subcommand.
///
/// Loads and displays the effective configuration (file + defaults), with
/// the geo-IP license key redacted.
async fn execute_show(config_path: &Path, section: Option<String>, writer: &OutputWriter) -> Result<(), CliError> {
    info!(path = %config_path.display(), "loading configuration");

    let mut config = GuardConfig::load(config_path).map_err(|e| CliError::Config(e.to_string()))?;

    redact_credentials(&mut config);

    let report = if let Some(section_name) = section {
        match section_name.as_str() {
            "general" => section_report(config_path, "general", &config.general),
            "ebpf" => section_report(config_path, "ebpf", &config.ebpf),
            "aggregator" => section_report(config_path, "aggregator", &config.aggregator),
            "sync" => section_report(config_path, "sync", &config.sync),
            "flood" => section_report(config_path, "flood", &config.flood),
            "control" => section_report(config_path, "control", &config.control),
            "metrics" => section_report(config_path, "metrics", &config.metrics),
            _ => {
                return Err(CliError::Command(format!(
                    "unknown section: {} (expected: general, ebpf, aggregator, sync, flood, control, metrics)",
                    section_name
                )));
            }
        }
    } else {
        ConfigReport {
            source: config_path.display().to_string(),
            section: None,
            config_toml: toml::to_string_pretty(&config).unwrap_or_else(|e| format!("(serialization error: {})", e)),
        }
    };

    writer.render(&report)?;

    Ok(())
}

fn section_report<T: Serialize>(config_path: &Path, name: &str, section: &T) -> ConfigReport {
    ConfigReport {
        source: config_path.display().to_string(),
        section: Some(name.to_owned()),
        config_toml: toml::to_string_pretty(section).unwrap_or_else(|e| format!("(serialization error: {})", e)),
    }
}

/// Redact the geo-IP licence key before printing configuration back to the
/// operator's terminal -- everything else in `sync` is non-sensitive CIDR
/// and interval data.
fn redact_credentials(config: &mut GuardConfig) {
    if config.sync.geo_license_key.is_some() {
        config.sync.geo_license_key = Some("***REDACTED***".to_owned());
    }
}

/// Configuration display report.
#[derive(Serialize)]
pub struct ConfigReport {
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(skip)]
    pub config_toml: String,
}

impl Render for ConfigReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        if let Some(ref section) = self.section {
            let section_label = format!("[{}]", section);
            writeln!(w, "Configuration {} (source: {})", section_label.bold(), self.source)?;
        } else {
            writeln!(w, "Configuration (source: {})", self.source.bold())?;
        }

        writeln!(w)?;
        write!(w, "{}", self.config_toml)?;

        Ok(())
    }
}

/// Configuration validation report.
#[derive(Serialize)]
pub struct ConfigValidationReport {
    pub source: String,
    pub valid: bool,
    pub errors: Vec<String>,
}

impl Render for ConfigValidationReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Config Validation: {}", self.source.bold())?;

        if self.valid {
            writeln!(w, "  Result: {}", "VALID".green().bold())?;
        } else {
            writeln!(w, "  Result: {}", "INVALID".red().bold())?;
            for err in &self.errors {
                writeln!(w, "  Error: {}", err.red())?;
            }
        }

        Ok(())
    }
}
