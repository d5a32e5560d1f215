//! `conveyor config` command handler

use std::io::Write;

use serde::Serialize;
use tracing::info;

use conveyor_core::config::ConveyorConfig;
use conveyor_core::error::ConveyorError;

use crate::cli::{ConfigAction, ConfigArgs};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Known top-level sections of conveyor.toml.
const SECTIONS: &[&str] = &["general", "log_stream"];

/// Execute the `config` command.
///
/// `loaded` is the result of loading the configuration from `source`;
/// validation reports its error instead of failing early.
pub fn execute(
    args: ConfigArgs,
    source: &str,
    loaded: Result<ConveyorConfig, ConveyorError>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    match args.action {
        ConfigAction::Validate => execute_validate(source, loaded, writer),
        ConfigAction::Show { section } => execute_show(source, loaded?, section, writer),
    }
}

/// Report whether the configuration loaded and validated.
///
/// # Errors
///
/// Returns `CliError::Config` if the configuration is invalid (after rendering the report).
fn execute_validate(
    source: &str,
    loaded: Result<ConveyorConfig, ConveyorError>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    info!(source, "validating configuration");

    let report = match loaded {
        Ok(_) => ConfigValidationReport {
            source: source.to_owned(),
            valid: true,
            errors: Vec::new(),
        },
        Err(e) => ConfigValidationReport {
            source: source.to_owned(),
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

/// Display the effective configuration (file + env overrides + defaults).
fn execute_show(
    source: &str,
    config: ConveyorConfig,
    section: Option<String>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let report = build_report(source, &config, section.as_deref())?;
    writer.render(&report)?;
    Ok(())
}

fn build_report(
    source: &str,
    config: &ConveyorConfig,
    section: Option<&str>,
) -> Result<ConfigReport, CliError> {
    let serialized = match section {
        None => toml::to_string_pretty(config),
        Some("general") => toml::to_string_pretty(&config.general),
        Some("log_stream") => toml::to_string_pretty(&config.log_stream),
        Some(other) => {
            return Err(CliError::Command(format!(
                "unknown section: {} (expected: {})",
                other,
                SECTIONS.join(", ")
            )));
        }
    };

    Ok(ConfigReport {
        source: source.to_owned(),
        section: section.map(str::to_owned),
        config_toml: serialized.unwrap_or_else(|e| format!("(serialization error: {})", e)),
        config: match section {
            None => serde_json::to_value(config)?,
            Some("general") => serde_json::to_value(&config.general)?,
            Some(_) => serde_json::to_value(&config.log_stream)?,
        },
    })
}

/// Configuration display report.
///
/// Text output shows the TOML form; JSON output embeds the structured values.
#[derive(Serialize)]
pub struct ConfigReport {
    /// Configuration source (file path or "defaults")
    pub source: String,
    /// Optional section name (None = full config)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    /// Serialized TOML configuration
    #[serde(skip)]
    pub config_toml: String,
    /// Structured configuration values
    pub config: serde_json::Value,
}

impl Render for ConfigReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        if let Some(ref section) = self.section {
            let section_label = format!("[{}]", section);
            writeln!(
                w,
                "Configuration {} (source: {})",
                section_label.bold(),
                self.source
            )?;
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
    /// Configuration source (file path or "defaults")
    pub source: String,
    /// Whether the configuration is valid
    pub valid: bool,
    /// Validation error messages (empty if valid)
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

#[cfg(test)]
mod tests {
    use super::*;

    use conveyor_core::error::ConfigError;

    fn render(report: &impl Render) -> String {
        colored::control::set_override(false);
        let mut buffer = Vec::new();
        report
            .render_text(&mut buffer)
            .expect("text rendering should succeed");
        String::from_utf8(buffer).expect("valid UTF-8")
    }

    #[test]
    fn test_full_report_contains_both_sections() {
        let report = build_report("conveyor.toml", &ConveyorConfig::default(), None)
            .expect("report should build");
        let output = render(&report);
        assert!(output.contains("conveyor.toml"));
        assert!(output.contains("[general]"));
        assert!(output.contains("[log_stream]"));
        assert!(output.contains("poll_interval_ms = 1000"));
    }

    #[test]
    fn test_section_report_only_shows_section() {
        let report = build_report("defaults", &ConveyorConfig::default(), Some("log_stream"))
            .expect("report should build");
        let output = render(&report);
        assert!(output.contains("[log_stream]"));
        assert!(output.contains("overflow_policy"));
        assert!(!output.contains("log_format"));
        assert_eq!(report.config["retry_max_attempts"].as_u64(), Some(3));
    }

    #[test]
    fn test_unknown_section_is_rejected() {
        let result = build_report("defaults", &ConveyorConfig::default(), Some("ebpf"));
        match result {
            Err(CliError::Command(msg)) => {
                assert!(msg.contains("ebpf"));
                assert!(msg.contains("log_stream"));
            }
            _ => panic!("expected Command error"),
        }
    }

    #[test]
    fn test_report_json_skips_toml_text() {
        let report = build_report("defaults", &ConveyorConfig::default(), Some("general"))
            .expect("report should build");
        let json = serde_json::to_value(&report).expect("JSON serialization should succeed");
        assert_eq!(json["section"].as_str(), Some("general"));
        assert_eq!(json["config"]["log_format"].as_str(), Some("json"));
        assert!(json.get("config_toml").is_none());
    }

    #[test]
    fn test_validation_report_invalid_lists_errors() {
        let report = ConfigValidationReport {
            source: "bad.toml".to_owned(),
            valid: false,
            errors: vec!["invalid value for 'on_error'".to_owned()],
        };
        let output = render(&report);
        assert!(output.contains("INVALID"));
        assert!(output.contains("on_error"));
    }

    #[test]
    fn test_validate_invalid_config_returns_config_error() {
        let writer = OutputWriter::new(crate::cli::OutputFormat::Json);
        let loaded = Err(ConveyorError::Config(ConfigError::ParseFailed {
            reason: "expected `=`".to_owned(),
        }));
        let result = execute_validate("bad.toml", loaded, &writer);
        match result {
            Err(e) => assert_eq!(e.exit_code(), 2),
            Ok(()) => panic!("invalid config should fail validation"),
        }
    }
}
