//! Worker configuration file and command-line overrides.

use std::path::{Path, PathBuf};

use anyhow::{ensure, Context, Result};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use worker::Timeouts;

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(
    name = "lumen-worker",
    version,
    about = "Plugin-hosting worker process for the Lumen launcher",
    long_about = "Speaks newline-delimited JSON on stdin/stdout. Logs go to stderr."
)]
pub struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log filter directive (overrides `[logging] filter`; `RUST_LOG` wins)
    #[arg(long)]
    pub log_filter: Option<String>,

    /// Log output format
    #[arg(long, value_enum)]
    pub log_format: Option<LogFormat>,

    /// OTLP gRPC endpoint for span export
    #[arg(long)]
    pub otlp_endpoint: Option<String>,
}

/// Log line format on stderr.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// `[logging]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
    pub format: LogFormat,
    /// Enables OTLP span export when set.
    pub otlp_endpoint: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            format: LogFormat::Text,
            otlp_endpoint: None,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkerConfig {
    pub timeouts: Timeouts,
    pub logging: LoggingConfig,
}

impl WorkerConfig {
    /// Loads the file at `path`, or the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file '{}'", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("in config file '{}'", path.display()))
    }

    /// Parses and validates a TOML document.
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).context("parsing TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// Applies command-line overrides.
    pub fn with_overrides(mut self, cli: &Cli) -> Result<Self> {
        if let Some(filter) = &cli.log_filter {
            self.logging.filter = filter.clone();
        }
        if let Some(format) = cli.log_format {
            self.logging.format = format;
        }
        if let Some(endpoint) = &cli.otlp_endpoint {
            self.logging.otlp_endpoint = Some(endpoint.clone());
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<()> {
        let t = &self.timeouts;
        ensure!(
            t.initialize_secs > 0 && t.search_secs > 0 && t.plugin_call_secs > 0,
            "timeouts must be at least one second"
        );
        EnvFilter::try_new(&self.logging.filter)
            .with_context(|| format!("invalid log filter '{}'", self.logging.filter))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = WorkerConfig::from_toml("").unwrap();
        assert_eq!(config, WorkerConfig::default());
        assert_eq!(config.timeouts.search_secs, 30);
        assert_eq!(config.logging.filter, "info");
    }

    #[test]
    fn test_partial_tables_keep_remaining_defaults() {
        let config = WorkerConfig::from_toml(
            r#"
            [timeouts]
            search_secs = 5

            [logging]
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.timeouts.search_secs, 5);
        assert_eq!(config.timeouts.initialize_secs, 60);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.otlp_endpoint, None);
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let err = WorkerConfig::from_toml("[timeouts]\nplugin_call_secs = 0\n").unwrap_err();
        assert!(format!("{err:#}").contains("at least one second"));
    }

    #[test]
    fn test_unknown_section_is_rejected() {
        assert!(WorkerConfig::from_toml("[plugins]\nenabled = true\n").is_err());
    }

    #[test]
    fn test_cli_overrides_file_values() {
        let cli = Cli::try_parse_from([
            "lumen-worker",
            "--log-filter",
            "worker=debug",
            "--log-format",
            "json",
            "--otlp-endpoint",
            "http://localhost:4317",
        ])
        .unwrap();

        let config = WorkerConfig::default().with_overrides(&cli).unwrap();

        assert_eq!(config.logging.filter, "worker=debug");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(
            config.logging.otlp_endpoint.as_deref(),
            Some("http://localhost:4317")
        );
    }

    #[test]
    fn test_missing_file_names_the_path() {
        let err = WorkerConfig::load(Some(Path::new("/nonexistent/lumen.toml"))).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/lumen.toml"));
    }
}
