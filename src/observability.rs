//! Logging setup for the feature-table binary, driven by `AQF_LOG_*`.

use std::path::Path;

use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::non_empty_var;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "pretty" => Some(Self::Pretty),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `aquahive_features=debug`.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Error)]
pub enum LoggingInitError {
    #[error("logging already initialized: {0}")]
    AlreadyInitialized(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Unknown formats keep the default rather than failing the run.
pub fn logging_config_from_env() -> LoggingConfig {
    let defaults = LoggingConfig::default();
    LoggingConfig {
        level: non_empty_var("AQF_LOG_LEVEL").unwrap_or(defaults.level),
        format: non_empty_var("AQF_LOG_FORMAT")
            .and_then(|raw| LogFormat::parse(&raw))
            .unwrap_or(defaults.format),
    }
}

pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingInitError> {
    let env_filter =
        EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_ansi(config.format == LogFormat::Pretty);

    match config.format {
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish())?,
        LogFormat::Pretty => tracing::subscriber::set_global_default(builder.pretty().finish())?,
    }

    Ok(())
}

pub fn log_run_start(config: &LoggingConfig, input_path: &Path, output_dir: &Path) {
    info!(
        component = "build_feature_tables",
        event = "run.start",
        log_level = %config.level,
        input_path = %input_path.display(),
        output_dir = %output_dir.display()
    );
}

pub fn log_run_finish(tables_written: usize, readings: usize) {
    info!(
        component = "build_feature_tables",
        event = "run.finish",
        tables_written,
        readings
    );
}
