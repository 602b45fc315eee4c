use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub use crate::domain::models::config::{LogFormat, RotationPolicy};
use crate::domain::models::config::LoggingConfig;

/// Logging configuration consumed by [`super::logger::LoggerImpl`].
///
/// Mirrors [`LoggingConfig`] (the figment-loaded, persisted shape) but is
/// the type the tracing wiring actually takes, so the two can evolve at
/// different rates without the subscriber setup reaching into `domain`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format (json, pretty)
    #[serde(default = "default_format")]
    pub format: LogFormat,

    /// Directory for log files (optional, if None logs only to stdout)
    pub log_dir: Option<PathBuf>,

    /// Enable stdout logging
    #[serde(default = "default_true")]
    pub enable_stdout: bool,

    /// Log rotation policy
    #[serde(default)]
    pub rotation: RotationPolicy,

    /// Log retention in days
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_format(),
            log_dir: None,
            enable_stdout: true,
            rotation: RotationPolicy::default(),
            retention_days: default_retention_days(),
        }
    }
}

impl From<&LoggingConfig> for LogConfig {
    fn from(cfg: &LoggingConfig) -> Self {
        Self {
            level: cfg.level.clone(),
            format: cfg.format,
            log_dir: cfg.log_dir.clone(),
            enable_stdout: cfg.enable_stdout,
            rotation: cfg.rotation,
            retention_days: i64::from(cfg.retention_days),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_format() -> LogFormat {
    LogFormat::Json
}

fn default_true() -> bool {
    true
}

fn default_retention_days() -> i64 {
    30
}
