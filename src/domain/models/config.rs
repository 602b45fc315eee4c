//! Top-level configuration structure for the coordinator.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Maximum number of concurrent agents (1-100).
    #[serde(default = "default_max_agents")]
    pub max_agents: usize,

    /// Coordinator state: sessions, agent registry, outcomes, baselines,
    /// patterns, dq_scores, file_locks, delegation_events, schema_version.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Trust ledger + evolution tables, kept in a separate silo under a
    /// separate path tree to mirror the source's two-data-directory split.
    #[serde(default = "default_agent_core_database")]
    pub agent_core_database: DatabaseConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub executor: ExecutorConfig,
}

const fn default_max_agents() -> usize {
    10
}

fn default_agent_core_database() -> DatabaseConfig {
    DatabaseConfig {
        path: ".agent-core/storage/trust.db".to_string(),
        max_connections: 10,
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_agents: default_max_agents(),
            database: DatabaseConfig::default(),
            agent_core_database: default_agent_core_database(),
            logging: LoggingConfig::default(),
            rate_limit: RateLimitConfig::default(),
            retry: RetryConfig::default(),
            executor: ExecutorConfig::default(),
        }
    }
}

/// `SQLite` database configuration shared by both data silos.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    #[serde(default = "default_database_path")]
    pub path: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> String {
    ".coordinator/data/coordinator.db".to_string()
}

const fn default_max_connections() -> u32 {
    10
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty.
    #[serde(default = "default_log_format")]
    pub format: LogFormat,

    /// Directory for log files; `None` means stdout-only.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    #[serde(default = "default_true")]
    pub enable_stdout: bool,

    #[serde(default)]
    pub rotation: RotationPolicy,

    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotationPolicy {
    Daily,
    Hourly,
    Never,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self::Daily
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> LogFormat {
    LogFormat::Json
}

const fn default_true() -> bool {
    true
}

const fn default_retention_days() -> u32 {
    30
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            enable_stdout: default_true(),
            rotation: RotationPolicy::default(),
            retention_days: default_retention_days(),
        }
    }
}

/// Rate limiting configuration for the model-invoker subprocess boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RateLimitConfig {
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: f64,

    #[serde(default = "default_burst_size")]
    pub burst_size: u32,
}

const fn default_requests_per_second() -> f64 {
    10.0
}

const fn default_burst_size() -> u32 {
    20
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_requests_per_second(),
            burst_size: default_burst_size(),
        }
    }
}

/// Retry policy for transient storage/subprocess failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_initial_backoff_ms() -> u64 {
    1000
}

const fn default_max_backoff_ms() -> u64 {
    30_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

/// Bounded-parallel subprocess executor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ExecutorConfig {
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Path to the model-invoker binary; overridden at runtime by the
    /// `CLAUDE_REAL_BIN` environment variable if set.
    #[serde(default = "default_claude_path")]
    pub claude_path: String,
}

const fn default_max_workers() -> usize {
    5
}

fn default_claude_path() -> String {
    "claude".to_string()
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            claude_path: default_claude_path(),
        }
    }
}
