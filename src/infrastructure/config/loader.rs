//! Hierarchical configuration loading for the coordinator.

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Configuration error types.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid max_agents: {0}. Must be between 1 and 100")]
    InvalidMaxAgents(usize),

    #[error("Invalid rate limit: {0}. Must be positive")]
    InvalidRateLimit(f64),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("Invalid burst_size: {0}. Must be at least 1")]
    InvalidBurstSize(u32),

    #[error("Invalid max_retries: {0}. Cannot be 0")]
    InvalidMaxRetries(u32),

    #[error(
        "Invalid backoff configuration: initial_backoff_ms ({0}) must be less than max_backoff_ms ({1})"
    )]
    InvalidBackoff(u64, u64),

    #[error("Invalid max_workers: {0}. Must be at least 1")]
    InvalidMaxWorkers(usize),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging.
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (`Serialized`)
    /// 2. `.coordinator/config.yaml` (project config, created by `init`)
    /// 3. `.coordinator/local.yaml` (project local overrides, optional)
    /// 4. Environment variables (`COORDINATOR_*` prefix, highest priority)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".coordinator/config.yaml"))
            .merge(Yaml::file(".coordinator/local.yaml"))
            .merge(Env::prefixed("COORDINATOR_").split("__"))
            .extract()
            .context("failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, skipping the project config
    /// search path — used by tests and by tooling that passes an explicit
    /// `--config`.
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .with_context(|| format!("failed to load config from {}", path.as_ref().display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate a loaded configuration, rejecting out-of-range values before
    /// anything durable (a database pool, a log file) is opened against it.
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.max_agents == 0 || config.max_agents > 100 {
            return Err(ConfigError::InvalidMaxAgents(config.max_agents));
        }

        for db in [&config.database, &config.agent_core_database] {
            if db.path.is_empty() {
                return Err(ConfigError::EmptyDatabasePath);
            }
            if db.max_connections == 0 {
                return Err(ConfigError::InvalidMaxConnections(db.max_connections));
            }
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        if config.rate_limit.requests_per_second <= 0.0 {
            return Err(ConfigError::InvalidRateLimit(config.rate_limit.requests_per_second));
        }
        if config.rate_limit.burst_size == 0 {
            return Err(ConfigError::InvalidBurstSize(config.rate_limit.burst_size));
        }

        if config.retry.max_retries == 0 {
            return Err(ConfigError::InvalidMaxRetries(config.retry.max_retries));
        }
        if config.retry.initial_backoff_ms >= config.retry.max_backoff_ms {
            return Err(ConfigError::InvalidBackoff(
                config.retry.initial_backoff_ms,
                config.retry.max_backoff_ms,
            ));
        }

        if config.executor.max_workers == 0 {
            return Err(ConfigError::InvalidMaxWorkers(config.executor.max_workers));
        }

        Ok(())
    }
}
