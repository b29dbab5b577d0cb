//! Configuration module
//!
//! Loads configuration from environment variables.

use std::env;

use crate::snapshot::SnapshotConfig;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL
    pub database_url: String,

    /// Maximum database connections in pool
    pub database_max_connections: u32,

    /// Environment (development, production)
    pub environment: String,

    /// Events since the last snapshot that trigger the next one
    pub snapshot_event_threshold: i64,

    /// Snapshots retained per aggregate
    pub snapshot_retain: u32,

    /// Seconds between snapshot sweep runs
    pub sweep_interval_secs: u64,

    /// Aggregates examined per sweep run
    pub sweep_batch_size: i64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingEnv("DATABASE_URL"))?;

        let database_max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("DATABASE_MAX_CONNECTIONS"))?;

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let snapshot_event_threshold = env::var("SNAPSHOT_EVENT_THRESHOLD")
            .unwrap_or_else(|_| "50".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("SNAPSHOT_EVENT_THRESHOLD"))?;

        let snapshot_retain = env::var("SNAPSHOT_RETAIN")
            .unwrap_or_else(|_| "3".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("SNAPSHOT_RETAIN"))?;

        let sweep_interval_secs = env::var("SWEEP_INTERVAL_SECS")
            .unwrap_or_else(|_| "300".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("SWEEP_INTERVAL_SECS"))?;

        let sweep_batch_size = env::var("SWEEP_BATCH_SIZE")
            .unwrap_or_else(|_| "100".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("SWEEP_BATCH_SIZE"))?;

        Ok(Self {
            database_url,
            database_max_connections,
            environment,
            snapshot_event_threshold,
            snapshot_retain,
            sweep_interval_secs,
            sweep_batch_size,
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Snapshot thresholds with the configurable knobs applied
    pub fn snapshot_config(&self) -> SnapshotConfig {
        SnapshotConfig {
            event_count_threshold: self.snapshot_event_threshold,
            retain_per_aggregate: self.snapshot_retain,
            ..SnapshotConfig::default()
        }
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}
