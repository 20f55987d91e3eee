//! Feeder configuration.
//!
//! Loaded once at startup from an optional `configuration/base.{yaml,json}` file
//! and `FEEDER_`-prefixed environment variables, then shared by reference.
//! Nested keys use double underscores, e.g. `FEEDER_DATABASE__HOST`.

use std::time::Duration;

use rust_cli_config::{Environment, File};
use secrecy::Secret;
use serde::Deserialize;

use crate::error::{FeedError, FeedResult};
use crate::retry::RetryConfig;

/// Prefix for environment variable configuration.
const ENV_PREFIX: &str = "FEEDER";

/// Separator for nested configuration keys in environment variables.
const ENV_SEPARATOR: &str = "__";

/// Optional base configuration file, without extension.
const BASE_CONFIG_FILE: &str = "configuration/base";

/// Top-level configuration for the feeder daemon.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeederConfig {
    /// Source database connection parameters.
    pub database: DatabaseConfig,

    /// Rows generated per tick, for both customers and orders.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Interval between customer insertions.
    #[serde(with = "humantime_serde", default = "default_customer_interval")]
    pub customer_interval: Duration,

    /// Interval between order insertions.
    #[serde(with = "humantime_serde", default = "default_order_interval")]
    pub order_interval: Duration,

    /// Upper bound on sampled customer ids per order batch.
    #[serde(default = "default_customer_sample_limit")]
    pub customer_sample_limit: u32,

    /// Percentage of the customers table scanned by the sample.
    #[serde(default = "default_customer_sample_percent")]
    pub customer_sample_percent: f64,

    /// Reconnect-and-retry behaviour around batch inserts.
    #[serde(default)]
    pub retry: RetryConfig,
}

/// Connection parameters for the source database.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Database name.
    pub name: String,

    pub username: String,

    pub password: Secret<String>,
}

fn default_batch_size() -> usize {
    2
}

fn default_customer_interval() -> Duration {
    Duration::from_secs(10)
}

fn default_order_interval() -> Duration {
    Duration::from_secs(15)
}

fn default_customer_sample_limit() -> u32 {
    20
}

fn default_customer_sample_percent() -> f64 {
    20.0
}

fn default_port() -> u16 {
    5432
}

impl FeederConfig {
    /// Builds a configuration with default scheduling for the given database.
    pub fn new(database: DatabaseConfig) -> Self {
        Self {
            database,
            batch_size: default_batch_size(),
            customer_interval: default_customer_interval(),
            order_interval: default_order_interval(),
            customer_sample_limit: default_customer_sample_limit(),
            customer_sample_percent: default_customer_sample_percent(),
            retry: RetryConfig::default(),
        }
    }

    /// Loads configuration from the base file (if present) and the environment.
    pub fn load() -> FeedResult<Self> {
        let config = rust_cli_config::Config::builder()
            .add_source(File::with_name(BASE_CONFIG_FILE).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            )
            .build()
            .map_err(|err| FeedError::Config(err.to_string()))?
            .try_deserialize::<FeederConfig>()
            .map_err(|err| FeedError::Config(err.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Validates the feeder configuration.
    pub fn validate(&self) -> FeedResult<()> {
        if self.database.host.is_empty() {
            return Err(FeedError::Config("database.host cannot be empty".into()));
        }

        if self.database.name.is_empty() {
            return Err(FeedError::Config("database.name cannot be empty".into()));
        }

        if self.customer_interval.is_zero() || self.order_interval.is_zero() {
            return Err(FeedError::Config("job intervals must be non-zero".into()));
        }

        if !(self.customer_sample_percent > 0.0 && self.customer_sample_percent <= 100.0) {
            return Err(FeedError::Config(
                "customer_sample_percent must be in (0, 100]".into(),
            ));
        }

        self.retry.validate()
    }
}
