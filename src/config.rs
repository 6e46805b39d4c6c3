//! # Configuration
//!
//! Layered configuration for the transition engine: built-in defaults, an
//! optional TOML file, then `STATUS_WORKFLOW__*` environment variables
//! (double underscore separates nesting, e.g. `STATUS_WORKFLOW__LEASE__TTL_MS`).

use crate::constants;
use crate::error::{WorkflowError, WorkflowResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Lease timing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeaseConfig {
    pub ttl_ms: u64,
    pub acquisition_timeout_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for LeaseConfig {
    fn default() -> Self {
        Self {
            ttl_ms: constants::lease::DEFAULT_TTL_MS,
            acquisition_timeout_ms: constants::lease::DEFAULT_ACQUISITION_TIMEOUT_MS,
            poll_interval_ms: constants::lease::DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl LeaseConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    pub fn acquisition_timeout(&self) -> Duration {
        Duration::from_millis(self.acquisition_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Heartbeat period, half the TTL; see [`crate::lease::Heartbeat`]
    pub fn heartbeat_interval(&self) -> Duration {
        self.ttl() / 2
    }

    pub fn validate(&self) -> WorkflowResult<()> {
        if self.ttl_ms == 0 {
            return Err(WorkflowError::Configuration(
                "lease.ttl_ms must be greater than zero".to_string(),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(WorkflowError::Configuration(
                "lease.poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.poll_interval_ms >= self.acquisition_timeout_ms {
            return Err(WorkflowError::Configuration(format!(
                "lease.poll_interval_ms ({}) must be smaller than lease.acquisition_timeout_ms ({})",
                self.poll_interval_ms, self.acquisition_timeout_ms
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub lease: LeaseConfig,
    /// Prefix of lease keys in the lock store
    pub key_prefix: String,
    /// Read by `RedisLockStore::from_config`
    pub redis_url: Option<String>,
    /// Read by `PgEntityStore::from_config`
    pub database_url: Option<String>,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            lease: LeaseConfig::default(),
            key_prefix: constants::lease::DEFAULT_KEY_PREFIX.to_string(),
            redis_url: None,
            database_url: None,
        }
    }
}

impl WorkflowConfig {
    /// Defaults overlaid with environment variables
    pub fn from_env() -> WorkflowResult<Self> {
        Self::build(None)
    }

    /// Defaults, then `path` (which must exist), then environment variables
    pub fn load(path: impl AsRef<Path>) -> WorkflowResult<Self> {
        Self::build(Some(path.as_ref()))
    }

    fn build(path: Option<&Path>) -> WorkflowResult<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default())?);

        if let Some(path) = path {
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(true),
            );
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(constants::env::CONFIG_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> WorkflowResult<()> {
        self.lease.validate()?;
        if self.key_prefix.trim().is_empty() {
            return Err(WorkflowError::Configuration(
                "key_prefix must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
