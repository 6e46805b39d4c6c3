//! Redis lock store
//!
//! Uses `redis::aio::ConnectionManager` for async multiplexed connections.
//! Requires the `redis` feature flag.

use super::store::LockStore;
use crate::config::WorkflowConfig;
use crate::error::{WorkflowError, WorkflowResult};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Redis-backed lock store: `SET NX EX`, `EXPIRE` and `DEL`.
///
/// Redis expiries have one second resolution here, so TTLs are rounded up
/// to whole seconds.
#[derive(Clone)]
pub struct RedisLockStore {
    connection_manager: redis::aio::ConnectionManager,
}

impl std::fmt::Debug for RedisLockStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisLockStore")
            .field("connection_manager", &"ConnectionManager")
            .finish()
    }
}

impl RedisLockStore {
    /// Connect to the Redis server at `url`
    pub async fn connect(url: &str) -> WorkflowResult<Self> {
        let client = redis::Client::open(url).map_err(|e| {
            WorkflowError::LockStore(format!("Failed to create Redis client: {e}"))
        })?;

        let connection_manager = redis::aio::ConnectionManager::new(client)
            .await
            .map_err(|e| WorkflowError::LockStore(format!("Failed to connect to Redis: {e}")))?;

        debug!(url = %redact_url(url), "Redis lock store connected");

        Ok(Self { connection_manager })
    }

    /// Connect using `redis_url` from the workflow configuration
    pub async fn from_config(config: &WorkflowConfig) -> WorkflowResult<Self> {
        let url = config.redis_url.as_deref().ok_or_else(|| {
            WorkflowError::Configuration("redis_url is required for the Redis lock store".into())
        })?;
        Self::connect(url).await
    }

    pub fn from_connection_manager(connection_manager: redis::aio::ConnectionManager) -> Self {
        Self { connection_manager }
    }
}

#[async_trait]
impl LockStore for RedisLockStore {
    async fn set_if_absent(&self, key: &str, ttl: Duration) -> WorkflowResult<bool> {
        let mut conn = self.connection_manager.clone();
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(1)
            .arg("NX")
            .arg("EX")
            .arg(ttl_seconds(ttl))
            .query_async(&mut conn)
            .await
            .map_err(|e| WorkflowError::LockStore(format!("Redis SET NX failed: {e}")))?;

        Ok(reply.is_some())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> WorkflowResult<bool> {
        let mut conn = self.connection_manager.clone();
        let updated: i64 = redis::cmd("EXPIRE")
            .arg(key)
            .arg(ttl_seconds(ttl))
            .query_async(&mut conn)
            .await
            .map_err(|e| WorkflowError::LockStore(format!("Redis EXPIRE failed: {e}")))?;

        Ok(updated == 1)
    }

    async fn delete(&self, key: &str) -> WorkflowResult<()> {
        let mut conn = self.connection_manager.clone();
        redis::cmd("DEL")
            .arg(key)
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| WorkflowError::LockStore(format!("Redis DEL failed: {e}")))?;
        Ok(())
    }

    fn store_name(&self) -> &'static str {
        "redis"
    }
}

fn ttl_seconds(ttl: Duration) -> u64 {
    let secs = ttl.as_secs();
    if ttl.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs.max(1)
    }
}

/// Redact credentials from a Redis URL for logging
fn redact_url(url: &str) -> String {
    if let Some(at_pos) = url.find('@') {
        if let Some(colon_pos) = url[..at_pos].rfind(':') {
            let prefix = &url[..=colon_pos];
            let suffix = &url[at_pos..];
            return format!("{prefix}***{suffix}");
        }
    }
    url.to_string()
}
