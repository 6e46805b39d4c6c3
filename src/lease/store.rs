use crate::error::WorkflowResult;
use async_trait::async_trait;
use std::time::Duration;

/// Atomic primitives a lease needs from a shared lock store.
///
/// Every call must be atomic and visible to all processes sharing the
/// store. Implementations round TTLs up to the store's own resolution.
#[async_trait]
pub trait LockStore: Send + Sync {
    /// Create `key` with expiry `ttl` unless it already exists
    async fn set_if_absent(&self, key: &str, ttl: Duration) -> WorkflowResult<bool>;

    /// Reset the expiry of an existing `key`; false when the key is gone
    async fn expire(&self, key: &str, ttl: Duration) -> WorkflowResult<bool>;

    /// Remove `key`; removing an absent key is not an error
    async fn delete(&self, key: &str) -> WorkflowResult<()>;

    /// Get the name of the lock store backend
    fn store_name(&self) -> &'static str;
}
