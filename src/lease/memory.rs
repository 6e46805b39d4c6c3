//! Process-local lock store.
//!
//! Entries carry their own deadline and are treated as absent once it has
//! passed. Only suitable when every contender lives in the same process.

use super::store::LockStore;
use crate::error::WorkflowResult;
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Default)]
pub struct InMemoryLockStore {
    entries: Arc<DashMap<String, Instant>>,
}

impl InMemoryLockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `key` is currently held (unexpired)
    pub fn is_held(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .is_some_and(|deadline| *deadline > Instant::now())
    }

    /// Remaining lifetime of `key`, if held
    pub fn remaining_ttl(&self, key: &str) -> Option<Duration> {
        let deadline = *self.entries.get(key)?;
        deadline.checked_duration_since(Instant::now())
    }
}

#[async_trait]
impl LockStore for InMemoryLockStore {
    async fn set_if_absent(&self, key: &str, ttl: Duration) -> WorkflowResult<bool> {
        let now = Instant::now();
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut held) => {
                if *held.get() > now {
                    return Ok(false);
                }
                // Expired entries are as good as absent
                held.insert(now + ttl);
                Ok(true)
            }
            Entry::Vacant(slot) => {
                slot.insert(now + ttl);
                Ok(true)
            }
        }
    }

    async fn expire(&self, key: &str, ttl: Duration) -> WorkflowResult<bool> {
        let now = Instant::now();
        match self.entries.get_mut(key) {
            Some(mut deadline) if *deadline > now => {
                *deadline = now + ttl;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete(&self, key: &str) -> WorkflowResult<()> {
        self.entries.remove(key);
        Ok(())
    }

    fn store_name(&self) -> &'static str {
        "memory"
    }
}
