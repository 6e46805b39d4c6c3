//! # Lease Manager
//!
//! Exclusive, time-bounded leases over a shared [`LockStore`]. A lease is
//! keyed by entity type, entity id and status namespace, so independent
//! namespaces on the same entity never contend with each other.
//!
//! ## Freshness
//!
//! Every [`LeaseHandle`] remembers when ownership was last confirmed (the
//! successful `SET NX` or the latest successful renewal). [`LeaseManager::assert_fresh`]
//! compares the local time since then against the TTL without asking the
//! store again. It is a conservative local check run before every critical
//! write.

use super::store::LockStore;
use crate::config::LeaseConfig;
use crate::entity::EntityRef;
use crate::error::{WorkflowError, WorkflowResult};
use crate::state_machine::StatusNamespace;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

/// Lock store key for one `(entity, namespace)` pair
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LeaseKey(String);

impl LeaseKey {
    /// `<prefix>/<EntityType>/<id>` plus `/<namespace>` for named namespaces
    pub fn new(prefix: &str, entity: &EntityRef, namespace: &StatusNamespace) -> Self {
        let mut key = format!("{prefix}/{}/{}", entity.entity_type(), entity.id());
        if let Some(name) = namespace.name() {
            key.push('/');
            key.push_str(name);
        }
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LeaseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Proof of a held lease.
///
/// Clones share the "last confirmed" instant, so a heartbeat renewing one
/// clone keeps the coordinator's copy fresh too.
#[derive(Debug, Clone)]
pub struct LeaseHandle {
    key: LeaseKey,
    ttl: Duration,
    acquired_at: Instant,
    last_confirmed: Arc<Mutex<Instant>>,
}

impl LeaseHandle {
    fn new(key: LeaseKey, ttl: Duration, confirmed_at: Instant) -> Self {
        Self {
            key,
            ttl,
            acquired_at: confirmed_at,
            last_confirmed: Arc::new(Mutex::new(confirmed_at)),
        }
    }

    pub fn key(&self) -> &LeaseKey {
        &self.key
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn acquired_at(&self) -> Instant {
        self.acquired_at
    }

    pub fn last_confirmed(&self) -> Instant {
        *self.last_confirmed.lock()
    }

    /// Time since ownership was last confirmed
    pub fn age(&self) -> Duration {
        self.last_confirmed().elapsed()
    }

    fn confirm(&self, at: Instant) {
        let mut last = self.last_confirmed.lock();
        // A slow renewal must not move the confirmation backwards
        if at > *last {
            *last = at;
        }
    }
}

/// Acquires, renews and releases leases against an injected lock store
#[derive(Clone)]
pub struct LeaseManager {
    store: Arc<dyn LockStore>,
    config: LeaseConfig,
}

impl fmt::Debug for LeaseManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LeaseManager")
            .field("store", &self.store.store_name())
            .field("config", &self.config)
            .finish()
    }
}

impl LeaseManager {
    pub fn new(store: Arc<dyn LockStore>, config: LeaseConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &LeaseConfig {
        &self.config
    }

    /// Acquire with the configured TTL and acquisition timeout
    pub async fn acquire(&self, key: LeaseKey) -> WorkflowResult<LeaseHandle> {
        self.acquire_with(key, self.config.ttl(), self.config.acquisition_timeout())
            .await
    }

    /// Poll `SET NX` every poll interval until the lease is ours or
    /// `acquisition_timeout` has passed
    #[instrument(skip(self, key), fields(key = %key, store = self.store.store_name()))]
    pub async fn acquire_with(
        &self,
        key: LeaseKey,
        ttl: Duration,
        acquisition_timeout: Duration,
    ) -> WorkflowResult<LeaseHandle> {
        let started = Instant::now();
        let deadline = started + acquisition_timeout;
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;
            // Stamp before the round trip so the local view never outlives the store's
            let attempted_at = Instant::now();
            if self.store.set_if_absent(key.as_str(), ttl).await? {
                debug!(
                    attempts,
                    waited_ms = started.elapsed().as_millis() as u64,
                    "Lease acquired"
                );
                return Ok(LeaseHandle::new(key, ttl, attempted_at));
            }

            let now = Instant::now();
            if now >= deadline {
                warn!(attempts, "Timed out waiting for lease");
                return Err(WorkflowError::AcquisitionTimeout {
                    key: key.to_string(),
                    waited: now.duration_since(started),
                });
            }

            tokio::time::sleep(self.config.poll_interval().min(deadline - now)).await;
        }
    }

    /// Push the lease expiry out to a full TTL from now.
    ///
    /// Returns false, leaving the handle's confirmation untouched, when the
    /// store no longer has the key.
    pub async fn renew(&self, handle: &LeaseHandle) -> WorkflowResult<bool> {
        let attempted_at = Instant::now();
        let renewed = self.store.expire(handle.key.as_str(), handle.ttl).await?;

        if renewed {
            handle.confirm(attempted_at);
            debug!(key = %handle.key, "Lease renewed");
        } else {
            warn!(key = %handle.key, "Lease renewal found no key in the lock store");
        }
        Ok(renewed)
    }

    /// Delete the lease key; releasing an absent lease is fine
    pub async fn release(&self, handle: &LeaseHandle) -> WorkflowResult<()> {
        self.store.delete(handle.key.as_str()).await?;
        debug!(
            key = %handle.key,
            held_ms = handle.acquired_at.elapsed().as_millis() as u64,
            "Lease released"
        );
        Ok(())
    }

    /// Fail with `LeaseExpired` once the handle has gone a full TTL unconfirmed
    pub fn assert_fresh(&self, handle: &LeaseHandle) -> WorkflowResult<()> {
        let elapsed = handle.age();
        if elapsed > handle.ttl {
            return Err(WorkflowError::LeaseExpired {
                key: handle.key.to_string(),
                elapsed,
                ttl: handle.ttl,
            });
        }
        Ok(())
    }
}
