//! # Leases
//!
//! Distributed mutual exclusion for status transitions. The lock store is the
//! sole arbiter: a lease exists exactly as long as its key lives there.
//!
//! ## Architecture
//!
//! - **LockStore**: atomic `set_if_absent` / `expire` / `delete` primitives
//! - **LeaseManager**: acquisition polling, renewal, release and the local
//!   freshness check
//! - **Heartbeat**: background renewal while a caller's action runs
//!
//! ## Usage
//!
//! ```rust
//! use status_workflow::config::LeaseConfig;
//! use status_workflow::entity::{EntityId, EntityRef};
//! use status_workflow::lease::{InMemoryLockStore, LeaseKey, LeaseManager};
//! use status_workflow::state_machine::StatusNamespace;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = LeaseManager::new(Arc::new(InMemoryLockStore::new()), LeaseConfig::default());
//! let pet = EntityRef::new("Pet", EntityId::Int(1));
//! let key = LeaseKey::new("status_workflow", &pet, &StatusNamespace::default());
//!
//! let lease = manager.acquire(key).await?;
//! manager.assert_fresh(&lease)?;
//! manager.release(&lease).await?;
//! # Ok(())
//! # }
//! ```

pub mod heartbeat;
pub mod manager;
pub mod memory;
#[cfg(feature = "redis")]
pub mod redis;
pub mod store;

pub use heartbeat::Heartbeat;
pub use manager::{LeaseHandle, LeaseKey, LeaseManager};
pub use memory::InMemoryLockStore;
#[cfg(feature = "redis")]
pub use self::redis::RedisLockStore;
pub use store::LockStore;
