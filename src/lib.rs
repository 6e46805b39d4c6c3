#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Status Workflow
//!
//! Lease-protected status workflows for persisted entities.
//!
//! ## Overview
//!
//! An entity (a row with a `status` column) moves through a declared set of
//! statuses. Every transition runs under an exclusive lease held in a shared
//! lock store, so concurrent processes can never interleave writes to the
//! same entity's status. Long-running work can execute inside a transition:
//! the lease is renewed by a heartbeat while it runs, and a failed action
//! leaves the entity in a `<status>_error` state with a rendered failure.
//!
//! ## Module Organization
//!
//! - [`state_machine`] - Transition tables compiled into validated definitions
//! - [`lease`] - Lock store contract, lease manager and heartbeat
//! - [`entity`] - Entity identity and the status field store contract
//! - [`workflow`] - The transition coordinator
//! - [`config`] - Layered configuration (defaults, TOML file, environment)
//! - [`logging`] - Structured logging setup
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust
//! use status_workflow::entity::{EntityId, EntityRef, InMemoryEntityStore};
//! use status_workflow::lease::InMemoryLockStore;
//! use status_workflow::state_machine::TransitionTable;
//! use status_workflow::workflow::{StatusWorkflow, TransitionRequest};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let entities = InMemoryEntityStore::new();
//! entities.insert(EntityRef::new("Pet", EntityId::Int(1)), Some("sleep"));
//!
//! let pets = StatusWorkflow::builder("Pet")
//!     .workflow(
//!         TransitionTable::new()
//!             .allow("sleep", ["awake", "feeding"])
//!             .allow("feeding", ["fed"]),
//!     )
//!     .lock_store(Arc::new(InMemoryLockStore::new()))
//!     .entity_store(Arc::new(entities))
//!     .build()?;
//!
//! let pet = pets.entity(1_i64);
//! let grams = pet
//!     .enter_with(TransitionRequest::to("fed").via("feeding"), || async {
//!         Ok::<_, std::io::Error>(120)
//!     })
//!     .await?;
//!
//! assert_eq!(grams, 120);
//! assert_eq!(pet.status().await?.as_deref(), Some("fed"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! ```bash
//! cargo test --lib                        # Unit tests
//! cargo test                              # All tests, in-memory stores
//! cargo test --features test-services     # Also against Redis and PostgreSQL
//! ```

pub mod config;
pub mod constants;
pub mod entity;
pub mod error;
pub mod lease;
pub mod logging;
pub mod state_machine;
pub mod workflow;

pub use config::{LeaseConfig, WorkflowConfig};
pub use entity::{EntityId, EntityRef, EntityStore, InMemoryEntityStore};
pub use error::{DefinitionError, TransitionError, WorkflowError, WorkflowResult};
pub use lease::{InMemoryLockStore, LeaseManager, LockStore};
pub use logging::init_structured_logging;
pub use state_machine::{StateMachineDefinition, StatusNamespace, TransitionTable};
pub use workflow::{
    ActionOutcome, HookContext, PreTransitionHook, StatusWorkflow, TransitionRequest,
    WorkflowEntity,
};
