//! # Status Workflows
//!
//! The transition engine: [`StatusWorkflow`] combines the per-namespace
//! transition tables, the lease manager and the entity store into
//! lease-protected status changes.

pub mod coordinator;
pub mod entity;
pub mod failure;
pub mod hook;
pub mod request;

pub use coordinator::{StatusWorkflow, StatusWorkflowBuilder};
pub use entity::WorkflowEntity;
pub use hook::{ActionOutcome, HookContext, PreTransitionHook};
pub use request::TransitionRequest;
