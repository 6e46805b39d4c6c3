//! Error types for status workflows.
//!

use std::convert::Infallible;
use std::time::Duration;
use thiserror::Error;

/// Errors produced by the transition engine and its collaborators
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WorkflowError {
    #[error("timeout waiting for {key} lock after {waited:?}")]
    AcquisitionTimeout { key: String, waited: Duration },

    #[error("can't enter {to} from {}, expected {expected}", .from.as_deref().unwrap_or("nil"))]
    InvalidTransition {
        from: Option<String>,
        to: String,
        expected: String,
    },

    #[error("too slow: lease {key} last confirmed {elapsed:?} ago, ttl is {ttl:?}")]
    LeaseExpired {
        key: String,
        elapsed: Duration,
        ttl: Duration,
    },

    #[error("Unknown status namespace: {0}")]
    UnknownNamespace(String),

    #[error("Invalid state machine definition: {0}")]
    Definition(#[from] DefinitionError),

    #[error("Lock store error: {0}")]
    LockStore(String),

    #[error("Entity store error: {0}")]
    EntityStore(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl WorkflowError {
    /// Whether `enter_if_possible` is allowed to swallow this error
    pub fn is_invalid_transition(&self) -> bool {
        matches!(self, Self::InvalidTransition { .. })
    }

    pub fn is_lease_expired(&self) -> bool {
        matches!(self, Self::LeaseExpired { .. })
    }
}

/// Construction failures for a state machine definition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    #[error("transition table is empty")]
    EmptyTable,

    #[error("blank target status declared from {}", .from.as_deref().unwrap_or("nil"))]
    BlankTarget { from: Option<String> },

    #[error("invalid namespace {0:?}: expected an identifier")]
    InvalidNamespace(String),
}

/// Outcome of a transition that ran a caller-supplied action.
///
/// The action's own failure is carried unchanged so callers can match on it
/// after the engine has recorded it on the entity.
#[derive(Debug, Error)]
pub enum TransitionError<E = Infallible> {
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error("Action failed: {0}")]
    ActionFailed(E),
}

impl<E> TransitionError<E> {
    pub fn is_invalid_transition(&self) -> bool {
        matches!(self, Self::Workflow(err) if err.is_invalid_transition())
    }

    /// The engine error, if the failure did not come from the action
    pub fn workflow_error(&self) -> Option<&WorkflowError> {
        match self {
            Self::Workflow(err) => Some(err),
            Self::ActionFailed(_) => None,
        }
    }

    /// The action's own error, if that is what failed
    pub fn into_action_error(self) -> Option<E> {
        match self {
            Self::ActionFailed(err) => Some(err),
            Self::Workflow(_) => None,
        }
    }
}

impl From<TransitionError<Infallible>> for WorkflowError {
    fn from(err: TransitionError<Infallible>) -> Self {
        match err {
            TransitionError::Workflow(err) => err,
            TransitionError::ActionFailed(never) => match never {},
        }
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for WorkflowError {
    fn from(err: sqlx::Error) -> Self {
        WorkflowError::EntityStore(err.to_string())
    }
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for WorkflowError {
    fn from(err: redis::RedisError) -> Self {
        WorkflowError::LockStore(err.to_string())
    }
}

impl From<config::ConfigError> for WorkflowError {
    fn from(err: config::ConfigError) -> Self {
        WorkflowError::Configuration(err.to_string())
    }
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;
