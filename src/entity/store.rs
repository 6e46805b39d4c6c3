use super::EntityRef;
use crate::error::WorkflowResult;
use crate::state_machine::StatusFields;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Value written to one entity field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldValue {
    Text(Option<String>),
    Timestamp(DateTime<Utc>),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => text.as_deref(),
            Self::Timestamp(_) => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Timestamp(at) => Some(*at),
            Self::Text(_) => None,
        }
    }
}

/// One `field = value` assignment within an atomic update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldUpdate {
    pub field: String,
    pub value: FieldValue,
}

impl FieldUpdate {
    pub fn text(field: impl Into<String>, value: Option<impl Into<String>>) -> Self {
        Self {
            field: field.into(),
            value: FieldValue::Text(value.map(Into::into)),
        }
    }

    pub fn timestamp(field: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            field: field.into(),
            value: FieldValue::Timestamp(at),
        }
    }
}

/// Freshly reloaded status fields of one namespace
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub status: Option<String>,
    pub changed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

/// Durable storage of entity status fields.
///
/// `atomic_update` must commit every given field or none of them; readers
/// never observe a partially applied update.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Reload the status, changed-at and error fields from storage
    async fn reload(&self, entity: &EntityRef, fields: &StatusFields)
        -> WorkflowResult<StatusSnapshot>;

    /// Read a single text field
    async fn read_field(&self, entity: &EntityRef, field: &str) -> WorkflowResult<Option<String>>;

    /// Write all `updates` together
    async fn atomic_update(&self, entity: &EntityRef, updates: &[FieldUpdate])
        -> WorkflowResult<()>;
}
