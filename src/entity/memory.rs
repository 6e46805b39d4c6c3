//! Process-local entity store.
//!
//! Rows are field maps keyed by [`EntityRef`]. Every applied update is also
//! appended to a history log so callers can observe intermediate states.

use super::store::{EntityStore, FieldUpdate, FieldValue, StatusSnapshot};
use super::EntityRef;
use crate::error::{WorkflowError, WorkflowResult};
use crate::state_machine::StatusFields;
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

type Row = HashMap<String, FieldValue>;

#[derive(Debug, Clone, Default)]
pub struct InMemoryEntityStore {
    rows: Arc<DashMap<EntityRef, Row>>,
    history: Arc<Mutex<Vec<(EntityRef, Vec<FieldUpdate>)>>>,
}

impl InMemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create (or reset) a row with a default-namespace status
    pub fn insert(&self, entity: EntityRef, status: Option<&str>) {
        let mut row = Row::new();
        row.insert(
            "status".to_string(),
            FieldValue::Text(status.map(str::to_string)),
        );
        self.rows.insert(entity, row);
    }

    /// Set one field directly, bypassing history
    pub fn set_field(&self, entity: &EntityRef, field: &str, value: FieldValue) {
        self.rows
            .entry(entity.clone())
            .or_default()
            .insert(field.to_string(), value);
    }

    pub fn field(&self, entity: &EntityRef, field: &str) -> Option<FieldValue> {
        self.rows.get(entity)?.get(field).cloned()
    }

    pub fn text_field(&self, entity: &EntityRef, field: &str) -> Option<String> {
        self.field(entity, field)
            .and_then(|value| value.as_text().map(str::to_string))
    }

    /// Every atomic update applied to `entity`, oldest first
    pub fn history(&self, entity: &EntityRef) -> Vec<Vec<FieldUpdate>> {
        self.history
            .lock()
            .iter()
            .filter(|(e, _)| e == entity)
            .map(|(_, updates)| updates.clone())
            .collect()
    }

    /// Values written to `field` on `entity`, oldest first
    pub fn field_history(&self, entity: &EntityRef, field: &str) -> Vec<FieldValue> {
        self.history(entity)
            .into_iter()
            .flatten()
            .filter(|update| update.field == field)
            .map(|update| update.value)
            .collect()
    }

    fn not_found(entity: &EntityRef) -> WorkflowError {
        WorkflowError::EntityStore(format!("{entity} not found"))
    }
}

#[async_trait]
impl EntityStore for InMemoryEntityStore {
    async fn reload(
        &self,
        entity: &EntityRef,
        fields: &StatusFields,
    ) -> WorkflowResult<StatusSnapshot> {
        let row = self.rows.get(entity).ok_or_else(|| Self::not_found(entity))?;
        Ok(StatusSnapshot {
            status: row
                .get(&fields.status)
                .and_then(|v| v.as_text().map(str::to_string)),
            changed_at: row.get(&fields.changed_at).and_then(FieldValue::as_timestamp),
            error: row
                .get(&fields.error)
                .and_then(|v| v.as_text().map(str::to_string)),
        })
    }

    async fn read_field(&self, entity: &EntityRef, field: &str) -> WorkflowResult<Option<String>> {
        let row = self.rows.get(entity).ok_or_else(|| Self::not_found(entity))?;
        Ok(row.get(field).and_then(|v| v.as_text().map(str::to_string)))
    }

    async fn atomic_update(
        &self,
        entity: &EntityRef,
        updates: &[FieldUpdate],
    ) -> WorkflowResult<()> {
        let mut row = self
            .rows
            .get_mut(entity)
            .ok_or_else(|| Self::not_found(entity))?;
        // The row guard is held for the whole update
        for update in updates {
            row.insert(update.field.clone(), update.value.clone());
        }
        self.history.lock().push((entity.clone(), updates.to_vec()));
        Ok(())
    }
}
