use super::store::{EntityStore, FieldUpdate, StatusSnapshot};
use super::EntityRef;
use crate::constants;
use crate::error::WorkflowResult;
use crate::state_machine::{StatusFields, StatusNamespace};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Status fields of one entity in one namespace.
///
/// Every write is a single atomic multi-field update; a status never lands
/// without its changed-at timestamp.
#[derive(Clone)]
pub struct EntityAccessor {
    store: Arc<dyn EntityStore>,
    entity: EntityRef,
    fields: StatusFields,
}

impl std::fmt::Debug for EntityAccessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityAccessor")
            .field("entity", &self.entity)
            .field("fields", &self.fields)
            .finish()
    }
}

impl EntityAccessor {
    pub fn new(
        store: Arc<dyn EntityStore>,
        entity: EntityRef,
        namespace: &StatusNamespace,
    ) -> Self {
        Self {
            store,
            entity,
            fields: namespace.fields(),
        }
    }

    pub fn entity(&self) -> &EntityRef {
        &self.entity
    }

    pub fn fields(&self) -> &StatusFields {
        &self.fields
    }

    pub async fn reload(&self) -> WorkflowResult<StatusSnapshot> {
        self.store.reload(&self.entity, &self.fields).await
    }

    /// Status as currently stored
    pub async fn current_status(&self) -> WorkflowResult<Option<String>> {
        self.store.read_field(&self.entity, &self.fields.status).await
    }

    /// Write `(status, status_changed_at)`
    pub async fn write_status(&self, status: &str, at: DateTime<Utc>) -> WorkflowResult<()> {
        self.store
            .atomic_update(
                &self.entity,
                &[
                    FieldUpdate::text(&self.fields.status, Some(status)),
                    FieldUpdate::timestamp(&self.fields.changed_at, at),
                ],
            )
            .await
    }

    /// Write the `<current>_error` sentinel with its message; returns the
    /// sentinel that was written
    pub async fn write_error(
        &self,
        current: Option<&str>,
        message: &str,
        at: DateTime<Utc>,
    ) -> WorkflowResult<String> {
        let error_status = constants::status::error_status(current);
        self.store
            .atomic_update(
                &self.entity,
                &[
                    FieldUpdate::text(&self.fields.status, Some(error_status.as_str())),
                    FieldUpdate::timestamp(&self.fields.changed_at, at),
                    FieldUpdate::text(&self.fields.error, Some(message)),
                ],
            )
            .await?;
        Ok(error_status)
    }
}
