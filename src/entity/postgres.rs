//! # PostgreSQL Entity Store
//!
//! One row per entity in a table per entity type, primary key column `id`.
//! Reads go through `to_jsonb(row)` so tables that lack an optional column
//! (such as `status_error`) still reload cleanly. Updates are a single
//! multi-column `UPDATE`, which Postgres applies atomically.

use super::store::{EntityStore, FieldUpdate, FieldValue, StatusSnapshot};
use super::{EntityId, EntityRef};
use crate::config::WorkflowConfig;
use crate::error::{WorkflowError, WorkflowResult};
use crate::state_machine::namespace::is_identifier;
use crate::state_machine::StatusFields;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use std::collections::HashMap;
use tracing::{debug, instrument};

macro_rules! bind_id {
    ($query:expr, $id:expr) => {
        match $id {
            EntityId::Int(id) => $query.bind(*id),
            EntityId::Uuid(id) => $query.bind(*id),
            EntityId::Text(id) => $query.bind(id.clone()),
        }
    };
}

#[derive(Debug, Clone)]
pub struct PgEntityStore {
    pool: PgPool,
    tables: HashMap<String, String>,
}

impl PgEntityStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            tables: HashMap::new(),
        }
    }

    /// Open a pool on `database_url` from the workflow configuration
    pub async fn from_config(config: &WorkflowConfig) -> WorkflowResult<Self> {
        let url = config.database_url.as_deref().ok_or_else(|| {
            WorkflowError::Configuration("database_url is required for the Postgres store".into())
        })?;
        let pool = PgPool::connect(url).await?;
        debug!("Postgres entity store connected");
        Ok(Self::new(pool))
    }

    /// Map an entity type to its table; unmapped types use the lowercased
    /// type name with an `s` suffix (`Pet` -> `pets`)
    pub fn with_table(
        mut self,
        entity_type: impl Into<String>,
        table: impl Into<String>,
    ) -> WorkflowResult<Self> {
        let table = table.into();
        checked_identifier(&table)?;
        self.tables.insert(entity_type.into(), table);
        Ok(self)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn table_for(&self, entity: &EntityRef) -> WorkflowResult<String> {
        let table = self
            .tables
            .get(entity.entity_type())
            .cloned()
            .unwrap_or_else(|| format!("{}s", entity.entity_type().to_lowercase()));
        checked_identifier(&table)?;
        Ok(table)
    }

    async fn load_row(&self, entity: &EntityRef) -> WorkflowResult<serde_json::Map<String, Value>> {
        let table = self.table_for(entity)?;
        let sql = format!(r#"SELECT to_jsonb(t) FROM "{table}" t WHERE t."id" = $1"#);

        let row = bind_id!(sqlx::query_scalar::<_, Value>(&sql), entity.id())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(Value::Object(columns)) => Ok(columns),
            Some(other) => Err(WorkflowError::EntityStore(format!(
                "unexpected row shape for {entity}: {other}"
            ))),
            None => Err(not_found(entity)),
        }
    }
}

#[async_trait]
impl EntityStore for PgEntityStore {
    #[instrument(skip(self, fields), fields(entity = %entity))]
    async fn reload(
        &self,
        entity: &EntityRef,
        fields: &StatusFields,
    ) -> WorkflowResult<StatusSnapshot> {
        let columns = self.load_row(entity).await?;
        Ok(StatusSnapshot {
            status: text_column(&columns, &fields.status),
            changed_at: text_column(&columns, &fields.changed_at)
                .as_deref()
                .and_then(parse_timestamp),
            error: text_column(&columns, &fields.error),
        })
    }

    async fn read_field(&self, entity: &EntityRef, field: &str) -> WorkflowResult<Option<String>> {
        checked_identifier(field)?;
        let columns = self.load_row(entity).await?;
        Ok(text_column(&columns, field))
    }

    #[instrument(skip(self, updates), fields(entity = %entity, field_count = updates.len()))]
    async fn atomic_update(
        &self,
        entity: &EntityRef,
        updates: &[FieldUpdate],
    ) -> WorkflowResult<()> {
        if updates.is_empty() {
            return Ok(());
        }

        let table = self.table_for(entity)?;
        let mut assignments = Vec::with_capacity(updates.len());
        for (index, update) in updates.iter().enumerate() {
            checked_identifier(&update.field)?;
            assignments.push(format!(r#""{}" = ${}"#, update.field, index + 1));
        }
        let sql = format!(
            r#"UPDATE "{table}" SET {} WHERE "id" = ${}"#,
            assignments.join(", "),
            updates.len() + 1
        );

        let mut query = sqlx::query(&sql);
        for update in updates {
            query = match &update.value {
                FieldValue::Text(text) => query.bind(text.clone()),
                FieldValue::Timestamp(at) => query.bind(*at),
            };
        }
        let result = bind_id!(query, entity.id()).execute(&self.pool).await?;

        if result.rows_affected() == 0 {
            return Err(not_found(entity));
        }
        debug!(sql = %sql, "Entity status fields updated");
        Ok(())
    }
}

fn checked_identifier(name: &str) -> WorkflowResult<()> {
    if is_identifier(name) {
        Ok(())
    } else {
        Err(WorkflowError::EntityStore(format!(
            "refusing to use {name:?} as a SQL identifier"
        )))
    }
}

fn not_found(entity: &EntityRef) -> WorkflowError {
    WorkflowError::EntityStore(format!("{entity} not found"))
}

fn text_column(columns: &serde_json::Map<String, Value>, name: &str) -> Option<String> {
    match columns.get(name)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// JSON renders `timestamptz` with an offset and `timestamp` without one
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    raw.parse::<NaiveDateTime>().ok().map(|at| at.and_utc())
}
