//! Shared fixtures: the pet workflow over in-memory stores.

#![allow(dead_code)]

pub mod strategies;

use async_trait::async_trait;
use status_workflow::config::{LeaseConfig, WorkflowConfig};
use status_workflow::entity::{
    EntityId, EntityRef, EntityStore, FieldUpdate, InMemoryEntityStore, StatusSnapshot,
};
use status_workflow::lease::{InMemoryLockStore, LockStore};
use status_workflow::state_machine::{StatusFields, StatusNamespace, TransitionTable};
use status_workflow::workflow::{PreTransitionHook, StatusWorkflow};
use status_workflow::WorkflowResult;
use std::sync::Arc;
use std::time::Duration;

/// sleep -> awake | feeding, awake -> sleep | run, feeding -> fed, fed -> sleep,
/// plus an initial `sleep` for pets with no status yet
pub fn pet_table() -> TransitionTable {
    TransitionTable::new()
        .allow_initial(["sleep"])
        .allow("sleep", ["awake", "feeding"])
        .allow("awake", ["sleep", "run"])
        .allow("feeding", ["fed"])
        .allow("fed", ["sleep"])
}

pub fn lease_config(
    ttl_ms: u64,
    acquisition_timeout_ms: u64,
    poll_interval_ms: u64,
) -> WorkflowConfig {
    WorkflowConfig {
        lease: LeaseConfig {
            ttl_ms,
            acquisition_timeout_ms,
            poll_interval_ms,
        },
        ..WorkflowConfig::default()
    }
}

pub fn pet(id: i64) -> EntityRef {
    EntityRef::new("Pet", EntityId::Int(id))
}

pub fn lease_key(id: i64) -> String {
    format!("status_workflow/Pet/{id}")
}

/// Entity store that stalls before delegating, like a slow database
#[derive(Debug, Clone, Default)]
pub struct SlowEntityStore {
    pub inner: InMemoryEntityStore,
    pub reload_delay: Duration,
    /// Delay before any update that writes `status` to `slow_status`
    pub slow_status: Option<String>,
    pub update_delay: Duration,
}

impl SlowEntityStore {
    fn delays_update(&self, updates: &[FieldUpdate]) -> bool {
        let Some(slow_status) = self.slow_status.as_deref() else {
            return false;
        };
        updates
            .iter()
            .any(|update| update.field == "status" && update.value.as_text() == Some(slow_status))
    }
}

#[async_trait]
impl EntityStore for SlowEntityStore {
    async fn reload(
        &self,
        entity: &EntityRef,
        fields: &StatusFields,
    ) -> WorkflowResult<StatusSnapshot> {
        tokio::time::sleep(self.reload_delay).await;
        self.inner.reload(entity, fields).await
    }

    async fn read_field(&self, entity: &EntityRef, field: &str) -> WorkflowResult<Option<String>> {
        self.inner.read_field(entity, field).await
    }

    async fn atomic_update(
        &self,
        entity: &EntityRef,
        updates: &[FieldUpdate],
    ) -> WorkflowResult<()> {
        if self.delays_update(updates) {
            tokio::time::sleep(self.update_delay).await;
        }
        self.inner.atomic_update(entity, updates).await
    }
}

/// Lock store whose renewals never answer, like a stalled Redis connection
#[derive(Debug, Clone, Default)]
pub struct StalledRenewalStore {
    pub inner: InMemoryLockStore,
}

#[async_trait]
impl LockStore for StalledRenewalStore {
    async fn set_if_absent(&self, key: &str, ttl: Duration) -> WorkflowResult<bool> {
        self.inner.set_if_absent(key, ttl).await
    }

    async fn expire(&self, _key: &str, _ttl: Duration) -> WorkflowResult<bool> {
        std::future::pending::<WorkflowResult<bool>>().await
    }

    async fn delete(&self, key: &str) -> WorkflowResult<()> {
        self.inner.delete(key).await
    }

    fn store_name(&self) -> &'static str {
        "stalled"
    }
}

pub struct PetHarness {
    pub entities: InMemoryEntityStore,
    pub locks: InMemoryLockStore,
    pub workflow: StatusWorkflow,
}

#[derive(Default)]
struct HarnessOptions {
    config: WorkflowConfig,
    hook: Option<Arc<dyn PreTransitionHook>>,
    namespaces: Vec<(StatusNamespace, TransitionTable)>,
    slow_entities: Option<SlowEntityStore>,
    stalled_renewals: bool,
}

impl PetHarness {
    pub fn new() -> Self {
        Self::build(HarnessOptions::default())
    }

    pub fn with_config(config: WorkflowConfig) -> Self {
        Self::build(HarnessOptions {
            config,
            ..HarnessOptions::default()
        })
    }

    pub fn with_hook(hook: Arc<dyn PreTransitionHook>) -> Self {
        Self::build(HarnessOptions {
            hook: Some(hook),
            ..HarnessOptions::default()
        })
    }

    pub fn with_namespaces(namespaces: Vec<(StatusNamespace, TransitionTable)>) -> Self {
        Self::build(HarnessOptions {
            namespaces,
            ..HarnessOptions::default()
        })
    }

    /// Pets behind a [`SlowEntityStore`]; `entities` still sees every write
    pub fn with_slow_entities(
        reload_delay: Duration,
        slow_status: Option<&str>,
        update_delay: Duration,
    ) -> Self {
        Self::build(HarnessOptions {
            slow_entities: Some(SlowEntityStore {
                inner: InMemoryEntityStore::new(),
                reload_delay,
                slow_status: slow_status.map(str::to_string),
                update_delay,
            }),
            ..HarnessOptions::default()
        })
    }

    /// Leases behind a [`StalledRenewalStore`]; `locks` still holds the keys
    pub fn with_stalled_renewals() -> Self {
        Self::build(HarnessOptions {
            stalled_renewals: true,
            ..HarnessOptions::default()
        })
    }

    fn build(options: HarnessOptions) -> Self {
        status_workflow::init_structured_logging();
        let HarnessOptions {
            config,
            hook,
            namespaces,
            slow_entities,
            stalled_renewals,
        } = options;

        let (entities, entity_store): (InMemoryEntityStore, Arc<dyn EntityStore>) =
            match slow_entities {
                Some(slow) => (slow.inner.clone(), Arc::new(slow)),
                None => {
                    let entities = InMemoryEntityStore::new();
                    (entities.clone(), Arc::new(entities))
                }
            };
        let locks = InMemoryLockStore::new();
        let lock_store: Arc<dyn LockStore> = if stalled_renewals {
            Arc::new(StalledRenewalStore {
                inner: locks.clone(),
            })
        } else {
            Arc::new(locks.clone())
        };

        let mut builder = StatusWorkflow::builder("Pet")
            .workflow(pet_table())
            .config(config)
            .lock_store(lock_store)
            .entity_store(entity_store);
        for (namespace, table) in namespaces {
            builder = builder.namespace(namespace, table);
        }
        if let Some(hook) = hook {
            builder = builder.hook(hook);
        }

        Self {
            entities,
            locks,
            workflow: builder.build().expect("pet workflow should build"),
        }
    }

    /// Insert pet `id` with the given default-namespace status
    pub fn insert_pet(&self, id: i64, status: Option<&str>) -> EntityRef {
        let entity = pet(id);
        self.entities.insert(entity.clone(), status);
        entity
    }

    pub fn status(&self, entity: &EntityRef) -> Option<String> {
        self.entities.text_field(entity, "status")
    }

    pub fn error(&self, entity: &EntityRef) -> Option<String> {
        self.entities.text_field(entity, "status_error")
    }

    /// Every status written to the default namespace, oldest first
    pub fn status_history(&self, entity: &EntityRef) -> Vec<String> {
        self.entities
            .field_history(entity, "status")
            .into_iter()
            .filter_map(|value| value.as_text().map(str::to_string))
            .collect()
    }
}
