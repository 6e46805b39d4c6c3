//! # Transition Coordinator
//!
//! [`StatusWorkflow`] runs every status change of one entity type under an
//! exclusive lease keyed by `(entity, namespace)`:
//!
//! 1. acquire the lease (poll until the acquisition timeout)
//! 2. reload the entity and validate the first status against the table
//! 3. optionally enter the intermediate status
//! 4. run the caller's action with a heartbeat renewing the lease
//! 5. re-validate and write the final status
//! 6. release the lease, whatever happened above
//!
//! A freshness check guards every write. When the action fails the entity is
//! parked in `<current>_error` with a rendered failure and the original error
//! is handed back to the caller. Panics get the same bookkeeping before they
//! resume unwinding.
//!
//! Dropping a transition future part way leaves the lease to expire on its
//! own after one TTL.

use super::entity::WorkflowEntity;
use super::failure;
use super::hook::{ActionOutcome, HookContext, PreTransitionHook};
use super::request::TransitionRequest;
use crate::config::WorkflowConfig;
use crate::entity::{EntityAccessor, EntityId, EntityRef, EntityStore};
use crate::error::{TransitionError, WorkflowError, WorkflowResult};
use crate::lease::{Heartbeat, LeaseHandle, LeaseKey, LeaseManager, LockStore};
use crate::state_machine::{StateMachineDefinition, StatusNamespace, TransitionTable};
use chrono::Utc;
use futures::FutureExt;
use std::any::Any;
use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt::{self, Debug, Display};
use std::future::{ready, Future, Ready};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

type NoAction = fn() -> Ready<Result<(), Infallible>>;

/// How the locked section ended when it did not return a value
enum Interrupted<E> {
    Failed(TransitionError<E>),
    Panicked(Box<dyn Any + Send>),
}

impl<E> From<WorkflowError> for Interrupted<E> {
    fn from(err: WorkflowError) -> Self {
        Self::Failed(TransitionError::Workflow(err))
    }
}

/// Lease-protected status workflow for one entity type
#[derive(Clone)]
pub struct StatusWorkflow {
    entity_type: String,
    key_prefix: String,
    definitions: Arc<HashMap<StatusNamespace, StateMachineDefinition>>,
    entities: Arc<dyn EntityStore>,
    leases: LeaseManager,
    hook: Option<Arc<dyn PreTransitionHook>>,
}

impl Debug for StatusWorkflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusWorkflow")
            .field("entity_type", &self.entity_type)
            .field("key_prefix", &self.key_prefix)
            .field("namespaces", &self.definitions.keys().collect::<Vec<_>>())
            .field("leases", &self.leases)
            .field("hook", &self.hook.is_some())
            .finish()
    }
}

impl StatusWorkflow {
    pub fn builder(entity_type: impl Into<String>) -> StatusWorkflowBuilder {
        StatusWorkflowBuilder::new(entity_type)
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    pub fn leases(&self) -> &LeaseManager {
        &self.leases
    }

    /// Registered namespaces, default first when present
    pub fn namespaces(&self) -> Vec<&StatusNamespace> {
        let mut namespaces: Vec<_> = self.definitions.keys().collect();
        namespaces.sort();
        namespaces
    }

    pub fn definition(
        &self,
        namespace: &StatusNamespace,
    ) -> WorkflowResult<&StateMachineDefinition> {
        self.definitions
            .get(namespace)
            .ok_or_else(|| WorkflowError::UnknownNamespace(namespace.to_string()))
    }

    /// Handle for one entity of this workflow's type
    pub fn entity(&self, id: impl Into<EntityId>) -> WorkflowEntity<'_> {
        WorkflowEntity::new(self, EntityRef::new(self.entity_type.clone(), id))
    }

    /// Status currently stored for `entity` in `namespace`; no lease taken
    pub async fn current_status(
        &self,
        entity: &EntityRef,
        namespace: &StatusNamespace,
    ) -> WorkflowResult<Option<String>> {
        self.definition(namespace)?;
        self.accessor(entity, namespace).current_status().await
    }

    /// Whether `target` is reachable from the stored status right now.
    ///
    /// Advisory only: another process may move the entity before a
    /// subsequent transition takes the lease.
    pub async fn can_enter(
        &self,
        entity: &EntityRef,
        namespace: &StatusNamespace,
        target: &str,
    ) -> WorkflowResult<bool> {
        let definition = self.definition(namespace)?;
        let current = self.accessor(entity, namespace).current_status().await?;
        Ok(definition.is_allowed(target.trim(), current.as_deref()))
    }

    /// Move `entity` to the requested status with no action in between
    pub async fn transition(
        &self,
        entity: &EntityRef,
        request: impl Into<TransitionRequest>,
    ) -> WorkflowResult<()> {
        let no_action: NoAction = || ready(Ok(()));
        self.run(entity, request.into(), no_action, false)
            .await
            .map_err(WorkflowError::from)
    }

    /// Move `entity` to the requested status, running `action` under the
    /// lease once the first status has been validated (and written, when the
    /// request goes through an intermediate status)
    pub async fn transition_with<T, E, F, Fut>(
        &self,
        entity: &EntityRef,
        request: impl Into<TransitionRequest>,
        action: F,
    ) -> Result<T, TransitionError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display + Debug,
    {
        self.run(entity, request.into(), action, true).await
    }

    /// Like [`transition`](Self::transition), reporting a disallowed
    /// transition as `Ok(false)` instead of an error
    pub async fn enter_if_possible(
        &self,
        entity: &EntityRef,
        request: impl Into<TransitionRequest>,
    ) -> WorkflowResult<bool> {
        match self.transition(entity, request).await {
            Ok(()) => Ok(true),
            Err(e) if e.is_invalid_transition() => {
                debug!(entity = %entity, error = %e, "Transition not possible");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Like [`transition_with`](Self::transition_with), yielding `Ok(None)`
    /// when the transition is disallowed
    pub async fn transition_with_if_possible<T, E, F, Fut>(
        &self,
        entity: &EntityRef,
        request: impl Into<TransitionRequest>,
        action: F,
    ) -> Result<Option<T>, TransitionError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display + Debug,
    {
        match self.transition_with(entity, request, action).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_invalid_transition() => {
                debug!(entity = %entity, error = %e, "Transition not possible");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn accessor(&self, entity: &EntityRef, namespace: &StatusNamespace) -> EntityAccessor {
        EntityAccessor::new(Arc::clone(&self.entities), entity.clone(), namespace)
    }

    /// Lease acquisition, the locked section and the unconditional release.
    ///
    /// `supervised` is false for plain transitions: the no-op action runs
    /// without a heartbeat and without the hook.
    #[instrument(
        skip_all,
        fields(
            entity = %entity,
            namespace = %request.namespace(),
            to = request.target(),
            via = request.intermediate(),
        )
    )]
    async fn run<T, E, F, Fut>(
        &self,
        entity: &EntityRef,
        request: TransitionRequest,
        action: F,
        supervised: bool,
    ) -> Result<T, TransitionError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display + Debug,
    {
        let definition = self.definition(request.namespace())?;
        let accessor = self.accessor(entity, request.namespace());
        let key = LeaseKey::new(&self.key_prefix, entity, request.namespace());
        let lease = self.leases.acquire(key).await?;

        let outcome = self
            .run_locked(&lease, definition, &accessor, &request, action, supervised)
            .await;

        let freshness = self.leases.assert_fresh(&lease);
        let released = self.leases.release(&lease).await;

        match outcome {
            Ok(value) => {
                freshness?;
                released?;
                info!(status = request.target(), "Transition complete");
                Ok(value)
            }
            Err(interrupted) => {
                if let Err(e) = freshness {
                    warn!(error = %e, "Lease went stale before the failed transition finished");
                }
                if let Err(e) = released {
                    warn!(error = %e, "Failed to release lease after failed transition");
                }
                match interrupted {
                    Interrupted::Failed(err) => Err(err),
                    Interrupted::Panicked(payload) => std::panic::resume_unwind(payload),
                }
            }
        }
    }

    async fn run_locked<T, E, F, Fut>(
        &self,
        lease: &LeaseHandle,
        definition: &StateMachineDefinition,
        accessor: &EntityAccessor,
        request: &TransitionRequest,
        action: F,
        supervised: bool,
    ) -> Result<T, Interrupted<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display + Debug,
    {
        let snapshot = accessor.reload().await?;
        let first = request.first_status();
        check_allowed(definition, snapshot.status.as_deref(), first)?;
        self.leases.assert_fresh(lease)?;

        if let Some(intermediate) = request.intermediate() {
            accessor.write_status(intermediate, Utc::now()).await?;
            debug!(status = intermediate, "Entered intermediate status");
            self.leases.assert_fresh(lease)?;
        }

        let value = if supervised {
            self.supervise(lease, accessor, request, action).await?
        } else {
            action().await.map_err(|e| Interrupted::Failed(TransitionError::ActionFailed(e)))?
        };

        if let Some(intermediate) = request.intermediate() {
            check_allowed(definition, Some(intermediate), request.target())?;
        }
        if supervised || request.intermediate().is_some() {
            self.leases.assert_fresh(lease)?;
        }

        accessor.write_status(request.target(), Utc::now()).await?;
        Ok(value)
    }

    /// Run the action with the heartbeat going; on failure park the entity in
    /// its error status before handing the failure back
    async fn supervise<T, E, F, Fut>(
        &self,
        lease: &LeaseHandle,
        accessor: &EntityAccessor,
        request: &TransitionRequest,
        action: F,
    ) -> Result<T, Interrupted<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display + Debug,
    {
        let heartbeat = Heartbeat::start(self.leases.clone(), lease.clone());
        let result = AssertUnwindSafe(async move { action().await })
            .catch_unwind()
            .await;
        let renewals = heartbeat.stop().await;
        debug!(renewals, "Action finished");

        match result {
            Ok(Ok(value)) => {
                self.run_hook(accessor, request, ActionOutcome::Succeeded).await;
                Ok(value)
            }
            Ok(Err(err)) => {
                let message = failure::describe_error(&err);
                self.record_failure(accessor, request, message).await;
                Err(Interrupted::Failed(TransitionError::ActionFailed(err)))
            }
            Err(payload) => {
                let message = failure::describe_panic(payload.as_ref());
                self.record_failure(accessor, request, message).await;
                Err(Interrupted::Panicked(payload))
            }
        }
    }

    async fn run_hook(
        &self,
        accessor: &EntityAccessor,
        request: &TransitionRequest,
        outcome: ActionOutcome,
    ) {
        if let Some(hook) = &self.hook {
            let context = HookContext {
                entity: accessor.entity().clone(),
                namespace: request.namespace().clone(),
                target: request.target().to_string(),
                outcome,
            };
            hook.before_transition(&context).await;
        }
    }

    /// Write `<current>_error` plus the rendered failure. A store error here
    /// is logged; the caller still gets the action's own failure.
    async fn record_failure(
        &self,
        accessor: &EntityAccessor,
        request: &TransitionRequest,
        message: String,
    ) {
        error!(failure = %message, "Transition action failed");
        self.run_hook(
            accessor,
            request,
            ActionOutcome::Failed {
                message: message.clone(),
            },
        )
        .await;

        let written = match accessor.current_status().await {
            Ok(current) => accessor.write_error(current.as_deref(), &message, Utc::now()).await,
            Err(e) => Err(e),
        };
        match written {
            Ok(status) => info!(status = %status, "Entity parked in error status"),
            Err(e) => error!(error = %e, "Failed to record transition failure"),
        }
    }
}

fn check_allowed(
    definition: &StateMachineDefinition,
    current: Option<&str>,
    target: &str,
) -> WorkflowResult<()> {
    if definition.is_allowed(target, current) {
        return Ok(());
    }
    Err(WorkflowError::InvalidTransition {
        from: current.map(str::to_string),
        to: target.to_string(),
        expected: definition.expected_sources_label(target),
    })
}

/// Assembles a [`StatusWorkflow`]: tables per namespace, both stores, timing
/// configuration and the optional hook
pub struct StatusWorkflowBuilder {
    entity_type: String,
    tables: Vec<(StatusNamespace, TransitionTable)>,
    lock_store: Option<Arc<dyn LockStore>>,
    entity_store: Option<Arc<dyn EntityStore>>,
    config: WorkflowConfig,
    hook: Option<Arc<dyn PreTransitionHook>>,
}

impl StatusWorkflowBuilder {
    fn new(entity_type: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            tables: Vec::new(),
            lock_store: None,
            entity_store: None,
            config: WorkflowConfig::default(),
            hook: None,
        }
    }

    /// Table for the default namespace
    pub fn workflow(self, table: TransitionTable) -> Self {
        self.namespace(StatusNamespace::default(), table)
    }

    pub fn namespace(mut self, namespace: StatusNamespace, table: TransitionTable) -> Self {
        self.tables.push((namespace, table));
        self
    }

    pub fn lock_store(mut self, store: Arc<dyn LockStore>) -> Self {
        self.lock_store = Some(store);
        self
    }

    pub fn entity_store(mut self, store: Arc<dyn EntityStore>) -> Self {
        self.entity_store = Some(store);
        self
    }

    pub fn config(mut self, config: WorkflowConfig) -> Self {
        self.config = config;
        self
    }

    pub fn hook(mut self, hook: Arc<dyn PreTransitionHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    pub fn build(self) -> WorkflowResult<StatusWorkflow> {
        self.config.validate()?;
        if self.entity_type.trim().is_empty() {
            return Err(WorkflowError::Configuration(
                "entity type must not be blank".to_string(),
            ));
        }
        let lock_store = self.lock_store.ok_or_else(|| {
            WorkflowError::Configuration("a lock store is required".to_string())
        })?;
        let entity_store = self.entity_store.ok_or_else(|| {
            WorkflowError::Configuration("an entity store is required".to_string())
        })?;
        if self.tables.is_empty() {
            return Err(WorkflowError::Configuration(format!(
                "no workflow registered for {}",
                self.entity_type
            )));
        }

        let mut definitions = HashMap::with_capacity(self.tables.len());
        for (namespace, table) in &self.tables {
            let definition = StateMachineDefinition::build(namespace.clone(), table)?;
            if definitions.insert(namespace.clone(), definition).is_some() {
                return Err(WorkflowError::Configuration(format!(
                    "workflow for {} namespace {namespace} registered twice",
                    self.entity_type
                )));
            }
        }

        info!(
            entity_type = %self.entity_type,
            namespaces = definitions.len(),
            lock_store = lock_store.store_name(),
            "Status workflow registered"
        );

        Ok(StatusWorkflow {
            entity_type: self.entity_type,
            key_prefix: self.config.key_prefix.clone(),
            definitions: Arc::new(definitions),
            entities: entity_store,
            leases: LeaseManager::new(lock_store, self.config.lease),
            hook: self.hook,
        })
    }
}
