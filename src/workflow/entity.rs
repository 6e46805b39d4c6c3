use super::coordinator::StatusWorkflow;
use super::request::TransitionRequest;
use crate::entity::EntityRef;
use crate::error::{TransitionError, WorkflowResult};
use crate::state_machine::StatusNamespace;
use std::fmt::{Debug, Display};
use std::future::Future;

/// One entity bound to its workflow.
///
/// ```rust,no_run
/// # use status_workflow::workflow::{StatusWorkflow, TransitionRequest};
/// # async fn feed(pets: &StatusWorkflow) -> status_workflow::WorkflowResult<()> {
/// let pet = pets.entity(42_i64);
/// pet.enter("awake").await?;
/// pet.enter(TransitionRequest::to("fed").via("feeding")).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct WorkflowEntity<'a> {
    workflow: &'a StatusWorkflow,
    entity: EntityRef,
}

impl<'a> WorkflowEntity<'a> {
    pub(crate) fn new(workflow: &'a StatusWorkflow, entity: EntityRef) -> Self {
        Self { workflow, entity }
    }

    pub fn entity(&self) -> &EntityRef {
        &self.entity
    }

    pub async fn enter(&self, request: impl Into<TransitionRequest>) -> WorkflowResult<()> {
        self.workflow.transition(&self.entity, request).await
    }

    /// Shorthand for `enter(TransitionRequest::to(target).via(intermediate))`
    pub async fn enter_via(&self, intermediate: &str, target: &str) -> WorkflowResult<()> {
        self.enter(TransitionRequest::to(target).via(intermediate))
            .await
    }

    pub async fn enter_with<T, E, F, Fut>(
        &self,
        request: impl Into<TransitionRequest>,
        action: F,
    ) -> Result<T, TransitionError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display + Debug,
    {
        self.workflow
            .transition_with(&self.entity, request, action)
            .await
    }

    pub async fn enter_if_possible(
        &self,
        request: impl Into<TransitionRequest>,
    ) -> WorkflowResult<bool> {
        self.workflow.enter_if_possible(&self.entity, request).await
    }

    /// Default namespace
    pub async fn can_enter(&self, target: &str) -> WorkflowResult<bool> {
        self.workflow
            .can_enter(&self.entity, &StatusNamespace::default(), target)
            .await
    }

    pub async fn can_enter_in(
        &self,
        namespace: &StatusNamespace,
        target: &str,
    ) -> WorkflowResult<bool> {
        self.workflow.can_enter(&self.entity, namespace, target).await
    }

    /// Default namespace
    pub async fn status(&self) -> WorkflowResult<Option<String>> {
        self.workflow
            .current_status(&self.entity, &StatusNamespace::default())
            .await
    }

    pub async fn status_in(&self, namespace: &StatusNamespace) -> WorkflowResult<Option<String>> {
        self.workflow.current_status(&self.entity, namespace).await
    }
}
