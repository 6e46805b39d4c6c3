use crate::entity::EntityRef;
use crate::state_machine::StatusNamespace;
use async_trait::async_trait;

/// How the caller's action ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Succeeded,
    Failed { message: String },
}

/// Passed to the pre-transition hook right before the status write that
/// follows an action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookContext {
    pub entity: EntityRef,
    pub namespace: StatusNamespace,
    /// Status the request was heading for
    pub target: String,
    pub outcome: ActionOutcome,
}

impl HookContext {
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, ActionOutcome::Succeeded)
    }
}

/// Global callback run once per action execution, successful or failed,
/// before the corresponding status write. Runs while the lease is held.
#[async_trait]
pub trait PreTransitionHook: Send + Sync {
    async fn before_transition(&self, context: &HookContext);
}

#[async_trait]
impl<F> PreTransitionHook for F
where
    F: Fn(&HookContext) + Send + Sync,
{
    async fn before_transition(&self, context: &HookContext) {
        self(context)
    }
}
