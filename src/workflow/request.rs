use crate::state_machine::StatusNamespace;

/// What a caller wants to happen to one entity's status.
///
/// ```rust
/// use status_workflow::workflow::TransitionRequest;
///
/// let request = TransitionRequest::to("fed").via("feeding");
/// assert_eq!(request.first_status(), "feeding");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionRequest {
    namespace: StatusNamespace,
    intermediate: Option<String>,
    target: String,
}

impl TransitionRequest {
    /// Enter `target` in the default namespace
    pub fn to(target: impl Into<String>) -> Self {
        Self {
            namespace: StatusNamespace::default(),
            intermediate: None,
            target: target.into().trim().to_string(),
        }
    }

    /// Pass through `intermediate` while the action runs
    pub fn via(mut self, intermediate: impl Into<String>) -> Self {
        self.intermediate = Some(intermediate.into().trim().to_string());
        self
    }

    pub fn in_namespace(mut self, namespace: StatusNamespace) -> Self {
        self.namespace = namespace;
        self
    }

    pub fn namespace(&self) -> &StatusNamespace {
        &self.namespace
    }

    pub fn intermediate(&self) -> Option<&str> {
        self.intermediate.as_deref()
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// The first status the entity will enter
    pub fn first_status(&self) -> &str {
        self.intermediate.as_deref().unwrap_or(&self.target)
    }
}

impl From<&str> for TransitionRequest {
    fn from(target: &str) -> Self {
        Self::to(target)
    }
}

impl From<String> for TransitionRequest {
    fn from(target: String) -> Self {
        Self::to(target)
    }
}
