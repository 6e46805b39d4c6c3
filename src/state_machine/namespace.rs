use crate::error::DefinitionError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one independent status workflow on an entity.
///
/// The default namespace owns the plain `status` field set; a named
/// namespace `alt` owns `alt_status`, `alt_status_changed_at` and
/// `alt_status_error`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusNamespace(Option<String>);

impl StatusNamespace {
    /// The default `status` namespace
    pub const fn default_namespace() -> Self {
        Self(None)
    }

    /// A named namespace, validated as an identifier
    pub fn named(name: impl AsRef<str>) -> Result<Self, DefinitionError> {
        let name = name.as_ref().trim();
        if !is_identifier(name) {
            return Err(DefinitionError::InvalidNamespace(name.to_string()));
        }
        Ok(Self(Some(name.to_string())))
    }

    pub fn name(&self) -> Option<&str> {
        self.0.as_deref()
    }

    pub fn is_default(&self) -> bool {
        self.0.is_none()
    }

    /// Field names this namespace reads and writes on the entity
    pub fn fields(&self) -> StatusFields {
        let prefix = match &self.0 {
            Some(name) => format!("{name}_"),
            None => String::new(),
        };
        StatusFields {
            status: format!("{prefix}status"),
            changed_at: format!("{prefix}status_changed_at"),
            error: format!("{prefix}status_error"),
        }
    }
}

impl fmt::Display for StatusNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_deref().unwrap_or("status"))
    }
}

/// Column/attribute names backing one namespace
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StatusFields {
    pub status: String,
    pub changed_at: String,
    pub error: String,
}

pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}
