use super::namespace::StatusNamespace;
use super::table::TransitionTable;
use crate::error::DefinitionError;
use std::collections::{BTreeMap, BTreeSet};

/// Immutable transition graph for one namespace.
///
/// Stored inverted: for every status that can be entered, the set of
/// statuses it may be entered from. `None` in a source set is the unset
/// sentinel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateMachineDefinition {
    namespace: StatusNamespace,
    allowed_sources: BTreeMap<String, BTreeSet<Option<String>>>,
    // Sources in first-declared order per target, for error messages
    declared_sources: BTreeMap<String, Vec<Option<String>>>,
}

impl StateMachineDefinition {
    /// Compile a declarative table into a validated definition
    pub fn build(
        namespace: StatusNamespace,
        table: &TransitionTable,
    ) -> Result<Self, DefinitionError> {
        if table.is_empty() {
            return Err(DefinitionError::EmptyTable);
        }

        let mut allowed_sources: BTreeMap<String, BTreeSet<Option<String>>> = BTreeMap::new();
        let mut declared_sources: BTreeMap<String, Vec<Option<String>>> = BTreeMap::new();

        for (source, targets) in table.entries() {
            let source = source.and_then(normalize);
            for target in targets {
                let target = normalize(target).ok_or_else(|| DefinitionError::BlankTarget {
                    from: source.clone(),
                })?;

                if allowed_sources
                    .entry(target.clone())
                    .or_default()
                    .insert(source.clone())
                {
                    declared_sources
                        .entry(target)
                        .or_default()
                        .push(source.clone());
                }
            }
        }

        if allowed_sources.is_empty() {
            // Every source declared an empty target list
            return Err(DefinitionError::EmptyTable);
        }

        Ok(Self {
            namespace,
            allowed_sources,
            declared_sources,
        })
    }

    pub fn namespace(&self) -> &StatusNamespace {
        &self.namespace
    }

    /// True iff `current` is a declared source for `target`
    pub fn is_allowed(&self, target: &str, current: Option<&str>) -> bool {
        let Some(sources) = self.allowed_sources.get(target.trim()) else {
            return false;
        };
        let current = current.and_then(normalize);
        sources.contains(&current)
    }

    pub fn allowed_sources(&self, target: &str) -> Option<&BTreeSet<Option<String>>> {
        self.allowed_sources.get(target.trim())
    }

    /// Every status that can be entered
    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.allowed_sources.keys().map(String::as_str)
    }

    /// Every status named anywhere in the definition
    pub fn statuses(&self) -> BTreeSet<&str> {
        self.allowed_sources
            .iter()
            .flat_map(|(target, sources)| {
                std::iter::once(target.as_str()).chain(sources.iter().flatten().map(String::as_str))
            })
            .collect()
    }

    /// Human-readable source list, e.g. `sleep/run`
    pub fn expected_sources_label(&self, target: &str) -> String {
        match self.declared_sources.get(target.trim()) {
            Some(sources) => sources
                .iter()
                .map(|s| s.as_deref().unwrap_or("nil"))
                .collect::<Vec<_>>()
                .join("/"),
            None => String::new(),
        }
    }
}

/// Canonical form of a status identifier; blank means unset
fn normalize(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
