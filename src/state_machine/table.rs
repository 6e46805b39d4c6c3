use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;

/// Declarative `source -> [targets]` workflow table.
///
/// A `None` source is the unset sentinel: it lets an entity with no status
/// yet enter the listed targets. Identifiers are normalized when the table
/// is compiled into a [`StateMachineDefinition`](super::StateMachineDefinition).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionTable {
    entries: Vec<(Option<String>, Vec<String>)>,
}

impl TransitionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow entering each of `targets` from `source`
    pub fn allow<S, I, T>(mut self, source: S, targets: I) -> Self
    where
        S: AsRef<str>,
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        self.push(Some(source.as_ref().to_string()), targets);
        self
    }

    /// Allow entering each of `targets` when the entity has no status yet
    pub fn allow_initial<I, T>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        self.push(None, targets);
        self
    }

    fn push<I, T>(&mut self, source: Option<String>, targets: I)
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let targets = targets
            .into_iter()
            .map(|t| t.as_ref().to_string())
            .collect();
        self.entries.push((source, targets));
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = (Option<&str>, &[String])> {
        self.entries
            .iter()
            .map(|(source, targets)| (source.as_deref(), targets.as_slice()))
    }
}

/// Tables deserialize from a plain map; the empty-string key stands for
/// the unset source.
impl<'de> Deserialize<'de> for TransitionTable {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = BTreeMap::<String, Vec<String>>::deserialize(deserializer)?;
        let entries = raw
            .into_iter()
            .map(|(source, targets)| {
                let source = Some(source).filter(|s| !s.trim().is_empty());
                (source, targets)
            })
            .collect();
        Ok(Self { entries })
    }
}
