//! Parent/child prefix relations.
//!
//! Agent names follow `<Prefix>_<Variant>` (e.g. `Table_01`, `Table_Oak`).
//! Replacing an agent keeps its prefix, so relations are stored between
//! prefixes and resolved back to live agents on demand.

use std::collections::BTreeMap;

use crate::error::ResolutionError;
use crate::Id;

/// Separator between an agent's prefix and its variant suffix.
pub const PREFIX_SEPARATOR: char = '_';

/// Characters before the first separator, or the whole name.
pub fn name_prefix(name: &str) -> &str {
    name.split(PREFIX_SEPARATOR).next().unwrap_or(name)
}

/// Child prefix → parent prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationTable {
    entries: BTreeMap<String, String>,
}

impl RelationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the relation between a child and its parent by name.
    ///
    /// The first recorded parent for a child prefix wins; later records for
    /// the same child prefix are ignored.
    pub fn record(&mut self, child_name: &str, parent_name: &str) {
        self.entries
            .entry(name_prefix(child_name).to_string())
            .or_insert_with(|| name_prefix(parent_name).to_string());
    }

    pub fn parent_prefix_for(&self, child_name: &str) -> Option<&str> {
        self.entries.get(name_prefix(child_name)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Finds the first candidate `(id, name)` whose prefix equals `prefix`.
    pub fn resolve_parent<'a, I>(prefix: &str, candidates: I) -> Result<Id, ResolutionError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        candidates
            .into_iter()
            .find(|(_, name)| name_prefix(name) == prefix)
            .map(|(id, _)| id.to_string())
            .ok_or_else(|| ResolutionError::ParentNotFound(prefix.to_string()))
    }

    /// Resolves a child's parent through the recorded relation.
    pub fn resolve_for_child<'a, I>(&self, child_name: &str, candidates: I) -> Result<Id, ResolutionError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let prefix = self
            .parent_prefix_for(child_name)
            .ok_or_else(|| ResolutionError::UnknownChildPrefix(name_prefix(child_name).to_string()))?;
        Self::resolve_parent(prefix, candidates)
    }
}
