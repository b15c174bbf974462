//! Relationship Registry - Explicit relation name to accessor mapping
//!
//! Each fillable model builds one registry when its type is first used
//! (typically in a `once_cell::sync::Lazy`) and hands it out for the
//! lifetime of the program.

use std::fmt;

use super::traits::Relation;

/// Resolves a relation handle from its owning record
pub type RelationAccessor<M> = fn(&M) -> Relation;

/// Ordered registry of the relation accessors a model exposes
pub struct RelationRegistry<M> {
    accessors: Vec<(String, RelationAccessor<M>)>,
}

impl<M> Default for RelationRegistry<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> RelationRegistry<M> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            accessors: Vec::new(),
        }
    }

    /// Register an accessor under `name`, replacing any previous one
    pub fn register(mut self, name: &str, accessor: RelationAccessor<M>) -> Self {
        match self.accessors.iter_mut().find(|(existing, _)| existing == name) {
            Some(entry) => entry.1 = accessor,
            None => self.accessors.push((name.to_string(), accessor)),
        }
        self
    }

    /// Get the accessor registered under `name`
    pub fn get(&self, name: &str) -> Option<RelationAccessor<M>> {
        self.accessors
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, accessor)| *accessor)
    }

    /// Check if an accessor is registered under `name`
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Resolve the relation named `name` for `owner`
    pub fn resolve(&self, owner: &M, name: &str) -> Option<Relation> {
        self.get(name).map(|accessor| accessor(owner))
    }

    /// Registered relation names in registration order
    pub fn names(&self) -> Vec<&str> {
        self.accessors.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.accessors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accessors.is_empty()
    }
}

impl<M> fmt::Debug for RelationRegistry<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelationRegistry")
            .field("relations", &self.names())
            .finish()
    }
}
