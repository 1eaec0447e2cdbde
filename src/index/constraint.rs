//! Vertex uniqueness constraints
//!
//! Each registered (label, key) pair owns the set of vertices it tracks.
//! The graph checks a candidate value against that set instead of scanning
//! every vertex with the label.

use crate::graph::{Label, VertexId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Key for identifying a uniqueness constraint
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConstraintKey {
    pub label: Label,
    pub key: String,
}

impl ConstraintKey {
    pub fn new(label: impl Into<Label>, key: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            key: key.into(),
        }
    }
}

/// Registered constraints, in registration order
#[derive(Debug, Clone, Default)]
pub struct ConstraintTable {
    constraints: IndexMap<Label, IndexMap<String, BTreeSet<VertexId>>>,
}

impl ConstraintTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constraint. Registering it again starts a fresh, empty
    /// tracked set; vertices that already exist are not checked.
    pub fn add(&mut self, label: Label, key: String) {
        self.constraints
            .entry(label)
            .or_default()
            .insert(key, BTreeSet::new());
    }

    pub fn has(&self, label: &str, key: &str) -> bool {
        self.constraints
            .get(label)
            .is_some_and(|keys| keys.contains_key(key))
    }

    /// Constrained keys on `label` with the vertices each one tracks
    pub fn keys_for<'a>(
        &'a self,
        label: &str,
    ) -> impl Iterator<Item = (&'a String, &'a BTreeSet<VertexId>)> + 'a {
        self.constraints
            .get(label)
            .into_iter()
            .flat_map(|keys| keys.iter())
    }

    pub fn tracked(&self, label: &str, key: &str) -> Option<&BTreeSet<VertexId>> {
        self.constraints.get(label).and_then(|keys| keys.get(key))
    }

    /// Start tracking `vertex` under (label, key). No-op if unconstrained.
    pub fn track(&mut self, label: &str, key: &str, vertex: VertexId) {
        if let Some(ids) = self
            .constraints
            .get_mut(label)
            .and_then(|keys| keys.get_mut(key))
        {
            ids.insert(vertex);
        }
    }

    /// Drop `vertex` from every constraint on its label
    pub fn untrack(&mut self, label: &str, vertex: VertexId) {
        if let Some(keys) = self.constraints.get_mut(label) {
            for ids in keys.values_mut() {
                ids.remove(&vertex);
            }
        }
    }

    /// Every registered constraint, in registration order
    pub fn list(&self) -> Vec<ConstraintKey> {
        self.constraints
            .iter()
            .flat_map(|(label, keys)| {
                keys.keys().map(move |key| ConstraintKey {
                    label: label.clone(),
                    key: key.clone(),
                })
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.values().all(|keys| keys.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_track() {
        let mut table = ConstraintTable::new();
        assert!(table.is_empty());

        table.add(Label::new("Person"), "email".to_string());
        assert!(table.has("Person", "email"));
        assert!(!table.has("Person", "name"));
        assert!(!table.has("Company", "email"));

        table.track("Person", "email", VertexId::new(3));
        table.track("Person", "name", VertexId::new(3));
        assert_eq!(table.tracked("Person", "email").unwrap().len(), 1);
        assert!(table.tracked("Person", "name").is_none());
    }

    #[test]
    fn test_reregistration_resets_tracked_set() {
        let mut table = ConstraintTable::new();
        table.add(Label::new("Person"), "email".to_string());
        table.track("Person", "email", VertexId::new(1));

        table.add(Label::new("Person"), "email".to_string());
        assert!(table.tracked("Person", "email").unwrap().is_empty());
        assert_eq!(table.list().len(), 1);
    }

    #[test]
    fn test_untrack_covers_every_key() {
        let mut table = ConstraintTable::new();
        table.add(Label::new("Person"), "email".to_string());
        table.add(Label::new("Person"), "ssn".to_string());
        table.track("Person", "email", VertexId::new(1));
        table.track("Person", "ssn", VertexId::new(1));

        table.untrack("Person", VertexId::new(1));
        assert!(table.keys_for("Person").all(|(_, ids)| ids.is_empty()));
    }

    #[test]
    fn test_list_keeps_registration_order() {
        let mut table = ConstraintTable::new();
        table.add(Label::new("Person"), "email".to_string());
        table.add(Label::new("Company"), "vat".to_string());
        table.add(Label::new("Person"), "ssn".to_string());

        assert_eq!(
            table.list(),
            vec![
                ConstraintKey::new("Person", "email"),
                ConstraintKey::new("Person", "ssn"),
                ConstraintKey::new("Company", "vat"),
            ]
        );
    }
}
