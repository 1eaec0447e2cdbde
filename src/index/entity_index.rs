//! Indexed entity container
//!
//! `EntityIndex` owns every vertex (or every edge) of a graph keyed by
//! identity and keeps two secondary indices in step with it:
//! - label -> ids
//! - property key -> value -> ids
//!
//! `filter` intersects those sets, starting from the smallest, so a lookup
//! never scans entities that cannot match. Property changes must go through
//! `update_index` before the stored map changes; `apply_properties` does both
//! in that order.

use super::property_index::PropertyIndex;
use crate::graph::{
    Edge, EdgeId, EntityId, GraphError, GraphResult, Label, PropertyMap, PropertyValue, Vertex,
    VertexId,
};
use rustc_hash::FxHashMap;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;
use std::hash::Hash;

/// Anything an `EntityIndex` can hold
pub trait Entity {
    type Id: Copy + Ord + Hash + Debug + Into<EntityId>;

    fn entity_id(&self) -> Self::Id;
    fn entity_label(&self) -> &Label;
    fn entity_properties(&self) -> &PropertyMap;
    fn entity_properties_mut(&mut self) -> &mut PropertyMap;
}

impl Entity for Vertex {
    type Id = VertexId;

    fn entity_id(&self) -> VertexId {
        self.id()
    }

    fn entity_label(&self) -> &Label {
        self.label()
    }

    fn entity_properties(&self) -> &PropertyMap {
        self.properties()
    }

    fn entity_properties_mut(&mut self) -> &mut PropertyMap {
        self.properties_mut()
    }
}

impl Entity for Edge {
    type Id = EdgeId;

    fn entity_id(&self) -> EdgeId {
        self.id()
    }

    fn entity_label(&self) -> &Label {
        self.label()
    }

    fn entity_properties(&self) -> &PropertyMap {
        self.properties()
    }

    fn entity_properties_mut(&mut self) -> &mut PropertyMap {
        self.properties_mut()
    }
}

#[derive(Debug, Clone)]
pub struct EntityIndex<E: Entity> {
    entities: BTreeMap<E::Id, E>,
    labels: FxHashMap<Label, BTreeSet<E::Id>>,
    properties: FxHashMap<String, PropertyIndex<E::Id>>,
}

impl<E: Entity> EntityIndex<E> {
    pub fn new() -> Self {
        Self {
            entities: BTreeMap::new(),
            labels: FxHashMap::default(),
            properties: FxHashMap::default(),
        }
    }

    /// Insert an entity. Fails if its identity is already taken.
    pub fn add(&mut self, entity: E) -> GraphResult<()> {
        let id = entity.entity_id();
        if self.entities.contains_key(&id) {
            return Err(GraphError::DuplicateEntity(id.into()));
        }

        self.labels
            .entry(entity.entity_label().clone())
            .or_default()
            .insert(id);
        for (key, value) in entity.entity_properties() {
            self.properties
                .entry(key.clone())
                .or_default()
                .insert(value.clone(), id);
        }

        self.entities.insert(id, entity);
        Ok(())
    }

    /// Remove an entity by identity, returning it. Removing an absent
    /// entity is an error, not a no-op.
    pub fn remove(&mut self, id: E::Id) -> GraphResult<E> {
        let entity = self
            .entities
            .remove(&id)
            .ok_or_else(|| GraphError::NotFound(id.into()))?;

        let label = entity.entity_label();
        if let Some(ids) = self.labels.get_mut(label) {
            ids.remove(&id);
            if ids.is_empty() {
                self.labels.remove(label);
            }
        }
        for (key, value) in entity.entity_properties() {
            self.unindex_value(key, value, id);
        }

        Ok(entity)
    }

    pub fn get(&self, id: E::Id) -> Option<&E> {
        self.entities.get(&id)
    }

    /// Mutable access for adjacency bookkeeping. Callers must not touch the
    /// property map through this; use `apply_properties`.
    pub(crate) fn get_mut(&mut self, id: E::Id) -> Option<&mut E> {
        self.entities.get_mut(&id)
    }

    pub fn contains(&self, id: E::Id) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Entities in ascending identity order
    pub fn iter(&self) -> impl Iterator<Item = &E> {
        self.entities.values()
    }

    /// Every entity whose label matches (any label when `None`) and whose
    /// properties contain every predicate key with an exactly equal value.
    /// Results come back in ascending identity order.
    pub fn filter(&self, label: Option<&str>, predicates: &PropertyMap) -> Vec<&E> {
        let mut candidates: Vec<&BTreeSet<E::Id>> = Vec::with_capacity(predicates.len() + 1);

        if let Some(label) = label {
            match self.labels.get(label) {
                Some(ids) => candidates.push(ids),
                None => return Vec::new(),
            }
        }
        for (key, value) in predicates {
            match self.properties.get(key).and_then(|index| index.get(value)) {
                Some(ids) => candidates.push(ids),
                None => return Vec::new(),
            }
        }

        if candidates.is_empty() {
            return self.entities.values().collect();
        }

        candidates.sort_by_key(|ids| ids.len());
        let (smallest, rest) = candidates.split_at(1);
        smallest[0]
            .iter()
            .filter(|id| rest.iter().all(|ids| ids.contains(id)))
            .filter_map(|id| self.entities.get(id))
            .collect()
    }

    /// Re-point the property index at `new_properties` before the entity's
    /// map is changed. Keys not mentioned keep their current entries.
    pub fn update_index(&mut self, id: E::Id, new_properties: &PropertyMap) -> GraphResult<()> {
        let entity = self
            .entities
            .get(&id)
            .ok_or_else(|| GraphError::NotFound(id.into()))?;

        let changes: Vec<_> = new_properties
            .iter()
            .filter_map(|(key, value)| match entity.entity_properties().get(key) {
                Some(old) if old == value => None,
                old => Some((key, old.cloned(), value)),
            })
            .collect();

        for (key, old, value) in changes {
            if let Some(old) = old {
                self.unindex_value(key, &old, id);
            }
            self.properties
                .entry(key.clone())
                .or_default()
                .insert(value.clone(), id);
        }
        Ok(())
    }

    /// Reindex, then merge `new_properties` into the entity's map.
    pub fn apply_properties(&mut self, id: E::Id, new_properties: PropertyMap) -> GraphResult<()> {
        self.update_index(id, &new_properties)?;
        if let Some(entity) = self.entities.get_mut(&id) {
            entity.entity_properties_mut().extend(new_properties);
        }
        Ok(())
    }

    fn unindex_value(&mut self, key: &str, value: &PropertyValue, id: E::Id) {
        if let Some(index) = self.properties.get_mut(key) {
            index.remove(value, id);
            if index.is_empty() {
                self.properties.remove(key);
            }
        }
    }
}

impl<E: Entity> Default for EntityIndex<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, E: Entity> IntoIterator for &'a EntityIndex<E> {
    type Item = &'a E;
    type IntoIter = std::collections::btree_map::Values<'a, E::Id, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.entities.values()
    }
}
