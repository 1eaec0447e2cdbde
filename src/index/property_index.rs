//! Hash-based property index for exact-match lookups
//!
//! One `PropertyIndex` covers one property key across every entity of a
//! container: value -> ids of the entities currently holding that value.

use crate::graph::PropertyValue;
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;

/// Index for a specific property key
#[derive(Debug, Clone)]
pub struct PropertyIndex<I> {
    /// Value -> Set of entity ids
    index: FxHashMap<PropertyValue, BTreeSet<I>>,
}

impl<I: Ord + Copy> PropertyIndex<I> {
    pub fn new() -> Self {
        Self {
            index: FxHashMap::default(),
        }
    }

    pub fn insert(&mut self, value: PropertyValue, id: I) {
        self.index.entry(value).or_default().insert(id);
    }

    pub fn remove(&mut self, value: &PropertyValue, id: I) {
        if let Some(ids) = self.index.get_mut(value) {
            ids.remove(&id);
            if ids.is_empty() {
                self.index.remove(value);
            }
        }
    }

    /// Ids holding exactly `value`, if any
    pub fn get(&self, value: &PropertyValue) -> Option<&BTreeSet<I>> {
        self.index.get(value)
    }

    /// Number of distinct values indexed
    pub fn cardinality(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

impl<I: Ord + Copy> Default for PropertyIndex<I> {
    fn default() -> Self {
        Self::new()
    }
}
