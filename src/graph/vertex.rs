//! Vertex implementation for the property graph

use super::property::{PropertyMap, PropertyValue};
use super::types::{EdgeId, Label, VertexId};
use std::collections::BTreeSet;

/// A vertex in the property graph
///
/// Vertices have:
/// - A unique ID, assigned by the owning graph
/// - A single immutable label
/// - Properties (key-value pairs of scalars)
/// - Incoming and outgoing adjacency sets holding edge ids
///
/// Only the graph creates vertices and mutates their properties or
/// adjacency, so every field is read through accessors.
#[derive(Debug, Clone)]
pub struct Vertex {
    id: VertexId,
    label: Label,
    properties: PropertyMap,
    in_edges: BTreeSet<EdgeId>,
    out_edges: BTreeSet<EdgeId>,
}

impl Vertex {
    pub(crate) fn new(id: VertexId, label: impl Into<Label>, properties: PropertyMap) -> Self {
        Vertex {
            id,
            label: label.into(),
            properties,
            in_edges: BTreeSet::new(),
            out_edges: BTreeSet::new(),
        }
    }

    pub fn id(&self) -> VertexId {
        self.id
    }

    pub fn label(&self) -> &Label {
        &self.label
    }

    pub fn properties(&self) -> &PropertyMap {
        &self.properties
    }

    /// Get a property value
    pub fn get_property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    /// Check if property exists
    pub fn has_property(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    /// Ids of edges pointing at this vertex
    pub fn in_edges(&self) -> &BTreeSet<EdgeId> {
        &self.in_edges
    }

    /// Ids of edges leaving this vertex
    pub fn out_edges(&self) -> &BTreeSet<EdgeId> {
        &self.out_edges
    }

    /// Ids of every incident edge
    pub fn both_edges(&self) -> BTreeSet<EdgeId> {
        self.in_edges.union(&self.out_edges).copied().collect()
    }

    /// True while any edge still references this vertex
    pub fn is_bound(&self) -> bool {
        !self.in_edges.is_empty() || !self.out_edges.is_empty()
    }

    pub(crate) fn properties_mut(&mut self) -> &mut PropertyMap {
        &mut self.properties
    }

    pub(crate) fn attach_in_edge(&mut self, edge: EdgeId) {
        self.in_edges.insert(edge);
    }

    pub(crate) fn attach_out_edge(&mut self, edge: EdgeId) {
        self.out_edges.insert(edge);
    }

    /// Detach an edge from both adjacency sets (self-loops live in both)
    pub(crate) fn detach_edge(&mut self, edge: EdgeId) {
        self.in_edges.remove(&edge);
        self.out_edges.remove(&edge);
    }
}

impl PartialEq for Vertex {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Vertex {}

impl std::hash::Hash for Vertex {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::property::property_map;

    #[test]
    fn test_create_vertex() {
        let vertex = Vertex::new(VertexId::new(1), "Person", property_map([("name", "Alice")]));
        assert_eq!(vertex.id(), VertexId::new(1));
        assert_eq!(vertex.label().as_str(), "Person");
        assert_eq!(vertex.get_property("name").unwrap().as_string(), Some("Alice"));
        assert!(!vertex.has_property("age"));
        assert!(!vertex.is_bound());
    }

    #[test]
    fn test_adjacency() {
        let mut vertex = Vertex::new(VertexId::new(2), "Person", PropertyMap::new());
        vertex.attach_out_edge(EdgeId::new(10));
        vertex.attach_in_edge(EdgeId::new(11));
        assert!(vertex.is_bound());
        assert_eq!(vertex.both_edges().len(), 2);

        vertex.detach_edge(EdgeId::new(10));
        assert!(vertex.out_edges().is_empty());
        assert_eq!(vertex.in_edges().len(), 1);

        vertex.detach_edge(EdgeId::new(11));
        assert!(!vertex.is_bound());
    }

    #[test]
    fn test_vertex_equality() {
        let v1 = Vertex::new(VertexId::new(7), "Person", PropertyMap::new());
        let v2 = Vertex::new(VertexId::new(7), "Company", PropertyMap::new());
        let v3 = Vertex::new(VertexId::new(8), "Person", PropertyMap::new());

        assert_eq!(v1, v2);
        assert_ne!(v1, v3);
    }
}
