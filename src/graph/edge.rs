//! Edge implementation for the property graph
//!
//! Edges are directed from `head` to `tail`. At most one edge may exist per
//! (head, label, tail) triple; the graph enforces that, not the edge.

use super::property::{PropertyMap, PropertyValue};
use super::types::{EdgeId, Label, VertexId};

/// A directed edge in the property graph
#[derive(Debug, Clone)]
pub struct Edge {
    id: EdgeId,
    head: VertexId,
    tail: VertexId,
    label: Label,
    properties: PropertyMap,
}

impl Edge {
    pub(crate) fn new(
        id: EdgeId,
        head: VertexId,
        label: impl Into<Label>,
        tail: VertexId,
        properties: PropertyMap,
    ) -> Self {
        Edge {
            id,
            head,
            tail,
            label: label.into(),
            properties,
        }
    }

    pub fn id(&self) -> EdgeId {
        self.id
    }

    /// Vertex the edge leaves from
    pub fn head(&self) -> VertexId {
        self.head
    }

    /// Vertex the edge points at
    pub fn tail(&self) -> VertexId {
        self.tail
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

    /// The endpoint opposite `vertex`, if `vertex` is one of the endpoints
    pub fn other_end(&self, vertex: VertexId) -> Option<VertexId> {
        if vertex == self.head {
            Some(self.tail)
        } else if vertex == self.tail {
            Some(self.head)
        } else {
            None
        }
    }

    /// Check if this edge goes FROM a specific vertex
    pub fn starts_from(&self, vertex: VertexId) -> bool {
        self.head == vertex
    }

    /// Check if this edge goes TO a specific vertex
    pub fn ends_at(&self, vertex: VertexId) -> bool {
        self.tail == vertex
    }

    pub(crate) fn properties_mut(&mut self) -> &mut PropertyMap {
        &mut self.properties
    }
}

impl PartialEq for Edge {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Edge {}

impl std::hash::Hash for Edge {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
