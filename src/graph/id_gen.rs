//! Identity allocation for vertices and edges
//!
//! Two independent counters, both starting at 0. Freed identities are never
//! handed out again.

use super::types::{EdgeId, VertexId};
use serde::{Deserialize, Serialize};

/// Next identities each counter would hand out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IdWatermark {
    pub next_vertex_id: u64,
    pub next_edge_id: u64,
}

#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    next_vertex: u64,
    next_edge: u64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_vertex_id(&mut self) -> VertexId {
        let id = VertexId::new(self.next_vertex);
        self.next_vertex += 1;
        id
    }

    pub fn next_edge_id(&mut self) -> EdgeId {
        let id = EdgeId::new(self.next_edge);
        self.next_edge += 1;
        id
    }

    /// Record an identity that was assigned elsewhere (reload from disk).
    /// The counter moves past it and never moves backwards.
    pub fn observe_vertex_id(&mut self, id: VertexId) {
        self.next_vertex = self.next_vertex.max(id.as_u64().saturating_add(1));
    }

    pub fn observe_edge_id(&mut self, id: EdgeId) {
        self.next_edge = self.next_edge.max(id.as_u64().saturating_add(1));
    }

    /// Raise both counters to at least the given watermark
    pub fn raise_to(&mut self, watermark: IdWatermark) {
        self.next_vertex = self.next_vertex.max(watermark.next_vertex_id);
        self.next_edge = self.next_edge.max(watermark.next_edge_id);
    }

    pub fn watermark(&self) -> IdWatermark {
        IdWatermark {
            next_vertex_id: self.next_vertex,
            next_edge_id: self.next_edge,
        }
    }
}
