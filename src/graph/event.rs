//! Graph mutation events
//!
//! Every committed mutation is described as a `GraphEvent` and handed to the
//! store's journal, if one is registered. The persistent graph mirrors the
//! events onto disk; an in-memory store has no journal and skips this step.

use super::edge::Edge;
use super::id_gen::IdWatermark;
use super::types::Label;
use super::vertex::Vertex;
use crate::index::ConstraintKey;
use crate::persistence::StorageResult;

/// A committed mutation, borrowed from the store's post-mutation state
#[derive(Debug, Clone, Copy)]
pub enum GraphEvent<'a> {
    ConstraintAdded {
        constraint: &'a ConstraintKey,
        all: &'a [ConstraintKey],
    },
    VertexCreated {
        vertex: &'a Vertex,
        watermark: IdWatermark,
    },
    EdgeCreated {
        edge: &'a Edge,
        head: &'a Vertex,
        tail: &'a Vertex,
        watermark: IdWatermark,
    },
    VertexPropertiesSet {
        vertex: &'a Vertex,
    },
    EdgePropertiesSet {
        edge: &'a Edge,
    },
    VertexRemoved {
        vertex: &'a Vertex,
    },
    EdgeRemoved {
        edge: &'a Edge,
        head: &'a Vertex,
        tail: &'a Vertex,
    },
}

impl GraphEvent<'_> {
    pub fn kind(&self) -> &'static str {
        match self {
            GraphEvent::ConstraintAdded { .. } => "constraint_added",
            GraphEvent::VertexCreated { .. } => "vertex_created",
            GraphEvent::EdgeCreated { .. } => "edge_created",
            GraphEvent::VertexPropertiesSet { .. } => "vertex_properties_set",
            GraphEvent::EdgePropertiesSet { .. } => "edge_properties_set",
            GraphEvent::VertexRemoved { .. } => "vertex_removed",
            GraphEvent::EdgeRemoved { .. } => "edge_removed",
        }
    }
}

/// Side-effecting mirror of the in-memory graph.
///
/// `admit_label` runs in the check phase, before anything is mutated, so a
/// label the journal cannot store is rejected with the graph untouched.
/// `record` runs after the in-memory commit and is not rolled back with it:
/// if it fails, the journal and the store have diverged.
pub trait GraphJournal: std::fmt::Debug {
    fn admit_label(&self, _label: &Label) -> StorageResult<()> {
        Ok(())
    }

    fn record(&mut self, event: &GraphEvent<'_>) -> StorageResult<()>;

    /// Flush anything buffered. Called when the owning graph is closed.
    fn flush(&mut self) -> StorageResult<()> {
        Ok(())
    }
}
