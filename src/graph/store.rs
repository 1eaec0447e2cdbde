//! In-memory graph storage implementation
//!
//! `GraphStore` is the only mutation surface of the engine. Every mutating
//! operation runs a check phase (constraints, membership, journal pre-flight)
//! before touching any state, then commits, then reports the committed change
//! to the registered journal.

use super::edge::Edge;
use super::event::{GraphEvent, GraphJournal};
use super::id_gen::{IdGenerator, IdWatermark};
use super::property::{PropertyMap, PropertyValue};
use super::types::{EdgeId, EntityId, Label, VertexId};
use super::vertex::Vertex;
use crate::index::{ConstraintKey, ConstraintTable, EntityIndex};
use crate::persistence::StorageError;
use rustc_hash::FxHashMap;
use std::fmt;
use thiserror::Error;
use tracing::debug;

/// The uniqueness rule a rejected mutation would have broken
#[derive(Debug, Clone, PartialEq)]
pub enum Violation {
    /// Another vertex with the same label already holds this value
    VertexProperty {
        label: Label,
        key: String,
        value: PropertyValue,
        existing: VertexId,
    },
    /// An edge already exists for this (head, label, tail) triple
    EdgeTriple {
        head: VertexId,
        label: Label,
        tail: VertexId,
        existing: EdgeId,
    },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::VertexProperty {
                label,
                key,
                value,
                existing,
            } => write!(
                f,
                "{}.{} = {} is already held by {}",
                label, key, value, existing
            ),
            Violation::EdgeTriple {
                head,
                label,
                tail,
                existing,
            } => write!(
                f,
                "duplicate {} edge between head {} and tail {} (existing {})",
                label, head, tail, existing
            ),
        }
    }
}

/// Errors that can occur during graph operations
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("{0} already exists")]
    DuplicateEntity(EntityId),

    #[error("{0} not found")]
    NotFound(EntityId),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(Violation),

    #[error("Multiple {label} vertices found ({count}) when one expected")]
    MultipleFoundExpectedOne { label: Label, count: usize },

    #[error("Unknown entity {0}")]
    UnknownEntity(EntityId),

    #[error("Cannot resolve a {0:?} vertex without a label and properties")]
    UnresolvedVertex(Label),

    #[error("{0} is still bound to another vertex by an edge; remove its edges first")]
    VertexBoundByEdges(VertexId),

    #[error("Property {key} holds {value}, which cannot be stored")]
    NonFiniteProperty { key: String, value: PropertyValue },

    #[error("Invalid graph document: {0}")]
    InvalidDocument(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl GraphError {
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, GraphError::ConstraintViolation(_))
    }
}

pub type GraphResult<T> = Result<T, GraphError>;

/// NaN and infinities have no JSON form, so they are refused before any
/// mutation rather than silently stored as null.
pub(super) fn check_finite(properties: &PropertyMap) -> GraphResult<()> {
    match properties.iter().find(|(_, value)| !value.is_finite()) {
        Some((key, value)) => Err(GraphError::NonFiniteProperty {
            key: key.clone(),
            value: value.clone(),
        }),
        None => Ok(()),
    }
}

/// An edge endpoint: either a vertex already in the graph, or a label and
/// property map to resolve through `get_or_create_vertex`.
#[derive(Debug, Clone, PartialEq)]
pub enum VertexRef {
    Id(VertexId),
    Match { label: Label, properties: PropertyMap },
}

impl VertexRef {
    pub fn matching(label: impl Into<Label>, properties: PropertyMap) -> Self {
        VertexRef::Match {
            label: label.into(),
            properties,
        }
    }
}

impl From<VertexId> for VertexRef {
    fn from(id: VertexId) -> Self {
        VertexRef::Id(id)
    }
}

impl From<&Vertex> for VertexRef {
    fn from(vertex: &Vertex) -> Self {
        VertexRef::Id(vertex.id())
    }
}

type EdgeTriple = (VertexId, Label, VertexId);

/// In-memory graph storage
///
/// - vertices: indexed by id, label and property value
/// - edges: indexed by id, label and property value
/// - constraints: (label, key) -> vertices whose value must stay unique
/// - edge_triples: (head, label, tail) -> the single edge allowed there
#[derive(Debug, Default)]
pub struct GraphStore {
    vertices: EntityIndex<Vertex>,
    edges: EntityIndex<Edge>,
    ids: IdGenerator,
    constraints: ConstraintTable,
    edge_triples: FxHashMap<EdgeTriple, EdgeId>,
    journal: Option<Box<dyn GraphJournal>>,
}

impl GraphStore {
    /// Create a new empty graph store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store that mirrors every mutation to `journal`
    pub fn with_journal(journal: Box<dyn GraphJournal>) -> Self {
        let mut store = Self::new();
        store.journal = Some(journal);
        store
    }

    /// Register (or replace) the journal. Mutations made before this call
    /// are not replayed into it.
    pub(crate) fn set_journal(&mut self, journal: Box<dyn GraphJournal>) {
        self.journal = Some(journal);
    }

    pub fn has_journal(&self) -> bool {
        self.journal.is_some()
    }

    // ============================================================
    // Constraints
    // ============================================================

    /// Register a uniqueness constraint on (label, key) for vertices.
    /// Existing vertices are not validated against it.
    pub fn add_vertex_constraint(
        &mut self,
        label: impl Into<Label>,
        key: impl Into<String>,
    ) -> GraphResult<()> {
        let constraint = ConstraintKey::new(label, key);
        self.constraints
            .add(constraint.label.clone(), constraint.key.clone());
        debug!("Registered constraint {}.{}", constraint.label, constraint.key);

        if let Some(journal) = self.journal.as_mut() {
            let all = self.constraints.list();
            journal.record(&GraphEvent::ConstraintAdded {
                constraint: &constraint,
                all: &all,
            })?;
        }
        Ok(())
    }

    /// Registered constraints, in registration order
    pub fn get_vertex_constraints(&self) -> Vec<ConstraintKey> {
        self.constraints.list()
    }

    // ============================================================
    // Vertices
    // ============================================================

    /// Create a vertex. Constrained keys present in `properties` start being
    /// tracked, but no uniqueness check is made; use `get_or_create_vertex`
    /// to deduplicate.
    pub fn add_vertex(
        &mut self,
        label: impl Into<Label>,
        properties: PropertyMap,
    ) -> GraphResult<VertexId> {
        let label = label.into();
        check_finite(&properties)?;
        self.admit_label(&label)?;

        let id = self.ids.next_vertex_id();
        let constrained = self.constrained_keys(&label, &properties);
        self.vertices.add(Vertex::new(id, label.clone(), properties))?;
        for key in &constrained {
            self.constraints.track(label.as_str(), key, id);
        }
        debug!("Created vertex {} with label {}", id, label);

        if let Some(journal) = self.journal.as_mut() {
            if let Some(vertex) = self.vertices.get(id) {
                journal.record(&GraphEvent::VertexCreated {
                    vertex,
                    watermark: self.ids.watermark(),
                })?;
            }
        }
        Ok(id)
    }

    /// Return the vertex matching `label` and `properties`, creating it if
    /// none exists.
    ///
    /// Constrained keys are consulted first: a tracked vertex holding an
    /// equal value wins immediately, whatever the other properties say.
    /// Otherwise a full label/property filter runs; more than one match is
    /// ambiguous and rejected. An empty label or property map yields `None`.
    pub fn get_or_create_vertex(
        &mut self,
        label: impl Into<Label>,
        properties: PropertyMap,
    ) -> GraphResult<Option<VertexId>> {
        let label = label.into();
        if label.is_empty() || properties.is_empty() {
            return Ok(None);
        }
        check_finite(&properties)?;

        if let Some(id) = self.find_by_constraint(&label, &properties) {
            return Ok(Some(id));
        }

        let found: Vec<VertexId> = self
            .vertices
            .filter(Some(label.as_str()), &properties)
            .iter()
            .map(|vertex| vertex.id())
            .collect();
        match found.as_slice() {
            [] => self.add_vertex(label, properties).map(Some),
            [id] => Ok(Some(*id)),
            _ => Err(GraphError::MultipleFoundExpectedOne {
                label,
                count: found.len(),
            }),
        }
    }

    /// Get a vertex by ID
    pub fn get_vertex(&self, id: VertexId) -> Option<&Vertex> {
        self.vertices.get(id)
    }

    /// Vertices with the given label (any when `None`) holding every
    /// property in `properties`, in id order
    pub fn get_vertices(&self, label: Option<&str>, properties: &PropertyMap) -> Vec<&Vertex> {
        self.vertices.filter(label, properties)
    }

    /// Remove a vertex. Its edges must have been removed first.
    pub fn remove_vertex(&mut self, id: VertexId) -> GraphResult<Vertex> {
        let vertex = self
            .vertices
            .get(id)
            .ok_or(GraphError::NotFound(id.into()))?;
        if vertex.is_bound() {
            return Err(GraphError::VertexBoundByEdges(id));
        }

        let vertex = self.vertices.remove(id)?;
        self.constraints.untrack(vertex.label().as_str(), id);
        debug!("Removed vertex {}", id);

        if let Some(journal) = self.journal.as_mut() {
            journal.record(&GraphEvent::VertexRemoved { vertex: &vertex })?;
        }
        Ok(vertex)
    }

    // ============================================================
    // Edges
    // ============================================================

    /// Create an edge from `head` to `tail`. Only one edge may exist per
    /// (head, label, tail) triple.
    pub fn add_edge(
        &mut self,
        head: VertexId,
        label: impl Into<Label>,
        tail: VertexId,
        properties: PropertyMap,
    ) -> GraphResult<EdgeId> {
        let label = label.into();
        if !self.vertices.contains(head) {
            return Err(GraphError::UnknownEntity(head.into()));
        }
        if !self.vertices.contains(tail) {
            return Err(GraphError::UnknownEntity(tail.into()));
        }
        let triple = (head, label.clone(), tail);
        if let Some(&existing) = self.edge_triples.get(&triple) {
            return Err(GraphError::ConstraintViolation(Violation::EdgeTriple {
                head,
                label,
                tail,
                existing,
            }));
        }
        check_finite(&properties)?;
        self.admit_label(&label)?;

        let id = self.ids.next_edge_id();
        self.edges
            .add(Edge::new(id, head, label.clone(), tail, properties))?;
        self.edge_triples.insert(triple, id);
        self.link_endpoints(id, head, tail);
        debug!("Created edge {} ({})-[{}]->({})", id, head, label, tail);

        if let Some(journal) = self.journal.as_mut() {
            if let (Some(edge), Some(head), Some(tail)) = (
                self.edges.get(id),
                self.vertices.get(head),
                self.vertices.get(tail),
            ) {
                journal.record(&GraphEvent::EdgeCreated {
                    edge,
                    head,
                    tail,
                    watermark: self.ids.watermark(),
                })?;
            }
        }
        Ok(id)
    }

    /// Return the edge for the (head, label, tail) triple, creating it if
    /// absent. Endpoints given as `VertexRef::Match` are resolved with
    /// `get_or_create_vertex` first. `properties` only apply to a new edge.
    pub fn get_or_create_edge(
        &mut self,
        head: impl Into<VertexRef>,
        label: impl Into<Label>,
        tail: impl Into<VertexRef>,
        properties: PropertyMap,
    ) -> GraphResult<EdgeId> {
        let head = self.resolve_vertex(head.into())?;
        let tail = self.resolve_vertex(tail.into())?;
        let label = label.into();

        if let Some(&existing) = self.edge_triples.get(&(head, label.clone(), tail)) {
            return Ok(existing);
        }
        self.add_edge(head, label, tail, properties)
    }

    /// Get an edge by ID
    pub fn get_edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id)
    }

    /// Edges matching label and properties, then narrowed to the given
    /// endpoints (both when both are given, otherwise whichever is given)
    pub fn get_edges(
        &self,
        head: Option<VertexId>,
        label: Option<&str>,
        tail: Option<VertexId>,
        properties: &PropertyMap,
    ) -> Vec<&Edge> {
        let mut edges = self.edges.filter(label, properties);
        if head.is_some() || tail.is_some() {
            edges.retain(|edge| {
                head.map_or(true, |head| edge.head() == head)
                    && tail.map_or(true, |tail| edge.tail() == tail)
            });
        }
        edges
    }

    /// Get all outgoing edges from a vertex
    pub fn get_out_edges(&self, vertex: VertexId) -> Vec<&Edge> {
        self.vertices
            .get(vertex)
            .map(|v| v.out_edges().iter().filter_map(|&id| self.edges.get(id)).collect())
            .unwrap_or_default()
    }

    /// Get all incoming edges to a vertex
    pub fn get_in_edges(&self, vertex: VertexId) -> Vec<&Edge> {
        self.vertices
            .get(vertex)
            .map(|v| v.in_edges().iter().filter_map(|&id| self.edges.get(id)).collect())
            .unwrap_or_default()
    }

    /// Vertices one edge away in either direction, without duplicates
    pub fn neighbours(&self, vertex: VertexId) -> Vec<VertexId> {
        let Some(v) = self.vertices.get(vertex) else {
            return Vec::new();
        };
        let found: std::collections::BTreeSet<VertexId> = v
            .both_edges()
            .into_iter()
            .filter_map(|id| self.edges.get(id))
            .filter_map(|edge| edge.other_end(vertex))
            .collect();
        found.into_iter().collect()
    }

    /// Remove an edge, detaching it from both endpoints first
    pub fn remove_edge(&mut self, id: EdgeId) -> GraphResult<Edge> {
        let edge = self.edges.get(id).ok_or(GraphError::NotFound(id.into()))?;
        let (head, tail) = (edge.head(), edge.tail());

        for endpoint in [head, tail] {
            if let Some(vertex) = self.vertices.get_mut(endpoint) {
                vertex.detach_edge(id);
            }
        }
        let edge = self.edges.remove(id)?;
        self.edge_triples
            .remove(&(head, edge.label().clone(), tail));
        debug!("Removed edge {}", id);

        if let Some(journal) = self.journal.as_mut() {
            if let (Some(head), Some(tail)) = (self.vertices.get(head), self.vertices.get(tail)) {
                journal.record(&GraphEvent::EdgeRemoved {
                    edge: &edge,
                    head,
                    tail,
                })?;
            }
        }
        Ok(edge)
    }

    // ============================================================
    // Properties
    // ============================================================

    /// Merge `properties` into a vertex's or edge's property map.
    ///
    /// For vertices every constrained key is checked against the other
    /// tracked vertices before anything changes, so a rejected call leaves
    /// the graph as it was.
    pub fn set_property(
        &mut self,
        entity: impl Into<EntityId>,
        properties: PropertyMap,
    ) -> GraphResult<()> {
        match entity.into() {
            EntityId::Vertex(id) => self.set_vertex_properties(id, properties),
            EntityId::Edge(id) => self.set_edge_properties(id, properties),
        }
    }

    fn set_vertex_properties(&mut self, id: VertexId, properties: PropertyMap) -> GraphResult<()> {
        let label = self
            .vertices
            .get(id)
            .ok_or(GraphError::UnknownEntity(id.into()))?
            .label()
            .clone();

        // Check phase
        check_finite(&properties)?;
        for (key, value) in &properties {
            let Some(tracked) = self.constraints.tracked(label.as_str(), key) else {
                continue;
            };
            let holder = tracked.iter().copied().find(|&other| {
                other != id
                    && self
                        .vertices
                        .get(other)
                        .and_then(|vertex| vertex.get_property(key))
                        == Some(value)
            });
            if let Some(existing) = holder {
                return Err(GraphError::ConstraintViolation(Violation::VertexProperty {
                    label,
                    key: key.clone(),
                    value: value.clone(),
                    existing,
                }));
            }
        }

        // Commit phase
        let constrained = self.constrained_keys(&label, &properties);
        self.vertices.apply_properties(id, properties)?;
        for key in &constrained {
            self.constraints.track(label.as_str(), key, id);
        }
        debug!("Updated properties of vertex {}", id);

        if let Some(journal) = self.journal.as_mut() {
            if let Some(vertex) = self.vertices.get(id) {
                journal.record(&GraphEvent::VertexPropertiesSet { vertex })?;
            }
        }
        Ok(())
    }

    fn set_edge_properties(&mut self, id: EdgeId, properties: PropertyMap) -> GraphResult<()> {
        if !self.edges.contains(id) {
            return Err(GraphError::UnknownEntity(id.into()));
        }
        check_finite(&properties)?;
        self.edges.apply_properties(id, properties)?;
        debug!("Updated properties of edge {}", id);

        if let Some(journal) = self.journal.as_mut() {
            if let Some(edge) = self.edges.get(id) {
                journal.record(&GraphEvent::EdgePropertiesSet { edge })?;
            }
        }
        Ok(())
    }

    // ============================================================
    // Inspection
    // ============================================================

    /// Whether the vertex or edge belongs to this graph
    pub fn contains(&self, entity: impl Into<EntityId>) -> bool {
        match entity.into() {
            EntityId::Vertex(id) => self.vertices.contains(id),
            EntityId::Edge(id) => self.edges.contains(id),
        }
    }

    /// Get total number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Get total number of edges
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// All vertices in id order
    pub fn vertices(&self) -> impl Iterator<Item = &Vertex> {
        self.vertices.iter()
    }

    /// All edges in id order
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter()
    }

    /// Next identities the generator will hand out
    pub fn watermark(&self) -> IdWatermark {
        self.ids.watermark()
    }

    /// Flush the journal, if any
    pub fn close(&mut self) -> GraphResult<()> {
        if let Some(journal) = self.journal.as_mut() {
            journal.flush()?;
        }
        Ok(())
    }

    // ============================================================
    // Recovery methods - used to rebuild graph from persisted data
    // ============================================================

    /// Insert a recovered vertex (used during recovery from persistence)
    /// Unlike add_vertex(), this keeps the vertex's existing ID and advances
    /// the generator past it. Nothing is reported to the journal.
    pub(crate) fn insert_recovered_vertex(
        &mut self,
        id: VertexId,
        label: impl Into<Label>,
        properties: PropertyMap,
    ) -> GraphResult<()> {
        let label = label.into();
        let constrained = self.constrained_keys(&label, &properties);
        self.vertices.add(Vertex::new(id, label.clone(), properties))?;
        for key in &constrained {
            self.constraints.track(label.as_str(), key, id);
        }
        self.ids.observe_vertex_id(id);
        Ok(())
    }

    /// Insert a recovered edge (used during recovery from persistence)
    /// Unlike add_edge(), this keeps the edge's existing ID.
    /// Note: head and tail vertices must already exist
    pub(crate) fn insert_recovered_edge(
        &mut self,
        id: EdgeId,
        head: VertexId,
        label: impl Into<Label>,
        tail: VertexId,
        properties: PropertyMap,
    ) -> GraphResult<()> {
        let label = label.into();
        if !self.vertices.contains(head) {
            return Err(GraphError::UnknownEntity(head.into()));
        }
        if !self.vertices.contains(tail) {
            return Err(GraphError::UnknownEntity(tail.into()));
        }
        let triple = (head, label.clone(), tail);
        if let Some(&existing) = self.edge_triples.get(&triple) {
            return Err(GraphError::ConstraintViolation(Violation::EdgeTriple {
                head,
                label,
                tail,
                existing,
            }));
        }

        self.edges.add(Edge::new(id, head, label, tail, properties))?;
        self.edge_triples.insert(triple, id);
        self.link_endpoints(id, head, tail);
        self.ids.observe_edge_id(id);
        Ok(())
    }

    /// Raise the identity counters, e.g. from a persisted header
    pub(crate) fn raise_watermark(&mut self, watermark: IdWatermark) {
        self.ids.raise_to(watermark);
    }

    // ============================================================
    // Helpers
    // ============================================================

    fn admit_label(&self, label: &Label) -> GraphResult<()> {
        if let Some(journal) = &self.journal {
            journal.admit_label(label)?;
        }
        Ok(())
    }

    fn constrained_keys(&self, label: &Label, properties: &PropertyMap) -> Vec<String> {
        self.constraints
            .keys_for(label.as_str())
            .filter(|(key, _)| properties.contains_key(*key))
            .map(|(key, _)| key.clone())
            .collect()
    }

    fn find_by_constraint(&self, label: &Label, properties: &PropertyMap) -> Option<VertexId> {
        self.constraints
            .keys_for(label.as_str())
            .filter_map(|(key, tracked)| properties.get(key).map(|value| (key, value, tracked)))
            .find_map(|(key, value, tracked)| {
                tracked.iter().copied().find(|&id| {
                    self.vertices
                        .get(id)
                        .and_then(|vertex| vertex.get_property(key))
                        == Some(value)
                })
            })
    }

    fn resolve_vertex(&mut self, vertex: VertexRef) -> GraphResult<VertexId> {
        match vertex {
            VertexRef::Id(id) if self.vertices.contains(id) => Ok(id),
            VertexRef::Id(id) => Err(GraphError::UnknownEntity(id.into())),
            VertexRef::Match { label, properties } => self
                .get_or_create_vertex(label.clone(), properties)?
                .ok_or(GraphError::UnresolvedVertex(label)),
        }
    }

    fn link_endpoints(&mut self, edge: EdgeId, head: VertexId, tail: VertexId) {
        if let Some(vertex) = self.vertices.get_mut(head) {
            vertex.attach_out_edge(edge);
        }
        if let Some(vertex) = self.vertices.get_mut(tail) {
            vertex.attach_in_edge(edge);
        }
    }
}
