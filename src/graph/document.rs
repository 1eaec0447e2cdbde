//! Bulk graph documents
//!
//! `dump` captures the whole graph as plain records; `load` replays a document
//! into a store: constraints first, then vertices in ascending record id, then
//! edges in ascending record id. Record ids only tie edges to their endpoints
//! within one document and need not match the identities the store assigns.

use super::property::PropertyMap;
use super::store::{check_finite, GraphError, GraphResult, GraphStore};
use super::types::{Label, VertexId};
use crate::index::ConstraintKey;
use crate::persistence::StorageError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{Read, Write};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VertexRecord {
    pub id: u64,
    pub label: Label,
    #[serde(default)]
    pub properties: PropertyMap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub id: u64,
    pub label: Label,
    pub head_id: u64,
    pub tail_id: u64,
    #[serde(default)]
    pub properties: PropertyMap,
}

/// The whole graph as three flat arrays
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    #[serde(default)]
    pub vertices: Vec<VertexRecord>,
    #[serde(default)]
    pub edges: Vec<EdgeRecord>,
    #[serde(default)]
    pub constraints: Vec<ConstraintKey>,
}

impl GraphDocument {
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() && self.edges.is_empty() && self.constraints.is_empty()
    }

    /// Reject duplicate vertex ids, edges whose endpoints are not in the
    /// document and unstorable floats, before anything is loaded
    fn validate(&self) -> GraphResult<()> {
        let mut seen = std::collections::HashSet::with_capacity(self.vertices.len());
        for vertex in &self.vertices {
            check_finite(&vertex.properties)?;
            if !seen.insert(vertex.id) {
                return Err(GraphError::InvalidDocument(format!(
                    "vertex id {} appears more than once",
                    vertex.id
                )));
            }
        }
        for edge in &self.edges {
            check_finite(&edge.properties)?;
            for endpoint in [edge.head_id, edge.tail_id] {
                if !seen.contains(&endpoint) {
                    return Err(GraphError::InvalidDocument(format!(
                        "edge {} refers to unknown vertex {}",
                        edge.id, endpoint
                    )));
                }
            }
        }
        Ok(())
    }
}

impl GraphStore {
    /// Snapshot every constraint, vertex and edge
    pub fn dump(&self) -> GraphDocument {
        GraphDocument {
            vertices: self
                .vertices()
                .map(|vertex| VertexRecord {
                    id: vertex.id().as_u64(),
                    label: vertex.label().clone(),
                    properties: vertex.properties().clone(),
                })
                .collect(),
            edges: self
                .edges()
                .map(|edge| EdgeRecord {
                    id: edge.id().as_u64(),
                    label: edge.label().clone(),
                    head_id: edge.head().as_u64(),
                    tail_id: edge.tail().as_u64(),
                    properties: edge.properties().clone(),
                })
                .collect(),
            constraints: self.get_vertex_constraints(),
        }
    }

    /// Replay a document into this store.
    ///
    /// Vertices go through `add_vertex`, so duplicates in the document stay
    /// duplicates; edges go through `get_or_create_edge`, so a repeated
    /// triple collapses into one edge.
    pub fn load(&mut self, document: GraphDocument) -> GraphResult<()> {
        document.validate()?;
        let GraphDocument {
            mut vertices,
            mut edges,
            constraints,
        } = document;

        for constraint in constraints {
            self.add_vertex_constraint(constraint.label, constraint.key)?;
        }

        vertices.sort_by_key(|vertex| vertex.id);
        let mut remap: HashMap<u64, VertexId> = HashMap::with_capacity(vertices.len());
        for record in vertices {
            let id = self.add_vertex(record.label, record.properties)?;
            remap.insert(record.id, id);
        }

        edges.sort_by_key(|edge| edge.id);
        let edge_count = edges.len();
        for record in edges {
            let (Some(&head), Some(&tail)) = (remap.get(&record.head_id), remap.get(&record.tail_id))
            else {
                return Err(GraphError::InvalidDocument(format!(
                    "edge {} has an unresolved endpoint",
                    record.id
                )));
            };
            self.get_or_create_edge(head, record.label, tail, record.properties)?;
        }

        info!(
            "Loaded graph document: {} vertices, {} edges",
            remap.len(),
            edge_count
        );
        Ok(())
    }

    /// Write `dump()` as pretty JSON
    pub fn dump_json<W: Write>(&self, writer: W) -> GraphResult<()> {
        serde_json::to_writer_pretty(writer, &self.dump()).map_err(StorageError::from)?;
        Ok(())
    }

    /// Parse a JSON document and `load` it
    pub fn load_json<R: Read>(&mut self, reader: R) -> GraphResult<()> {
        let document: GraphDocument = serde_json::from_reader(reader)
            .map_err(|e| GraphError::InvalidDocument(e.to_string()))?;
        self.load(document)
    }
}
