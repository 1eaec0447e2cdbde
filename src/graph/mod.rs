//! Core graph engine
//!
//! This module implements the property graph data model with:
//! - Vertices with a single immutable label and scalar properties
//! - Directed edges (head -> tail), at most one per (head, label, tail)
//! - Per-label uniqueness constraints on vertex properties
//! - In-memory storage with label and property-value indices
//! - An optional journal that mirrors committed mutations elsewhere

pub mod document;
pub mod edge;
pub mod event;
pub mod id_gen;
pub mod property;
pub mod store;
pub mod types;
pub mod vertex;

// Re-export main types
pub use document::{EdgeRecord, GraphDocument, VertexRecord};
pub use edge::Edge;
pub use event::{GraphEvent, GraphJournal};
pub use id_gen::{IdGenerator, IdWatermark};
pub use property::{property_map, PropertyMap, PropertyValue};
pub use store::{GraphError, GraphResult, GraphStore, VertexRef, Violation};
pub use types::{EdgeId, EntityId, Label, VertexId};
pub use vertex::Vertex;
