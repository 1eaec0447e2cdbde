//! dirgraph
//!
//! An embeddable property graph engine with uniqueness constraints, indexed
//! lookup, and a persistence layer that stores the graph as a directory tree
//! with links as relationship pointers.
//!
//! # Architecture
//!
//! - `graph`: the data model and `GraphStore`, the single mutation surface
//! - `index`: the indexed entity container and the constraint table
//! - `persistence`: `PersistentGraph`, a store whose journal mirrors every
//!   mutation to disk and which can be rebuilt by scanning the tree
//!
//! The engine is single-threaded and synchronous. Hosts that share a graph
//! between threads must serialize access themselves.
//!
//! ## Example Usage
//!
//! ```rust
//! use dirgraph::graph::{property_map, GraphStore, PropertyMap};
//!
//! let mut store = GraphStore::new();
//! store.add_vertex_constraint("Person", "email").unwrap();
//!
//! let alice = store
//!     .add_vertex("Person", property_map([("email", "alice@example.com"), ("name", "Alice")]))
//!     .unwrap();
//! let bob = store
//!     .get_or_create_vertex("Person", property_map([("email", "bob@example.com")]))
//!     .unwrap()
//!     .unwrap();
//!
//! let knows = store.add_edge(alice, "KNOWS", bob, PropertyMap::new()).unwrap();
//! assert_eq!(store.get_or_create_edge(alice, "KNOWS", bob, PropertyMap::new()).unwrap(), knows);
//!
//! // Same email, same vertex
//! let again = store
//!     .get_or_create_vertex("Person", property_map([("email", "alice@example.com")]))
//!     .unwrap();
//! assert_eq!(again, Some(alice));
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod graph;
pub mod index;
pub mod persistence;

// Re-export main types for convenience
pub use graph::{
    property_map, Edge, EdgeId, EntityId, GraphDocument, GraphError, GraphEvent, GraphJournal,
    GraphResult, GraphStore, Label, PropertyMap, PropertyValue, Vertex, VertexId, VertexRef,
    Violation,
};

pub use index::{ConstraintKey, EntityIndex};

pub use persistence::{
    LinkStyle, PersistenceConfig, PersistentGraph, StorageError, StorageResult,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        let ver = version();
        assert!(!ver.is_empty());
        assert_eq!(ver, "0.1.0");
    }
}
