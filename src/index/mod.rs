//! Indexing module
//!
//! Provides the indexed entity container used for vertex and edge storage,
//! the per-key property index behind it, and the uniqueness constraint table.

pub mod constraint;
pub mod entity_index;
pub mod property_index;

pub use constraint::{ConstraintKey, ConstraintTable};
pub use entity_index::{Entity, EntityIndex};
pub use property_index::PropertyIndex;
