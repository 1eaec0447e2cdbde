//! Persistence layer
//!
//! A `PersistentGraph` is an in-memory `GraphStore` whose journal mirrors
//! every committed mutation into a directory tree (see `layout`), plus the
//! bootstrap path that rebuilds the store by scanning that tree.
//!
//! The disk step is not transactional with the in-memory one. Label names are
//! checked before anything changes, but an I/O failure afterwards leaves the
//! tree behind the store until the graph is reopened.

pub mod config;
pub mod journal;
pub mod layout;

pub use config::{LinkStyle, PersistenceConfig};
pub use journal::FsJournal;
pub use layout::{DiskLayout, LayoutScan, ScannedEdge, ScannedVertex};

use crate::graph::{EdgeId, GraphResult, GraphStore, VertexId};
use std::collections::{BTreeSet, HashMap};
use std::ops::{Deref, DerefMut};
use std::path::Path;
use tempfile::TempDir;
use thiserror::Error;
use tracing::{info, warn};

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(serde_yaml::Error),

    /// The tree on disk is not a graph layout
    #[error("Corrupt layout: {0}")]
    CorruptLayout(String),

    /// A label that cannot be used as a directory name
    #[error("Invalid name for on-disk entry: {0:?}")]
    InvalidName(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Graph store mirrored to a directory tree
#[derive(Debug)]
pub struct PersistentGraph {
    store: GraphStore,
    layout: DiskLayout,
    /// Set when the root is a temporary directory; removed on drop
    temp_dir: Option<TempDir>,
}

impl PersistentGraph {
    /// Fresh graph in a new temporary directory
    pub fn create_temp() -> GraphResult<Self> {
        Self::from_config(&PersistenceConfig::default())
    }

    /// Open the graph at `root`, creating the skeleton if the directory is
    /// missing or empty
    pub fn open(root: impl AsRef<Path>) -> GraphResult<Self> {
        Self::from_config(&PersistenceConfig::default().with_root(root))
    }

    pub fn from_config(config: &PersistenceConfig) -> GraphResult<Self> {
        let Some(root) = &config.root else {
            let temp_dir = tempfile::Builder::new()
                .prefix(&config.temp_prefix)
                .tempdir()
                .map_err(StorageError::from)?;
            let layout = DiskLayout::new(temp_dir.path(), config.link_style);
            layout.create_skeleton()?;
            info!("Created temporary graph at {:?}", layout.root());
            return Ok(Self::attach(GraphStore::new(), layout, Some(temp_dir)));
        };

        let layout = DiskLayout::new(root, config.link_style);
        if layout.is_blank()? {
            layout.create_skeleton()?;
            info!("Created graph at {:?}", layout.root());
            return Ok(Self::attach(GraphStore::new(), layout, None));
        }

        let store = Self::reload(&layout)?;
        Ok(Self::attach(store, layout, None))
    }

    fn attach(mut store: GraphStore, layout: DiskLayout, temp_dir: Option<TempDir>) -> Self {
        let journal = FsJournal::new(layout.clone(), store.watermark());
        store.set_journal(Box::new(journal));
        Self {
            store,
            layout,
            temp_dir,
        }
    }

    /// Rebuild a store from the tree: constraints, then vertices, then edges,
    /// each keeping the identity its directory is named after. Nothing is
    /// journaled while this runs.
    fn reload(layout: &DiskLayout) -> GraphResult<GraphStore> {
        let scan = layout.scan()?;
        let mut store = GraphStore::new();

        for constraint in scan.constraints {
            store.add_vertex_constraint(constraint.label, constraint.key)?;
        }

        let mut back_links: HashMap<VertexId, (BTreeSet<EdgeId>, BTreeSet<EdgeId>)> =
            HashMap::with_capacity(scan.vertices.len());
        for vertex in scan.vertices {
            back_links.insert(vertex.id, (vertex.in_edges, vertex.out_edges));
            store.insert_recovered_vertex(vertex.id, vertex.label, vertex.properties)?;
        }

        for edge in scan.edges {
            let head_links = back_links.get(&edge.head).map(|(_, out)| out);
            if !head_links.is_some_and(|out| out.contains(&edge.id)) {
                warn!("{} missing from out-edges of head {}", edge.id, edge.head);
            }
            let tail_links = back_links.get(&edge.tail).map(|(inbound, _)| inbound);
            if !tail_links.is_some_and(|inbound| inbound.contains(&edge.id)) {
                warn!("{} missing from in-edges of tail {}", edge.id, edge.tail);
            }
            store.insert_recovered_edge(
                edge.id,
                edge.head,
                edge.label,
                edge.tail,
                edge.properties,
            )?;
        }

        let observed = store.watermark();
        match scan.header {
            Some(header) => {
                if header.next_vertex_id < observed.next_vertex_id
                    || header.next_edge_id < observed.next_edge_id
                {
                    warn!(
                        "Stale identity header at {:?}: {:?}, tree holds up to {:?}",
                        layout.root(),
                        header,
                        observed
                    );
                }
                store.raise_watermark(header);
            }
            None => warn!("No identity header at {:?}", layout.root()),
        }
        layout.write_header(store.watermark())?;

        info!(
            "Reloaded graph from {:?}: {} vertices, {} edges",
            layout.root(),
            store.vertex_count(),
            store.edge_count()
        );
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        self.layout.root()
    }

    pub fn is_temporary(&self) -> bool {
        self.temp_dir.is_some()
    }

    pub fn layout(&self) -> &DiskLayout {
        &self.layout
    }

    /// Flush the identity header and drop the graph. A temporary root is
    /// deleted.
    pub fn close(mut self) -> GraphResult<()> {
        self.store.close()?;
        if let Some(temp_dir) = self.temp_dir.take() {
            temp_dir.close().map_err(StorageError::from)?;
        }
        Ok(())
    }
}

impl Deref for PersistentGraph {
    type Target = GraphStore;

    fn deref(&self) -> &GraphStore {
        &self.store
    }
}

impl DerefMut for PersistentGraph {
    fn deref_mut(&mut self) -> &mut GraphStore {
        &mut self.store
    }
}
