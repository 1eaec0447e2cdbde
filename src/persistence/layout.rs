//! Directory-tree layout of a persisted graph
//!
//! ```text
//! <root>/graph.json                                   identity header
//! <root>/vertices/constraints.json                    [{label, key}, ...]
//! <root>/vertices/<label>/<id>/properties.json
//! <root>/vertices/<label>/<id>/in-edges/<edge-id>     -> edge dir
//! <root>/vertices/<label>/<id>/out-edges/<edge-id>    -> edge dir
//! <root>/edges/<label>/<id>/properties.json
//! <root>/edges/<label>/<id>/head/<vertex-id>          -> vertex dir
//! <root>/edges/<label>/<id>/tail/<vertex-id>          -> vertex dir
//! ```
//!
//! Links hold paths relative to the link itself, so a root can be moved or
//! copied. A scan only reads link names, never their targets, which is why a
//! `LinkStyle::Record` tree reloads exactly like a symlinked one.
//!
//! JSON files are written to a sibling temp file and renamed into place.

use super::config::LinkStyle;
use super::{StorageError, StorageResult};
use crate::graph::{Edge, EdgeId, IdWatermark, Label, PropertyMap, Vertex, VertexId};
use crate::index::ConstraintKey;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const FORMAT_VERSION: u32 = 1;

const HEADER_FILE: &str = "graph.json";
const VERTICES_DIR: &str = "vertices";
const EDGES_DIR: &str = "edges";
const CONSTRAINTS_FILE: &str = "constraints.json";
const PROPERTIES_FILE: &str = "properties.json";
const IN_EDGES_DIR: &str = "in-edges";
const OUT_EDGES_DIR: &str = "out-edges";
const HEAD_DIR: &str = "head";
const TAIL_DIR: &str = "tail";
/// Appended to a record's path while it is being written
const TEMP_SUFFIX: &str = ".tmp";

/// From a link inside `<kind>/<label>/<id>/<dir>/` back up to the root
const LINK_DEPTH: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct LayoutHeader {
    format_version: u32,
    #[serde(flatten)]
    watermark: IdWatermark,
}

/// Reject labels that cannot be used as a single directory name, or that
/// would collide with a file the layout owns.
pub fn validate_name(name: &str) -> StorageResult<()> {
    let unusable = name.is_empty()
        || name == "."
        || name == ".."
        || name == CONSTRAINTS_FILE
        || name.ends_with(TEMP_SUFFIX)
        || name.chars().any(|c| matches!(c, '/' | '\\' | '\0'));
    if unusable {
        return Err(StorageError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// A vertex directory as found on disk
#[derive(Debug, Clone, PartialEq)]
pub struct ScannedVertex {
    pub id: VertexId,
    pub label: Label,
    pub properties: PropertyMap,
    /// Back-link names under `in-edges/`
    pub in_edges: BTreeSet<EdgeId>,
    /// Back-link names under `out-edges/`
    pub out_edges: BTreeSet<EdgeId>,
}

/// An edge directory as found on disk
#[derive(Debug, Clone, PartialEq)]
pub struct ScannedEdge {
    pub id: EdgeId,
    pub label: Label,
    pub head: VertexId,
    pub tail: VertexId,
    pub properties: PropertyMap,
}

/// Everything a scan found, vertices and edges in ascending id order
#[derive(Debug, Clone, Default)]
pub struct LayoutScan {
    pub header: Option<IdWatermark>,
    pub constraints: Vec<ConstraintKey>,
    pub vertices: Vec<ScannedVertex>,
    pub edges: Vec<ScannedEdge>,
}

#[derive(Debug, Clone)]
pub struct DiskLayout {
    root: PathBuf,
    link_style: LinkStyle,
}

impl DiskLayout {
    pub fn new(root: impl Into<PathBuf>, link_style: LinkStyle) -> Self {
        Self {
            root: root.into(),
            link_style,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn link_style(&self) -> LinkStyle {
        self.link_style
    }

    pub fn vertex_dir(&self, label: &Label, id: VertexId) -> PathBuf {
        self.root
            .join(VERTICES_DIR)
            .join(label.as_str())
            .join(id.as_u64().to_string())
    }

    pub fn edge_dir(&self, label: &Label, id: EdgeId) -> PathBuf {
        self.root
            .join(EDGES_DIR)
            .join(label.as_str())
            .join(id.as_u64().to_string())
    }

    fn header_path(&self) -> PathBuf {
        self.root.join(HEADER_FILE)
    }

    fn constraints_path(&self) -> PathBuf {
        self.root.join(VERTICES_DIR).join(CONSTRAINTS_FILE)
    }

    /// True when the root does not exist or is an empty directory
    pub fn is_blank(&self) -> StorageResult<bool> {
        match fs::read_dir(&self.root) {
            Ok(mut entries) => Ok(entries.next().is_none()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(true),
            Err(e) => Err(e.into()),
        }
    }

    /// Create empty `vertices/` and `edges/`, an empty constraints record and
    /// a zeroed header
    pub fn create_skeleton(&self) -> StorageResult<()> {
        fs::create_dir_all(self.root.join(VERTICES_DIR))?;
        fs::create_dir_all(self.root.join(EDGES_DIR))?;
        self.write_constraints(&[])?;
        self.write_header(IdWatermark::default())?;
        debug!("Created graph skeleton at {:?}", self.root);
        Ok(())
    }

    fn check_skeleton(&self) -> StorageResult<()> {
        for dir in [VERTICES_DIR, EDGES_DIR] {
            let path = self.root.join(dir);
            if !path.is_dir() {
                return Err(StorageError::CorruptLayout(format!(
                    "{} is missing",
                    path.display()
                )));
            }
        }
        Ok(())
    }

    // ============================================================
    // Header and constraints
    // ============================================================

    pub fn write_header(&self, watermark: IdWatermark) -> StorageResult<()> {
        write_json(
            &self.header_path(),
            &LayoutHeader {
                format_version: FORMAT_VERSION,
                watermark,
            },
        )
    }

    /// The persisted high-water mark. Trees written without one yield `None`.
    pub fn read_header(&self) -> StorageResult<Option<IdWatermark>> {
        let path = self.header_path();
        if !path.exists() {
            return Ok(None);
        }
        let header: LayoutHeader = read_json(&path)?;
        if header.format_version != FORMAT_VERSION {
            return Err(StorageError::CorruptLayout(format!(
                "unsupported format version {} in {}",
                header.format_version,
                path.display()
            )));
        }
        Ok(Some(header.watermark))
    }

    pub fn write_constraints(&self, constraints: &[ConstraintKey]) -> StorageResult<()> {
        write_json(&self.constraints_path(), constraints)
    }

    pub fn read_constraints(&self) -> StorageResult<Vec<ConstraintKey>> {
        let path = self.constraints_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        read_json(&path)
    }

    // ============================================================
    // Vertices
    // ============================================================

    pub fn create_vertex(&self, vertex: &Vertex) -> StorageResult<()> {
        let dir = self.vertex_dir(vertex.label(), vertex.id());
        fs::create_dir_all(dir.join(IN_EDGES_DIR))?;
        fs::create_dir_all(dir.join(OUT_EDGES_DIR))?;
        write_json(&dir.join(PROPERTIES_FILE), vertex.properties())
    }

    pub fn write_vertex_properties(&self, vertex: &Vertex) -> StorageResult<()> {
        let dir = self.vertex_dir(vertex.label(), vertex.id());
        write_json(&dir.join(PROPERTIES_FILE), vertex.properties())
    }

    pub fn remove_vertex(&self, vertex: &Vertex) -> StorageResult<()> {
        fs::remove_dir_all(self.vertex_dir(vertex.label(), vertex.id()))?;
        Ok(())
    }

    // ============================================================
    // Edges
    // ============================================================

    /// Edge directory, its endpoint links, then the back-links in the head's
    /// `out-edges/` and the tail's `in-edges/`
    pub fn create_edge(&self, edge: &Edge, head: &Vertex, tail: &Vertex) -> StorageResult<()> {
        let dir = self.edge_dir(edge.label(), edge.id());
        fs::create_dir_all(dir.join(HEAD_DIR))?;
        fs::create_dir_all(dir.join(TAIL_DIR))?;
        write_json(&dir.join(PROPERTIES_FILE), edge.properties())?;

        self.link(
            &vertex_link_target(head),
            &dir.join(HEAD_DIR).join(head.id().as_u64().to_string()),
        )?;
        self.link(
            &vertex_link_target(tail),
            &dir.join(TAIL_DIR).join(tail.id().as_u64().to_string()),
        )?;

        let back_link = edge_link_target(edge);
        let name = edge.id().as_u64().to_string();
        self.link(
            &back_link,
            &self.vertex_dir(head.label(), head.id()).join(OUT_EDGES_DIR).join(&name),
        )?;
        self.link(
            &back_link,
            &self.vertex_dir(tail.label(), tail.id()).join(IN_EDGES_DIR).join(&name),
        )
    }

    pub fn write_edge_properties(&self, edge: &Edge) -> StorageResult<()> {
        let dir = self.edge_dir(edge.label(), edge.id());
        write_json(&dir.join(PROPERTIES_FILE), edge.properties())
    }

    pub fn remove_edge(&self, edge: &Edge, head: &Vertex, tail: &Vertex) -> StorageResult<()> {
        let name = edge.id().as_u64().to_string();
        remove_link(
            &self.vertex_dir(head.label(), head.id()).join(OUT_EDGES_DIR).join(&name),
        )?;
        remove_link(
            &self.vertex_dir(tail.label(), tail.id()).join(IN_EDGES_DIR).join(&name),
        )?;
        fs::remove_dir_all(self.edge_dir(edge.label(), edge.id()))?;
        Ok(())
    }

    fn link(&self, target: &Path, at: &Path) -> StorageResult<()> {
        match self.link_style {
            LinkStyle::Symlink => create_symlink(target, at)?,
            LinkStyle::Record => fs::write(at, target.to_string_lossy().as_bytes())?,
        }
        Ok(())
    }

    // ============================================================
    // Scan
    // ============================================================

    /// Read the whole tree. Fails with `CorruptLayout` when the skeleton is
    /// incomplete, a directory name is not a numeric identity, a properties
    /// record is missing, or an edge does not have exactly one head and one
    /// tail.
    pub fn scan(&self) -> StorageResult<LayoutScan> {
        self.check_skeleton()?;
        let header = self.read_header()?;
        let constraints = self.read_constraints()?;

        let mut vertices = Vec::new();
        for (label, label_dir) in subdirectories(&self.root.join(VERTICES_DIR))? {
            for (name, dir) in subdirectories(&label_dir)? {
                vertices.push(ScannedVertex {
                    id: VertexId::new(parse_id(&dir, &name)?),
                    label: Label::new(label.as_str()),
                    properties: read_properties(&dir)?,
                    in_edges: back_links(&dir.join(IN_EDGES_DIR))?,
                    out_edges: back_links(&dir.join(OUT_EDGES_DIR))?,
                });
            }
        }
        vertices.sort_by_key(|vertex| vertex.id);

        let mut edges = Vec::new();
        for (label, label_dir) in subdirectories(&self.root.join(EDGES_DIR))? {
            for (name, dir) in subdirectories(&label_dir)? {
                edges.push(ScannedEdge {
                    id: EdgeId::new(parse_id(&dir, &name)?),
                    label: Label::new(label.as_str()),
                    head: VertexId::new(single_endpoint(&dir.join(HEAD_DIR))?),
                    tail: VertexId::new(single_endpoint(&dir.join(TAIL_DIR))?),
                    properties: read_properties(&dir)?,
                });
            }
        }
        edges.sort_by_key(|edge| edge.id);

        debug!(
            "Scanned {:?}: {} vertices, {} edges, {} constraints",
            self.root,
            vertices.len(),
            edges.len(),
            constraints.len()
        );
        Ok(LayoutScan {
            header,
            constraints,
            vertices,
            edges,
        })
    }
}

fn up_to_root() -> PathBuf {
    std::iter::repeat("..").take(LINK_DEPTH).collect()
}

fn vertex_link_target(vertex: &Vertex) -> PathBuf {
    up_to_root()
        .join(VERTICES_DIR)
        .join(vertex.label().as_str())
        .join(vertex.id().as_u64().to_string())
}

fn edge_link_target(edge: &Edge) -> PathBuf {
    up_to_root()
        .join(EDGES_DIR)
        .join(edge.label().as_str())
        .join(edge.id().as_u64().to_string())
}

#[cfg(unix)]
fn create_symlink(target: &Path, at: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, at)
}

// Directory symlinks need elevated rights on Windows; write a record instead.
#[cfg(not(unix))]
fn create_symlink(target: &Path, at: &Path) -> io::Result<()> {
    fs::write(at, target.to_string_lossy().as_bytes())
}

fn remove_link(path: &Path) -> StorageResult<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
        _ => Ok(()),
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> StorageResult<()> {
    let mut temp = path.as_os_str().to_owned();
    temp.push(TEMP_SUFFIX);
    let temp = PathBuf::from(temp);
    fs::write(&temp, serde_json::to_vec_pretty(value)?)?;
    fs::rename(&temp, path)?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> StorageResult<T> {
    let bytes = fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn read_properties(dir: &Path) -> StorageResult<PropertyMap> {
    let path = dir.join(PROPERTIES_FILE);
    if !path.is_file() {
        return Err(StorageError::CorruptLayout(format!(
            "{} is missing",
            path.display()
        )));
    }
    read_json(&path)
}

fn entry_name(path: &Path, name: std::ffi::OsString) -> StorageResult<String> {
    name.into_string().map_err(|name| {
        StorageError::CorruptLayout(format!(
            "non UTF-8 entry {:?} in {}",
            name,
            path.display()
        ))
    })
}

/// Child directories of `dir` as (name, path), sorted by name. Plain files
/// such as the constraints record are skipped.
fn subdirectories(dir: &Path) -> StorageResult<Vec<(String, PathBuf)>> {
    let mut found = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            found.push((entry_name(dir, entry.file_name())?, entry.path()));
        }
    }
    found.sort();
    Ok(found)
}

/// Names of every entry in a link directory
fn link_names(dir: &Path) -> StorageResult<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        names.push(entry_name(dir, entry?.file_name())?);
    }
    names.sort();
    Ok(names)
}

fn back_links(dir: &Path) -> StorageResult<BTreeSet<EdgeId>> {
    if !dir.is_dir() {
        return Ok(BTreeSet::new());
    }
    link_names(dir)?
        .iter()
        .map(|name| parse_id(dir, name).map(EdgeId::new))
        .collect()
}

fn single_endpoint(dir: &Path) -> StorageResult<u64> {
    if !dir.is_dir() {
        return Err(StorageError::CorruptLayout(format!(
            "{} is missing",
            dir.display()
        )));
    }
    match link_names(dir)?.as_slice() {
        [name] => parse_id(dir, name),
        names => Err(StorageError::CorruptLayout(format!(
            "{} holds {} links, expected exactly one",
            dir.display(),
            names.len()
        ))),
    }
}

/// Identities are counters that must have a successor, so `u64::MAX` is
/// never a valid name.
fn parse_id(dir: &Path, name: &str) -> StorageResult<u64> {
    match name.parse::<u64>() {
        Ok(id) if id < u64::MAX => Ok(id),
        Ok(_) => Err(StorageError::CorruptLayout(format!(
            "{:?} in {} is past the last assignable identity",
            name,
            dir.display()
        ))),
        Err(_) => Err(StorageError::CorruptLayout(format!(
            "{:?} in {} is not a numeric identity",
            name,
            dir.display()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::property_map;
    use tempfile::TempDir;

    fn vertex(id: u64, label: &str) -> Vertex {
        Vertex::new(VertexId::new(id), label, property_map([("name", label)]))
    }

    fn edge(id: u64, head: u64, tail: u64) -> Edge {
        Edge::new(
            EdgeId::new(id),
            VertexId::new(head),
            "KNOWS",
            VertexId::new(tail),
            property_map([("since", 2020)]),
        )
    }

    fn layout(dir: &TempDir, style: LinkStyle) -> DiskLayout {
        let layout = DiskLayout::new(dir.path().join("graph"), style);
        layout.create_skeleton().unwrap();
        layout
    }

    #[test]
    fn test_skeleton() {
        let dir = TempDir::new().unwrap();
        let layout = DiskLayout::new(dir.path().join("graph"), LinkStyle::Record);
        assert!(layout.is_blank().unwrap());

        layout.create_skeleton().unwrap();
        assert!(!layout.is_blank().unwrap());
        assert!(layout.root().join("vertices").is_dir());
        assert!(layout.root().join("edges").is_dir());
        assert!(layout.read_constraints().unwrap().is_empty());
        assert_eq!(layout.read_header().unwrap(), Some(IdWatermark::default()));

        let scan = layout.scan().unwrap();
        assert!(scan.vertices.is_empty() && scan.edges.is_empty());
    }

    #[test]
    fn test_header_and_constraints_round_trip() {
        let dir = TempDir::new().unwrap();
        let layout = layout(&dir, LinkStyle::Record);
        let watermark = IdWatermark {
            next_vertex_id: 7,
            next_edge_id: 3,
        };
        layout.write_header(watermark).unwrap();
        layout
            .write_constraints(&[ConstraintKey::new("Person", "email")])
            .unwrap();

        assert_eq!(layout.read_header().unwrap(), Some(watermark));
        assert_eq!(
            layout.read_constraints().unwrap(),
            vec![ConstraintKey::new("Person", "email")]
        );
        assert!(!layout.root().join("graph.json.tmp").exists());
    }

    #[test]
    fn test_edge_writes_all_links() {
        let dir = TempDir::new().unwrap();
        let layout = layout(&dir, LinkStyle::Record);
        let (a, b) = (vertex(0, "Person"), vertex(1, "Company"));
        layout.create_vertex(&a).unwrap();
        layout.create_vertex(&b).unwrap();
        layout.create_edge(&edge(0, 0, 1), &a, &b).unwrap();

        let root = layout.root();
        assert!(root.join("edges/KNOWS/0/head/0").exists());
        assert!(root.join("edges/KNOWS/0/tail/1").exists());
        assert!(root.join("vertices/Person/0/out-edges/0").exists());
        assert!(root.join("vertices/Company/1/in-edges/0").exists());
        let record = fs::read_to_string(root.join("edges/KNOWS/0/tail/1")).unwrap();
        assert_eq!(Path::new(&record), Path::new("../../../../vertices/Company/1"));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_resolve_to_entity_dirs() {
        let dir = TempDir::new().unwrap();
        let layout = layout(&dir, LinkStyle::Symlink);
        let (a, b) = (vertex(0, "Person"), vertex(1, "Person"));
        layout.create_vertex(&a).unwrap();
        layout.create_vertex(&b).unwrap();
        layout.create_edge(&edge(4, 0, 1), &a, &b).unwrap();

        let root = layout.root();
        let head = root.join("edges/KNOWS/4/head/0");
        assert!(fs::symlink_metadata(&head).unwrap().file_type().is_symlink());
        assert!(head.join("properties.json").is_file());
        assert!(root
            .join("vertices/Person/1/in-edges/4/properties.json")
            .is_file());
    }

    #[test]
    fn test_scan_reads_back_entities() {
        let dir = TempDir::new().unwrap();
        let layout = layout(&dir, LinkStyle::Record);
        let (a, b) = (vertex(3, "Person"), vertex(1, "Person"));
        layout.create_vertex(&a).unwrap();
        layout.create_vertex(&b).unwrap();
        layout.create_edge(&edge(2, 3, 1), &a, &b).unwrap();

        let scan = layout.scan().unwrap();
        let ids: Vec<u64> = scan.vertices.iter().map(|v| v.id.as_u64()).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(scan.vertices[1].out_edges, BTreeSet::from([EdgeId::new(2)]));
        assert_eq!(scan.vertices[0].in_edges, BTreeSet::from([EdgeId::new(2)]));
        assert_eq!(scan.vertices[0].properties, property_map([("name", "Person")]));

        let scanned = &scan.edges[0];
        assert_eq!(scanned.head, VertexId::new(3));
        assert_eq!(scanned.tail, VertexId::new(1));
        assert_eq!(scanned.label.as_str(), "KNOWS");
        assert_eq!(scanned.properties, property_map([("since", 2020)]));
    }

    #[test]
    fn test_remove_edge_and_vertex() {
        let dir = TempDir::new().unwrap();
        let layout = layout(&dir, LinkStyle::Record);
        let (a, b) = (vertex(0, "Person"), vertex(1, "Person"));
        let e = edge(0, 0, 1);
        layout.create_vertex(&a).unwrap();
        layout.create_vertex(&b).unwrap();
        layout.create_edge(&e, &a, &b).unwrap();

        layout.remove_edge(&e, &a, &b).unwrap();
        assert!(!layout.root().join("edges/KNOWS/0").exists());
        assert!(!layout.root().join("vertices/Person/0/out-edges/0").exists());
        layout.remove_vertex(&a).unwrap();

        let scan = layout.scan().unwrap();
        assert_eq!(scan.vertices.len(), 1);
        assert!(scan.edges.is_empty());
    }

    #[test]
    fn test_missing_edges_dir_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let layout = layout(&dir, LinkStyle::Record);
        fs::remove_dir(layout.root().join("edges")).unwrap();
        assert!(matches!(layout.scan(), Err(StorageError::CorruptLayout(_))));
    }

    #[test]
    fn test_non_numeric_vertex_dir_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let layout = layout(&dir, LinkStyle::Record);
        fs::create_dir_all(layout.root().join("vertices/Person/alice")).unwrap();
        assert!(matches!(layout.scan(), Err(StorageError::CorruptLayout(_))));
    }

    #[test]
    fn test_last_identity_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let layout = layout(&dir, LinkStyle::Record);
        let a = vertex(u64::MAX, "Person");
        layout.create_vertex(&a).unwrap();
        assert!(matches!(layout.scan(), Err(StorageError::CorruptLayout(_))));
    }

    #[test]
    fn test_missing_properties_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let layout = layout(&dir, LinkStyle::Record);
        let a = vertex(0, "Person");
        layout.create_vertex(&a).unwrap();
        fs::remove_file(layout.vertex_dir(a.label(), a.id()).join("properties.json")).unwrap();
        assert!(matches!(layout.scan(), Err(StorageError::CorruptLayout(_))));
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("Person").is_ok());
        assert!(validate_name("HAS PART").is_ok());
        for bad in [
            "",
            ".",
            "..",
            "a/b",
            "a\\b",
            "constraints.json",
            "constraints.json.tmp",
            "Person.tmp",
        ] {
            assert!(
                matches!(validate_name(bad), Err(StorageError::InvalidName(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }
}
