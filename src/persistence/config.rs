//! Persistence configuration
//!
//! Loaded from YAML or built in code:
//!
//! ```yaml
//! root: /var/lib/dirgraph/social
//! link_style: symlink   # or: record
//! temp_prefix: dirgraph-
//! ```

use super::{StorageError, StorageResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How relationship pointers are written to disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkStyle {
    /// A relative symbolic link to the target directory
    Symlink,
    /// A regular file holding the relative target path
    Record,
}

impl LinkStyle {
    /// Symlinks where the platform has them, records elsewhere
    pub fn native() -> Self {
        if cfg!(unix) {
            LinkStyle::Symlink
        } else {
            LinkStyle::Record
        }
    }
}

impl Default for LinkStyle {
    fn default() -> Self {
        Self::native()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// Graph root. `None` creates a fresh temporary directory that is
    /// deleted when the graph is dropped.
    pub root: Option<PathBuf>,
    pub link_style: LinkStyle,
    /// Name prefix for temporary roots
    pub temp_prefix: String,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            root: None,
            link_style: LinkStyle::default(),
            temp_prefix: "dirgraph-".to_string(),
        }
    }
}

impl PersistenceConfig {
    pub fn with_root(mut self, root: impl AsRef<Path>) -> Self {
        self.root = Some(root.as_ref().to_path_buf());
        self
    }

    pub fn with_link_style(mut self, link_style: LinkStyle) -> Self {
        self.link_style = link_style;
        self
    }

    pub fn from_yaml_str(yaml: &str) -> StorageResult<Self> {
        serde_yaml::from_str(yaml).map_err(StorageError::Config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> StorageResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn to_yaml_string(&self) -> StorageResult<String> {
        serde_yaml::to_string(self).map_err(StorageError::Config)
    }
}
