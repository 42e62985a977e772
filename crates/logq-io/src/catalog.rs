//! YAML table catalog.
//!
//! ```yaml
//! tables:
//!   events:
//!     logformat: "_time user action"
//!     owner: ops
//! ```
//!
//! Ids are handed out in insertion order starting at 1; a loaded file
//! inserts its tables sorted by name, so ids are stable across loads.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};

use logq_core::catalog::{TableMetadata, TableRegistry};
use logq_core::id::TableId;

use crate::error::Result;
use crate::logs::FileLogStorage;

/// Catalog file name looked up by `TableCatalog::discover`.
pub const CATALOG_FILE: &str = "catalog.yaml";

#[derive(Debug, Default, Serialize, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    tables: BTreeMap<String, TableMetadata>,
}

#[derive(Debug, Default, Clone)]
pub struct TableCatalog {
    ids: BTreeMap<String, TableId>,
    metadata: HashMap<TableId, TableMetadata>,
    next_id: u64,
}

impl TableCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name`, replacing the metadata of an existing entry.
    pub fn insert(&mut self, name: impl Into<String>, metadata: TableMetadata) -> TableId {
        let name = name.into();
        let id = match self.ids.get(&name) {
            Some(id) => *id,
            None => {
                self.next_id += 1;
                let id = TableId::new(self.next_id);
                self.ids.insert(name, id);
                id
            }
        };
        self.metadata.insert(id, metadata);
        id
    }

    pub fn with_table(mut self, name: impl Into<String>, metadata: TableMetadata) -> Self {
        self.insert(name, metadata);
        self
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let file: CatalogFile = serde_yaml::from_str(text)?;
        let mut catalog = Self::new();
        for (name, meta) in file.tables {
            catalog.insert(name, meta);
        }
        Ok(catalog)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Catalog for a data directory: `catalog.yaml` when present, plus every
    /// `<table>.log` file it does not mention (with empty metadata).
    pub fn discover(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let file = dir.join(CATALOG_FILE);
        let mut catalog = if file.exists() {
            Self::load(&file)?
        } else {
            Self::new()
        };
        for name in FileLogStorage::new(dir).table_names()? {
            if !catalog.ids.contains_key(&name) {
                catalog.insert(name, TableMetadata::new());
            }
        }
        tracing::debug!(dir = %dir.display(), tables = catalog.ids.len(), "catalog loaded");
        Ok(catalog)
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        let tables = self
            .ids
            .iter()
            .filter_map(|(name, id)| Some((name.clone(), self.metadata.get(id)?.clone())))
            .collect();
        Ok(serde_yaml::to_string(&CatalogFile { tables })?)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.ids.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl TableRegistry for TableCatalog {
    fn table_id(&self, name: &str) -> Option<TableId> {
        self.ids.get(name).copied()
    }

    fn table_metadata(&self, id: TableId) -> Option<TableMetadata> {
        self.metadata.get(&id).cloned()
    }
}
