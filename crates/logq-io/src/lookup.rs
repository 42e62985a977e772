//! CSV-backed lookup tables.
//!
//! A lookup table is a CSV file with a header row. `lookup(src, dst, v)`
//! finds the first record whose `src` column equals `v` (compared as text)
//! and returns its `dst` column. Indexes are built per column on first use.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use std::sync::{Arc, RwLock};

use logq_core::catalog::{LookupHandler, LookupService};
use logq_core::value::Value;

use crate::error::Result;

/// Extension of lookup files picked up by `LookupTables::load_dir`.
pub const LOOKUP_EXTENSION: &str = "csv";

pub struct CsvLookupTable {
    columns: Vec<String>,
    records: Vec<Vec<String>>,
    // column index -> key text -> first record index
    indexes: RwLock<HashMap<usize, Arc<HashMap<String, usize>>>>,
}

impl CsvLookupTable {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let columns = rdr.headers()?.iter().map(|s| s.to_string()).collect();
        let mut records = Vec::new();
        for rec in rdr.records() {
            records.push(rec?.iter().map(|s| s.to_string()).collect());
        }
        Ok(Self {
            columns,
            records,
            indexes: RwLock::new(HashMap::new()),
        })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    fn index(&self, col: usize) -> Arc<HashMap<String, usize>> {
        if let Ok(indexes) = self.indexes.read() {
            if let Some(idx) = indexes.get(&col) {
                return Arc::clone(idx);
            }
        }
        let mut idx = HashMap::with_capacity(self.records.len());
        for (i, rec) in self.records.iter().enumerate() {
            if let Some(key) = rec.get(col) {
                idx.entry(key.clone()).or_insert(i);
            }
        }
        let idx = Arc::new(idx);
        if let Ok(mut indexes) = self.indexes.write() {
            indexes.entry(col).or_insert_with(|| Arc::clone(&idx));
        }
        idx
    }
}

impl LookupHandler for CsvLookupTable {
    fn lookup(&self, src_field: &str, dst_field: &str, value: &Value) -> Option<Value> {
        if value.is_null() {
            return None;
        }
        let src = self.column(src_field)?;
        let dst = self.column(dst_field)?;
        let row = *self.index(src).get(&value.to_string())?;
        self.records[row].get(dst).map(|s| Value::str(s.as_str()))
    }
}

/// Named lookup tables; implements `LookupService`.
#[derive(Default, Clone)]
pub struct LookupTables {
    tables: HashMap<String, Arc<dyn LookupHandler>>,
}

impl LookupTables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, handler: Arc<dyn LookupHandler>) {
        self.tables.insert(name.into(), handler);
    }

    pub fn with(mut self, name: impl Into<String>, handler: Arc<dyn LookupHandler>) -> Self {
        self.insert(name, handler);
        self
    }

    /// Load every `<name>.csv` in `dir`. A missing directory yields no tables.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let mut out = Self::new();
        if !dir.is_dir() {
            return Ok(out);
        }
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(LOOKUP_EXTENSION) {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let table = CsvLookupTable::from_path(&path)?;
            tracing::debug!(lookup = name, records = table.len(), "loaded lookup table");
            out.insert(name.to_string(), Arc::new(table));
        }
        Ok(out)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(|s| s.as_str())
    }
}

impl LookupService for LookupTables {
    fn lookup_handler(&self, name: &str) -> Option<Arc<dyn LookupHandler>> {
        self.tables.get(name).cloned()
    }
}
