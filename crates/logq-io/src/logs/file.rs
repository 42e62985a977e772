use std::path::{Path, PathBuf};

use logq_core::catalog::{LogStorage, RecordCursor};
use logq_core::error::{Error, Result};
use logq_core::row::Row;

use super::LOG_EXTENSION;
use crate::buf::{lines_from_path, DEFAULT_READ_CAPACITY};

/// Tables stored as `<dir>/<table>.log`, one raw record per line.
#[derive(Debug, Clone)]
pub struct FileLogStorage {
    dir: PathBuf,
    read_capacity: usize,
}

impl FileLogStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            read_capacity: DEFAULT_READ_CAPACITY,
        }
    }

    pub fn with_read_capacity(mut self, bytes: usize) -> Self {
        self.read_capacity = bytes.max(1);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn table_path(&self, table: &str) -> PathBuf {
        self.dir.join(format!("{table}.{LOG_EXTENSION}"))
    }

    /// Table names found in the directory, sorted.
    pub fn table_names(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(LOG_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

impl LogStorage for FileLogStorage {
    fn open(&self, table: &str) -> Result<Box<dyn RecordCursor>> {
        if table.contains(['/', '\\']) || table.starts_with('.') {
            return Err(Error::Storage(format!("invalid table name '{table}'")));
        }
        let path = self.table_path(table);
        let lines = lines_from_path(&path, self.read_capacity)
            .map_err(|e| Error::Storage(format!("open {}: {e}", path.display())))?;
        tracing::debug!(table, path = %path.display(), "opened table");
        Ok(Box::new(lines.map(|line| line.map(Row::from_raw).map_err(Error::from))))
    }
}
