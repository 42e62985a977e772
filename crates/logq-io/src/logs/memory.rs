use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use logq_core::catalog::{LogStorage, RecordCursor};
use logq_core::error::{Error, Result};
use logq_core::row::Row;

/// Tables held in memory as raw records. Clones share the same tables.
#[derive(Clone, Default)]
pub struct MemoryLogStorage {
    tables: Arc<RwLock<HashMap<String, Arc<Vec<String>>>>>,
}

impl MemoryLogStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the records of `table`.
    pub fn insert<I, S>(&self, table: impl Into<String>, records: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let records: Vec<String> = records.into_iter().map(Into::into).collect();
        if let Ok(mut tables) = self.tables.write() {
            tables.insert(table.into(), Arc::new(records));
        }
    }

    pub fn with_table<I, S>(self, table: impl Into<String>, records: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert(table, records);
        self
    }
}

impl LogStorage for MemoryLogStorage {
    fn open(&self, table: &str) -> Result<Box<dyn RecordCursor>> {
        let records = self
            .tables
            .read()
            .map_err(|_| Error::Storage("log storage lock poisoned".into()))?
            .get(table)
            .cloned()
            .ok_or_else(|| Error::Storage(format!("no such table '{table}'")))?;
        let len = records.len();
        Ok(Box::new(
            (0..len).map(move |i| Ok::<_, Error>(Row::from_raw(records[i].clone()))),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_open_starts_a_fresh_scan() {
        let storage = MemoryLogStorage::new().with_table("t", ["a 1", "b 2"]);
        assert_eq!(storage.open("t").unwrap().count(), 2);
        let first = storage.open("t").unwrap().next().unwrap().unwrap();
        assert_eq!(first.raw(), Some("a 1"));
        assert!(storage.open("missing").is_err());
    }
}
