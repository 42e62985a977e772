//! Contracts for the engine's external collaborators.
//!
//! The engine only needs narrow views of them:
//! - `LogStorage`: table name -> sequential record cursor (used by `table`).
//! - `TableRegistry`: table name -> id -> metadata (used at bind time).
//! - `LookupService`: lookup name -> handler (used by `lookup`).
//!
//! Implementations live in `logq-io`; tests provide in-memory ones.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::id::TableId;
use crate::row::{header_from_logformat, Header, Row};
use crate::value::Value;

/// Metadata key holding the positional field order of a table's raw records.
pub const LOGFORMAT_KEY: &str = "logformat";

/// Sequential scan over one table. Yields rows in storage order.
pub trait RecordCursor: Iterator<Item = Result<Row>> + Send {}

impl<T> RecordCursor for T where T: Iterator<Item = Result<Row>> + Send {}

/// Read-only access to log tables.
pub trait LogStorage: Send + Sync {
    /// Open a sequential cursor over `table`.
    fn open(&self, table: &str) -> Result<Box<dyn RecordCursor>>;
}

/// Attribute map of a table as kept by the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableMetadata(pub BTreeMap<String, String>);

impl TableMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(|s| s.as_str())
    }

    pub fn logformat(&self) -> Option<&str> {
        self.get(LOGFORMAT_KEY)
    }

    /// Header declared by `logformat`, if any.
    pub fn header(&self) -> Option<Header> {
        self.logformat()
            .map(header_from_logformat)
            .filter(|h| !h.is_empty())
    }
}

/// Catalog of tables.
pub trait TableRegistry: Send + Sync {
    fn table_id(&self, name: &str) -> Option<TableId>;

    fn table_metadata(&self, id: TableId) -> Option<TableMetadata>;
}

/// One lookup table: maps a key value to enrichment values.
pub trait LookupHandler: Send + Sync {
    /// Look `value` up by `src_field` and return the `dst_field` column of the
    /// matching entry.
    fn lookup(&self, src_field: &str, dst_field: &str, value: &Value) -> Option<Value>;
}

/// Resolves lookup tables by name.
pub trait LookupService: Send + Sync {
    fn lookup_handler(&self, name: &str) -> Option<Arc<dyn LookupHandler>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_header_from_logformat() {
        let meta = TableMetadata::new().with(LOGFORMAT_KEY, "_time host status");
        let header = meta.header().unwrap();
        assert_eq!(header.len(), 3);
        assert_eq!(header[1], "host");
    }

    #[test]
    fn blank_logformat_is_no_header() {
        let meta = TableMetadata::new().with(LOGFORMAT_KEY, "   ");
        assert!(meta.header().is_none());
        assert!(TableMetadata::new().header().is_none());
    }
}
