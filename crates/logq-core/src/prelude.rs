//! Convenient re-exports for downstream crates.

pub use crate::catalog::{
    LogStorage, LookupHandler, LookupService, RecordCursor, TableMetadata, TableRegistry,
};
pub use crate::config::EngineConfig;
pub use crate::error::{Error, Result};
pub use crate::id::{QueryId, SpillId, TableId};
pub use crate::row::{Header, Row};
pub use crate::value::Value;
