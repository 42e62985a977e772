#![forbid(unsafe_code)]
//! logq-io: adapters between the engine and the outside world.
//!
//! - `storage`: `SpillStorage` backends (local directory, in-memory).
//! - `logs`: `LogStorage` over `<dir>/<table>.log` files or in-memory tables.
//! - `catalog`: YAML table catalog implementing `TableRegistry`.
//! - `lookup`: CSV lookup tables implementing `LookupService`.
//! - `writers`: JSONL result writer.

pub mod buf;
pub mod catalog;
pub mod error;
pub mod logs;
pub mod lookup;
pub mod storage;
pub mod writers;

pub use catalog::TableCatalog;
pub use error::{Error, Result};
pub use logs::{FileLogStorage, MemoryLogStorage};
pub use lookup::{CsvLookupTable, LookupTables};
pub use storage::{build_spill_manager, FsStorage, MemoryStorage};
pub use writers::jsonl::JsonlWriter;
