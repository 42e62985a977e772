//! `LogStorage` implementations: where `table` reads its records from.

mod file;
mod memory;

pub use file::FileLogStorage;
pub use memory::MemoryLogStorage;

/// File extension of a table's record file.
pub const LOG_EXTENSION: &str = "log";
