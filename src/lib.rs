#![forbid(unsafe_code)]
//! logq: a pipe-query engine for raw log tables.
//!
//! ```text
//! table events | search status >= 500 | stats count by host
//! ```
//!
//! This crate only re-exports the workspace members; the integration tests
//! and benches under the repository root build against it.

pub use logq_commands as commands;
pub use logq_core as core;
pub use logq_exec as exec;
pub use logq_io as io;
pub use logq_mem as mem;
pub use logq_parser as parser;

pub use logq_exec::{QueryService, QueryReport};
