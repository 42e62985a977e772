#![forbid(unsafe_code)]
//! logq-core: values, rows, lazy field resolution, and the contracts the
//! engine expects from its external collaborators (storage, catalog, lookup).
//!
//! No I/O and no threads live here. Concrete storage/catalog adapters are in
//! `logq-io`; commands and the pipeline protocol are in `logq-commands`.

pub mod catalog;
pub mod config;
pub mod error;
pub mod id;
pub mod prelude;
pub mod row;
pub mod value;

/// Engine version string reported by the CLI and query logs.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
