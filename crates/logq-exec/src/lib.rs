#![forbid(unsafe_code)]
//! logq-exec: turns query text into a bound, runnable chain and drives it.
//!
//! - `bind`: compile, attach context/storage/header/lookups, append the sink,
//!   place the timeline reporter.
//! - `query`: `Query` (owns the chain) and the thread-safe `QueryHandle`.
//! - `service`: `QueryService`, one driving thread per query.
//! - `sink`: the terminal `ResultSink` and its row consumers.

pub mod bind;
pub mod error;
pub mod query;
pub mod service;
pub mod sink;

pub use bind::create_command;
pub use error::ExecError;
pub use query::{CommandState, Query, QueryHandle, QueryReport};
pub use service::{QueryService, RunningQuery};
pub use sink::{CollectRows, JsonlRows, ResultSink, RowConsumer};
