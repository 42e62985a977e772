#![forbid(unsafe_code)]
//! logq-mem: per-query memory budget, spill segments, and the spill-backed
//! `RowBuffer` used for bulk handoff between commands.
//!
//! No object-store or file I/O lives here. Spill bytes go through the
//! `SpillStorage` trait, implemented by `logq-io`.

pub mod budget;
pub mod buffer;
pub mod error;
pub mod spill;

pub use budget::{MemoryBudget, Reservation};
pub use buffer::{BufferEnv, RowBuffer, RowBufferIter};
pub use spill::{Codec, SpillManager, SpillStorage};
