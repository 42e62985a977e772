#![forbid(unsafe_code)]
//! logq-commands: the command chain and the built-in commands.
//!
//! A query compiles into a forward-linked chain of `Command`s. The head
//! (`table`) pulls records from storage in `start()` and pushes them down the
//! chain one call at a time; `eof()` ends the chain forward and, when it starts
//! mid-chain, asks the head to stop through the shared `QueryContext`.

pub mod command;
pub mod commands;
pub mod context;
pub mod error;
pub mod sort;
pub mod status;

pub use command::{chain_len, for_each_command, Command, CommandCore};
pub use context::{QueryContext, TimelineCallback};
pub use error::{CommandError, Result};
pub use status::{Status, StatusCell};
