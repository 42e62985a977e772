#![forbid(unsafe_code)]
//! logq-parser: the Syntax Registry.
//!
//! Each keyword module contributes its grammar through `QueryParser`. The
//! registry collects every contributor once per process and compiles query
//! text into a linked command chain:
//!
//! ```text
//! table events | search status >= 500 | stats count by host
//! ```
//!
//! Stages are separated by `|` outside double quotes. A contributor that
//! fails to register is logged and skipped; the others stay usable.

pub mod error;
pub mod lexer;
pub mod parsers;
pub mod registry;
pub mod syntax;

pub use error::{QuerySyntaxError, RegistrationError};
pub use registry::{RegistrationFailure, SyntaxRegistry};
pub use syntax::{ParseFn, QueryParser, Stage, Syntax};

/// Compile `query` with the process-wide registry.
pub fn compile(
    query: &str,
) -> Result<Box<dyn logq_commands::Command>, QuerySyntaxError> {
    SyntaxRegistry::global().compile(query)
}
