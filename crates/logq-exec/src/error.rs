use thiserror::Error;

use logq_commands::CommandError;
use logq_parser::QuerySyntaxError;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("syntax error: {0}")]
    Syntax(#[from] QuerySyntaxError),

    #[error("unknown table '{0}'")]
    UnknownTable(String),

    #[error("no metadata for table '{0}'")]
    Metadata(String),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("spill setup: {0}")]
    Spill(#[from] logq_io::Error),

    #[error("query thread: {0}")]
    Thread(String),
}
