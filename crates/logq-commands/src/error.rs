use thiserror::Error;

pub type Result<T> = std::result::Result<T, CommandError>;

#[derive(Debug, Error)]
pub enum CommandError {
    /// Operation the command does not implement, e.g. `start()` on anything
    /// but a source. Never expected in a correctly built chain.
    #[error("{command}: {operation} is not supported")]
    NotSupported {
        command: &'static str,
        operation: &'static str,
    },

    #[error("execution error: {0}")]
    Exec(String),

    #[error(transparent)]
    Spill(#[from] logq_mem::error::Error),

    #[error(transparent)]
    Storage(#[from] logq_core::error::Error),
}
