use thiserror::Error;

/// A query that does not match the grammar. `position` is the byte offset
/// into `query` of the offending stage or token.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message} (at position {position})")]
pub struct QuerySyntaxError {
    pub query: String,
    pub position: usize,
    pub message: String,
}

impl QuerySyntaxError {
    pub fn new(query: &str, position: usize, message: impl Into<String>) -> Self {
        Self {
            query: query.to_string(),
            position,
            message: message.into(),
        }
    }

    /// The query with a caret under `position`, for terminal output.
    pub fn pointer(&self) -> String {
        let col = self.query[..self.position.min(self.query.len())]
            .chars()
            .count();
        format!("{}\n{}^", self.query, " ".repeat(col))
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("keyword '{keyword}' is already registered by '{owner}'")]
    Duplicate {
        keyword: &'static str,
        owner: &'static str,
    },

    #[error("invalid keyword '{0}'")]
    InvalidKeyword(&'static str),
}
