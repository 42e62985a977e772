use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("catalog yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("config: {0}")]
    Config(String),

    #[error(transparent)]
    Mem(#[from] logq_mem::error::Error),

    #[error(transparent)]
    Core(#[from] logq_core::error::Error),
}

impl From<Error> for logq_core::error::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::Core(e) => e,
            Error::Yaml(e) => logq_core::error::Error::Catalog(e.to_string()),
            Error::Csv(e) => logq_core::error::Error::Lookup(e.to_string()),
            Error::Config(s) => logq_core::error::Error::Config(s),
            other => logq_core::error::Error::Storage(other.to_string()),
        }
    }
}
