use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TradingError>;

#[derive(Error, Debug)]
pub enum TradingError {
    #[error("Data file not found at {0}")]
    MissingInput(PathBuf),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Missing required parameters: {}", .0.join(", "))]
    MissingConfiguration(Vec<String>),

    #[error("Q-table not found at {0}")]
    PersistenceMissing(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Chart error: {0}")]
    Chart(String),
}

impl From<postcard::Error> for TradingError {
    fn from(err: postcard::Error) -> Self {
        TradingError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for TradingError {
    fn from(err: serde_json::Error) -> Self {
        TradingError::Serialization(err.to_string())
    }
}
