use polars::prelude::PolarsError;
use thiserror::Error;

/// Errors that can occur while acquiring, preparing or modeling the dataset
#[derive(Error, Debug)]
pub enum ZillowError {
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    #[error("Schema mismatch on column '{column}': {reason}")]
    SchemaMismatch { column: String, reason: String },

    #[error("Invalid metric input: {0}")]
    InvalidMetricInput(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error(transparent)]
    Polars(#[from] PolarsError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ZillowError {
    pub(crate) fn missing_column(column: &str) -> Self {
        ZillowError::SchemaMismatch {
            column: column.to_string(),
            reason: "column not found".to_string(),
        }
    }
}

/// Result type for pipeline operations
pub type ZillowResult<T> = Result<T, ZillowError>;
