//! Error types for the box-office feature pipeline

use thiserror::Error;

/// Result type alias used across the crate
pub type Result<T> = std::result::Result<T, BoxOfficeError>;

/// Main error type
#[derive(Error, Debug)]
pub enum BoxOfficeError {
    #[error("Data error: {0}")]
    DataError(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Search error: {0}")]
    SearchError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Feature not found: {0}")]
    FeatureNotFound(String),

    /// A parsed record lacks a field the encoding strategy depends on.
    #[error("Record in column '{column}' has no '{field}' field")]
    MissingField { column: String, field: String },

    #[error("No {0} series was given to this encoder")]
    MissingSplit(String),

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<polars::error::PolarsError> for BoxOfficeError {
    fn from(err: polars::error::PolarsError) -> Self {
        BoxOfficeError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for BoxOfficeError {
    fn from(err: serde_json::Error) -> Self {
        BoxOfficeError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for BoxOfficeError {
    fn from(err: ndarray::ShapeError) -> Self {
        BoxOfficeError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
