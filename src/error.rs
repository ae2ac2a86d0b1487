//! Error types for the churn pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, ChurnError>;

/// Main error type for the churn pipeline
#[derive(Error, Debug)]
pub enum ChurnError {
    #[error("Data error: {0}")]
    DataError(String),

    #[error("Encoding error: column '{column}' has unseen category '{category}'")]
    EncodingError { column: String, category: String },

    #[error("Column mismatch between train and test tables: {0}")]
    ColumnMismatch(String),

    #[error("No model found at {}. Run the training step first", path.display())]
    ModelNotFound { path: PathBuf },

    #[error("Request validation error: {0}")]
    RequestValidation(String),

    #[error("Feature schema mismatch: expected {expected}, got {actual}")]
    SchemaMismatch { expected: String, actual: String },

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Training error: {0}")]
    Training(String),

    #[error("Training exceeded its time budget of {secs:.1}s after {iterations} passes")]
    TrainingTimeout { secs: f64, iterations: usize },

    #[error("Grid search failed: all {0} grid points failed")]
    GridSearchFailed(usize),

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Tracking error: {0}")]
    Tracking(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ChurnError {
    /// True for errors caused by the input tables rather than the pipeline itself.
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            ChurnError::DataError(_) | ChurnError::EncodingError { .. } | ChurnError::ColumnMismatch(_)
        )
    }
}

impl From<polars::error::PolarsError> for ChurnError {
    fn from(err: polars::error::PolarsError) -> Self {
        ChurnError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for ChurnError {
    fn from(err: serde_json::Error) -> Self {
        ChurnError::Serialization(err.to_string())
    }
}

impl From<bincode::Error> for ChurnError {
    fn from(err: bincode::Error) -> Self {
        ChurnError::Serialization(err.to_string())
    }
}

impl From<ndarray::ShapeError> for ChurnError {
    fn from(err: ndarray::ShapeError) -> Self {
        ChurnError::SchemaMismatch {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
