//! Error types for ensemble aggregation

use thiserror::Error;

/// Core error type for ensemble operations
#[derive(Error, Debug)]
pub enum EnsembleError {
    /// Unrecognised frequency keyword or malformed time index
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Operand rows do not line up with the reference rows
    #[error("Data integrity error at row {row}: expected {expected}, found {found}")]
    DataIntegrity {
        row: usize,
        expected: String,
        found: String,
    },

    /// A provider failed to produce data
    #[error("Provider error: {0}")]
    Provider(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EnsembleError {
    /// Create an invalid-argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a provider error
    pub fn provider(msg: impl Into<String>) -> Self {
        Self::Provider(msg.into())
    }
}

/// Result type for ensemble operations
pub type Result<T> = std::result::Result<T, EnsembleError>;
