//! Error types for collision fatality prediction

use thiserror::Error;

/// Result type alias for crate operations
pub type Result<T> = std::result::Result<T, CollisionError>;

/// Main error type
#[derive(Error, Debug)]
pub enum CollisionError {
    /// An expected column is absent, or an unknown column appeared
    #[error("Schema error: {0}")]
    Schema(String),

    /// Unexpected missing or malformed value after cleaning
    #[error("Data quality error: {0}")]
    DataQuality(String),

    /// A YES/NO column holds a value outside the accepted set
    #[error("Invalid binary value in column '{column}' at row {row}: {value:?} (expected YES or NO)")]
    InvalidBinaryValue {
        column: String,
        row: usize,
        value: String,
    },

    /// Persisted pipeline/model pair is inconsistent or incomplete
    #[error("Artifact mismatch: {0}")]
    ArtifactMismatch(String),

    /// Inference attempted without loaded artifacts
    #[error("Service not ready: model and pipeline artifacts are not loaded")]
    ServiceNotReady,

    /// Probability requested from an ensemble containing a voter that cannot produce one
    #[error("Probability estimates unsupported: {0}")]
    ProbabilityUnsupported(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Data error: {0}")]
    Data(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    Shape { expected: String, actual: String },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Validation error: {0}")]
    Validation(String),
}

impl CollisionError {
    /// Whether the error was caused by the caller's input rather than the service
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            CollisionError::Schema(_)
                | CollisionError::DataQuality(_)
                | CollisionError::InvalidBinaryValue { .. }
                | CollisionError::Validation(_)
                | CollisionError::Shape { .. }
        )
    }
}

impl From<polars::error::PolarsError> for CollisionError {
    fn from(err: polars::error::PolarsError) -> Self {
        CollisionError::Data(err.to_string())
    }
}

impl From<serde_json::Error> for CollisionError {
    fn from(err: serde_json::Error) -> Self {
        CollisionError::Serialization(err.to_string())
    }
}

impl From<ndarray::ShapeError> for CollisionError {
    fn from(err: ndarray::ShapeError) -> Self {
        CollisionError::Shape {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
