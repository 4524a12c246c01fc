//! Error taxonomy shared by training, inference and metrics retrieval.

use std::path::PathBuf;

use thiserror::Error;

/// Coarse error category surfaced to callers (and mapped to status codes by transports).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A dataset, model artifact or metrics document does not exist.
    NotFound,
    /// The caller supplied something the core cannot work with.
    BadInput,
    /// Unexpected failure while fitting, serializing or touching storage.
    Internal,
}

/// Errors returned by the core operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Dataset not found.")]
    DatasetNotFound { path: PathBuf },
    #[error("Model not found.")]
    ModelNotFound { name: String },
    #[error("Metrics not found.")]
    MetricsNotFound { name: String },
    #[error("Error loading dataset: {0}")]
    DatasetParse(String),
    #[error("Target column not found in dataset.")]
    MissingTarget { column: String },
    #[error("Expected {expected} features, got {received}")]
    FeatureCountMismatch { expected: usize, received: usize },
    #[error("Input data must be a 2D array (list of lists).")]
    NotRectangular,
    #[error("This model does not support probability predictions.")]
    ProbabilitiesUnsupported,
    #[error("Could not retrieve 'classes_' from this model.")]
    ClassesUnavailable,
    #[error("{0}")]
    InvalidInput(String),
    #[error("Training cancelled")]
    Cancelled,
    #[error("Training failed: {0}")]
    Training(String),
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid JSON at {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Invalid model artifact at {path}: {reason}")]
    CorruptArtifact { path: PathBuf, reason: String },
}

/// Result alias used throughout the crate.
pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::DatasetNotFound { .. }
            | ServiceError::ModelNotFound { .. }
            | ServiceError::MetricsNotFound { .. } => ErrorKind::NotFound,
            ServiceError::DatasetParse(_)
            | ServiceError::MissingTarget { .. }
            | ServiceError::FeatureCountMismatch { .. }
            | ServiceError::NotRectangular
            | ServiceError::ProbabilitiesUnsupported
            | ServiceError::ClassesUnavailable
            | ServiceError::InvalidInput(_) => ErrorKind::BadInput,
            ServiceError::Cancelled
            | ServiceError::Training(_)
            | ServiceError::Io { .. }
            | ServiceError::Json { .. }
            | ServiceError::CorruptArtifact { .. } => ErrorKind::Internal,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ServiceError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        ServiceError::Json {
            path: path.into(),
            source,
        }
    }
}
