//! Error types for moodscan

use serde::{Deserialize, Serialize};

/// Result type alias using moodscan's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for moodscan operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Input text rejected before classification
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The model-backed path cannot serve requests
    #[error("classifier unavailable: {0}")]
    ClassifierUnavailable(String),

    /// Batch exceeds the configured upper bound; nothing was processed
    #[error("batch of {size} texts exceeds the limit of {limit}")]
    BatchTooLarge { size: usize, limit: usize },

    /// Chunk size must be at least one
    #[error("invalid chunk size: {0}")]
    InvalidChunkSize(usize),

    /// Comparison request outside the accepted shape
    #[error("invalid comparison: {0}")]
    InvalidComparison(String),

    /// Classifier construction or execution errors
    #[error("classifier error: {0}")]
    Classifier(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a new classifier-unavailable error
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::ClassifierUnavailable(msg.into())
    }

    /// Create a new classifier error
    pub fn classifier(msg: impl Into<String>) -> Self {
        Self::Classifier(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether this error aborts a whole batch request
    pub fn is_batch_fatal(&self) -> bool {
        matches!(self, Self::BatchTooLarge { .. } | Self::InvalidChunkSize(_))
    }
}

/// Reason a text was rejected by the validator
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, thiserror::Error,
)]
pub enum ValidationError {
    /// Empty or fewer than the minimum number of characters
    #[error("text is too short")]
    TooShort,

    /// More than the maximum number of characters
    #[error("text is too long")]
    TooLong,

    /// Binary payloads, control characters or mostly non-textual content
    #[error("text content is invalid")]
    InvalidContent,
}

impl ValidationError {
    /// Stable machine-readable name, used as a metrics label
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TooShort => "too_short",
            Self::TooLong => "too_long",
            Self::InvalidContent => "invalid_content",
        }
    }
}
