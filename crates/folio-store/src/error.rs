//! Error types for the data store.

use thiserror::Error;

/// Errors that can occur in the data store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The supplied file name is empty or only a path-traversal segment.
    #[error("invalid filename")]
    InvalidFilename(String),

    /// The upload encoding is not one of the supported values.
    #[error("encoding must be utf8 or base64")]
    UnsupportedEncoding(String),

    /// The upload content could not be decoded with the declared encoding.
    #[error("invalid base64 content: {0}")]
    InvalidPayload(String),

    /// The named file does not exist in the data directory.
    #[error("file not found: {0}")]
    NotFound(String),

    /// The persisted status document is not valid JSON.
    #[error("status parse error: {0}")]
    StatusParse(#[source] serde_json::Error),

    /// Serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
