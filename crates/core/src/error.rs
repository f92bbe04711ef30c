//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid file id: {0}")]
    InvalidFileId(String),

    #[error("not a chunk key: {0}")]
    InvalidChunkKey(String),

    #[error("invalid range: {0}")]
    RangeInvalid(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
