//! Engine error types.

use chunkvault_storage::StorageError;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the chunk engine.
///
/// Store failures carry the operation and key that failed. Nothing in the
/// engine retries; that is left to callers and to [`crate::connect`].
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("not found: {key}")]
    NotFound { key: String },

    #[error("file {file_id} is incomplete: chunk {index} is missing")]
    BrokenSequence { file_id: String, index: u64 },

    #[error("invalid range: {0}")]
    RangeInvalid(String),

    #[error("chunk {key} is {size} bytes, over the {limit} byte limit")]
    SizeExceeded { key: String, size: u64, limit: u64 },

    #[error("store {op} failed for {key}: {source}")]
    StoreUnavailable {
        op: &'static str,
        key: String,
        #[source]
        source: StorageError,
    },

    #[error("store {op} for {key} timed out after {after:?}")]
    Timeout {
        op: &'static str,
        key: String,
        after: Duration,
    },

    #[error("replace of {file_id} left {} chunk(s) behind", .remaining.len())]
    PartialCleanupFailure {
        file_id: String,
        remaining: Vec<String>,
    },

    #[error("chunk {key} was already written by another writer")]
    IndexConflict { key: String },

    #[error("invalid file id: {0}")]
    InvalidFileId(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("object store unreachable after {attempts} attempt(s): {last_error}")]
    ConnectFailed { attempts: u32, last_error: String },
}

impl EngineError {
    /// Wrap a store error with the operation and key it came from.
    ///
    /// A missing object stays `NotFound` so readers can tell absence
    /// from an outage, and a key the backend cannot address is reported
    /// as `InvalidFileId`.
    pub fn store(op: &'static str, key: &str, err: StorageError) -> Self {
        match err {
            StorageError::NotFound(_) => EngineError::NotFound {
                key: key.to_string(),
            },
            // The key itself is unusable on this backend; retrying will not help.
            StorageError::InvalidKey(msg) => EngineError::InvalidFileId(msg),
            source => EngineError::StoreUnavailable {
                op,
                key: key.to_string(),
                source,
            },
        }
    }

    /// Short, stable name for logs and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::NotFound { .. } => "not_found",
            EngineError::BrokenSequence { .. } => "broken_sequence",
            EngineError::RangeInvalid(_) => "range_invalid",
            EngineError::SizeExceeded { .. } => "size_exceeded",
            EngineError::StoreUnavailable { .. } => "store_unavailable",
            EngineError::Timeout { .. } => "timeout",
            EngineError::PartialCleanupFailure { .. } => "partial_cleanup",
            EngineError::IndexConflict { .. } => "index_conflict",
            EngineError::InvalidFileId(_) => "invalid_file_id",
            EngineError::InvalidConfig(_) => "invalid_config",
            EngineError::ConnectFailed { .. } => "connect_failed",
        }
    }
}

impl From<chunkvault_core::Error> for EngineError {
    fn from(err: chunkvault_core::Error) -> Self {
        use chunkvault_core::Error;
        match err {
            Error::InvalidFileId(msg) => EngineError::InvalidFileId(msg),
            Error::InvalidChunkKey(key) => EngineError::InvalidFileId(key),
            Error::RangeInvalid(msg) => EngineError::RangeInvalid(msg),
            Error::InvalidConfig(msg) => EngineError::InvalidConfig(msg),
        }
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = std::result::Result<T, EngineError>;
