//! API error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chunkvault_engine::EngineError;
use serde::Serialize;

/// API error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("file not found")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("incomplete or corrupted file")]
    IncompleteFile(String),

    #[error("corrupted chunk: {0}")]
    CorruptedChunk(String),

    #[error("partial cleanup: {0}")]
    PartialCleanup(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Map an engine error from a read path.
    ///
    /// A stored chunk over the size limit means the data was tampered with
    /// or written by something else, so it is reported as a bad gateway.
    pub fn read(err: EngineError) -> Self {
        match err {
            EngineError::SizeExceeded { .. } => Self::CorruptedChunk(err.to_string()),
            other => other.into(),
        }
    }

    /// Get the error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::BadRequest(_) => "bad_request",
            Self::Conflict(_) => "conflict",
            Self::PayloadTooLarge(_) => "payload_too_large",
            Self::IncompleteFile(_) => "incomplete_file",
            Self::CorruptedChunk(_) => "corrupted_chunk",
            Self::PartialCleanup(_) => "partial_cleanup",
            Self::Timeout(_) => "timeout",
            Self::Unavailable(_) => "storage_unavailable",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::IncompleteFile(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::CorruptedChunk(_) => StatusCode::BAD_GATEWAY,
            Self::PartialCleanup(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Write-path mapping. Reads go through [`ApiError::read`].
impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        let message = err.to_string();
        match err {
            EngineError::NotFound { key } => Self::NotFound(key),
            EngineError::BrokenSequence { .. } => Self::IncompleteFile(message),
            EngineError::RangeInvalid(_) | EngineError::InvalidFileId(_) => {
                Self::BadRequest(message)
            }
            EngineError::SizeExceeded { .. } => Self::PayloadTooLarge(message),
            EngineError::StoreUnavailable { .. } => Self::Unavailable(message),
            EngineError::Timeout { .. } => Self::Timeout(message),
            EngineError::PartialCleanupFailure { .. } => Self::PartialCleanup(message),
            EngineError::IndexConflict { .. } => Self::Conflict(message),
            EngineError::InvalidConfig(_) | EngineError::ConnectFailed { .. } => {
                Self::Internal(message)
            }
        }
    }
}

impl From<chunkvault_core::Error> for ApiError {
    fn from(err: chunkvault_core::Error) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<chunkvault_storage::StorageError> for ApiError {
    fn from(err: chunkvault_storage::StorageError) -> Self {
        Self::Unavailable(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        crate::metrics::record_request_error(self.code());
        if status.is_server_error() {
            tracing::warn!(code = self.code(), error = %self, "Request failed");
        }
        let body = ErrorResponse {
            code: self.code().to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_size_exceeded_depends_on_direction() {
        let oversized = || EngineError::SizeExceeded {
            key: "doc_chunk_0".to_string(),
            size: 10,
            limit: 5,
        };
        assert_eq!(
            ApiError::from(oversized()).status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(ApiError::read(oversized()).status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(ApiError::read(oversized()).code(), "corrupted_chunk");
    }

    #[test]
    fn test_engine_error_status_mapping() {
        let cases = [
            (
                EngineError::NotFound {
                    key: "doc_chunk_0".to_string(),
                },
                StatusCode::NOT_FOUND,
            ),
            (
                EngineError::BrokenSequence {
                    file_id: "doc".to_string(),
                    index: 2,
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                EngineError::RangeInvalid("negative".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                EngineError::Timeout {
                    op: "get",
                    key: "doc_chunk_0".to_string(),
                    after: Duration::from_secs(1),
                },
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (
                EngineError::IndexConflict {
                    key: "doc_chunk_1".to_string(),
                },
                StatusCode::CONFLICT,
            ),
            (
                EngineError::PartialCleanupFailure {
                    file_id: "doc".to_string(),
                    remaining: vec!["doc_chunk_3".to_string()],
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::read(err).status_code(), status);
        }
    }

    #[test]
    fn test_not_found_message_is_generic() {
        let err = ApiError::from(EngineError::NotFound {
            key: "secret_chunk_0".to_string(),
        });
        assert_eq!(err.to_string(), "file not found");
    }
}
