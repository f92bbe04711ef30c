//! File upload, chunk and download handlers.

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;
use axum::Json;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS};
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use chunkvault_core::FileId;
use chunkvault_core::chunk::index_from_wire;
use futures::{StreamExt, stream};
use serde::Serialize;

/// `true` when the served chunk is the final one of its file.
pub const X_IS_LAST_CHUNK: HeaderName = HeaderName::from_static("x-is-last-chunk");

/// Index of the served chunk.
pub const X_CHUNK_INDEX: HeaderName = HeaderName::from_static("x-chunk-index");

const OCTET_STREAM: HeaderValue = HeaderValue::from_static("application/octet-stream");

/// Whole-file upload response.
#[derive(Debug, Serialize)]
pub struct UploadFileResponse {
    pub file_id: String,
    /// Number of chunks now stored for the file.
    pub chunks: u64,
    pub download_path: String,
}

/// PUT /v1/files/{file_id} - Replace a file with the request body.
pub async fn upload_file(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<UploadFileResponse>> {
    let file = FileId::new(file_id)?;
    let size = body.len() as u64;

    let chunks = state.engine.replace_file(&file, body).await?;
    metrics::record_chunks_written(chunks, size);
    tracing::info!(file_id = %file, chunks, bytes = size, "File replaced");

    Ok(Json(UploadFileResponse {
        download_path: format!("/download/{file}"),
        file_id: file.to_string(),
        chunks,
    }))
}

/// Append-chunk response.
#[derive(Debug, Serialize)]
pub struct AddChunkResponse {
    pub success: bool,
    pub index: u64,
    pub message: String,
}

/// POST /v1/files/{file_id}/chunks - Append one chunk.
pub async fn add_chunk(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<AddChunkResponse>> {
    let file = FileId::new(file_id)?;
    let size = body.len() as u64;

    let index = state.engine.append_chunk(&file, body).await?;
    metrics::record_chunks_written(1, size);

    Ok(Json(AddChunkResponse {
        success: true,
        index,
        message: format!("stored chunk {index} of {file}"),
    }))
}

/// GET /v1/files/{file_id}/chunks/{index} - Read one chunk.
///
/// Negative indices are rejected with 400 rather than by the router.
pub async fn get_chunk(
    State(state): State<AppState>,
    Path((file_id, index)): Path<(String, i64)>,
) -> ApiResult<Response> {
    let file = FileId::new(file_id)?;
    let index = index_from_wire(index)?;

    let chunk = state
        .engine
        .read_chunk(&file, index, state.engine.max_chunk_size())
        .await
        .map_err(ApiError::read)?;
    metrics::CHUNKS_READ.inc();

    let is_last = if chunk.is_last { "true" } else { "false" };
    Ok((
        StatusCode::OK,
        [
            (CONTENT_TYPE, OCTET_STREAM),
            (X_IS_LAST_CHUNK, HeaderValue::from_static(is_last)),
            (X_CHUNK_INDEX, HeaderValue::from(chunk.index)),
        ],
        Body::from(chunk.data),
    )
        .into_response())
}

/// GET /download/{file_id} - Stream the whole file.
///
/// The first chunk is read before the response starts so that a missing or
/// unreadable file gets a proper status. Later failures abort the body.
pub async fn download_file(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> ApiResult<Response> {
    let file = FileId::new(file_id)?;
    let disposition = content_disposition(&file);

    let mut chunks = state.engine.stream_file(file.clone());
    let first = match chunks.next().await {
        Some(first) => first.map_err(ApiError::read)?,
        None => Bytes::new(),
    };
    metrics::CHUNKS_READ.inc();

    let rest = chunks.map(move |result| {
        result
            .inspect(|_| metrics::CHUNKS_READ.inc())
            .map_err(|e| {
                tracing::error!(file_id = %file, error = %e, "Download failed mid-transfer");
                metrics::record_request_error(e.kind());
                std::io::Error::other(e.to_string())
            })
    });
    let body = Body::from_stream(stream::once(async move { Ok::<_, std::io::Error>(first) }).chain(rest));

    Ok((
        StatusCode::OK,
        [
            (CONTENT_TYPE, OCTET_STREAM),
            (CONTENT_DISPOSITION, disposition),
            (X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff")),
        ],
        body,
    )
        .into_response())
}

/// `attachment; filename="..."` with characters that cannot be quoted dropped.
fn content_disposition(file: &FileId) -> HeaderValue {
    let name: String = file
        .as_str()
        .chars()
        .filter(|c| (c.is_ascii_graphic() || *c == ' ') && *c != '"' && *c != '\\')
        .collect();
    if name.is_empty() {
        return HeaderValue::from_static("attachment");
    }
    HeaderValue::from_str(&format!("attachment; filename=\"{name}\""))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}
