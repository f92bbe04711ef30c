//! Storage usage and health handlers.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use serde::Serialize;

/// Storage usage response.
#[derive(Debug, Serialize)]
pub struct StorageInfoResponse {
    pub used_units: u64,
    pub limit_units: u64,
    pub used_bytes: u64,
}

/// GET /v1/storage - Current usage across every container.
pub async fn get_storage_info(State(state): State<AppState>) -> ApiResult<Json<StorageInfoResponse>> {
    let usage = state.quota.get_usage().await?;

    Ok(Json(StorageInfoResponse {
        used_units: usage.used_units,
        limit_units: usage.limit_units,
        used_bytes: usage.used_bytes,
    }))
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub backend: &'static str,
    pub version: &'static str,
}

/// GET /v1/health - Health check.
///
/// Probes the object store, bounded by the engine operation timeout.
/// Unauthenticated, for load balancer and orchestrator health checks.
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    let store = state.store();
    let limit = state.config.engine.operation_timeout();

    tokio::time::timeout(limit, store.health_check())
        .await
        .map_err(|_| ApiError::Timeout(format!("health check after {limit:?}")))??;

    Ok(Json(HealthResponse {
        status: "ok",
        backend: store.backend_name(),
        version: env!("CARGO_PKG_VERSION"),
    }))
}
