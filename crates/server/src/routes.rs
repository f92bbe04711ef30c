//! Route configuration.

use crate::handlers;
use crate::metrics::metrics_handler;
use crate::state::AppState;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post, put};
use tower_http::trace::TraceLayer;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/v1/health", get(handlers::health_check))
        .route("/v1/storage", get(handlers::get_storage_info))
        .route("/v1/files/{file_id}", put(handlers::upload_file))
        .route("/v1/files/{file_id}/chunks", post(handlers::add_chunk))
        .route(
            "/v1/files/{file_id}/chunks/{index}",
            get(handlers::get_chunk),
        );

    let download_routes = Router::new().route("/download/{file_id}", get(handlers::download_file));

    let mut router = Router::new().merge(api_routes).merge(download_routes);

    // Unauthenticated; keep it off public networks.
    if state.config.server.metrics_enabled {
        let metrics_routes = Router::new().route("/metrics", get(metrics_handler));
        router = router.merge(metrics_routes);
    }

    router
        .layer(DefaultBodyLimit::max(state.config.server.max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
