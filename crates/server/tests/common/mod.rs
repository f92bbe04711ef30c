//! Server test utilities.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use bytes::Bytes;
use chunkvault_core::config::AppConfig;
use chunkvault_server::{AppState, create_router};
use chunkvault_storage::{MemoryBackend, ObjectStore};
use std::sync::Arc;
use tower::ServiceExt;

/// Chunk limit small enough to exercise splitting.
#[allow(dead_code)]
pub const TEST_CHUNK_LIMIT: u64 = 16;

/// A router over an in-memory store the test can inspect directly.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: axum::Router,
    pub state: AppState,
    pub store: Arc<MemoryBackend>,
}

#[allow(dead_code)]
impl TestServer {
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    /// Start from the default test config with small chunks, then apply `tweak`.
    pub fn with_config(tweak: impl FnOnce(&mut AppConfig)) -> Self {
        let mut config = AppConfig::for_testing();
        config.engine.max_chunk_size = TEST_CHUNK_LIMIT;
        config.engine.operation_timeout_secs = 5;
        tweak(&mut config);

        let store = Arc::new(MemoryBackend::new());
        let state = AppState::new(config, store.clone() as Arc<dyn ObjectStore>)
            .expect("Failed to build app state");
        let router = create_router(state.clone());

        Self {
            router,
            state,
            store,
        }
    }

    /// Send a request and collect status, headers and the full body.
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        body: impl Into<Bytes>,
    ) -> (StatusCode, axum::http::HeaderMap, Bytes) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::from(body.into()))
            .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, headers, body)
    }

    /// Send a request and parse the body as JSON.
    pub async fn send_json(
        &self,
        method: &str,
        uri: &str,
        body: impl Into<Bytes>,
    ) -> (StatusCode, serde_json::Value) {
        let (status, _, body) = self.send(method, uri, body).await;
        let json = serde_json::from_slice(&body)
            .unwrap_or_else(|e| panic!("response was not JSON ({e}): {body:?}"));
        (status, json)
    }
}
