//! HTTP API server for the chunkvault storage engine.
//!
//! This crate binds the engine to HTTP:
//! - Whole-file upload and chunk append
//! - Single-chunk reads and streamed downloads
//! - Storage usage, health and Prometheus metrics

pub mod error;
pub mod handlers;
pub mod metrics;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
