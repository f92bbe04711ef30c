//! Prometheus metrics for the chunkvault server.
//!
//! Counts chunk traffic, request errors by kind and retention deletions.
//! The `/metrics` endpoint is unauthenticated and only mounted when
//! `server.metrics_enabled` is set.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use chunkvault_engine::SweepReport;
use prometheus::{self, Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::{LazyLock, Once};

/// Global Prometheus registry for all metrics.
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// Chunk metrics
pub static CHUNKS_WRITTEN: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "chunkvault_chunks_written_total",
        "Total number of chunks persisted",
    )
    .expect("metric creation failed")
});

pub static CHUNK_BYTES_WRITTEN: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "chunkvault_chunk_bytes_written_total",
        "Total bytes persisted as chunk objects",
    )
    .expect("metric creation failed")
});

pub static CHUNKS_READ: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "chunkvault_chunks_read_total",
        "Total number of chunks served, including streamed downloads",
    )
    .expect("metric creation failed")
});

// Error metrics
pub static REQUEST_ERRORS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "chunkvault_request_errors_total",
            "Total failed requests by error kind",
        ),
        &["kind"],
    )
    .expect("metric creation failed")
});

// Retention metrics
pub static SWEEP_OBJECTS_DELETED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "chunkvault_sweep_objects_deleted_total",
        "Total objects deleted by retention sweeps",
    )
    .expect("metric creation failed")
});

pub static SWEEP_FAILURES: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "chunkvault_sweep_failures_total",
        "Total listing and deletion failures during retention sweeps",
    )
    .expect("metric creation failed")
});

static REGISTER_ONCE: Once = Once::new();

/// Register all metrics with the global registry.
pub fn register_metrics() {
    REGISTER_ONCE.call_once(|| {
        REGISTRY
            .register(Box::new(CHUNKS_WRITTEN.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(CHUNK_BYTES_WRITTEN.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(CHUNKS_READ.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(REQUEST_ERRORS.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(SWEEP_OBJECTS_DELETED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(SWEEP_FAILURES.clone()))
            .expect("metric registration failed");
    });
}

/// GET /metrics - Prometheus metrics endpoint.
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("Failed to encode metrics: {e}").into_bytes(),
        ),
    }
}

/// Record a failed request by its API error code.
pub fn record_request_error(kind: &str) {
    REQUEST_ERRORS.with_label_values(&[kind]).inc();
}

/// Record `count` persisted chunks totalling `bytes`.
pub fn record_chunks_written(count: u64, bytes: u64) {
    CHUNKS_WRITTEN.inc_by(count);
    CHUNK_BYTES_WRITTEN.inc_by(bytes);
}

/// Fold a completed retention sweep into the counters.
pub fn record_sweep(report: &SweepReport) {
    SWEEP_OBJECTS_DELETED.inc_by(report.deleted);
    SWEEP_FAILURES.inc_by(report.failures);
}
