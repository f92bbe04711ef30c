//! Integration tests for HTTP API endpoints.

mod common;

use axum::http::StatusCode;
use bytes::Bytes;
use chunkvault_storage::ObjectStore;
use common::{TEST_CHUNK_LIMIT, TestServer};

fn content(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

#[tokio::test]
async fn test_upload_then_download_round_trips() {
    let server = TestServer::new();
    let data = content(40);

    let (status, json) = server.send_json("PUT", "/v1/files/report.bin", data.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["file_id"], "report.bin");
    assert_eq!(json["chunks"], 3);
    assert_eq!(json["download_path"], "/download/report.bin");

    let (status, headers, body) = server.send("GET", "/download/report.bin", "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Bytes::from(data));
    assert_eq!(
        headers["content-disposition"],
        "attachment; filename=\"report.bin\""
    );
    assert_eq!(headers["x-content-type-options"], "nosniff");
}

#[tokio::test]
async fn test_upload_replaces_longer_file() {
    let server = TestServer::new();

    server.send_json("PUT", "/v1/files/doc", content(40)).await;
    let (status, json) = server.send_json("PUT", "/v1/files/doc", content(10)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["chunks"], 1);

    let (_, _, body) = server.send("GET", "/download/doc", "").await;
    assert_eq!(body.len(), 10);

    let (status, _) = server.send_json("GET", "/v1/files/doc/chunks/1", "").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_empty_upload_downloads_empty() {
    let server = TestServer::new();

    let (status, json) = server.send_json("PUT", "/v1/files/empty", "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["chunks"], 1);

    let (status, _, body) = server.send("GET", "/download/empty", "").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_empty());
}

#[tokio::test]
async fn test_append_assigns_sequential_indices() {
    let server = TestServer::new();

    for expected in 0..3 {
        let (status, json) = server
            .send_json("POST", "/v1/files/log/chunks", format!("part-{expected}"))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["index"], expected);
    }

    let (status, headers, body) = server.send("GET", "/v1/files/log/chunks/1", "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Bytes::from_static(b"part-1"));
    assert_eq!(headers["x-is-last-chunk"], "false");
    assert_eq!(headers["x-chunk-index"], "1");

    let (_, headers, _) = server.send("GET", "/v1/files/log/chunks/2", "").await;
    assert_eq!(headers["x-is-last-chunk"], "true");

    let (_, _, body) = server.send("GET", "/download/log", "").await;
    assert_eq!(body, Bytes::from_static(b"part-0part-1part-2"));
}

#[tokio::test]
async fn test_append_over_chunk_limit_is_rejected() {
    let server = TestServer::new();

    let (status, json) = server
        .send_json(
            "POST",
            "/v1/files/big/chunks",
            content(TEST_CHUNK_LIMIT as usize + 1),
        )
        .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(json["code"], "payload_too_large");
    assert!(server.store.is_empty().await);
}

#[tokio::test]
async fn test_missing_chunk_is_not_found() {
    let server = TestServer::new();

    let (status, json) = server.send_json("GET", "/v1/files/ghost/chunks/0", "").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "not_found");
    assert_eq!(json["message"], "file not found");

    let (status, json) = server.send_json("GET", "/download/ghost", "").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "not_found");
}

#[tokio::test]
async fn test_negative_index_is_bad_request() {
    let server = TestServer::new();
    server.send_json("POST", "/v1/files/doc/chunks", "x").await;

    let (status, json) = server.send_json("GET", "/v1/files/doc/chunks/-1", "").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "bad_request");
}

#[tokio::test]
async fn test_non_numeric_index_is_bad_request() {
    let server = TestServer::new();

    let (status, _, _) = server.send("GET", "/v1/files/doc/chunks/first", "").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_file_id_is_bad_request() {
    let server = TestServer::new();

    let (status, json) = server.send_json("POST", "/v1/files/a..b/chunks", "x").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "bad_request");
}

#[tokio::test]
async fn test_oversized_stored_chunk_is_corrupted() {
    let server = TestServer::new();
    server
        .store
        .put("tampered_chunk_0", Bytes::from(content(TEST_CHUNK_LIMIT as usize * 2)))
        .await
        .unwrap();

    let (status, json) = server.send_json("GET", "/v1/files/tampered/chunks/0", "").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["code"], "corrupted_chunk");

    // Fails before the first byte, so the download still gets a status.
    let (status, json) = server.send_json("GET", "/download/tampered", "").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["code"], "corrupted_chunk");
}

#[tokio::test]
async fn test_request_body_limit() {
    let server = TestServer::with_config(|config| config.server.max_body_bytes = 64);

    let (status, _, _) = server.send("PUT", "/v1/files/doc", content(100)).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(server.store.is_empty().await);
}

#[tokio::test]
async fn test_storage_info_totals_objects() {
    let server = TestServer::with_config(|config| config.quota.unit_size_bytes = 10);

    server.send_json("PUT", "/v1/files/a", content(25)).await;
    server.send_json("POST", "/v1/files/b/chunks", content(8)).await;

    let (status, json) = server.send_json("GET", "/v1/storage", "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["used_bytes"], 33);
    assert_eq!(json["used_units"], 3);
    assert_eq!(
        json["limit_units"],
        server.state.config.quota.capacity_units
    );
}

#[tokio::test]
async fn test_health_reports_backend() {
    let server = TestServer::new();

    let (status, json) = server.send_json("GET", "/v1/health", "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["backend"], "memory");
}

#[tokio::test]
async fn test_metrics_endpoint_toggle() {
    chunkvault_server::metrics::register_metrics();

    let server = TestServer::new();
    server.send_json("POST", "/v1/files/m/chunks", "abc").await;

    let (status, _, body) = server.send("GET", "/metrics", "").await;
    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("chunkvault_chunks_written_total"));

    let server = TestServer::with_config(|config| config.server.metrics_enabled = false);
    let (status, _, _) = server.send("GET", "/metrics", "").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
