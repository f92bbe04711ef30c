// Startup connection with bounded retries.

mod common;

use chunkvault_core::config::{ConnectConfig, StorageConfig};
use chunkvault_engine::{EngineError, connect_with_retry, wait_until_healthy};
use chunkvault_storage::ObjectStore;
use common::{FaultyStore, SlowStore};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

fn policy(attempts: u32) -> ConnectConfig {
    ConnectConfig {
        attempts,
        backoff_ms: 2000,
        attempt_timeout_secs: 1,
    }
}

#[tokio::test(start_paused = true)]
async fn test_recovers_after_transient_failures() {
    let store = FaultyStore::new();
    store.health_failures_left.store(2, Ordering::SeqCst);
    let dyn_store: Arc<dyn ObjectStore> = store.clone();

    wait_until_healthy(&dyn_store, &policy(5)).await.unwrap();
    assert_eq!(store.health_checks.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_gives_up_after_attempt_budget() {
    let store = FaultyStore::new();
    store.health_failures_left.store(u32::MAX, Ordering::SeqCst);
    let dyn_store: Arc<dyn ObjectStore> = store.clone();

    let started = tokio::time::Instant::now();
    let err = wait_until_healthy(&dyn_store, &policy(3)).await.unwrap_err();
    match err {
        EngineError::ConnectFailed { attempts, last_error } => {
            assert_eq!(attempts, 3);
            assert!(last_error.contains("injected failure"));
        }
        other => panic!("expected ConnectFailed, got {other:?}"),
    }
    assert_eq!(store.health_checks.load(Ordering::SeqCst), 3);
    // Backoff only between attempts.
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(4) && elapsed < Duration::from_secs(6), "{elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn test_hung_health_check_counts_as_failed_attempt() {
    let store: Arc<dyn ObjectStore> = SlowStore::new(Duration::from_secs(600), &["health"]);

    let err = wait_until_healthy(&store, &policy(2)).await.unwrap_err();
    match err {
        EngineError::ConnectFailed { last_error, .. } => assert!(last_error.contains("timed out")),
        other => panic!("expected ConnectFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_connect_memory_store() {
    let store = connect_with_retry(&StorageConfig::Memory, &policy(1)).await.unwrap();
    assert_eq!(store.backend_name(), "memory");
}

#[tokio::test]
async fn test_connect_filesystem_store() {
    let dir = tempfile::tempdir().unwrap();
    let config = StorageConfig::Filesystem {
        path: dir.path().join("root"),
    };
    let store = connect_with_retry(&config, &policy(1)).await.unwrap();
    assert_eq!(store.backend_name(), "filesystem");
}

#[tokio::test]
async fn test_invalid_storage_config_fails_without_retrying() {
    let config = StorageConfig::S3 {
        bucket: "files".to_string(),
        endpoint: None,
        region: None,
        prefix: None,
        access_key_id: Some("key".to_string()),
        secret_access_key: None,
        force_path_style: false,
    };
    let err = connect_with_retry(&config, &policy(10)).await.err().unwrap();
    assert!(matches!(err, EngineError::InvalidConfig(_)));
}

#[tokio::test]
async fn test_zero_attempts_is_rejected() {
    let err = connect_with_retry(&StorageConfig::Memory, &policy(0)).await.err().unwrap();
    assert!(matches!(err, EngineError::InvalidConfig(_)));
}
