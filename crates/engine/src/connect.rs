//! Startup connection to the object store.

use crate::error::{EngineError, EngineResult};
use chunkvault_core::config::{ConnectConfig, StorageConfig};
use chunkvault_storage::{ObjectStore, StorageError};
use std::future::Future;
use std::sync::Arc;
use tracing::{info, warn};

/// Build the configured backend and wait until it answers a health check.
///
/// Tries `attempts` times with a fixed backoff between attempts. Invalid
/// configuration fails at once; exhausting the budget returns
/// [`EngineError::ConnectFailed`].
pub async fn connect_with_retry(
    storage: &StorageConfig,
    connect: &ConnectConfig,
) -> EngineResult<Arc<dyn ObjectStore>> {
    let store = retry(connect, move || async move {
        match chunkvault_storage::from_config(storage).await {
            Ok(store) => Ok(check_health(&store, connect).await.map(|()| store)),
            Err(StorageError::Config(msg)) => Err(EngineError::InvalidConfig(msg)),
            Err(e) => Ok(Err(e.to_string())),
        }
    })
    .await?;

    info!(backend = store.backend_name(), "Connected to object store");
    Ok(store)
}

/// Retry the health check of an already-built store.
pub async fn wait_until_healthy(
    store: &Arc<dyn ObjectStore>,
    connect: &ConnectConfig,
) -> EngineResult<()> {
    retry(connect, move || async move { Ok(check_health(store, connect).await) }).await
}

/// Drive `attempt` until it succeeds or the budget runs out.
///
/// The outer `Err` aborts immediately; the inner `Err` is retried.
async fn retry<T, F, Fut>(connect: &ConnectConfig, mut attempt_fn: F) -> EngineResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = EngineResult<Result<T, String>>>,
{
    connect.validate()?;

    let mut last_error = String::new();
    for attempt in 1..=connect.attempts {
        match attempt_fn().await? {
            Ok(value) => return Ok(value),
            Err(error) => {
                warn!(attempt, attempts = connect.attempts, error = %error, "Object store not ready");
                last_error = error;
            }
        }
        if attempt < connect.attempts {
            tokio::time::sleep(connect.backoff()).await;
        }
    }

    Err(EngineError::ConnectFailed {
        attempts: connect.attempts,
        last_error,
    })
}

async fn check_health(store: &Arc<dyn ObjectStore>, connect: &ConnectConfig) -> Result<(), String> {
    match tokio::time::timeout(connect.attempt_timeout(), store.health_check()).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err(format!(
            "health check timed out after {:?}",
            connect.attempt_timeout()
        )),
    }
}
