//! Deadlines around store calls.

use crate::error::{EngineError, EngineResult};
use chunkvault_storage::StorageResult;
use std::future::Future;
use std::time::Duration;

/// Run one store operation under `limit`.
///
/// Store errors are wrapped with `op` and `key`; an elapsed deadline becomes
/// [`EngineError::Timeout`].
pub(crate) async fn within<T, F>(limit: Duration, op: &'static str, key: &str, fut: F) -> EngineResult<T>
where
    F: Future<Output = StorageResult<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(EngineError::store(op, key, err)),
        Err(_) => Err(EngineError::Timeout {
            op,
            key: key.to_string(),
            after: limit,
        }),
    }
}
