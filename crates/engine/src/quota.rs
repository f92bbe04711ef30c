//! Storage usage reporting.

use crate::deadline::within;
use crate::error::{EngineError, EngineResult};
use chunkvault_core::config::QuotaConfig;
use chunkvault_storage::ObjectStore;
use futures::TryStreamExt;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Point-in-time usage. Derived on every call, never persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct StorageUsage {
    pub used_bytes: u64,
    /// `used_bytes / unit_size_bytes`, rounded down.
    pub used_units: u64,
    pub limit_units: u64,
}

/// Sums object sizes across every container the store can see.
/// Informational only; nothing here enforces the limit.
#[derive(Clone)]
pub struct QuotaReporter {
    store: Arc<dyn ObjectStore>,
    unit_size_bytes: u64,
    capacity_units: u64,
    timeout: Duration,
}

impl QuotaReporter {
    pub fn new(store: Arc<dyn ObjectStore>, config: &QuotaConfig) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self {
            store,
            unit_size_bytes: config.unit_size_bytes,
            capacity_units: config.capacity_units,
            timeout: config.timeout(),
        })
    }

    /// Enumerate everything and total it. Any listing error fails the whole
    /// call; partial totals are never returned.
    pub async fn get_usage(&self) -> EngineResult<StorageUsage> {
        let (objects, used_bytes) = within(
            self.timeout,
            "list_all",
            "*",
            self.store
                .list_all_containers()
                .try_fold((0u64, 0u64), |(count, total), entry| async move {
                    Ok((count + 1, total.saturating_add(entry.size)))
                }),
        )
        .await
        .map_err(|e| match e {
            // An absent container during enumeration is still an outage here.
            EngineError::NotFound { key } => EngineError::StoreUnavailable {
                op: "list_all",
                source: chunkvault_storage::StorageError::NotFound(key.clone()),
                key,
            },
            other => other,
        })?;

        let usage = StorageUsage {
            used_bytes,
            used_units: used_bytes / self.unit_size_bytes,
            limit_units: self.capacity_units,
        };
        debug!(objects, used_bytes, used_units = usage.used_units, "Computed storage usage");
        Ok(usage)
    }
}
