//! In-process storage backend.
//!
//! Holds every object in a map guarded by a single lock. Intended for
//! tests and throwaway deployments; nothing survives a restart.

use crate::error::{StorageError, StorageResult};
use crate::traits::{ObjectEntry, ObjectMeta, ObjectStore, ObjectStream};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::BTreeMap;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use tracing::instrument;

#[derive(Clone)]
struct StoredObject {
    data: Bytes,
    last_modified: Option<OffsetDateTime>,
}

/// In-memory object store.
#[derive(Default)]
pub struct MemoryBackend {
    objects: RwLock<BTreeMap<String, StoredObject>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an object with an explicit modification time.
    ///
    /// `None` simulates a backend that reports no timestamp.
    pub async fn put_at(&self, key: &str, data: Bytes, last_modified: Option<OffsetDateTime>) {
        self.objects.write().await.insert(
            key.to_string(),
            StoredObject {
                data,
                last_modified,
            },
        );
    }

    /// Number of stored objects.
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }

    /// All keys in lexicographic order.
    pub async fn keys(&self) -> Vec<String> {
        self.objects.read().await.keys().cloned().collect()
    }
}

fn check_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("empty key".to_string()));
    }
    Ok(())
}

#[async_trait]
impl ObjectStore for MemoryBackend {
    async fn exists(&self, key: &str) -> StorageResult<bool> {
        check_key(key)?;
        Ok(self.objects.read().await.contains_key(key))
    }

    async fn head(&self, key: &str) -> StorageResult<ObjectMeta> {
        check_key(key)?;
        self.objects
            .read()
            .await
            .get(key)
            .map(|obj| ObjectMeta {
                size: obj.data.len() as u64,
                last_modified: obj.last_modified,
            })
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        check_key(key)?;
        self.objects
            .read()
            .await
            .get(key)
            .map(|obj| obj.data.clone())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    #[instrument(skip(self, data), fields(backend = "memory", size = data.len()))]
    async fn put(&self, key: &str, data: Bytes) -> StorageResult<()> {
        check_key(key)?;
        self.put_at(key, data, Some(OffsetDateTime::now_utc())).await;
        Ok(())
    }

    #[instrument(skip(self, data), fields(backend = "memory", size = data.len()))]
    async fn put_if_not_exists(&self, key: &str, data: Bytes) -> StorageResult<bool> {
        check_key(key)?;
        let mut objects = self.objects.write().await;
        if objects.contains_key(key) {
            return Ok(false);
        }
        objects.insert(
            key.to_string(),
            StoredObject {
                data,
                last_modified: Some(OffsetDateTime::now_utc()),
            },
        );
        Ok(true)
    }

    #[instrument(skip(self), fields(backend = "memory"))]
    async fn delete(&self, key: &str) -> StorageResult<()> {
        check_key(key)?;
        self.objects.write().await.remove(key);
        Ok(())
    }

    fn list_stream<'a>(&'a self, prefix: &str) -> ObjectStream<'a> {
        let prefix = prefix.to_string();
        let stream = async_stream::stream! {
            // Snapshot so the lock is not held while the consumer works.
            let entries: Vec<ObjectEntry> = self
                .objects
                .read()
                .await
                .range(prefix.clone()..)
                .take_while(|(key, _)| key.starts_with(&prefix))
                .map(|(key, obj)| ObjectEntry {
                    key: key.clone(),
                    size: obj.data.len() as u64,
                    last_modified: obj.last_modified,
                })
                .collect();
            for entry in entries {
                yield Ok::<_, StorageError>(entry);
            }
        };
        Box::pin(stream)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
