use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use chunkvault_storage::{
    MemoryBackend, ObjectEntry, ObjectMeta, ObjectStore, ObjectStream, StorageError, StorageResult,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn injected(what: &str) -> StorageError {
    StorageError::Io(std::io::Error::other(format!("injected failure: {what}")))
}

/// Memory-backed store with switchable failures.
#[allow(dead_code)]
#[derive(Default)]
pub struct FaultyStore {
    pub inner: MemoryBackend,
    pub fail_list: AtomicBool,
    /// Listings yield this many entries, then an error.
    pub list_fail_after: Mutex<Option<usize>>,
    pub fail_puts: AtomicBool,
    pub fail_delete_keys: Mutex<HashSet<String>>,
    /// Health checks fail this many more times before succeeding.
    pub health_failures_left: AtomicU32,
    pub health_checks: AtomicU32,
}

#[allow(dead_code)]
impl FaultyStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_list_after(&self, entries: usize) {
        *self.list_fail_after.lock().unwrap() = Some(entries);
    }

    pub fn fail_delete_of(&self, key: &str) {
        self.fail_delete_keys.lock().unwrap().insert(key.to_string());
    }
}

#[async_trait]
impl ObjectStore for FaultyStore {
    async fn exists(&self, key: &str) -> StorageResult<bool> {
        self.inner.exists(key).await
    }

    async fn head(&self, key: &str) -> StorageResult<ObjectMeta> {
        self.inner.head(key).await
    }

    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, data: Bytes) -> StorageResult<()> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(injected("put"));
        }
        self.inner.put(key, data).await
    }

    async fn put_if_not_exists(&self, key: &str, data: Bytes) -> StorageResult<bool> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(injected("put"));
        }
        self.inner.put_if_not_exists(key, data).await
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        if self.fail_delete_keys.lock().unwrap().contains(key) {
            return Err(injected("delete"));
        }
        self.inner.delete(key).await
    }

    fn list_stream<'a>(&'a self, prefix: &str) -> ObjectStream<'a> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Box::pin(futures::stream::once(async { Err::<ObjectEntry, _>(injected("list")) }));
        }
        if let Some(entries) = *self.list_fail_after.lock().unwrap() {
            let head = self.inner.list_stream(prefix).take(entries);
            return Box::pin(head.chain(futures::stream::once(async {
                Err::<ObjectEntry, _>(injected("list"))
            })));
        }
        self.inner.list_stream(prefix)
    }

    fn backend_name(&self) -> &'static str {
        "faulty"
    }

    async fn health_check(&self) -> StorageResult<()> {
        self.health_checks.fetch_add(1, Ordering::SeqCst);
        let left = self.health_failures_left.load(Ordering::SeqCst);
        if left > 0 {
            self.health_failures_left.store(left - 1, Ordering::SeqCst);
            return Err(injected("health"));
        }
        Ok(())
    }
}

/// Memory-backed store that stalls selected operations.
#[allow(dead_code)]
pub struct SlowStore {
    pub inner: MemoryBackend,
    pub delay: Duration,
    pub slow_ops: HashSet<&'static str>,
}

#[allow(dead_code)]
impl SlowStore {
    pub fn new(delay: Duration, slow_ops: &[&'static str]) -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryBackend::new(),
            delay,
            slow_ops: slow_ops.iter().copied().collect(),
        })
    }

    async fn maybe_stall(&self, op: &str) {
        if self.slow_ops.contains(op) {
            tokio::time::sleep(self.delay).await;
        }
    }
}

#[async_trait]
impl ObjectStore for SlowStore {
    async fn exists(&self, key: &str) -> StorageResult<bool> {
        self.maybe_stall("exists").await;
        self.inner.exists(key).await
    }

    async fn head(&self, key: &str) -> StorageResult<ObjectMeta> {
        self.maybe_stall("head").await;
        self.inner.head(key).await
    }

    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        self.maybe_stall("get").await;
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, data: Bytes) -> StorageResult<()> {
        self.maybe_stall("put").await;
        self.inner.put(key, data).await
    }

    async fn put_if_not_exists(&self, key: &str, data: Bytes) -> StorageResult<bool> {
        self.maybe_stall("put").await;
        self.inner.put_if_not_exists(key, data).await
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.maybe_stall("delete").await;
        self.inner.delete(key).await
    }

    fn list_stream<'a>(&'a self, prefix: &str) -> ObjectStream<'a> {
        let inner = self.inner.list_stream(prefix);
        if !self.slow_ops.contains("list") {
            return inner;
        }
        let delay = self.delay;
        Box::pin(async_stream::stream! {
            tokio::time::sleep(delay).await;
            let mut inner = inner;
            while let Some(item) = futures::StreamExt::next(&mut inner).await {
                yield item;
            }
        })
    }

    fn backend_name(&self) -> &'static str {
        "slow"
    }

    async fn health_check(&self) -> StorageResult<()> {
        self.maybe_stall("health").await;
        Ok(())
    }
}
