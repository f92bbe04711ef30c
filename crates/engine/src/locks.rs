//! Per-file append locks.
//!
//! Appends and replaces for one file id are serialized within this process.
//! Writers in other processes are caught by the create-only write instead.

use crate::error::{EngineError, EngineResult};
use chunkvault_core::FileId;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};

type LockMap = DashMap<FileId, Arc<Mutex<()>>>;

/// A registry of per-file mutexes. Entries exist only while someone holds
/// or waits on them.
#[derive(Clone, Default)]
pub struct FileLocks {
    inner: Arc<LockMap>,
}

impl FileLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for `file`, waiting at most `limit`.
    pub async fn lock(&self, file: &FileId, limit: Duration) -> EngineResult<FileGuard> {
        let mutex = self.inner.entry(file.clone()).or_default().clone();

        match tokio::time::timeout(limit, mutex.lock_owned()).await {
            Ok(guard) => Ok(FileGuard {
                guard: Some(guard),
                file: file.clone(),
                map: self.inner.clone(),
            }),
            Err(_) => {
                self.release_if_idle(file);
                Err(EngineError::Timeout {
                    op: "lock",
                    key: file.to_string(),
                    after: limit,
                })
            }
        }
    }

    /// Number of files with a live lock entry.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    fn release_if_idle(&self, file: &FileId) {
        self.inner
            .remove_if(file, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

/// Held for the duration of one append or replace.
pub struct FileGuard {
    guard: Option<OwnedMutexGuard<()>>,
    file: FileId,
    map: Arc<LockMap>,
}

impl Drop for FileGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Only the map's own reference left: nobody is waiting.
        self.map
            .remove_if(&self.file, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}
