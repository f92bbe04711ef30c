//! Chunk ingestion: append and whole-file replace.

use crate::deadline::within;
use crate::error::{EngineError, EngineResult};
use crate::locks::FileLocks;
use crate::resolver::IndexResolver;
use bytes::Bytes;
use chunkvault_core::FileId;
use chunkvault_core::chunk::next_index;
use chunkvault_storage::ObjectStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Writes chunks. Cloning shares the per-file locks.
#[derive(Clone)]
pub struct ChunkWriter {
    store: Arc<dyn ObjectStore>,
    resolver: IndexResolver,
    locks: FileLocks,
    max_chunk_size: u64,
    timeout: Duration,
}

impl ChunkWriter {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        resolver: IndexResolver,
        max_chunk_size: u64,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            resolver,
            locks: FileLocks::new(),
            max_chunk_size,
            timeout,
        }
    }

    /// Append `data` as the next chunk of `file` and return its index.
    ///
    /// Index allocation is serialized per file in this process. The write
    /// itself is create-only, so a writer elsewhere that took the same index
    /// first produces [`EngineError::IndexConflict`], never an overwrite.
    pub async fn append_chunk(&self, file: &FileId, data: Bytes) -> EngineResult<u64> {
        self.check_size(file, data.len() as u64)?;

        let _guard = self.locks.lock(file, self.timeout).await?;
        let next = match self.resolver.resolve_last_index(file).await? {
            None => 0,
            Some(last) => next_index(last)?,
        };
        let size = data.len();
        self.create(file, next, data).await?;

        info!(file_id = %file, index = next, size, "Appended chunk");
        Ok(next)
    }

    /// Replace the whole content of `file` and return the number of chunks
    /// written.
    ///
    /// Existing chunks of exactly this file are deleted first. If any
    /// deletion fails nothing new is written, and the failed keys are
    /// returned in [`EngineError::PartialCleanupFailure`]. Content over the
    /// chunk size limit is split into consecutive full-size chunks.
    pub async fn replace_file(&self, file: &FileId, data: Bytes) -> EngineResult<u64> {
        let _guard = self.locks.lock(file, self.timeout).await?;

        let existing = self.resolver.chunk_keys(file).await?;
        let mut remaining = Vec::new();
        for (_, key) in &existing {
            if let Err(e) = within(self.timeout, "delete", key, self.store.delete(key)).await {
                warn!(file_id = %file, key = %key, error = %e, "Failed to delete chunk during replace");
                remaining.push(key.clone());
            }
        }
        if !remaining.is_empty() {
            return Err(EngineError::PartialCleanupFailure {
                file_id: file.to_string(),
                remaining,
            });
        }

        let parts = split_chunks(data, self.max_chunk_size);
        let count = parts.len() as u64;
        for (index, part) in (0u64..).zip(parts) {
            self.create(file, index, part).await?;
        }

        info!(
            file_id = %file,
            deleted = existing.len(),
            chunks = count,
            "Replaced file content"
        );
        Ok(count)
    }

    fn check_size(&self, file: &FileId, size: u64) -> EngineResult<()> {
        if size > self.max_chunk_size {
            return Err(EngineError::SizeExceeded {
                key: file.to_string(),
                size,
                limit: self.max_chunk_size,
            });
        }
        Ok(())
    }

    async fn create(&self, file: &FileId, index: u64, data: Bytes) -> EngineResult<()> {
        let key = file.chunk_key(index);
        let created = within(
            self.timeout,
            "put",
            &key,
            self.store.put_if_not_exists(&key, data),
        )
        .await?;
        if !created {
            warn!(file_id = %file, key = %key, "Chunk index already taken by another writer");
            return Err(EngineError::IndexConflict { key });
        }
        Ok(())
    }
}

/// Cut `data` into pieces of at most `cap` bytes. Empty input is one empty
/// chunk, so every replaced file has a chunk 0.
fn split_chunks(data: Bytes, cap: u64) -> Vec<Bytes> {
    let cap = usize::try_from(cap).unwrap_or(usize::MAX).max(1);
    if data.len() <= cap {
        return vec![data];
    }
    (0..data.len())
        .step_by(cap)
        .map(|start| data.slice(start..data.len().min(start.saturating_add(cap))))
        .collect()
}
