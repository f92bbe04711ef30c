//! Chunk index resolution.

use crate::deadline::within;
use crate::error::EngineResult;
use chunkvault_core::{ChunkKey, FileId};
use chunkvault_storage::ObjectStore;
use futures::TryStreamExt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Finds the chunks a file currently has in the store.
#[derive(Clone)]
pub struct IndexResolver {
    store: Arc<dyn ObjectStore>,
    timeout: Duration,
}

impl IndexResolver {
    pub fn new(store: Arc<dyn ObjectStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Every chunk of `file` as `(index, key)`, sorted by index.
    ///
    /// Keys under the prefix that are not chunks of exactly this file are
    /// skipped with a warning. A listing failure is returned as an error.
    pub async fn chunk_keys(&self, file: &FileId) -> EngineResult<Vec<(u64, String)>> {
        let prefix = file.chunk_prefix();
        let keys: Vec<String> = within(
            self.timeout,
            "list",
            &prefix,
            self.store
                .list_stream(&prefix)
                .map_ok(|entry| entry.key)
                .try_collect(),
        )
        .await?;

        let mut chunks: Vec<(u64, String)> = keys
            .into_iter()
            .filter_map(|key| match ChunkKey::parse_for(file, &key) {
                Some(index) => Some((index, key)),
                None => {
                    warn!(file_id = %file, key = %key, "Skipping key that is not a chunk of this file");
                    None
                }
            })
            .collect();
        chunks.sort_unstable_by_key(|(index, _)| *index);
        Ok(chunks)
    }

    /// Highest persisted chunk index, or `None` if the file has no chunks.
    ///
    /// Indices are compared numerically; listing order is never trusted.
    pub async fn resolve_last_index(&self, file: &FileId) -> EngineResult<Option<u64>> {
        let last = self
            .chunk_keys(file)
            .await?
            .last()
            .map(|(index, _)| *index);
        debug!(file_id = %file, last_index = ?last, "Resolved last chunk index");
        Ok(last)
    }
}
