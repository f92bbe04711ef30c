//! Chunk reads.

use crate::deadline::within;
use crate::error::{EngineError, EngineResult};
use bytes::Bytes;
use chunkvault_core::FileId;
use chunkvault_core::chunk::next_index;
use chunkvault_storage::ObjectStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

/// One chunk as returned to callers.
#[derive(Clone, Debug)]
pub struct ChunkRead {
    pub index: u64,
    pub data: Bytes,
    /// No chunk at `index + 1` when the check ran. A concurrent append can
    /// make this stale immediately.
    pub is_last: bool,
}

/// Reads single chunks by index.
#[derive(Clone)]
pub struct ChunkReader {
    store: Arc<dyn ObjectStore>,
    timeout: Duration,
}

impl ChunkReader {
    pub fn new(store: Arc<dyn ObjectStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Read chunk `index` of `file`, refusing any chunk over `size_cap` bytes.
    ///
    /// A missing chunk is [`EngineError::NotFound`]. An oversized chunk is
    /// [`EngineError::SizeExceeded`]; it is never truncated.
    pub async fn read_chunk(&self, file: &FileId, index: u64, size_cap: u64) -> EngineResult<ChunkRead> {
        let key = file.chunk_key(index);
        // Validate the next index before any I/O.
        let next_key = file.chunk_key(next_index(index)?);

        let meta = within(self.timeout, "head", &key, self.store.head(&key)).await?;
        if meta.size > size_cap {
            error!(key = %key, size = meta.size, limit = size_cap, "Chunk exceeds size limit");
            return Err(EngineError::SizeExceeded {
                key,
                size: meta.size,
                limit: size_cap,
            });
        }

        let data = within(self.timeout, "get", &key, self.store.get(&key)).await?;
        // The object may have been swapped between head and get.
        if data.len() as u64 > size_cap {
            error!(key = %key, size = data.len(), limit = size_cap, "Chunk exceeds size limit");
            return Err(EngineError::SizeExceeded {
                size: data.len() as u64,
                key,
                limit: size_cap,
            });
        }

        let has_next = within(self.timeout, "exists", &next_key, self.store.exists(&next_key)).await?;
        debug!(key = %key, size = data.len(), is_last = !has_next, "Read chunk");

        Ok(ChunkRead {
            index,
            data,
            is_last: !has_next,
        })
    }
}
