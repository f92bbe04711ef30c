//! The chunk engine.
//!
//! Turns files into ordered sequences of bounded chunks in an object store
//! and reads them back:
//! - [`resolver`] finds the highest persisted chunk index
//! - [`writer`] appends chunks and replaces whole files
//! - [`reader`] and [`stream`] read single chunks or whole files
//! - [`quota`] totals usage, [`retention`] expires old data
//! - [`connect`] establishes the store at startup

pub mod connect;
mod deadline;
pub mod error;
pub mod locks;
pub mod quota;
pub mod reader;
pub mod resolver;
pub mod retention;
pub mod stream;
pub mod writer;

pub use connect::{connect_with_retry, wait_until_healthy};
pub use error::{EngineError, EngineResult};
pub use quota::{QuotaReporter, StorageUsage};
pub use reader::{ChunkRead, ChunkReader};
pub use resolver::IndexResolver;
pub use retention::{RetentionSweeper, SweepReport};
pub use stream::{FileStream, stream_file};
pub use writer::ChunkWriter;

use bytes::Bytes;
use chunkvault_core::FileId;
use chunkvault_core::config::EngineConfig;
use chunkvault_storage::ObjectStore;
use std::sync::Arc;

/// Resolver, writer and reader over one store.
///
/// Cheap to clone; clones share the per-file write locks.
#[derive(Clone)]
pub struct ChunkEngine {
    store: Arc<dyn ObjectStore>,
    resolver: IndexResolver,
    writer: ChunkWriter,
    reader: ChunkReader,
    max_chunk_size: u64,
}

impl ChunkEngine {
    pub fn new(store: Arc<dyn ObjectStore>, config: &EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        let timeout = config.operation_timeout();
        let resolver = IndexResolver::new(store.clone(), timeout);
        let writer = ChunkWriter::new(store.clone(), resolver.clone(), config.max_chunk_size, timeout);
        let reader = ChunkReader::new(store.clone(), timeout);
        Ok(Self {
            store,
            resolver,
            writer,
            reader,
            max_chunk_size: config.max_chunk_size,
        })
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Per-chunk size limit for writes and the default read cap.
    pub fn max_chunk_size(&self) -> u64 {
        self.max_chunk_size
    }

    pub async fn resolve_last_index(&self, file: &FileId) -> EngineResult<Option<u64>> {
        self.resolver.resolve_last_index(file).await
    }

    pub async fn append_chunk(&self, file: &FileId, data: Bytes) -> EngineResult<u64> {
        self.writer.append_chunk(file, data).await
    }

    pub async fn replace_file(&self, file: &FileId, data: Bytes) -> EngineResult<u64> {
        self.writer.replace_file(file, data).await
    }

    pub async fn read_chunk(&self, file: &FileId, index: u64, size_cap: u64) -> EngineResult<ChunkRead> {
        self.reader.read_chunk(file, index, size_cap).await
    }

    /// Stream the whole file, reading each chunk with the engine's size limit.
    pub fn stream_file(&self, file: FileId) -> FileStream {
        stream_file(self.reader.clone(), file, self.max_chunk_size)
    }
}
