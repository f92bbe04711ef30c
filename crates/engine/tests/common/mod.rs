pub mod mocks;

#[allow(unused_imports)]
pub use mocks::{FaultyStore, SlowStore};

use chunkvault_core::FileId;
use chunkvault_core::config::EngineConfig;
use chunkvault_engine::ChunkEngine;
use chunkvault_storage::{MemoryBackend, ObjectStore};
use std::sync::Arc;

/// Small chunk limit so tests can exercise splitting and size checks.
#[allow(dead_code)]
pub const TEST_CHUNK_LIMIT: u64 = 16;

#[allow(dead_code)]
pub fn test_engine_config() -> EngineConfig {
    EngineConfig {
        max_chunk_size: TEST_CHUNK_LIMIT,
        operation_timeout_secs: 5,
    }
}

#[allow(dead_code)]
pub fn memory_engine() -> (Arc<MemoryBackend>, ChunkEngine) {
    let store = Arc::new(MemoryBackend::new());
    let engine = ChunkEngine::new(store.clone() as Arc<dyn ObjectStore>, &test_engine_config()).unwrap();
    (store, engine)
}

#[allow(dead_code)]
pub fn fid(s: &str) -> FileId {
    FileId::new(s).unwrap()
}
