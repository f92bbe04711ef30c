use bytes::Bytes;
use chunkvault_storage::{FilesystemBackend, MemoryBackend, ObjectStore};
use std::sync::Arc;
use tempfile::TempDir;

/// Generate deterministic test data using a seeded pseudo-random generator
/// Same seed produces same output (reproducible tests)
pub fn seeded_bytes(seed: u64, len: usize) -> Bytes {
    let mut data = vec![0u8; len];
    let mut state = seed;

    // Simple LCG (Linear Congruential Generator)
    for chunk in data.chunks_mut(8) {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
        let bytes = state.to_le_bytes();
        for (i, byte) in chunk.iter_mut().enumerate() {
            *byte = bytes[i % 8];
        }
    }

    Bytes::from(data)
}

/// Every local backend, paired with the temp dir that must outlive it.
#[allow(dead_code)]
pub async fn all_backends() -> Vec<(&'static str, Arc<dyn ObjectStore>, Option<TempDir>)> {
    let dir = TempDir::new().unwrap();
    let fs = FilesystemBackend::new(dir.path()).await.unwrap();
    vec![
        ("filesystem", Arc::new(fs) as Arc<dyn ObjectStore>, Some(dir)),
        ("memory", Arc::new(MemoryBackend::new()), None),
    ]
}
