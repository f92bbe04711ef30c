//! Object storage abstraction and backends for chunkvault.
//!
//! This crate provides:
//! - The [`ObjectStore`] trait the chunk engine talks to
//! - Create-only writes for race-free chunk index allocation
//! - Backends: local filesystem, S3-compatible and in-memory

pub mod backends;
pub mod error;
pub mod traits;

pub use backends::{filesystem::FilesystemBackend, memory::MemoryBackend, s3::S3Backend};
pub use error::{StorageError, StorageResult};
pub use traits::{ObjectEntry, ObjectMeta, ObjectStore, ObjectStream};

use chunkvault_core::config::StorageConfig;
use std::sync::Arc;

/// Create an object store from configuration.
pub async fn from_config(config: &StorageConfig) -> StorageResult<Arc<dyn ObjectStore>> {
    config
        .validate()
        .map_err(|e| StorageError::Config(e.to_string()))?;

    match config {
        StorageConfig::Filesystem { path } => {
            let backend = FilesystemBackend::new(path).await?;
            Ok(Arc::new(backend))
        }
        StorageConfig::S3 {
            bucket,
            endpoint,
            region,
            prefix,
            access_key_id,
            secret_access_key,
            force_path_style,
        } => {
            let backend = S3Backend::new(
                bucket,
                endpoint.clone(),
                region.clone(),
                prefix.clone(),
                access_key_id.clone(),
                secret_access_key.clone(),
                *force_path_style,
            )
            .await?;
            Ok(Arc::new(backend))
        }
        StorageConfig::Memory => Ok(Arc::new(MemoryBackend::new())),
    }
}
