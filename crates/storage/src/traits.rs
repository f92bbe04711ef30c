//! Storage trait definitions.

use crate::error::StorageResult;
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;
use time::OffsetDateTime;

/// A boxed stream of listing entries.
///
/// The stream borrows the store for `'a`. Callers that need to hold it
/// across a spawn should hold an `Arc<dyn ObjectStore>` alongside it.
pub type ObjectStream<'a> = Pin<Box<dyn Stream<Item = StorageResult<ObjectEntry>> + Send + 'a>>;

/// Object store abstraction for chunk objects.
///
/// Keys are flat strings. Listing uses plain string-prefix matching on the
/// key, so `doc_chunk_` matches `doc_chunk_0` but also `doc_chunk_x_chunk_3`.
/// Callers filter by parsing the key.
#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    /// Check if an object exists.
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Get an object's size without fetching content.
    async fn head(&self, key: &str) -> StorageResult<ObjectMeta>;

    /// Get an object's content.
    async fn get(&self, key: &str) -> StorageResult<Bytes>;

    /// Put an object, replacing any previous content.
    async fn put(&self, key: &str, data: Bytes) -> StorageResult<()>;

    /// Put an object only if it doesn't exist.
    ///
    /// Returns `Ok(false)` when the key is already taken. Backends must turn
    /// this into a single conditional write; a separate exists-then-put is
    /// not acceptable.
    async fn put_if_not_exists(&self, key: &str, data: Bytes) -> StorageResult<bool>;

    /// Delete an object. Deleting a missing object is not an error.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// List objects whose key starts with `prefix`.
    fn list_stream<'a>(&'a self, prefix: &str) -> ObjectStream<'a>;

    /// List every object in every container this store can see.
    ///
    /// For S3 that is every bucket the credentials can list; single-root
    /// backends list their own root. Used for usage reporting.
    fn list_all_containers<'a>(&'a self) -> ObjectStream<'a> {
        self.list_stream("")
    }

    /// Get the name of this storage backend.
    ///
    /// Returns a static string identifier for the backend type (e.g., "s3", "filesystem").
    /// Used for metrics and logging.
    fn backend_name(&self) -> &'static str;

    /// Verify storage backend connectivity.
    ///
    /// The default implementation returns Ok(()), suitable for backends that
    /// don't require connectivity verification (e.g., local filesystem).
    async fn health_check(&self) -> StorageResult<()> {
        Ok(())
    }
}

/// Metadata about a stored object.
#[derive(Clone, Debug)]
pub struct ObjectMeta {
    /// Object size in bytes.
    pub size: u64,
    /// Last modification time (if available).
    pub last_modified: Option<OffsetDateTime>,
}

/// One entry yielded by a listing.
#[derive(Clone, Debug)]
pub struct ObjectEntry {
    pub key: String,
    pub size: u64,
    pub last_modified: Option<OffsetDateTime>,
}
