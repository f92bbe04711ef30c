//! Local filesystem storage backend.
//!
//! Keys map to paths under the root. Writes go through a staging directory
//! inside the root so the final file appears atomically.

use crate::error::{StorageError, StorageResult};
use crate::traits::{ObjectEntry, ObjectMeta, ObjectStore, ObjectStream};
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Component, Path, PathBuf};
use time::OffsetDateTime;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};
use uuid::Uuid;

/// Staging directory for in-flight writes, relative to the root.
const STAGING_DIR: &str = ".staging";

/// Longest single path component most filesystems accept (`NAME_MAX`).
pub const MAX_COMPONENT_LEN: usize = 255;

/// Local filesystem object store.
pub struct FilesystemBackend {
    root: PathBuf,
}

impl FilesystemBackend {
    /// Create a new filesystem backend, creating the root if needed.
    pub async fn new(root: impl AsRef<Path>) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(root.join(STAGING_DIR)).await?;
        Ok(Self { root })
    }

    /// Resolve a key to a path, off the async runtime.
    async fn key_path(&self, key: &str) -> StorageResult<PathBuf> {
        let root = self.root.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || resolve_key(&root, &key))
            .await
            .map_err(|e| {
                StorageError::Io(std::io::Error::other(format!("spawn_blocking failed: {e}")))
            })?
    }

    fn staging_path(&self) -> PathBuf {
        self.root
            .join(STAGING_DIR)
            .join(format!("{}.tmp", Uuid::new_v4()))
    }

    /// Write `data` to a fresh staging file and fsync it.
    async fn stage(&self, data: &[u8]) -> StorageResult<PathBuf> {
        let temp_path = self.staging_path();
        let mut file = fs::File::create(&temp_path).await?;
        if let Err(e) = write_synced(&mut file, data).await {
            drop(file);
            let _ = fs::remove_file(&temp_path).await;
            return Err(e);
        }
        Ok(temp_path)
    }

    async fn ensure_parent(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

async fn write_synced(file: &mut fs::File, data: &[u8]) -> StorageResult<()> {
    file.write_all(data).await?;
    file.sync_all().await?;
    Ok(())
}

fn not_found_or_io(key: &str, e: std::io::Error) -> StorageError {
    if e.kind() == std::io::ErrorKind::NotFound {
        StorageError::NotFound(key.to_string())
    } else {
        StorageError::Io(e)
    }
}

/// Map a key to a path under `root`, refusing anything that could escape it.
///
/// Symlinks are resolved for the target (if present) and for the nearest
/// existing ancestor (if not), so a link inside the root cannot redirect a
/// read or a directory creation elsewhere.
fn resolve_key(root: &Path, key: &str) -> StorageResult<PathBuf> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("empty key".to_string()));
    }
    if key.starts_with('/') || key.starts_with('\\') || key.contains("..") {
        return Err(StorageError::InvalidKey(format!(
            "path traversal not allowed: {key}"
        )));
    }
    let mut components = Path::new(key).components();
    if let Some(Component::Normal(first)) = components.clone().next()
        && first == STAGING_DIR
    {
        return Err(StorageError::InvalidKey(format!("reserved key: {key}")));
    }
    if !components.all(|c| matches!(c, Component::Normal(_))) {
        return Err(StorageError::InvalidKey(format!(
            "contains unsafe path component: {key}"
        )));
    }
    if key.split('/').any(|c| c.len() > MAX_COMPONENT_LEN) {
        return Err(StorageError::InvalidKey(format!(
            "path component longer than {MAX_COMPONENT_LEN} bytes in key: {key}"
        )));
    }

    let path = root.join(key);
    let root_canonical = root.canonicalize()?;

    // Nearest existing path, starting with the target itself.
    let mut ancestor = Some(path.as_path());
    while let Some(candidate) = ancestor {
        match std::fs::symlink_metadata(candidate) {
            Ok(meta) => {
                let canonical = candidate.canonicalize().map_err(|e| {
                    if meta.file_type().is_symlink() {
                        StorageError::InvalidKey(format!("dangling symlink in key: {key}"))
                    } else {
                        StorageError::Io(e)
                    }
                })?;
                if !canonical.starts_with(&root_canonical) {
                    return Err(StorageError::InvalidKey(format!(
                        "resolved path escapes storage root: {key}"
                    )));
                }
                return Ok(path);
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                ancestor = candidate.parent();
            }
            Err(e) => return Err(StorageError::Io(e)),
        }
    }

    Ok(path)
}

/// Split a listing prefix into the directory to walk and the full prefix.
///
/// `a/b/doc_chunk_` walks `a/b/`; `doc_chunk_` walks the root.
fn walk_base(prefix: &str) -> &str {
    match prefix.rfind('/') {
        Some(idx) => &prefix[..=idx],
        None => "",
    }
}

#[async_trait]
impl ObjectStore for FilesystemBackend {
    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let path = self.key_path(key).await?;
        match fs::metadata(&path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn head(&self, key: &str) -> StorageResult<ObjectMeta> {
        let path = self.key_path(key).await?;
        let metadata = fs::metadata(&path)
            .await
            .map_err(|e| not_found_or_io(key, e))?;
        if !metadata.is_file() {
            return Err(StorageError::NotFound(key.to_string()));
        }

        Ok(ObjectMeta {
            size: metadata.len(),
            last_modified: metadata.modified().ok().map(OffsetDateTime::from),
        })
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        let path = self.key_path(key).await?;
        let data = fs::read(&path).await.map_err(|e| not_found_or_io(key, e))?;
        Ok(Bytes::from(data))
    }

    #[instrument(skip(self, data), fields(backend = "filesystem", size = data.len()))]
    async fn put(&self, key: &str, data: Bytes) -> StorageResult<()> {
        let path = self.key_path(key).await?;
        self.ensure_parent(&path).await?;

        let temp_path = self.stage(&data).await?;
        if let Err(e) = fs::rename(&temp_path, &path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(StorageError::Io(e));
        }
        Ok(())
    }

    #[instrument(skip(self, data), fields(backend = "filesystem", size = data.len()))]
    async fn put_if_not_exists(&self, key: &str, data: Bytes) -> StorageResult<bool> {
        let path = self.key_path(key).await?;
        self.ensure_parent(&path).await?;

        // hard_link fails if the destination exists, which makes the
        // publish step a single create-only operation.
        let temp_path = self.stage(&data).await?;
        let linked = fs::hard_link(&temp_path, &path).await;
        let _ = fs::remove_file(&temp_path).await;

        match linked {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                debug!(key, "create-only write lost to an existing object");
                Ok(false)
            }
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.key_path(key).await?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    fn list_stream<'a>(&'a self, prefix: &str) -> ObjectStream<'a> {
        let prefix = prefix.to_string();

        let stream = async_stream::try_stream! {
            let base = walk_base(&prefix);
            let base_path = if base.is_empty() {
                self.root.clone()
            } else {
                self.key_path(base.trim_end_matches('/')).await?
            };

            let base_exists = match fs::metadata(&base_path).await {
                Ok(meta) => meta.is_dir(),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
                Err(e) => Err(StorageError::Io(e))?,
            };
            if !base_exists {
                return;
            }

            let staging = self.root.join(STAGING_DIR);
            let mut stack = vec![base_path];
            while let Some(dir) = stack.pop() {
                let mut entries = fs::read_dir(&dir).await?;
                while let Some(entry) = entries.next_entry().await? {
                    let path = entry.path();
                    // file_type() does not follow symlinks; links are skipped.
                    let file_type = entry.file_type().await?;
                    if file_type.is_dir() {
                        if path != staging {
                            stack.push(path);
                        }
                        continue;
                    }
                    if !file_type.is_file() {
                        continue;
                    }
                    let Ok(rel) = path.strip_prefix(&self.root) else {
                        continue;
                    };
                    let key = rel
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy())
                        .collect::<Vec<_>>()
                        .join("/");
                    if !key.starts_with(&prefix) {
                        continue;
                    }
                    let meta = match entry.metadata().await {
                        Ok(meta) => meta,
                        // Removed between read_dir and stat.
                        Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                        Err(e) => Err(StorageError::Io(e))?,
                    };
                    yield ObjectEntry {
                        key,
                        size: meta.len(),
                        last_modified: meta.modified().ok().map(OffsetDateTime::from),
                    };
                }
            }
        };

        Box::pin(stream)
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn health_check(&self) -> StorageResult<()> {
        let metadata = fs::metadata(&self.root).await.map_err(|e| {
            StorageError::Io(std::io::Error::new(
                e.kind(),
                format!("storage root not accessible: {e}"),
            ))
        })?;

        if !metadata.is_dir() {
            return Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::NotADirectory,
                format!("storage root is not a directory: {:?}", self.root),
            )));
        }

        Ok(())
    }
}
