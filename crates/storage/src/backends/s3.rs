//! S3-compatible storage backend using AWS SDK.

use crate::error::{StorageError, StorageResult};
use crate::traits::{ObjectEntry, ObjectMeta, ObjectStore, ObjectStream};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::primitives::DateTime;
use bytes::Bytes;
use std::time::Duration;
use time::OffsetDateTime;
use tracing::{instrument, warn};

/// Deadline for the startup bucket check.
const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

/// S3-compatible object store using AWS SDK.
pub struct S3Backend {
    client: Client,
    bucket: String,
    prefix: Option<String>,
}

impl std::fmt::Debug for S3Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Backend")
            .field("bucket", &self.bucket)
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

/// Convert an S3 timestamp. Unrepresentable values become `None`, which
/// retention treats as "keep".
fn to_offset(key: &str, dt: &DateTime) -> Option<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp(dt.secs())
        .inspect_err(|e| {
            warn!(
                key = %key,
                timestamp = dt.secs(),
                error = %e,
                "Failed to convert S3 timestamp, object will be kept by retention"
            );
        })
        .ok()
}

fn status_of<E>(err: &SdkError<E>) -> Option<u16> {
    match err {
        SdkError::ServiceError(service_err) => Some(service_err.raw().status().as_u16()),
        _ => None,
    }
}

fn map_s3_operation_error<E>(err: SdkError<E>) -> StorageError
where
    E: std::error::Error + Send + Sync + 'static,
{
    StorageError::S3(Box::new(err))
}

/// Convert an AWS SDK error to StorageError, mapping 404 to NotFound.
fn map_sdk_error<E>(err: SdkError<E>, key: &str) -> StorageError
where
    E: std::error::Error + Send + Sync + 'static,
{
    if status_of(&err) == Some(404) {
        return StorageError::NotFound(key.to_string());
    }
    map_s3_operation_error(err)
}

/// Page through one bucket with ListObjectsV2.
///
/// `strip` is removed from returned keys; `label` is prepended to them.
fn list_bucket(
    client: Client,
    bucket: String,
    full_prefix: String,
    strip: Option<String>,
    label: Option<String>,
) -> ObjectStream<'static> {
    let stream = async_stream::try_stream! {
        let mut continuation_token: Option<String> = None;

        loop {
            let mut request = client
                .list_objects_v2()
                .bucket(&bucket)
                .prefix(&full_prefix);

            if let Some(token) = continuation_token.take() {
                request = request.continuation_token(token);
            }

            let output = request
                .send()
                .await
                .map_err(map_s3_operation_error)?;

            for obj in output.contents() {
                let Some(obj_key) = obj.key() else {
                    continue;
                };
                let relative = match &strip {
                    Some(pfx) => obj_key.strip_prefix(pfx.as_str()).unwrap_or(obj_key),
                    None => obj_key,
                };
                let key = match &label {
                    Some(label) => format!("{label}/{relative}"),
                    None => relative.to_string(),
                };
                yield ObjectEntry {
                    size: obj.size().map(|s| s.max(0) as u64).unwrap_or(0),
                    last_modified: obj.last_modified().and_then(|dt| to_offset(obj_key, dt)),
                    key,
                };
            }

            if output.is_truncated() == Some(true) {
                continuation_token = output.next_continuation_token().map(|s| s.to_string());
            } else {
                break;
            }
        }
    };

    Box::pin(stream)
}

impl S3Backend {
    /// Create a new S3 backend.
    ///
    /// `force_path_style` selects `endpoint/bucket/key` URLs, which MinIO
    /// and most self-hosted S3 services need.
    pub async fn new(
        bucket: &str,
        endpoint: Option<String>,
        region: Option<String>,
        prefix: Option<String>,
        access_key_id: Option<String>,
        secret_access_key: Option<String>,
        force_path_style: bool,
    ) -> StorageResult<Self> {
        if access_key_id.is_some() ^ secret_access_key.is_some() {
            return Err(StorageError::Config(
                "s3 config requires both access_key_id and secret_access_key when either is set"
                    .to_string(),
            ));
        }

        let resolved_region = aws_config::Region::new(region.unwrap_or_else(|| "us-east-1".to_string()));
        let mut s3_config_builder = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(resolved_region.clone());

        if let (Some(key_id), Some(secret)) = (access_key_id, secret_access_key) {
            let credentials = aws_sdk_s3::config::Credentials::new(
                key_id,
                secret,
                None, // session token
                None, // expiration
                "chunkvault-config",
            );
            s3_config_builder = s3_config_builder.credentials_provider(credentials);
        } else {
            let chain = aws_config::default_provider::credentials::DefaultCredentialsChain::builder()
                .region(resolved_region)
                .build()
                .await;
            s3_config_builder = s3_config_builder.credentials_provider(chain);
        }

        if let Some(endpoint_url) = endpoint.as_deref().map(normalize_endpoint) {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint_url);
        }

        if force_path_style {
            s3_config_builder = s3_config_builder.force_path_style(true);
        }

        let client = Client::from_conf(s3_config_builder.build());

        // Strip trailing slashes to avoid double-slash keys like "prefix//key"
        let prefix = prefix
            .map(|p| p.trim_end_matches('/').to_string())
            .filter(|p| !p.is_empty());

        Ok(Self {
            client,
            bucket: bucket.to_string(),
            prefix,
        })
    }

    /// Full object key for a key (applies prefix if configured).
    fn full_key(&self, key: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}/{key}"),
            None => key.to_string(),
        }
    }

    fn strip_prefix(&self) -> Option<String> {
        self.prefix.as_ref().map(|p| format!("{p}/"))
    }
}

/// Accept bare `host:port` endpoints (e.g. "minio:9000") by assuming http.
fn normalize_endpoint(endpoint: &str) -> String {
    let lower = endpoint.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        endpoint.to_string()
    } else {
        format!("http://{endpoint}")
    }
}

#[async_trait]
impl ObjectStore for S3Backend {
    #[instrument(skip(self), fields(backend = "s3"))]
    async fn exists(&self, key: &str) -> StorageResult<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(self.full_key(key))
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(err) if status_of(&err) == Some(404) => Ok(false),
            Err(err) => Err(map_s3_operation_error(err)),
        }
    }

    #[instrument(skip(self), fields(backend = "s3"))]
    async fn head(&self, key: &str) -> StorageResult<ObjectMeta> {
        let output = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(self.full_key(key))
            .send()
            .await
            .map_err(|e| map_sdk_error(e, key))?;

        Ok(ObjectMeta {
            size: output.content_length().unwrap_or(0).max(0) as u64,
            last_modified: output.last_modified().and_then(|dt| to_offset(key, dt)),
        })
    }

    #[instrument(skip(self), fields(backend = "s3"))]
    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(self.full_key(key))
            .send()
            .await
            .map_err(|e| map_sdk_error(e, key))?;

        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| StorageError::S3(Box::new(e)))?
            .into_bytes();

        Ok(bytes)
    }

    #[instrument(skip(self, data), fields(backend = "s3", size = data.len()))]
    async fn put(&self, key: &str, data: Bytes) -> StorageResult<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(self.full_key(key))
            .body(data.into())
            .send()
            .await
            .map_err(map_s3_operation_error)?;
        Ok(())
    }

    #[instrument(skip(self, data), fields(backend = "s3", size = data.len()))]
    async fn put_if_not_exists(&self, key: &str, data: Bytes) -> StorageResult<bool> {
        match self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(self.full_key(key))
            .if_none_match("*")
            .body(data.into())
            .send()
            .await
        {
            Ok(_) => Ok(true),
            // 412: key exists; 409: a concurrent conditional write is in flight.
            Err(err) if matches!(status_of(&err), Some(412) | Some(409)) => Ok(false),
            Err(err) => Err(map_s3_operation_error(err)),
        }
    }

    #[instrument(skip(self), fields(backend = "s3"))]
    async fn delete(&self, key: &str) -> StorageResult<()> {
        match self
            .client
            .delete_object()
            .bucket(&self.bucket)
            .key(self.full_key(key))
            .send()
            .await
        {
            Ok(_) => Ok(()),
            Err(err) if status_of(&err) == Some(404) => Ok(()),
            Err(err) => Err(map_s3_operation_error(err)),
        }
    }

    fn list_stream<'a>(&'a self, prefix: &str) -> ObjectStream<'a> {
        list_bucket(
            self.client.clone(),
            self.bucket.clone(),
            self.full_key(prefix),
            self.strip_prefix(),
            None,
        )
    }

    /// Every object in every bucket visible to the credentials, keyed
    /// `<bucket>/<key>`. The configured key prefix does not apply.
    fn list_all_containers<'a>(&'a self) -> ObjectStream<'a> {
        let client = self.client.clone();
        let stream = async_stream::try_stream! {
            let output = client
                .list_buckets()
                .send()
                .await
                .map_err(map_s3_operation_error)?;

            for bucket in output.buckets() {
                let Some(name) = bucket.name() else {
                    continue;
                };
                let mut objects = list_bucket(
                    client.clone(),
                    name.to_string(),
                    String::new(),
                    None,
                    Some(name.to_string()),
                );
                while let Some(entry) = futures::StreamExt::next(&mut objects).await {
                    yield entry?;
                }
            }
        };
        Box::pin(stream)
    }

    fn backend_name(&self) -> &'static str {
        "s3"
    }

    #[instrument(skip(self), fields(backend = "s3"))]
    async fn health_check(&self) -> StorageResult<()> {
        let head_bucket = self.client.head_bucket().bucket(&self.bucket).send();

        match tokio::time::timeout(HEALTH_CHECK_TIMEOUT, head_bucket).await {
            Err(_) => Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "S3 health check timed out after 10 seconds",
            ))),
            Ok(Ok(_)) => Ok(()),
            Ok(Err(err)) if status_of(&err) == Some(404) => Err(StorageError::Config(format!(
                "bucket {} does not exist",
                self.bucket
            ))),
            Ok(Err(err)) => Err(map_s3_operation_error(err)),
        }
    }
}
