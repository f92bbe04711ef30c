//! Configuration types shared across crates.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// HTTP server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Enable the /metrics endpoint for Prometheus scraping (default: true).
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_max_body_bytes() -> usize {
    31 * 1024 * 1024
}

fn default_metrics_enabled() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_body_bytes: default_max_body_bytes(),
            metrics_enabled: default_metrics_enabled(),
        }
    }
}

/// Storage backend configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Local filesystem storage.
    Filesystem {
        /// Root directory for storage.
        path: PathBuf,
    },
    /// S3-compatible storage (AWS, MinIO, ...).
    S3 {
        /// Bucket name. The bucket must already exist.
        bucket: String,
        /// Optional endpoint URL (for MinIO, etc.).
        endpoint: Option<String>,
        /// AWS region.
        region: Option<String>,
        /// Optional key prefix.
        prefix: Option<String>,
        /// Access key ID. Falls back to the ambient AWS credential chain if not set.
        access_key_id: Option<String>,
        /// Secret access key. Falls back to the ambient AWS credential chain if not set.
        secret_access_key: Option<String>,
        /// Force path-style URLs (`endpoint/bucket/key`). Required for MinIO.
        #[serde(default)]
        force_path_style: bool,
    },
    /// In-process storage. Contents are lost on restart.
    Memory,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::Filesystem {
            path: PathBuf::from("./data/storage"),
        }
    }
}

impl StorageConfig {
    /// Validate storage configuration invariants.
    pub fn validate(&self) -> Result<()> {
        match self {
            StorageConfig::S3 {
                bucket,
                access_key_id,
                secret_access_key,
                ..
            } => {
                if bucket.is_empty() {
                    return Err(Error::InvalidConfig("s3 bucket must not be empty".to_string()));
                }
                match (access_key_id.as_ref(), secret_access_key.as_ref()) {
                    (Some(_), Some(_)) | (None, None) => Ok(()),
                    _ => Err(Error::InvalidConfig(
                        "s3 config requires both access_key_id and secret_access_key when either is set"
                            .to_string(),
                    )),
                }
            }
            _ => Ok(()),
        }
    }
}

/// Chunk engine limits.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Largest chunk payload accepted on write and served on read.
    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size: u64,
    /// Deadline for every individual store operation.
    #[serde(default = "default_operation_timeout_secs")]
    pub operation_timeout_secs: u64,
}

fn default_max_chunk_size() -> u64 {
    crate::DEFAULT_MAX_CHUNK_SIZE
}

fn default_operation_timeout_secs() -> u64 {
    30
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: default_max_chunk_size(),
            operation_timeout_secs: default_operation_timeout_secs(),
        }
    }
}

impl EngineConfig {
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_chunk_size == 0 {
            return Err(Error::InvalidConfig(
                "engine.max_chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.operation_timeout_secs == 0 {
            return Err(Error::InvalidConfig(
                "engine.operation_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Storage usage reporting.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QuotaConfig {
    /// Bytes per reported storage unit (default: 1 GiB).
    #[serde(default = "default_unit_size_bytes")]
    pub unit_size_bytes: u64,
    /// Fixed capacity, in units. Informational only.
    #[serde(default = "default_capacity_units")]
    pub capacity_units: u64,
    /// Deadline for a full usage enumeration.
    #[serde(default = "default_quota_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_unit_size_bytes() -> u64 {
    crate::GIB
}

fn default_capacity_units() -> u64 {
    200
}

fn default_quota_timeout_secs() -> u64 {
    120
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            unit_size_bytes: default_unit_size_bytes(),
            capacity_units: default_capacity_units(),
            timeout_secs: default_quota_timeout_secs(),
        }
    }
}

impl QuotaConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.unit_size_bytes == 0 {
            return Err(Error::InvalidConfig(
                "quota.unit_size_bytes must be greater than zero".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(Error::InvalidConfig(
                "quota.timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// How the retention sweeper decides what to expire.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RetentionMode {
    /// Every object is judged on its own age. Files can lose some chunks
    /// and keep others.
    PerObject,
    /// Chunks are grouped by file; a file expires when its newest chunk is
    /// older than the window, and all of its chunks go together.
    #[default]
    PerFile,
}

/// Retention sweeper configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetentionConfig {
    /// Run the background sweeper (default: true).
    #[serde(default = "default_retention_enabled")]
    pub enabled: bool,
    /// Objects older than this are deleted (default: 7 days).
    #[serde(default = "default_retention_window_secs")]
    pub window_secs: u64,
    /// Period between sweeps (default: 1 hour).
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    #[serde(default)]
    pub mode: RetentionMode,
}

fn default_retention_enabled() -> bool {
    true
}

fn default_retention_window_secs() -> u64 {
    7 * 24 * 3600
}

fn default_sweep_interval_secs() -> u64 {
    3600
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            enabled: default_retention_enabled(),
            window_secs: default_retention_window_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            mode: RetentionMode::default(),
        }
    }
}

impl RetentionConfig {
    /// Get the retention window as a time::Duration.
    pub fn window(&self) -> time::Duration {
        // Saturate at i64::MAX to prevent overflow wrapping to negative
        let secs = i64::try_from(self.window_secs).unwrap_or(i64::MAX);
        time::Duration::seconds(secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.window_secs == 0 {
            return Err(Error::InvalidConfig(
                "retention.window_secs must be greater than zero".to_string(),
            ));
        }
        if self.window_secs > i64::MAX as u64 {
            return Err(Error::InvalidConfig(format!(
                "retention.window_secs {} exceeds maximum value {}",
                self.window_secs,
                i64::MAX
            )));
        }
        if self.sweep_interval_secs == 0 {
            return Err(Error::InvalidConfig(
                "retention.sweep_interval_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Startup connection policy for the object store.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConnectConfig {
    /// Connection attempts before giving up (default: 10).
    #[serde(default = "default_connect_attempts")]
    pub attempts: u32,
    /// Fixed delay between attempts in milliseconds (default: 2000).
    #[serde(default = "default_connect_backoff_ms")]
    pub backoff_ms: u64,
    /// Deadline for a single attempt's health check (default: 10s).
    #[serde(default = "default_connect_attempt_timeout_secs")]
    pub attempt_timeout_secs: u64,
}

fn default_connect_attempts() -> u32 {
    10
}

fn default_connect_backoff_ms() -> u64 {
    2000
}

fn default_connect_attempt_timeout_secs() -> u64 {
    10
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            attempts: default_connect_attempts(),
            backoff_ms: default_connect_backoff_ms(),
            attempt_timeout_secs: default_connect_attempt_timeout_secs(),
        }
    }
}

impl ConnectConfig {
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.attempts == 0 {
            return Err(Error::InvalidConfig(
                "connect.attempts must be at least 1".to_string(),
            ));
        }
        if self.attempt_timeout_secs == 0 {
            return Err(Error::InvalidConfig(
                "connect.attempt_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub quota: QuotaConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
    #[serde(default)]
    pub connect: ConnectConfig,
}

impl AppConfig {
    /// Create a test configuration backed by in-memory storage.
    ///
    /// **For testing only.**
    pub fn for_testing() -> Self {
        Self {
            storage: StorageConfig::Memory,
            retention: RetentionConfig {
                enabled: false,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<()> {
        self.storage.validate()?;
        self.engine.validate()?;
        self.quota.validate()?;
        self.retention.validate()?;
        self.connect.validate()?;
        Ok(())
    }
}
