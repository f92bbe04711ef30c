//! Background retention sweeps.
//!
//! Each tick lists the store and deletes what has outlived the retention
//! window. Errors are logged and counted; a sweep never fails and the
//! loop never stops.

use crate::deadline::within;
use crate::error::{EngineError, EngineResult};
use chunkvault_core::config::{RetentionConfig, RetentionMode};
use chunkvault_core::{ChunkKey, FileId};
use chunkvault_storage::{ObjectEntry, ObjectStore, ObjectStream};
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Outcome of one sweep.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub examined: u64,
    pub deleted: u64,
    pub retained: u64,
    /// Listing and deletion errors.
    pub failures: u64,
    /// Whole files expired (per-file mode only).
    pub files_expired: u64,
}

/// Deletes expired objects on a fixed period.
pub struct RetentionSweeper {
    store: Arc<dyn ObjectStore>,
    window: time::Duration,
    interval: Duration,
    mode: RetentionMode,
    op_timeout: Duration,
}

impl RetentionSweeper {
    /// Fails on a zero window or interval, or a zero `op_timeout`.
    pub fn new(
        store: Arc<dyn ObjectStore>,
        config: &RetentionConfig,
        op_timeout: Duration,
    ) -> EngineResult<Self> {
        config.validate()?;
        if op_timeout.is_zero() {
            return Err(EngineError::InvalidConfig(
                "retention operation timeout must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            store,
            window: config.window(),
            interval: config.sweep_interval(),
            mode: config.mode,
            op_timeout,
        })
    }

    /// Sweep forever. `on_report` sees every completed sweep.
    pub async fn run<F>(self, mut on_report: F)
    where
        F: FnMut(&SweepReport) + Send + 'static,
    {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            interval_secs = self.interval.as_secs(),
            window_secs = self.window.whole_seconds(),
            mode = ?self.mode,
            "Retention sweeper started"
        );

        loop {
            ticker.tick().await;
            let report = self.sweep_at(OffsetDateTime::now_utc()).await;
            on_report(&report);
        }
    }

    /// Run the sweeper on the current runtime.
    pub fn spawn<F>(self, on_report: F) -> JoinHandle<()>
    where
        F: FnMut(&SweepReport) + Send + 'static,
    {
        tokio::spawn(self.run(on_report))
    }

    /// One sweep, judging age against `now`.
    pub async fn sweep_at(&self, now: OffsetDateTime) -> SweepReport {
        let mut report = SweepReport::default();

        let outcome = match self.mode {
            RetentionMode::PerObject => self.sweep_objects(now, &mut report).await,
            RetentionMode::PerFile => self.sweep_files(now, &mut report).await,
        };
        if let Err(error) = outcome {
            warn!(error = %error, "Retention listing failed, sweep cut short");
            report.failures += 1;
        }

        if report.deleted > 0 || report.failures > 0 {
            info!(
                examined = report.examined,
                deleted = report.deleted,
                retained = report.retained,
                failures = report.failures,
                files_expired = report.files_expired,
                "Retention sweep complete"
            );
        } else {
            debug!(examined = report.examined, "Retention sweep found nothing to delete");
        }
        report
    }

    /// Next listing entry, with a stall counted as a listing error.
    async fn next_entry(&self, stream: &mut ObjectStream<'_>) -> Result<Option<ObjectEntry>, String> {
        match tokio::time::timeout(self.op_timeout, stream.next()).await {
            Ok(Some(Ok(entry))) => Ok(Some(entry)),
            Ok(Some(Err(e))) => Err(e.to_string()),
            Ok(None) => Ok(None),
            Err(_) => Err(format!("listing stalled for {:?}", self.op_timeout)),
        }
    }

    /// Judge each object as it is listed. Deletions made before a listing
    /// error stand.
    async fn sweep_objects(&self, now: OffsetDateTime, report: &mut SweepReport) -> Result<(), String> {
        let mut stream = self.store.list_stream("");
        while let Some(entry) = self.next_entry(&mut stream).await? {
            report.examined += 1;
            self.judge_object(entry, now, report).await;
        }
        Ok(())
    }

    /// Group chunks by file and expire whole files once the listing is
    /// complete. A partial listing could miss a file's newest chunk, so a
    /// listing error deletes no chunks. Loose objects are judged as listed.
    async fn sweep_files(&self, now: OffsetDateTime, report: &mut SweepReport) -> Result<(), String> {
        let mut files: HashMap<FileId, Vec<ObjectEntry>> = HashMap::new();
        let mut stream = self.store.list_stream("");
        while let Some(entry) = self.next_entry(&mut stream).await? {
            report.examined += 1;
            match ChunkKey::parse(&entry.key) {
                Ok(chunk) => files.entry(chunk.file_id).or_default().push(entry),
                Err(_) => self.judge_object(entry, now, report).await,
            }
        }
        drop(stream);

        for (file, chunks) in files {
            // Any chunk without a timestamp keeps the whole file.
            let newest = chunks
                .iter()
                .map(|c| c.last_modified)
                .try_fold(OffsetDateTime::UNIX_EPOCH, |acc, t| t.map(|t| acc.max(t)));

            match newest {
                Some(newest) if self.is_expired(newest, now) => {
                    debug!(file_id = %file, chunks = chunks.len(), "File expired");
                    let before = report.failures;
                    for chunk in &chunks {
                        self.delete(&chunk.key, report).await;
                    }
                    if report.failures == before {
                        report.files_expired += 1;
                    }
                }
                _ => report.retained += chunks.len() as u64,
            }
        }
        Ok(())
    }

    fn is_expired(&self, last_modified: OffsetDateTime, now: OffsetDateTime) -> bool {
        now - last_modified > self.window
    }

    async fn judge_object(&self, entry: ObjectEntry, now: OffsetDateTime, report: &mut SweepReport) {
        match entry.last_modified {
            Some(modified) if self.is_expired(modified, now) => {
                self.delete(&entry.key, report).await;
            }
            Some(_) => report.retained += 1,
            None => {
                debug!(key = %entry.key, "No modification time, keeping object");
                report.retained += 1;
            }
        }
    }

    async fn delete(&self, key: &str, report: &mut SweepReport) {
        match within(self.op_timeout, "delete", key, self.store.delete(key)).await {
            Ok(()) => report.deleted += 1,
            Err(error) => {
                warn!(key = %key, error = %error, "Failed to delete expired object");
                report.failures += 1;
            }
        }
    }
}
