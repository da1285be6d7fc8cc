//! Archival Scheduler (spec §4.8): on a fixed cadence, batch unsynchronized
//! records to object storage and mark them synced.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use chrono::{Duration as ChronoDuration, Utc};
use flate2::write::GzEncoder;
use flate2::Compression;
use opsentra_store::Store;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::ArchiveError;

const DEFAULT_INTERVAL: Duration = Duration::from_secs(10 * 60);
const DEFAULT_BATCH_LIMIT: i64 = 10_000;
const DEFAULT_WINDOW: ChronoDuration = ChronoDuration::minutes(10);
const MANIFEST_VERSION: &str = "3.0";

pub struct Scheduler {
    store: Arc<Store>,
    s3: S3Client,
    bucket: String,
    interval: Duration,
    batch_limit: i64,
    window: ChronoDuration,
    bucket_ready: AtomicBool,
    healthy: AtomicBool,
}

impl Scheduler {
    pub fn new(store: Arc<Store>, s3: S3Client, bucket_prefix: &str, capture_ip: &str) -> Self {
        Scheduler {
            store,
            s3,
            bucket: format!("{bucket_prefix}-logs-{capture_ip}"),
            interval: DEFAULT_INTERVAL,
            batch_limit: DEFAULT_BATCH_LIMIT,
            window: DEFAULT_WINDOW,
            bucket_ready: AtomicBool::new(false),
            healthy: AtomicBool::new(true),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    /// Drive the fixed-cadence loop until cancelled. Missed ticks are
    /// skipped, not queued (spec §4.8: "at most one archival operation is in
    /// flight at a time. Overruns are skipped, not queued").
    pub async fn run(&self, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("archival scheduler shutting down");
                    return;
                }
                _ = ticker.tick() => {}
            }
            match self.run_once().await {
                Ok(0) => {}
                Ok(n) => info!(archived = n, "archival batch complete"),
                Err(err) => {
                    self.healthy.store(false, Ordering::Relaxed);
                    error!(error = %err, "archival tick failed, will retry next tick");
                }
            }
        }
    }

    /// One archival pass (spec §4.8 steps 1-6). Returns the number of
    /// records archived.
    pub async fn run_once(&self) -> Result<usize, ArchiveError> {
        let records = self
            .store
            .query_unsynced(self.batch_limit, self.window)
            .await
            .map_err(ArchiveError::Query)?;
        if records.is_empty() {
            self.healthy.store(true, Ordering::Relaxed);
            return Ok(0);
        }

        let ids: Vec<_> = records.iter().filter_map(|r| r.id).collect();
        let payload: Vec<_> = records.iter().map(|r| r.to_log_record()).collect();
        let count = payload.len();

        let json = serde_json::to_vec(&payload).expect("LogRecord batch always serializes");
        let compressed = gzip(&json).map_err(ArchiveError::Compress)?;

        self.ensure_bucket().await?;
        let key = format!(
            "logs-{}.json.gz",
            Utc::now().to_rfc3339().replace(':', "-")
        );
        self.s3
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(compressed))
            .content_type("application/gzip")
            .content_encoding("gzip")
            .metadata("log-count", count.to_string())
            .metadata("compression", "gzip")
            .metadata("version", MANIFEST_VERSION)
            .send()
            .await
            .map_err(|err| ArchiveError::Upload(err.to_string()))?;

        self.store
            .mark_synced(&ids)
            .await
            .map_err(ArchiveError::MarkSynced)?;

        self.healthy.store(true, Ordering::Relaxed);
        Ok(count)
    }

    /// Lazily create the destination bucket once per process (spec §4.8
    /// step 3: "idempotent: existence check then create; ignore 'already
    /// exists' races").
    async fn ensure_bucket(&self) -> Result<(), ArchiveError> {
        if self.bucket_ready.load(Ordering::Relaxed) {
            return Ok(());
        }
        match self.s3.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => {
                self.bucket_ready.store(true, Ordering::Relaxed);
                return Ok(());
            }
            Err(_) => {}
        }
        match self.s3.create_bucket().bucket(&self.bucket).send().await {
            Ok(_) => {
                self.bucket_ready.store(true, Ordering::Relaxed);
                Ok(())
            }
            Err(err) => {
                let message = err.to_string();
                if message.contains("BucketAlreadyOwnedByYou") || message.contains("BucketAlreadyExists")
                {
                    warn!("bucket created concurrently, ignoring race");
                    self.bucket_ready.store(true, Ordering::Relaxed);
                    Ok(())
                } else {
                    Err(ArchiveError::BucketSetup(message))
                }
            }
        }
    }
}

fn gzip(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;

    #[test]
    fn gzip_round_trips() {
        let input = b"[{\"message\":\"hello\"}]".to_vec();
        let compressed = gzip(&input).unwrap();
        assert_ne!(compressed, input);
        let mut decoder = GzDecoder::new(&compressed[..]);
        let mut out = Vec::new();
        decoder.read_to_end(&mut out).unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn key_format_replaces_colons() {
        let ts = "2026-07-27T10:15:30+00:00";
        let key = format!("logs-{}.json.gz", ts.replace(':', "-"));
        assert_eq!(key, "logs-2026-07-27T10-15-30+00-00.json.gz");
    }
}
