//! File Tailer (C2, spec §4.2): one independent task per source, following
//! a file across rotation/truncation and handing completed lines to the
//! Record Builder, with a bounded retry window before abandoning a source.
//!
//! Grounded in the "per-file retry on tail failure" REDESIGN FLAG (spec
//! §9): unlike the teacher pattern this is distilled from (which restarts
//! indefinitely), a tailer that cannot open or keep reading its file gives
//! up after `retry_window` and logs a structured warning rather than
//! looping forever on a permanently broken source.

use std::sync::Arc;
use std::time::{Duration, Instant};

use opsentra_core::{Identity, LogRecord};
use opsentra_discovery::SourceDescriptor;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::builder;
use crate::file_watcher::{FileWatcher, ReadFrom, RotationCheck};

const POLL_INTERVAL: Duration = Duration::from_millis(250);
const BACKOFF_START: Duration = Duration::from_millis(100);
const BACKOFF_MAX: Duration = Duration::from_secs(2);
const DEFAULT_MAX_LINE_BYTES: usize = 1024 * 1024;

#[derive(Debug, Error)]
pub enum TailError {
    #[error("source {path} abandoned after retry window elapsed: {source}")]
    Abandoned {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Run one tailer to completion: either the source is abandoned after
/// `retry_window` of consecutive failures, or `shutdown` fires and the
/// tailer finalizes its trailing partial line before returning.
#[instrument(skip(identity, tx, shutdown), fields(source = %source.path.display(), service = %source.service))]
pub async fn run(
    source: SourceDescriptor,
    identity: Arc<Identity>,
    tx: mpsc::Sender<LogRecord>,
    shutdown: CancellationToken,
    retry_window: Duration,
) -> Result<(), TailError> {
    let mut watcher = match open_with_retry(&source, retry_window, &shutdown).await {
        Ok(Some(w)) => w,
        Ok(None) => return Ok(()), // shut down while still retrying the initial open
        Err(err) => {
            warn!(source = %source.path.display(), error = %err, "abandoning source: could not open within retry window");
            return Err(TailError::Abandoned {
                path: source.path.display().to_string(),
                source: err,
            });
        }
    };

    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                if let Some(raw) = watcher.finalize() {
                    emit(&raw.bytes, &source, &identity, &tx).await;
                }
                return Ok(());
            }
            result = watcher.read_line() => {
                match result {
                    Ok(Some(raw)) => {
                        emit(&raw.bytes, &source, &identity, &tx).await;
                    }
                    Ok(None) => {
                        if handle_idle(&mut watcher, &source, retry_window, &shutdown).await? {
                            return Ok(());
                        }
                    }
                    Err(err) => {
                        debug!(source = %source.path.display(), error = %err, "read error, attempting reopen");
                        if reopen_with_retry(&mut watcher, &source, retry_window, &shutdown).await?.is_none() {
                            return Ok(());
                        }
                    }
                }
            }
        }
    }
}

/// No line was ready. Check for rotation/truncation, reopen if needed, then
/// sleep for the poll interval (or return early on shutdown).
///
/// Returns `Ok(true)` if shutdown fired during this step.
async fn handle_idle(
    watcher: &mut FileWatcher,
    source: &SourceDescriptor,
    retry_window: Duration,
    shutdown: &CancellationToken,
) -> Result<bool, TailError> {
    match watcher.check_rotation().await {
        RotationCheck::Unchanged => {}
        RotationCheck::Rotated | RotationCheck::Truncated => {
            debug!(source = %source.path.display(), "rotation or truncation detected, reopening at offset zero");
            if reopen_with_retry(watcher, source, retry_window, shutdown).await?.is_none() {
                return Ok(true);
            }
        }
    }

    tokio::select! {
        _ = tokio::time::sleep(POLL_INTERVAL) => Ok(false),
        _ = shutdown.cancelled() => Ok(true),
    }
}

/// Open the source for the first time, retrying with exponential backoff
/// up to `retry_window`. `Ok(None)` means shutdown fired while retrying.
async fn open_with_retry(
    source: &SourceDescriptor,
    retry_window: Duration,
    shutdown: &CancellationToken,
) -> Result<Option<FileWatcher>, std::io::Error> {
    let deadline = Instant::now() + retry_window;
    let mut backoff = BACKOFF_START;

    loop {
        match FileWatcher::new(source.path.clone(), ReadFrom::End, DEFAULT_MAX_LINE_BYTES).await {
            Ok(w) => return Ok(Some(w)),
            Err(err) => {
                if Instant::now() >= deadline {
                    return Err(err);
                }
                tokio::select! {
                    _ = tokio::time::sleep(backoff) => {}
                    _ = shutdown.cancelled() => return Ok(None),
                }
                backoff = (backoff * 2).min(BACKOFF_MAX);
            }
        }
    }
}

/// Reopen an existing watcher, retrying with backoff up to `retry_window`.
/// Returns `Ok(Some(()))` on success, `Ok(None)` if shutdown fired, and
/// `Err` if the retry window elapsed (the caller abandons the source).
async fn reopen_with_retry(
    watcher: &mut FileWatcher,
    source: &SourceDescriptor,
    retry_window: Duration,
    shutdown: &CancellationToken,
) -> Result<Option<()>, TailError> {
    let deadline = Instant::now() + retry_window;
    let mut backoff = BACKOFF_START;

    loop {
        match watcher.reopen().await {
            Ok(()) => return Ok(Some(())),
            Err(err) => {
                if Instant::now() >= deadline {
                    warn!(source = %source.path.display(), error = %err, "abandoning source: reopen failed within retry window");
                    return Err(TailError::Abandoned {
                        path: source.path.display().to_string(),
                        source: err,
                    });
                }
                tokio::select! {
                    _ = tokio::time::sleep(backoff) => {}
                    _ = shutdown.cancelled() => return Ok(None),
                }
                backoff = (backoff * 2).min(BACKOFF_MAX);
            }
        }
    }
}

async fn emit(
    raw_line: &[u8],
    source: &SourceDescriptor,
    identity: &Identity,
    tx: &mpsc::Sender<LogRecord>,
) {
    if let Some(record) = builder::build(raw_line, source, identity).await {
        if tx.send(record).await.is_err() {
            debug!(source = %source.path.display(), "record channel closed, dropping line");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opsentra_core::SourceType;
    use std::collections::BTreeMap;
    use std::io::Write;

    #[tokio::test]
    async fn tails_appended_lines_in_order() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let source = SourceDescriptor {
            path: tmp.path().to_path_buf(),
            source_type: SourceType::System,
            service: "app".to_string(),
            aux_metadata: BTreeMap::new(),
        };

        let (tx, mut rx) = mpsc::channel(16);
        let shutdown = CancellationToken::new();
        let identity = Arc::new(Identity::with_metadata_url("host", "http://127.0.0.1:1/x"));

        let handle = tokio::spawn(run(source, identity, tx, shutdown.clone(), Duration::from_secs(5)));

        tokio::time::sleep(Duration::from_millis(50)).await;
        writeln!(tmp.as_file(), "first line").unwrap();
        let r1 = rx.recv().await.unwrap();
        assert_eq!(r1.message, "first line");

        writeln!(tmp.as_file(), "second line").unwrap();
        let r2 = rx.recv().await.unwrap();
        assert_eq!(r2.message, "second line");
        assert!(r1.timestamp <= r2.timestamp);

        shutdown.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn abandons_missing_source_after_retry_window() {
        let source = SourceDescriptor {
            path: "/nonexistent/path/does-not-exist.log".into(),
            source_type: SourceType::System,
            service: "app".to_string(),
            aux_metadata: BTreeMap::new(),
        };
        let (tx, _rx) = mpsc::channel(1);
        let shutdown = CancellationToken::new();
        let identity = Arc::new(Identity::with_metadata_url("host", "http://127.0.0.1:1/x"));

        let result = run(source, identity, tx, shutdown, Duration::from_millis(200)).await;
        assert!(matches!(result, Err(TailError::Abandoned { .. })));
    }
}
