//! Polling-based file watcher (spec §4.2), grounded in the teacher's
//! `FileWatcher` state machine (`lib/file-source/src/file_watcher/mod.rs`):
//! one watcher per path, transparently reopening the underlying file
//! descriptor on rotation, carrying no gzip-decompression support (not in
//! scope here) and no `file_source_common` dependency — `read_until` is
//! inlined locally since only this crate needs it.

use std::io::{self, SeekFrom};
use std::path::PathBuf;

use bytes::{Bytes, BytesMut};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};

#[cfg(unix)]
use std::os::unix::fs::MetadataExt;

/// Where a newly created `FileWatcher` should start reading from.
#[derive(Debug, Clone, Copy)]
pub enum ReadFrom {
    Beginning,
    End,
    Checkpoint(u64),
}

fn dev_ino(metadata: &std::fs::Metadata) -> (u64, u64) {
    #[cfg(unix)]
    {
        (metadata.dev(), metadata.ino())
    }
    #[cfg(not(unix))]
    {
        let _ = metadata;
        (0, 0)
    }
}

/// One newline-terminated (or shutdown-finalized) line read from a watched
/// file, along with the byte offset it started at.
#[derive(Debug)]
pub struct RawLine {
    pub offset: u64,
    pub bytes: Bytes,
}

/// The outcome of a rotation/truncation check against the path on disk.
#[derive(Debug, PartialEq, Eq)]
pub enum RotationCheck {
    Unchanged,
    Rotated,
    Truncated,
}

pub struct FileWatcher {
    pub path: PathBuf,
    reader: BufReader<File>,
    file_position: u64,
    dev: u64,
    ino: u64,
    dead: bool,
    reached_eof: bool,
    max_line_bytes: usize,
    buf: BytesMut,
}

impl FileWatcher {
    pub async fn new(
        path: PathBuf,
        read_from: ReadFrom,
        max_line_bytes: usize,
    ) -> io::Result<FileWatcher> {
        let file = File::open(&path).await?;
        let metadata = file.metadata().await?;
        let (dev, ino) = dev_ino(&metadata);

        let mut reader = BufReader::new(file);
        let file_position = match read_from {
            ReadFrom::Beginning => reader.seek(SeekFrom::Start(0)).await?,
            ReadFrom::End => reader.seek(SeekFrom::End(0)).await?,
            ReadFrom::Checkpoint(pos) => reader.seek(SeekFrom::Start(pos)).await?,
        };

        Ok(FileWatcher {
            path,
            reader,
            file_position,
            dev,
            ino,
            dead: false,
            reached_eof: false,
            max_line_bytes,
            buf: BytesMut::new(),
        })
    }

    pub fn file_position(&self) -> u64 {
        self.file_position
    }

    pub fn dead(&self) -> bool {
        self.dead
    }

    pub fn set_dead(&mut self) {
        self.dead = true;
    }

    pub fn reached_eof(&self) -> bool {
        self.reached_eof
    }

    /// Compare the currently open file's identity and size against what is
    /// on disk at `self.path` right now, without reopening anything.
    pub async fn check_rotation(&self) -> RotationCheck {
        let on_disk = match tokio::fs::metadata(&self.path).await {
            Ok(m) => m,
            Err(_) => return RotationCheck::Unchanged,
        };
        let (dev, ino) = dev_ino(&on_disk);
        if (dev, ino) != (self.dev, self.ino) {
            return RotationCheck::Rotated;
        }
        if on_disk.len() < self.file_position {
            return RotationCheck::Truncated;
        }
        RotationCheck::Unchanged
    }

    /// Reopen `self.path` from the beginning. Used after rotation or
    /// truncation is detected (spec: "reopens at offset zero").
    pub async fn reopen(&mut self) -> io::Result<()> {
        let file = File::open(&self.path).await?;
        let metadata = file.metadata().await?;
        let (dev, ino) = dev_ino(&metadata);

        self.reader = BufReader::new(file);
        self.file_position = 0;
        self.dev = dev;
        self.ino = ino;
        self.dead = false;
        self.reached_eof = false;
        self.buf.clear();
        Ok(())
    }

    /// Read one line, buffering partial reads across calls. Returns `Ok(None)`
    /// when the current contents have been exhausted without a terminating
    /// newline (the partial line stays buffered for the next call).
    pub async fn read_line(&mut self) -> io::Result<Option<RawLine>> {
        let initial_position = self.file_position;
        let mut chunk = Vec::new();
        let bytes_read = self.reader.read_until(b'\n', &mut chunk).await?;

        if bytes_read == 0 {
            self.reached_eof = true;
            return Ok(None);
        }

        self.file_position += bytes_read as u64;
        self.buf.extend_from_slice(&chunk);

        if !self.buf.ends_with(b"\n") {
            if self.buf.len() > self.max_line_bytes {
                // Drop an oversized, still-incomplete line rather than growing unbounded.
                self.buf.clear();
            }
            return Ok(None);
        }

        self.reached_eof = false;
        let line = self.buf.split().freeze();
        Ok(Some(RawLine {
            offset: initial_position,
            bytes: line,
        }))
    }

    /// Return whatever partial line remains buffered, without a trailing
    /// newline. Called once at shutdown (spec: "a line is emitted only on
    /// newline or on explicit finalization at shutdown").
    pub fn finalize(&mut self) -> Option<RawLine> {
        if self.buf.is_empty() {
            return None;
        }
        let offset = self.file_position - self.buf.len() as u64;
        let line = self.buf.split().freeze();
        Some(RawLine { offset, bytes: line })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn reads_lines_as_they_are_written() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(tmp.as_file(), "line one").unwrap();

        let mut watcher = FileWatcher::new(tmp.path().to_path_buf(), ReadFrom::Beginning, 64 * 1024)
            .await
            .unwrap();

        let line = watcher.read_line().await.unwrap().unwrap();
        assert_eq!(&line.bytes[..], b"line one\n");
        assert_eq!(line.offset, 0);

        assert!(watcher.read_line().await.unwrap().is_none());
        assert!(watcher.reached_eof());
    }

    #[tokio::test]
    async fn buffers_partial_lines_across_reads() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        write!(tmp.as_file(), "partial").unwrap();

        let mut watcher = FileWatcher::new(tmp.path().to_path_buf(), ReadFrom::Beginning, 64 * 1024)
            .await
            .unwrap();

        assert!(watcher.read_line().await.unwrap().is_none());

        let mut f = std::fs::OpenOptions::new().append(true).open(tmp.path()).unwrap();
        writeln!(f, " line done").unwrap();

        let line = watcher.read_line().await.unwrap().unwrap();
        assert_eq!(&line.bytes[..], b"partial line done\n");
    }

    #[tokio::test]
    async fn finalize_returns_trailing_partial_line_without_newline() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        write!(tmp.as_file(), "no newline yet").unwrap();

        let mut watcher = FileWatcher::new(tmp.path().to_path_buf(), ReadFrom::Beginning, 64 * 1024)
            .await
            .unwrap();

        assert!(watcher.read_line().await.unwrap().is_none());
        let finalized = watcher.finalize().unwrap();
        assert_eq!(&finalized.bytes[..], b"no newline yet");
    }

    #[tokio::test]
    async fn detects_truncation() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(tmp.as_file(), "one line of content here").unwrap();

        let mut watcher = FileWatcher::new(tmp.path().to_path_buf(), ReadFrom::Beginning, 64 * 1024)
            .await
            .unwrap();
        watcher.read_line().await.unwrap();

        std::fs::write(tmp.path(), "short").unwrap();
        assert_eq!(watcher.check_rotation().await, RotationCheck::Truncated);
    }
}
