//! Bounded, drop-oldest outbound queue between Record Builders and the
//! Broker Publisher (spec §4.4): "drop-oldest so the most recent activity
//! survives a backlog."

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use opsentra_core::LogRecord;
use tokio::sync::{Mutex, Notify};

pub struct PublishQueue {
    inner: Mutex<VecDeque<LogRecord>>,
    capacity: usize,
    notify: Notify,
    dropped: AtomicU64,
}

impl PublishQueue {
    pub fn new(capacity: usize) -> Arc<Self> {
        Arc::new(PublishQueue {
            inner: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity,
            notify: Notify::new(),
            dropped: AtomicU64::new(0),
        })
    }

    /// Enqueue a freshly built record. If the queue is at capacity, the
    /// oldest entry is dropped to make room and the drop counter increments.
    pub async fn push(&self, record: LogRecord) {
        let mut guard = self.inner.lock().await;
        if guard.len() >= self.capacity {
            guard.pop_front();
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        guard.push_back(record);
        drop(guard);
        self.notify.notify_one();
    }

    /// Re-enqueue a record at the head of the queue — used when a publish
    /// attempt fails after retries and must be retried again once the
    /// connection recovers (spec §4.4: "puts the record back at the head").
    pub async fn push_front(&self, record: LogRecord) {
        let mut guard = self.inner.lock().await;
        guard.push_front(record);
        drop(guard);
        self.notify.notify_one();
    }

    /// Pop the oldest record, waiting if the queue is currently empty.
    pub async fn pop(&self) -> LogRecord {
        loop {
            {
                let mut guard = self.inner.lock().await;
                if let Some(record) = guard.pop_front() {
                    return record;
                }
            }
            self.notify.notified().await;
        }
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    /// Drain up to `limit` records without blocking — used by the shutdown
    /// flush deadline (spec §4.9) to give up remaining queued records.
    pub async fn drain(&self, limit: usize) -> Vec<LogRecord> {
        let mut guard = self.inner.lock().await;
        let n = guard.len().min(limit);
        guard.drain(..n).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use opsentra_core::{Level, SourceType};
    use std::collections::BTreeMap;

    fn record(message: &str) -> LogRecord {
        LogRecord::new(
            Utc::now(),
            Level::Info,
            "svc",
            "host",
            "1.2.3.4",
            "/var/log/app.log",
            message,
            SourceType::System,
            BTreeMap::new(),
        )
    }

    #[tokio::test]
    async fn drops_oldest_on_overflow() {
        let queue = PublishQueue::new(2);
        queue.push(record("one")).await;
        queue.push(record("two")).await;
        queue.push(record("three")).await;

        assert_eq!(queue.dropped_count(), 1);
        assert_eq!(queue.len().await, 2);
        let first = queue.pop().await;
        assert_eq!(first.message, "two");
    }

    #[tokio::test]
    async fn push_front_reorders_ahead_of_queue() {
        let queue = PublishQueue::new(10);
        queue.push(record("second")).await;
        queue.push_front(record("first")).await;

        assert_eq!(queue.pop().await.message, "first");
        assert_eq!(queue.pop().await.message, "second");
    }
}
