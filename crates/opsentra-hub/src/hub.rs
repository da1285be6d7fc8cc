//! Subscriber Hub (spec §4.7): fans out records and enrichment updates to
//! every registered subscriber in broker delivery order, with per-subscriber
//! filtering, a bounded outbound buffer, and disconnect-on-overflow
//! backpressure.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use opsentra_broker::{EnrichmentUpdate, HubNotifier};
use opsentra_core::LogRecord;
use tokio::sync::{mpsc, Mutex};
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::event::HubEvent;

const OUTBOUND_BUFFER: usize = 1_000;
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
const HEARTBEAT_TICK: Duration = Duration::from_secs(10);

struct Subscriber {
    service_filter: Option<String>,
    tx: mpsc::Sender<HubEvent>,
    last_activity: Instant,
}

pub struct Hub {
    subscribers: Mutex<HashMap<u64, Subscriber>>,
    next_id: AtomicU64,
}

impl Hub {
    pub fn new() -> Self {
        Hub {
            subscribers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        // best-effort snapshot; exact value racy by design, matching the
        // hub's non-blocking fan-out contract.
        self.subscribers
            .try_lock()
            .map(|guard| guard.len())
            .unwrap_or(0)
    }

    /// Register a new subscriber and return the event stream the HTTP layer
    /// turns into an SSE response.
    pub async fn register(
        &self,
        service_filter: Option<String>,
    ) -> impl futures::Stream<Item = Result<axum::response::sse::Event, Infallible>> {
        let (tx, rx) = mpsc::channel(OUTBOUND_BUFFER);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers.lock().await.insert(
            id,
            Subscriber {
                service_filter,
                tx,
                last_activity: Instant::now(),
            },
        );
        ReceiverStream::new(rx).map(|event| Ok(event.into_sse()))
    }

    async fn broadcast(&self, matches: impl Fn(Option<&str>) -> bool, event: HubEvent) {
        let mut subs = self.subscribers.lock().await;
        let mut stale = Vec::new();
        for (&id, sub) in subs.iter_mut() {
            if !matches(sub.service_filter.as_deref()) {
                continue;
            }
            match sub.tx.try_send(event.clone()) {
                Ok(()) => sub.last_activity = Instant::now(),
                Err(_) => stale.push(id),
            }
        }
        for id in stale {
            subs.remove(&id);
            warn!(subscriber_id = id, "subscriber disconnected: buffer full or closed");
        }
    }

    /// Background heartbeat loop (spec §4.7: "every 30s when no record has
    /// been delivered in the prior window"). Ticks more often than the 30s
    /// deadline itself so no subscriber's actual gap between framed events
    /// ever approaches the §8 45s ceiling.
    pub async fn run_heartbeats(&self, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(HEARTBEAT_TICK);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => return,
                _ = ticker.tick() => {}
            }
            let mut subs = self.subscribers.lock().await;
            let mut stale = Vec::new();
            let now = Instant::now();
            for (&id, sub) in subs.iter_mut() {
                if now.duration_since(sub.last_activity) < HEARTBEAT_INTERVAL {
                    continue;
                }
                match sub.tx.try_send(HubEvent::Heartbeat) {
                    Ok(()) => sub.last_activity = now,
                    Err(_) => stale.push(id),
                }
            }
            for id in stale {
                subs.remove(&id);
            }
        }
    }
}

impl Default for Hub {
    fn default() -> Self {
        Hub::new()
    }
}

#[async_trait]
impl HubNotifier for Hub {
    async fn notify_record(&self, record: &LogRecord) {
        let service = record.service.clone();
        self.broadcast(
            move |filter| filter.map_or(true, |f| f == service),
            HubEvent::Record(record.clone()),
        )
        .await;
    }

    async fn notify_enrichment(&self, update: &EnrichmentUpdate) {
        self.broadcast(|_| true, HubEvent::Enrichment(update.clone())).await;
    }
}
