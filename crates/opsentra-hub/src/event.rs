//! Wire shape of the two (plus heartbeat) event kinds the hub emits to
//! subscribers (spec §4.7): `record`, `enrichment`, `heartbeat`.

use std::time::Duration;

use axum::response::sse;
use opsentra_broker::EnrichmentUpdate;
use opsentra_core::LogRecord;

/// Reconnect hint advertised on every event (spec §4.7/§6: "a retry hint of
/// 3s is advertised").
const RETRY_HINT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone)]
pub enum HubEvent {
    Record(LogRecord),
    Enrichment(EnrichmentUpdate),
    Heartbeat,
}

impl HubEvent {
    pub fn into_sse(self) -> sse::Event {
        match self {
            HubEvent::Record(record) => sse::Event::default()
                .event("record")
                .json_data(&record)
                .expect("LogRecord always serializes")
                .retry(RETRY_HINT),
            HubEvent::Enrichment(update) => sse::Event::default()
                .event("enrichment")
                .json_data(&update)
                .expect("EnrichmentUpdate always serializes")
                .retry(RETRY_HINT),
            HubEvent::Heartbeat => sse::Event::default()
                .event("heartbeat")
                .data("")
                .retry(RETRY_HINT),
        }
    }
}
