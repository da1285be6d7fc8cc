//! Broker Consumer (spec §4.5): two independent consumers bound to the
//! `raw-logs` and `enriched` queues, each dispatching to a downstream sink
//! via a trait so this crate never depends on `opsentra-store` or
//! `opsentra-hub` directly.

use async_trait::async_trait;
use futures_util::StreamExt;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicPublishOptions, BasicQosOptions,
    QueueBindOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel};
use opsentra_core::LogRecord;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::ConsumeError;
use crate::reconnect::Reconnector;
use crate::topology;

const PREFETCH: u16 = 10;
const HANDLER_RETRY_BASE: std::time::Duration = std::time::Duration::from_millis(200);
const HANDLER_RETRY_MAX: std::time::Duration = std::time::Duration::from_secs(10);

/// An update produced by the enrichment pipeline for a previously-persisted
/// record (spec §4.6): carries the root-cause analysis and suggestions to
/// merge into the stored document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentUpdate {
    pub identifier: String,
    pub analysis: String,
    pub suggestions: Vec<String>,
    pub confidence: f64,
}

/// Destination for freshly published raw log records (implemented by
/// `opsentra-store`).
#[async_trait]
pub trait RecordSink: Send + Sync {
    async fn store(&self, record: LogRecord) -> Result<(), String>;
}

/// Destination for enrichment updates (implemented by `opsentra-store`).
#[async_trait]
pub trait EnrichmentSink: Send + Sync {
    async fn apply(&self, update: EnrichmentUpdate) -> Result<(), String>;
}

/// Notified after every successfully persisted record or enrichment so
/// live subscribers can be fanned out to (implemented by `opsentra-hub`).
#[async_trait]
pub trait HubNotifier: Send + Sync {
    async fn notify_record(&self, record: &LogRecord);
    async fn notify_enrichment(&self, update: &EnrichmentUpdate);
}

pub struct RawLogsConsumer<S, H> {
    reconnector: Reconnector,
    sink: S,
    hub: H,
}

impl<S, H> RawLogsConsumer<S, H>
where
    S: RecordSink + 'static,
    H: HubNotifier + 'static,
{
    pub fn new(broker_url: impl Into<String>, sink: S, hub: H) -> Self {
        RawLogsConsumer {
            reconnector: Reconnector::new(broker_url),
            sink,
            hub,
        }
    }

    pub fn health_handle(&self) -> std::sync::Arc<std::sync::atomic::AtomicBool> {
        self.reconnector.healthy_handle()
    }

    pub async fn run(mut self, shutdown: CancellationToken) {
        loop {
            let channel = tokio::select! {
                _ = shutdown.cancelled() => return,
                channel = self.reconnector.ensure_ready() => match channel {
                    Ok(channel) => channel,
                    Err(err) => {
                        error!(error = %err, "reconnector failed unexpectedly");
                        continue;
                    }
                },
            };

            if let Err(err) = declare_and_bind(
                &channel,
                topology::RAW_LOGS_QUEUE,
                topology::RAW_LOGS_BINDING,
            )
            .await
            {
                warn!(error = %err, "raw-logs topology setup failed, retrying");
                continue;
            }

            if let Err(err) = consume_loop(
                &channel,
                topology::RAW_LOGS_QUEUE,
                &shutdown,
                |payload| async {
                    let record: LogRecord = serde_json::from_slice(payload)
                        .map_err(ConsumeError::Decode)?;
                    self.sink
                        .store(record.clone())
                        .await
                        .map_err(ConsumeError::Handler)?;
                    self.hub.notify_record(&record).await;
                    Ok(())
                },
            )
            .await
            {
                warn!(error = %err, "raw-logs consume loop ended, reconnecting");
            }

            if shutdown.is_cancelled() {
                return;
            }
        }
    }
}

pub struct EnrichedConsumer<E, H> {
    reconnector: Reconnector,
    sink: E,
    hub: H,
}

impl<E, H> EnrichedConsumer<E, H>
where
    E: EnrichmentSink + 'static,
    H: HubNotifier + 'static,
{
    pub fn new(broker_url: impl Into<String>, sink: E, hub: H) -> Self {
        EnrichedConsumer {
            reconnector: Reconnector::new(broker_url),
            sink,
            hub,
        }
    }

    pub fn health_handle(&self) -> std::sync::Arc<std::sync::atomic::AtomicBool> {
        self.reconnector.healthy_handle()
    }

    pub async fn run(mut self, shutdown: CancellationToken) {
        loop {
            let channel = tokio::select! {
                _ = shutdown.cancelled() => return,
                channel = self.reconnector.ensure_ready() => match channel {
                    Ok(channel) => channel,
                    Err(err) => {
                        error!(error = %err, "reconnector failed unexpectedly");
                        continue;
                    }
                },
            };

            if let Err(err) = declare_and_bind(
                &channel,
                topology::ENRICHED_QUEUE,
                topology::ENRICHED_BINDING,
            )
            .await
            {
                warn!(error = %err, "enriched topology setup failed, retrying");
                continue;
            }

            if let Err(err) = consume_loop(
                &channel,
                topology::ENRICHED_QUEUE,
                &shutdown,
                |payload| async {
                    let update: EnrichmentUpdate = serde_json::from_slice(payload)
                        .map_err(ConsumeError::Decode)?;
                    self.sink
                        .apply(update.clone())
                        .await
                        .map_err(ConsumeError::Handler)?;
                    self.hub.notify_enrichment(&update).await;
                    Ok(())
                },
            )
            .await
            {
                warn!(error = %err, "enriched consume loop ended, reconnecting");
            }

            if shutdown.is_cancelled() {
                return;
            }
        }
    }
}

async fn declare_and_bind(
    channel: &Channel,
    queue: &str,
    binding: &str,
) -> Result<(), ConsumeError> {
    channel
        .queue_declare(
            queue,
            QueueDeclareOptions {
                durable: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await
        .map_err(ConsumeError::Connect)?;
    channel
        .queue_bind(
            queue,
            topology::EXCHANGE,
            binding,
            QueueBindOptions::default(),
            FieldTable::default(),
        )
        .await
        .map_err(ConsumeError::Connect)?;
    channel
        .basic_qos(PREFETCH, BasicQosOptions::default())
        .await
        .map_err(ConsumeError::Connect)?;
    Ok(())
}

async fn consume_loop<F, Fut>(
    channel: &Channel,
    queue: &str,
    shutdown: &CancellationToken,
    handle: F,
) -> Result<(), ConsumeError>
where
    F: Fn(&[u8]) -> Fut,
    Fut: std::future::Future<Output = Result<(), ConsumeError>>,
{
    let mut consumer = channel
        .basic_consume(
            queue,
            "opsentra-consumer",
            BasicConsumeOptions::default(),
            FieldTable::default(),
        )
        .await
        .map_err(ConsumeError::Connect)?;

    loop {
        let delivery = tokio::select! {
            _ = shutdown.cancelled() => return Ok(()),
            next = consumer.next() => next,
        };

        let Some(delivery) = delivery else {
            return Err(ConsumeError::StreamClosed);
        };
        let delivery = delivery.map_err(ConsumeError::Connect)?;

        // Genuine poison (undecodable payload) is dead-lettered immediately.
        // A transient handler failure (e.g. a momentary store write timeout)
        // never surfaces as a permanent failure (spec §4.6, §7): retry with
        // backoff and withhold the ack until it succeeds or shutdown fires,
        // so the broker redelivers rather than the record being dropped.
        let mut attempts = 0u32;
        let mut backoff = HANDLER_RETRY_BASE;
        loop {
            attempts += 1;
            match handle(&delivery.data).await {
                Ok(()) => {
                    delivery
                        .ack(BasicAckOptions::default())
                        .await
                        .map_err(ConsumeError::Connect)?;
                    break;
                }
                Err(ConsumeError::Decode(err)) => {
                    warn!(error = %err, "undecodable message, routing to dead letter");
                    route_to_dead_letter(channel, &delivery.data).await;
                    delivery
                        .ack(BasicAckOptions::default())
                        .await
                        .map_err(ConsumeError::Connect)?;
                    break;
                }
                Err(err) => {
                    warn!(error = %err, attempts, "handler failed, retrying with backoff");
                    tokio::select! {
                        _ = shutdown.cancelled() => return Ok(()),
                        _ = tokio::time::sleep(backoff) => {}
                    }
                    backoff = (backoff * 2).min(HANDLER_RETRY_MAX);
                }
            }
        }
    }
}

async fn route_to_dead_letter(channel: &Channel, payload: &[u8]) {
    if let Err(err) = channel
        .basic_publish(
            topology::DEAD_LETTER_EXCHANGE,
            topology::DEAD_LETTER_ROUTING_KEY,
            BasicPublishOptions::default(),
            payload,
            BasicProperties::default().with_delivery_mode(2),
        )
        .await
    {
        error!(error = %err, "failed to route message to dead letter exchange");
    } else {
        info!("message routed to dead letter exchange");
    }
}
