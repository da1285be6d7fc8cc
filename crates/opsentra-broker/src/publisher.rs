//! Broker Publisher (spec §4.4): drains the `PublishQueue` and publishes
//! each record to the topic exchange with persistent delivery, retrying a
//! bounded number of times before handing the connection back to the
//! reconnector.

use std::time::Duration;

use lapin::options::BasicPublishOptions;
use lapin::{BasicProperties, Channel};
use opsentra_core::LogRecord;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::PublishError;
use crate::queue::PublishQueue;
use crate::reconnect::Reconnector;
use std::sync::Arc;

const PUBLISH_RETRIES: u32 = 3;
const RETRY_SPACING: Duration = Duration::from_millis(250);

pub struct Publisher {
    queue: Arc<PublishQueue>,
    reconnector: Reconnector,
}

impl Publisher {
    pub fn new(queue: Arc<PublishQueue>, broker_url: impl Into<String>) -> Self {
        Publisher {
            queue,
            reconnector: Reconnector::new(broker_url),
        }
    }

    pub fn health_handle(&self) -> Arc<std::sync::atomic::AtomicBool> {
        self.reconnector.healthy_handle()
    }

    /// Run until cancelled. Never returns an error: connection failures are
    /// handled internally by the reconnector loop, and publish failures
    /// re-enqueue the record at the head of the queue for a later attempt.
    pub async fn run(mut self, shutdown: CancellationToken) {
        loop {
            let channel = tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("publisher shutting down");
                    return;
                }
                channel = self.reconnector.ensure_ready() => match channel {
                    Ok(channel) => channel,
                    Err(err) => {
                        error!(error = %err, "reconnector failed unexpectedly");
                        continue;
                    }
                },
            };

            loop {
                let record = tokio::select! {
                    _ = shutdown.cancelled() => {
                        info!("publisher shutting down");
                        return;
                    }
                    record = self.queue.pop() => record,
                };

                match publish_with_retry(&channel, &record).await {
                    Ok(()) => {}
                    Err(err) => {
                        warn!(error = %err, "publish failed after retries, requeueing and reconnecting");
                        self.queue.push_front(record).await;
                        self.reconnector.invalidate();
                        break;
                    }
                }
            }
        }
    }
}

async fn publish_with_retry(channel: &Channel, record: &LogRecord) -> Result<(), PublishError> {
    let payload = serde_json::to_vec(record).expect("LogRecord always serializes");
    let routing_key = record.routing_key();

    let mut last_err = None;
    for attempt in 0..PUBLISH_RETRIES {
        if attempt > 0 {
            tokio::time::sleep(RETRY_SPACING).await;
        }
        match channel
            .basic_publish(
                crate::topology::EXCHANGE,
                &routing_key,
                BasicPublishOptions::default(),
                &payload,
                BasicProperties::default().with_delivery_mode(2),
            )
            .await
        {
            Ok(confirm) => match confirm.await {
                Ok(_) => return Ok(()),
                Err(err) => last_err = Some(err),
            },
            Err(err) => last_err = Some(err),
        }
    }
    Err(PublishError::PublishFailed(
        last_err.expect("loop runs at least once"),
    ))
}
