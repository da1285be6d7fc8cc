//! Lifecycle Supervisor, Shipper half (spec §4.9): owns every client handle
//! explicitly and fans a single shutdown signal out to all of them — no
//! process-wide state except this struct.

use std::sync::Arc;

use opsentra_broker::{Publisher, PublishQueue};
use opsentra_core::Identity;
use opsentra_discovery::discover_all;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::ShipperConfig;

pub struct Supervisor {
    config: ShipperConfig,
}

impl Supervisor {
    pub fn new(config: ShipperConfig) -> Self {
        Supervisor { config }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let shutdown = CancellationToken::new();
        let identity = Arc::new(Identity::resolve());
        let queue = PublishQueue::new(self.config.publish_queue_capacity);

        let sources = discover_all(&self.config.discovery);
        info!(count = sources.len(), "discovery complete");

        let (record_tx, mut record_rx) = mpsc::channel(1024);

        let mut tailers = JoinSet::new();
        for source in sources {
            let identity = Arc::clone(&identity);
            let tx = record_tx.clone();
            let shutdown = shutdown.clone();
            let retry_window = self.config.retry_window;
            tailers.spawn(async move {
                if let Err(err) = opsentra_tailer::run(source, identity, tx, shutdown, retry_window).await {
                    warn!(error = %err, "tailer exited with error");
                }
            });
        }
        drop(record_tx);

        let forward_queue = Arc::clone(&queue);
        let forward_shutdown = shutdown.clone();
        let forwarder = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = forward_shutdown.cancelled() => break,
                    record = record_rx.recv() => match record {
                        Some(record) => forward_queue.push(record).await,
                        None => break,
                    },
                }
            }
        });

        let publisher = Publisher::new(Arc::clone(&queue), self.config.broker_url.clone());
        let publisher_shutdown = shutdown.clone();
        let publisher_handle = tokio::spawn(publisher.run(publisher_shutdown));

        tokio::signal::ctrl_c().await.ok();
        info!("shutdown signal received, draining");
        shutdown.cancel();

        while tailers.join_next().await.is_some() {}
        let _ = forwarder.await;

        let remaining = queue.drain(self.config.publish_queue_capacity).await;
        if !remaining.is_empty() {
            warn!(count = remaining.len(), "records still queued at shutdown flush deadline");
        }
        tokio::time::timeout(self.config.shutdown_flush_deadline, publisher_handle)
            .await
            .ok();

        info!("shipper shut down cleanly");
        Ok(())
    }
}
