//! Lifecycle Supervisor, Aggregator half (spec §4.9): fixed startup order,
//! drained shutdown order, all client handles owned here explicitly.

use std::sync::Arc;
use std::time::Instant;

use opsentra_archive::Scheduler;
use opsentra_broker::{EnrichedConsumer, RawLogsConsumer};
use opsentra_core::Identity;
use opsentra_hub::Hub;
use opsentra_store::Store;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::AggregatorConfig;
use crate::routes;
use crate::state::AppState;

pub struct Supervisor {
    config: AggregatorConfig,
}

impl Supervisor {
    pub fn new(config: AggregatorConfig) -> Self {
        Supervisor { config }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        // 1. Persistence store.
        let store = Arc::new(Store::connect(&self.config.mongo_uri, self.config.mongo_max_pool_size).await?);
        info!("persistence store ready");

        // 2. Object store client; bucket creation deferred to first archival tick.
        let identity = Identity::resolve();
        let capture_ip = identity.ip().await.to_string();
        let aws_sdk_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let s3 = aws_sdk_s3::Client::new(&aws_sdk_config);
        let scheduler = Arc::new(Scheduler::new(
            Arc::clone(&store),
            s3,
            &self.config.s3_bucket_prefix,
            &capture_ip,
        ));
        info!("object store client ready");

        // 4 (hub is wired before broker consumers need it as a dependency).
        let hub = Arc::new(Hub::new());

        // 3. Broker: consumers connect, declare topology, and start consuming.
        let shutdown = CancellationToken::new();
        let mut tasks = JoinSet::new();

        let raw_consumer = RawLogsConsumer::new(self.config.broker_url.clone(), StoreSink(Arc::clone(&store)), HubSink(Arc::clone(&hub)));
        let raw_healthy = raw_consumer.health_handle();
        let raw_shutdown = shutdown.clone();
        tasks.spawn(async move { raw_consumer.run(raw_shutdown).await });

        let enriched_consumer = EnrichedConsumer::new(self.config.broker_url.clone(), StoreSink(Arc::clone(&store)), HubSink(Arc::clone(&hub)));
        let enriched_healthy = enriched_consumer.health_handle();
        let enriched_shutdown = shutdown.clone();
        tasks.spawn(async move { enriched_consumer.run(enriched_shutdown).await });
        info!("broker consumers started");

        // 4. Subscriber hub: heartbeats plus the HTTP surface.
        let hub_heartbeat = Arc::clone(&hub);
        let heartbeat_shutdown = shutdown.clone();
        tasks.spawn(async move {
            hub_heartbeat.run_heartbeats(heartbeat_shutdown).await;
        });

        let state = Arc::new(AppState {
            store: Arc::clone(&store),
            hub: Arc::clone(&hub),
            scheduler: Arc::clone(&scheduler),
            raw_consumer_healthy: raw_healthy,
            enriched_consumer_healthy: enriched_healthy,
            started_at: Instant::now(),
        });
        let app = routes::router(Arc::clone(&state));
        let http_addr = self.config.http_addr;
        let server_shutdown = shutdown.clone();
        let server = tokio::spawn(async move {
            axum::Server::bind(&http_addr)
                .serve(app.into_make_service())
                .with_graceful_shutdown(async move { server_shutdown.cancelled().await })
                .await
        });
        info!(addr = %http_addr, "subscriber hub HTTP surface bound");

        // 5. Archival scheduler.
        let scheduler_shutdown = shutdown.clone();
        let scheduler_run = Arc::clone(&scheduler);
        tasks.spawn(async move {
            scheduler_run.run(scheduler_shutdown).await;
        });
        info!("archival scheduler started");

        tokio::signal::ctrl_c().await.ok();
        info!("shutdown signal received, draining");
        shutdown.cancel();

        let _ = server.await;
        while tasks.join_next().await.is_some() {}

        info!("aggregator shut down cleanly");
        Ok(())
    }
}

struct StoreSink(Arc<Store>);
struct HubSink(Arc<Hub>);

#[async_trait::async_trait]
impl opsentra_broker::RecordSink for StoreSink {
    async fn store(&self, record: opsentra_core::LogRecord) -> Result<(), String> {
        self.0.insert(&record).await.map(|_| ()).map_err(|e| e.to_string())
    }
}

#[async_trait::async_trait]
impl opsentra_broker::EnrichmentSink for StoreSink {
    async fn apply(&self, update: opsentra_broker::EnrichmentUpdate) -> Result<(), String> {
        self.0.apply_enrichment(&update).await.map_err(|e| e.to_string())
    }
}

#[async_trait::async_trait]
impl opsentra_broker::HubNotifier for HubSink {
    async fn notify_record(&self, record: &opsentra_core::LogRecord) {
        self.0.notify_record(record).await;
    }

    async fn notify_enrichment(&self, update: &opsentra_broker::EnrichmentUpdate) {
        self.0.notify_enrichment(update).await;
    }
}
