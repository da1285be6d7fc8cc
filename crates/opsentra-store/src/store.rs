//! Persistence Writer (spec §4.6): the Aggregator's time-series collection
//! client, grounded in the teacher's `mongodb` dependency usage pattern of
//! one shared `Client`/`Database` handle behind an explicit setup step.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use futures::stream::TryStreamExt;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{doc, DateTime as BsonDateTime};
use mongodb::options::{
    CreateCollectionOptions, FindOptions, IndexOptions, TimeseriesGranularity, TimeseriesOptions,
};
use mongodb::{Client, Collection, Database, IndexModel};
use opsentra_broker::{EnrichmentSink, EnrichmentUpdate, RecordSink};
use opsentra_core::LogRecord;
use tracing::{info, warn};

use crate::error::StoreError;
use crate::model::StoredRecord;

const DATABASE_NAME: &str = "opsentra";
const COLLECTION_NAME: &str = "logs";
const TTL_SECONDS: u64 = 30 * 24 * 60 * 60;

pub struct Store {
    collection: Collection<StoredRecord>,
    healthy: Arc<AtomicBool>,
}

impl Store {
    /// Connect and ensure the time-series collection and its secondary
    /// indexes exist (spec §4.9 startup step 1: "connect, create collection
    /// if absent, ensure indexes").
    pub async fn connect(uri: &str, max_pool_size: u32) -> Result<Self, StoreError> {
        let mut options = mongodb::options::ClientOptions::parse(uri)
            .await
            .map_err(StoreError::Connect)?;
        options.max_pool_size = Some(max_pool_size);
        let client = Client::with_options(options).map_err(StoreError::Connect)?;
        let db = client.database(DATABASE_NAME);

        ensure_collection(&db).await?;
        let collection = db.collection::<StoredRecord>(COLLECTION_NAME);
        ensure_indexes(&collection).await?;

        info!("connected to persistence store");
        Ok(Store {
            collection,
            healthy: Arc::new(AtomicBool::new(true)),
        })
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    fn mark(&self, ok: bool) {
        self.healthy.store(ok, Ordering::Relaxed);
    }

    /// Insert path (spec §4.6): persist all fields with `synced=false`,
    /// return the assigned identifier.
    pub async fn insert(&self, record: &LogRecord) -> Result<String, StoreError> {
        let doc = StoredRecord::from_record(record);
        let result = self.collection.insert_one(doc).await;
        match result {
            Ok(outcome) => {
                self.mark(true);
                let id = outcome
                    .inserted_id
                    .as_object_id()
                    .expect("mongodb assigns an ObjectId on insert");
                Ok(id.to_hex())
            }
            Err(err) => {
                self.mark(false);
                Err(StoreError::Write(err))
            }
        }
    }

    /// Update path (spec §4.6): locate by identifier, set
    /// analysis/suggestions/confidence/`enrichedAt`.
    pub async fn apply_enrichment(&self, update: &EnrichmentUpdate) -> Result<(), StoreError> {
        let oid = ObjectId::parse_str(&update.identifier)
            .map_err(|_| StoreError::NotFound(update.identifier.clone()))?;
        let result = self
            .collection
            .update_one(
                doc! { "_id": oid },
                doc! { "$set": {
                    "analysis": &update.analysis,
                    "suggestions": &update.suggestions,
                    "confidence": update.confidence,
                    "enrichedAt": BsonDateTime::now(),
                }},
            )
            .await;
        match result {
            Ok(outcome) if outcome.matched_count == 0 => {
                self.mark(true);
                Err(StoreError::NotFound(update.identifier.clone()))
            }
            Ok(_) => {
                self.mark(true);
                Ok(())
            }
            Err(err) => {
                self.mark(false);
                Err(StoreError::Write(err))
            }
        }
    }

    /// Archival query (spec §4.8 step 1): up to `batch_limit` unsynced
    /// records within `window` of now, oldest first.
    pub async fn query_unsynced(
        &self,
        batch_limit: i64,
        window: ChronoDuration,
    ) -> Result<Vec<StoredRecord>, StoreError> {
        let cutoff = BsonDateTime::from_chrono(Utc::now() - window);
        let filter = doc! {
            "synced": false,
            "timestamp": { "$gte": cutoff },
        };
        let options = FindOptions::builder()
            .sort(doc! { "timestamp": 1 })
            .limit(batch_limit)
            .build();
        let cursor = self
            .collection
            .find(filter)
            .with_options(options)
            .await
            .map_err(StoreError::Read)?;
        let records: Vec<StoredRecord> = cursor.try_collect().await.map_err(StoreError::Read)?;
        self.mark(true);
        Ok(records)
    }

    /// Archival mark (spec §4.8 step 5): atomically set
    /// `synced=true`/`syncedAt=now` for the given identifiers.
    pub async fn mark_synced(&self, ids: &[ObjectId]) -> Result<(), StoreError> {
        if ids.is_empty() {
            return Ok(());
        }
        self.collection
            .update_many(
                doc! { "_id": { "$in": ids } },
                doc! { "$set": { "synced": true, "syncedAt": BsonDateTime::now() } },
            )
            .await
            .map(|_| {
                self.mark(true);
            })
            .map_err(|err| {
                self.mark(false);
                StoreError::Write(err)
            })
    }

    /// Filtered-fetch endpoint query (spec §6: `GET /logs?service=&level=&limit=`).
    pub async fn query_filtered(
        &self,
        service: Option<&str>,
        level: Option<opsentra_core::Level>,
        limit: i64,
    ) -> Result<Vec<StoredRecord>, StoreError> {
        let mut filter = doc! {};
        if let Some(service) = service {
            filter.insert("service", service);
        }
        if let Some(level) = level {
            filter.insert("level", level.as_str());
        }
        let options = FindOptions::builder()
            .sort(doc! { "timestamp": -1 })
            .limit(limit)
            .build();
        let cursor = self
            .collection
            .find(filter)
            .with_options(options)
            .await
            .map_err(StoreError::Read)?;
        let records = cursor.try_collect().await.map_err(StoreError::Read)?;
        self.mark(true);
        Ok(records)
    }

    /// Distinct service names for the `/services` endpoint.
    pub async fn list_services(&self) -> Result<Vec<String>, StoreError> {
        let values = self
            .collection
            .distinct("service", doc! {})
            .await
            .map_err(StoreError::Read)?;
        self.mark(true);
        Ok(values
            .into_iter()
            .filter_map(|v| v.as_str().map(str::to_owned))
            .collect())
    }
}

async fn ensure_collection(db: &Database) -> Result<(), StoreError> {
    let existing = db
        .list_collection_names()
        .await
        .map_err(StoreError::Setup)?;
    if existing.iter().any(|name| name == COLLECTION_NAME) {
        return Ok(());
    }

    let timeseries = TimeseriesOptions::builder()
        .time_field("timestamp".to_string())
        .meta_field(Some("service".to_string()))
        .granularity(Some(TimeseriesGranularity::Minutes))
        .build();
    let options = CreateCollectionOptions::builder()
        .timeseries(timeseries)
        .expire_after_seconds(Some(TTL_SECONDS as i64))
        .build();

    match db.create_collection(COLLECTION_NAME).with_options(options).await {
        Ok(()) => Ok(()),
        Err(err) if err.to_string().contains("already exists") => {
            warn!("logs collection created concurrently, ignoring race");
            Ok(())
        }
        Err(err) => Err(StoreError::Setup(err)),
    }
}

async fn ensure_indexes(collection: &Collection<StoredRecord>) -> Result<(), StoreError> {
    let indexes = vec![
        IndexModel::builder()
            .keys(doc! { "timestamp": -1, "service": 1 })
            .build(),
        IndexModel::builder()
            .keys(doc! { "level": 1, "timestamp": -1 })
            .build(),
        IndexModel::builder()
            .keys(doc! { "synced": 1, "timestamp": 1 })
            .options(IndexOptions::builder().build())
            .build(),
    ];
    collection
        .create_indexes(indexes)
        .await
        .map(|_| ())
        .map_err(StoreError::Setup)
}

#[async_trait]
impl RecordSink for Store {
    async fn store(&self, record: LogRecord) -> Result<(), String> {
        self.insert(&record).await.map(|_| ()).map_err(|e| e.to_string())
    }
}

#[async_trait]
impl EnrichmentSink for Store {
    async fn apply(&self, update: EnrichmentUpdate) -> Result<(), String> {
        self.apply_enrichment(&update).await.map_err(|e| e.to_string())
    }
}
