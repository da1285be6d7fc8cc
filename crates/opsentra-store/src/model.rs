//! Wire/storage shape for a persisted record (spec §4.6, §6): the universal
//! `LogRecord` plus the archival/enrichment fields that only exist once a
//! record has landed in the time-series collection.

use std::collections::BTreeMap;

use mongodb::bson::oid::ObjectId;
use mongodb::bson::DateTime as BsonDateTime;
use opsentra_core::{Level, LogRecord, SourceType};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRecord {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub timestamp: BsonDateTime,
    pub level: Level,
    pub service: String,
    pub host: String,
    pub ip: String,
    pub source: String,
    pub message: String,
    pub source_type: SourceType,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
    pub synced: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synced_at: Option<BsonDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enriched_at: Option<BsonDateTime>,
}

impl StoredRecord {
    /// Build the document for the insert path (spec §4.6: "set
    /// `synced=false`; persist all record fields").
    pub fn from_record(record: &LogRecord) -> Self {
        StoredRecord {
            id: None,
            timestamp: BsonDateTime::from_chrono(record.timestamp),
            level: record.level,
            service: record.service.clone(),
            host: record.host.clone(),
            ip: record.ip.clone(),
            source: record.source.clone(),
            message: record.message.clone(),
            source_type: record.source_type,
            metadata: record.metadata.clone(),
            synced: false,
            synced_at: None,
            analysis: None,
            suggestions: Vec::new(),
            confidence: None,
            enriched_at: None,
        }
    }

    pub fn identifier(&self) -> Option<String> {
        self.id.map(|id| id.to_hex())
    }

    /// Project the canonical `LogRecord` fields out of a stored document,
    /// dropping the archival/enrichment bookkeeping fields (spec §4.8 step 1:
    /// "project only canonical fields").
    pub fn to_log_record(&self) -> LogRecord {
        LogRecord::new(
            self.timestamp.to_chrono(),
            self.level,
            self.service.clone(),
            self.host.clone(),
            self.ip.clone(),
            self.source.clone(),
            self.message.clone(),
            self.source_type,
            self.metadata.clone(),
        )
    }
}
