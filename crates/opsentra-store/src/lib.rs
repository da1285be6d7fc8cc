//! Persistence Writer (spec §4.6): durable time-series storage for
//! `LogRecord`s, plus the filtered-read queries the Aggregator's HTTP
//! surface needs.

mod error;
mod model;
mod store;

pub use error::StoreError;
pub use model::StoredRecord;
pub use mongodb::bson::oid::ObjectId;
pub use store::Store;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use opsentra_core::{Level, LogRecord, SourceType};
    use std::collections::BTreeMap;

    #[test]
    fn stored_record_from_record_defaults_unsynced() {
        let record = LogRecord::new(
            Utc::now(),
            Level::Error,
            "nginx",
            "host-a",
            "10.0.0.1",
            "/var/log/nginx/error.log",
            "boom",
            SourceType::System,
            BTreeMap::new(),
        );
        let stored = StoredRecord::from_record(&record);
        assert!(!stored.synced);
        assert!(stored.analysis.is_none());
        assert_eq!(stored.service, "nginx");
    }
}
