use opsentra_core::{ErrorClass, ErrorClassify};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("query for unsynced records failed: {0}")]
    Query(#[source] opsentra_store::StoreError),
    #[error("bucket setup failed: {0}")]
    BucketSetup(String),
    #[error("upload failed: {0}")]
    Upload(String),
    #[error("mark-synced failed: {0}")]
    MarkSynced(#[source] opsentra_store::StoreError),
    #[error("compression failed: {0}")]
    Compress(#[source] std::io::Error),
}

impl ErrorClassify for ArchiveError {
    fn class(&self) -> ErrorClass {
        match self {
            ArchiveError::Query(_) => ErrorClass::Transient,
            ArchiveError::BucketSetup(_) => ErrorClass::Transient,
            ArchiveError::Upload(_) => ErrorClass::Transient,
            ArchiveError::MarkSynced(_) => ErrorClass::Transient,
            ArchiveError::Compress(_) => ErrorClass::Fatal,
        }
    }
}
