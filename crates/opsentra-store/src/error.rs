use opsentra_core::{ErrorClass, ErrorClassify};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store connection failed: {0}")]
    Connect(#[source] mongodb::error::Error),
    #[error("collection setup failed: {0}")]
    Setup(#[source] mongodb::error::Error),
    #[error("write failed: {0}")]
    Write(#[source] mongodb::error::Error),
    #[error("read failed: {0}")]
    Read(#[source] mongodb::error::Error),
    #[error("no record found for identifier {0}")]
    NotFound(String),
}

impl ErrorClassify for StoreError {
    fn class(&self) -> ErrorClass {
        match self {
            StoreError::Connect(_) => ErrorClass::Transient,
            StoreError::Setup(_) => ErrorClass::Fatal,
            StoreError::Write(_) => ErrorClass::Transient,
            StoreError::Read(_) => ErrorClass::Transient,
            StoreError::NotFound(_) => ErrorClass::ProtocolViolation,
        }
    }
}
