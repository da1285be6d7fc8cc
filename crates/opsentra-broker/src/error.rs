use opsentra_core::{ErrorClass, ErrorClassify};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("broker connect failed: {0}")]
    Connect(#[source] lapin::Error),
    #[error("broker channel error: {0}")]
    Channel(#[source] lapin::Error),
    #[error("publish failed after retries: {0}")]
    PublishFailed(#[source] lapin::Error),
}

impl ErrorClassify for PublishError {
    fn class(&self) -> ErrorClass {
        ErrorClass::Transient
    }
}

#[derive(Debug, Error)]
pub enum ConsumeError {
    #[error("broker connect failed: {0}")]
    Connect(#[source] lapin::Error),
    #[error("message undecodable: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("downstream handler failed: {0}")]
    Handler(String),
    #[error("consumer stream closed by broker")]
    StreamClosed,
}

impl ErrorClassify for ConsumeError {
    fn class(&self) -> ErrorClass {
        match self {
            ConsumeError::Connect(_) => ErrorClass::Transient,
            ConsumeError::Decode(_) => ErrorClass::ProtocolViolation,
            ConsumeError::Handler(_) => ErrorClass::Transient,
            ConsumeError::StreamClosed => ErrorClass::Transient,
        }
    }
}
