//! Shared types for the OpSentra log pipeline: the canonical `LogRecord`,
//! level extraction, capture-host identity resolution, and the component
//! error taxonomy every other OpSentra crate builds on.

mod error;
mod identity;
mod level;
mod record;

pub use error::{ErrorClass, ErrorClassify};
pub use identity::Identity;
pub use level::extract as extract_level;
pub use record::{Level, LogRecord, SourceType};
