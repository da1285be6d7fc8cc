use std::collections::BTreeMap;
use std::path::PathBuf;

use opsentra_core::SourceType;

/// Ephemeral, Shipper-side description of one log source (spec §3).
///
/// Created by the Discoverer, consumed by exactly one Tailer, and destroyed
/// when that Tailer terminates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDescriptor {
    pub path: PathBuf,
    pub source_type: SourceType,
    pub service: String,
    pub aux_metadata: BTreeMap<String, String>,
}

impl SourceDescriptor {
    pub fn new(path: PathBuf, source_type: SourceType, service: impl Into<String>) -> Self {
        SourceDescriptor {
            path,
            source_type,
            service: service.into(),
            aux_metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.aux_metadata.insert(key.into(), value.into());
        self
    }
}
