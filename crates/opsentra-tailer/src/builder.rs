//! Record Builder (C3, spec §4.3): turns `(rawLine, source)` into a
//! fully-populated `LogRecord`.

use chrono::Utc;
use opsentra_core::{extract_level, Identity, LogRecord, SourceType};
use opsentra_discovery::SourceDescriptor;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct ContainerLogLine {
    log: String,
}

/// Build a `LogRecord` from one raw line. Returns `None` for an empty
/// trimmed line (spec: "Empty lines are dropped").
///
/// Pure with respect to `raw_line` and `source` (spec §8: "level extraction
/// idempotence" — repeated application on the same input yields an
/// identical record's `level`/`message`; only `timestamp` varies by capture
/// time, which is expected since spec.md defines `timestamp` as "wall-clock
/// at capture").
pub async fn build(
    raw_line: &[u8],
    source: &SourceDescriptor,
    identity: &Identity,
) -> Option<LogRecord> {
    let raw = String::from_utf8_lossy(raw_line);
    let trimmed = raw.trim_end_matches(['\n', '\r']);
    if trimmed.is_empty() {
        return None;
    }

    let (message, source_type) = unwrap_container_line(trimmed, source.source_type);
    let level = extract_level(&message);

    Some(LogRecord::new(
        Utc::now(),
        level,
        source.service.clone(),
        identity.host().to_string(),
        identity.ip().await.to_string(),
        source.path.display().to_string(),
        message,
        source_type,
        source.aux_metadata.clone(),
    ))
}

/// If `source_type == Container` and the line looks like a JSON object,
/// parse it and use its `log` field as the message; on parse failure fall
/// back to treating the line as plain text (spec §4.3).
fn unwrap_container_line(line: &str, source_type: SourceType) -> (String, SourceType) {
    if source_type != SourceType::Container || !line.trim_start().starts_with('{') {
        return (line.to_string(), source_type);
    }

    match serde_json::from_str::<ContainerLogLine>(line) {
        Ok(parsed) => (
            parsed.log.trim_end_matches(['\n', '\r']).to_string(),
            SourceType::Container,
        ),
        Err(_) => (line.to_string(), source_type),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn identity() -> Identity {
        Identity::with_metadata_url("test-host", "http://127.0.0.1:1/metadata")
    }

    fn source(service: &str, source_type: SourceType) -> SourceDescriptor {
        SourceDescriptor {
            path: "/var/log/app.log".into(),
            service: service.to_string(),
            source_type,
            aux_metadata: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn plain_line_builds_a_record() {
        let record = build(
            b"2025-09-17 10:30:00 INFO: starting worker",
            &source("app", SourceType::System),
            &identity(),
        )
        .await
        .unwrap();

        assert_eq!(record.level.as_str(), "info");
        assert_eq!(record.service, "app");
        assert_eq!(record.message, "2025-09-17 10:30:00 INFO: starting worker");
    }

    #[tokio::test]
    async fn empty_line_is_dropped() {
        assert!(build(b"\n", &source("app", SourceType::System), &identity())
            .await
            .is_none());
    }

    #[tokio::test]
    async fn container_json_line_is_unwrapped() {
        let line = br#"{"log":"[WARN] disk 90% full\n","stream":"stderr","time":"2025-09-17T10:30:00Z"}"#;
        let record = build(line, &source("container-abc123def456", SourceType::Container), &identity())
            .await
            .unwrap();

        assert_eq!(record.message, "[WARN] disk 90% full");
        assert_eq!(record.level.as_str(), "warn");
        assert_eq!(record.source_type, SourceType::Container);
    }

    #[tokio::test]
    async fn malformed_container_json_is_treated_as_plain_line() {
        let line = b"{not valid json";
        let record = build(line, &source("container-abc", SourceType::Container), &identity())
            .await
            .unwrap();

        assert_eq!(record.message, "{not valid json");
    }
}
