use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity of a single log line.
///
/// Always lowercased on the wire; unrecognized input falls back to `Info`
/// (spec: "default `info` when not extracted").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl Default for Level {
    fn default() -> Self {
        Level::Info
    }
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Fatal => "fatal",
        }
    }
}

/// The kind of source a record was captured from.
///
/// `sourceType`-specific detail (container id, pod/namespace, job name)
/// lives in `LogRecord::metadata` rather than as enum payload fields, so the
/// wire shape stays a flat JSON object matching spec.md's literal examples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    System,
    Container,
    Pod,
    Ci,
    Custom,
}

/// The universal log unit shipped from a Shipper to the Aggregator.
///
/// Invariants (spec.md §3): `message`, `service`, `host` are non-empty;
/// `timestamp` is monotonic within a single source because the Tailer emits
/// lines in file order and the Record Builder never reorders them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub level: Level,
    pub service: String,
    pub host: String,
    pub ip: String,
    pub source: String,
    pub message: String,
    pub source_type: SourceType,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl LogRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        timestamp: DateTime<Utc>,
        level: Level,
        service: impl Into<String>,
        host: impl Into<String>,
        ip: impl Into<String>,
        source: impl Into<String>,
        message: impl Into<String>,
        source_type: SourceType,
        metadata: BTreeMap<String, String>,
    ) -> Self {
        LogRecord {
            timestamp,
            level,
            service: service.into(),
            host: host.into(),
            ip: ip.into(),
            source: source.into(),
            message: message.into(),
            source_type,
            metadata,
        }
    }

    /// The routing key a Broker Publisher binds this record to: `logs.<service>.<ip-or-host>`.
    pub fn routing_key(&self) -> String {
        let identity = if self.ip.is_empty() { &self.host } else { &self.ip };
        format!("logs.{}.{}", self.service, identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routing_key_prefers_ip_over_host() {
        let r = LogRecord::new(
            Utc::now(),
            Level::Info,
            "nginx",
            "host-a",
            "10.0.0.5",
            "/var/log/nginx/error.log",
            "msg",
            SourceType::System,
            BTreeMap::new(),
        );
        assert_eq!(r.routing_key(), "logs.nginx.10.0.0.5");
    }

    #[test]
    fn routing_key_falls_back_to_host_without_ip() {
        let r = LogRecord::new(
            Utc::now(),
            Level::Info,
            "nginx",
            "host-a",
            "",
            "/var/log/nginx/error.log",
            "msg",
            SourceType::System,
            BTreeMap::new(),
        );
        assert_eq!(r.routing_key(), "logs.nginx.host-a");
    }

    #[test]
    fn level_roundtrips_through_json_lowercase() {
        let json = serde_json::to_string(&Level::Warn).unwrap();
        assert_eq!(json, "\"warn\"");
        let back: Level = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Level::Warn);
    }
}
