//! Capture-host identity resolution (spec §4.3, §5).
//!
//! `host` is resolved once at process start. `ip` is resolved lazily and
//! cached: the first caller pays for a cloud-metadata HTTP GET under a 2s
//! hard deadline; every later caller gets the cached value. Any failure or
//! non-2xx response falls back to `host`.

use std::time::Duration;

use tokio::sync::OnceCell;

const METADATA_TIMEOUT: Duration = Duration::from_secs(2);

/// Default metadata endpoint. Overridable for tests and for deployments on
/// a cloud provider whose metadata service lives at a different URL.
const DEFAULT_METADATA_URL: &str = "http://169.254.169.254/latest/meta-data/local-ipv4";

pub struct Identity {
    host: String,
    metadata_url: String,
    ip: OnceCell<String>,
}

impl Identity {
    /// Resolve the stable capture host name once.
    pub fn resolve() -> Self {
        let host = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "unknown-host".to_string());
        Identity {
            host,
            metadata_url: DEFAULT_METADATA_URL.to_string(),
            ip: OnceCell::new(),
        }
    }

    #[cfg(test)]
    pub fn with_metadata_url(host: impl Into<String>, metadata_url: impl Into<String>) -> Self {
        Identity {
            host: host.into(),
            metadata_url: metadata_url.into(),
            ip: OnceCell::new(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Best-effort network identity: the cloud-metadata IP if reachable
    /// within 2s, else `host`. Cached after the first resolution.
    pub async fn ip(&self) -> &str {
        self.ip
            .get_or_init(|| async { self.fetch_metadata_ip().await.unwrap_or_else(|| self.host.clone()) })
            .await
    }

    async fn fetch_metadata_ip(&self) -> Option<String> {
        let client = reqwest::Client::new();
        let response = tokio::time::timeout(
            METADATA_TIMEOUT,
            client.get(&self.metadata_url).send(),
        )
        .await
        .ok()?
        .ok()?;

        if !response.status().is_success() {
            return None;
        }
        let body = response.text().await.ok()?;
        let trimmed = body.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn falls_back_to_host_when_metadata_unreachable() {
        let identity = Identity::with_metadata_url("test-host", "http://127.0.0.1:1/metadata");
        assert_eq!(identity.ip().await, "test-host");
    }

    #[tokio::test]
    async fn ip_is_cached_after_first_resolution() {
        let identity = Identity::with_metadata_url("test-host", "http://127.0.0.1:1/metadata");
        let first = identity.ip().await.to_string();
        let second = identity.ip().await.to_string();
        assert_eq!(first, second);
    }
}
