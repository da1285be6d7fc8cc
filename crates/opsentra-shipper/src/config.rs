//! Environment-variable configuration for the Shipper binary. Deliberately
//! not a CLI flag parser or a generic config-file loader: both are
//! out of scope (spec §1).

use std::path::PathBuf;
use std::time::Duration;

use opsentra_discovery::DiscoveryConfig;

const DEFAULT_RETRY_WINDOW_SECS: u64 = 5;
const DEFAULT_PUBLISH_QUEUE_CAPACITY: usize = 10_000;
const DEFAULT_SHUTDOWN_FLUSH_SECS: u64 = 10;

pub struct ShipperConfig {
    pub broker_url: String,
    pub discovery: DiscoveryConfig,
    pub retry_window: Duration,
    pub publish_queue_capacity: usize,
    pub shutdown_flush_deadline: Duration,
}

impl ShipperConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let broker_url = std::env::var("OPSENTRA_BROKER_URL")
            .map_err(|_| anyhow::anyhow!("OPSENTRA_BROKER_URL is required and has no default"))?;

        let discovery = DiscoveryConfig {
            log_path_globs: csv_env("OPSENTRA_LOG_GLOBS"),
            custom_paths: csv_env("OPSENTRA_CUSTOM_PATHS").into_iter().map(PathBuf::from).collect(),
            container_enabled: bool_env("OPSENTRA_CONTAINER_ENABLED"),
            container_root: path_env("OPSENTRA_CONTAINER_ROOT"),
            pod_enabled: bool_env("OPSENTRA_POD_ENABLED"),
            pod_root: path_env("OPSENTRA_POD_ROOT"),
            ci_enabled: bool_env("OPSENTRA_CI_ENABLED"),
            ci_roots: csv_env("OPSENTRA_CI_ROOTS").into_iter().map(PathBuf::from).collect(),
        };

        let retry_window = Duration::from_secs(
            u64_env("OPSENTRA_RETRY_WINDOW_SECS", DEFAULT_RETRY_WINDOW_SECS).max(5),
        );
        let publish_queue_capacity =
            u64_env("OPSENTRA_PUBLISH_QUEUE_CAPACITY", DEFAULT_PUBLISH_QUEUE_CAPACITY as u64) as usize;
        let shutdown_flush_deadline =
            Duration::from_secs(u64_env("OPSENTRA_SHUTDOWN_FLUSH_SECS", DEFAULT_SHUTDOWN_FLUSH_SECS));

        Ok(ShipperConfig {
            broker_url,
            discovery,
            retry_window,
            publish_queue_capacity,
            shutdown_flush_deadline,
        })
    }
}

fn csv_env(key: &str) -> Vec<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect())
        .unwrap_or_default()
}

fn bool_env(key: &str) -> bool {
    std::env::var(key).map(|v| v == "true" || v == "1").unwrap_or(false)
}

fn path_env(key: &str) -> Option<PathBuf> {
    std::env::var(key).ok().map(PathBuf::from)
}

fn u64_env(key: &str, default: u64) -> u64 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}
