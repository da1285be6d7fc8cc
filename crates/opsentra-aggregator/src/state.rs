use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use opsentra_archive::Scheduler;
use opsentra_hub::Hub;
use opsentra_store::Store;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub hub: Arc<Hub>,
    pub scheduler: Arc<Scheduler>,
    pub raw_consumer_healthy: Arc<AtomicBool>,
    pub enriched_consumer_healthy: Arc<AtomicBool>,
    pub started_at: Instant,
}

impl AppState {
    pub fn broker_healthy(&self) -> bool {
        self.raw_consumer_healthy.load(Ordering::Relaxed)
            && self.enriched_consumer_healthy.load(Ordering::Relaxed)
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
