//! Subscriber Hub (spec §4.7): SSE fan-out for live log records and
//! enrichment updates.

mod event;
mod hub;
mod routes;

pub use event::HubEvent;
pub use hub::Hub;
pub use routes::{subscribe, SubscribeParams};
