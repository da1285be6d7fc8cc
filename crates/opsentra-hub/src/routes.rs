//! `GET /subscribe?service=<name>` (spec §6): the hub's half of the
//! Aggregator's HTTP surface. The remaining routes (`/logs`, `/services`,
//! `/health`) are composed by the binary crate, which also owns the
//! persistence and archive handles they need.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::sse::{KeepAlive, Sse};
use serde::Deserialize;

use crate::hub::Hub;

#[derive(Debug, Deserialize)]
pub struct SubscribeParams {
    pub service: Option<String>,
}

pub async fn subscribe(
    State(hub): State<Arc<Hub>>,
    Query(params): Query<SubscribeParams>,
) -> Sse<impl futures::Stream<Item = Result<axum::response::sse::Event, std::convert::Infallible>>>
{
    let stream = hub.register(params.service).await;
    Sse::new(stream).keep_alive(KeepAlive::new())
}
