//! The Aggregator's remaining HTTP routes (spec §6): `/logs`, `/services`,
//! `/health`. `/subscribe` is mounted directly from `opsentra_hub::subscribe`.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use opsentra_core::Level;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::state::{AppState, VERSION};

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/subscribe", get(subscribe))
        .route("/logs", get(logs))
        .route("/services", get(services))
        .route("/health", get(health))
        .with_state(state)
}

async fn subscribe(
    State(state): State<Arc<AppState>>,
    query: Query<opsentra_hub::SubscribeParams>,
) -> impl axum::response::IntoResponse {
    opsentra_hub::subscribe(State(Arc::clone(&state.hub)), query).await
}

#[derive(Debug, Deserialize)]
struct LogsParams {
    service: Option<String>,
    level: Option<String>,
    #[serde(default = "default_limit")]
    limit: i64,
}

fn default_limit() -> i64 {
    100
}

fn parse_level(s: &str) -> Option<Level> {
    match s.to_ascii_lowercase().as_str() {
        "trace" => Some(Level::Trace),
        "debug" => Some(Level::Debug),
        "info" => Some(Level::Info),
        "warn" | "warning" => Some(Level::Warn),
        "error" => Some(Level::Error),
        "fatal" | "critical" => Some(Level::Fatal),
        _ => None,
    }
}

async fn logs(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LogsParams>,
) -> Result<Json<Value>, axum::http::StatusCode> {
    let level = params.level.as_deref().and_then(parse_level);
    let records = state
        .store
        .query_filtered(params.service.as_deref(), level, params.limit)
        .await
        .map_err(|_| axum::http::StatusCode::INTERNAL_SERVER_ERROR)?;

    let logs: Vec<_> = records.iter().map(|r| r.to_log_record()).collect();
    Ok(Json(json!({ "logs": logs, "count": logs.len() })))
}

async fn services(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, axum::http::StatusCode> {
    let services = state
        .store
        .list_services()
        .await
        .map_err(|_| axum::http::StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(Json(json!({ "services": services })))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    dependencies: HealthDependencies,
    subscriber_count: usize,
    uptime_seconds: u64,
}

#[derive(Serialize)]
struct HealthDependencies {
    broker: bool,
    store: bool,
    object_store: bool,
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let broker = state.broker_healthy();
    let store = state.store.is_healthy();
    let object_store = state.scheduler.is_healthy();
    let status = if broker && store && object_store { "ok" } else { "degraded" };

    Json(HealthResponse {
        status,
        version: VERSION,
        dependencies: HealthDependencies { broker, store, object_store },
        subscriber_count: state.hub.subscriber_count(),
        uptime_seconds: state.uptime_seconds(),
    })
}
