//! # API Handlers
//!
//! Axum handlers for the read API, event ingestion and on-demand plan
//! parsing. Lookups answer "not found" with a 404 or an empty list,
//! never an error body with parser internals.

use crate::store::DatabaseSummary;
use crate::synth::{self, SimulateParams, SimulateResult};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use qs_core::plan::{json as json_plan, text as text_plan};
use qs_core::{Fragment, PlanNode, QueryEvent, QueryRecord};
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
pub struct SystemStatus {
    version: &'static str,
    uptime_seconds: u64,
    queries_tracked: usize,
    events_processed: u64,
    update_subscribers: usize,
}

pub async fn status(State(state): State<Arc<AppState>>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        queries_tracked: state.aggregator.store().count().await,
        events_processed: state.aggregator.events_processed(),
        update_subscribers: state.aggregator.notifier().receiver_count(),
    })
}

// =============================================================================
// Queries
// =============================================================================

pub async fn list_queries(State(state): State<Arc<AppState>>) -> Json<Vec<QueryRecord>> {
    Json(state.aggregator.store().all().await)
}

pub async fn list_query_ids(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    Json(state.aggregator.store().all_ids().await)
}

pub async fn get_query(
    State(state): State<Arc<AppState>>,
    Path(query_id): Path<String>,
) -> Result<Json<QueryRecord>, (StatusCode, String)> {
    state
        .aggregator
        .store()
        .get(&query_id)
        .await
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, format!("Query '{}' not found", query_id)))
}

pub async fn queries_by_catalog(
    State(state): State<Arc<AppState>>,
    Path(catalog): Path<String>,
) -> Json<Vec<QueryRecord>> {
    Json(state.aggregator.store().by_catalog(&catalog).await)
}

pub async fn queries_by_schema(
    State(state): State<Arc<AppState>>,
    Path(schema_key): Path<String>,
) -> Json<Vec<QueryRecord>> {
    Json(state.aggregator.store().by_schema(&schema_key).await)
}

pub async fn queries_by_table(
    State(state): State<Arc<AppState>>,
    Path(table_key): Path<String>,
) -> Json<Vec<QueryRecord>> {
    Json(state.aggregator.store().by_table(&table_key).await)
}

pub async fn database_summary(State(state): State<Arc<AppState>>) -> Json<DatabaseSummary> {
    Json(state.aggregator.store().summary().await)
}

// =============================================================================
// Ingestion
// =============================================================================

pub async fn ingest_event(
    State(state): State<Arc<AppState>>,
    Json(event): Json<QueryEvent>,
) -> Result<StatusCode, (StatusCode, String)> {
    if event.query_id.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "queryId is required".to_string()));
    }

    state.aggregator.process_event(event).await;
    Ok(StatusCode::ACCEPTED)
}

pub async fn simulate(
    State(state): State<Arc<AppState>>,
    Json(params): Json<SimulateParams>,
) -> Json<SimulateResult> {
    Json(synth::run(&state.aggregator, &params).await)
}

// =============================================================================
// On-demand plan parsing
// =============================================================================

pub async fn parse_text_plan(body: String) -> Json<Vec<Fragment>> {
    Json(text_plan::parse(&body))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanParseResponse {
    root: Option<PlanNode>,
    operators: Vec<String>,
}

pub async fn parse_json_plan(body: String) -> Json<PlanParseResponse> {
    Json(PlanParseResponse {
        operators: json_plan::extract_operator_list(&body),
        root: json_plan::parse(&body),
    })
}
