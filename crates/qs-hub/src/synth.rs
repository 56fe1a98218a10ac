//! # Synthetic query lifecycles
//!
//! Drives made-up but realistically shaped lifecycle events through the
//! aggregator so the dashboard has something to show without a live
//! engine attached.

use crate::aggregator::QueryAggregator;
use chrono::Utc;
use qs_core::QueryEvent;
use rand::Rng;
use serde::{Deserialize, Serialize};

const SOURCES: &[(&str, &str, &str)] = &[
    ("postgres", "public", "customers"),
    ("postgres", "public", "orders"),
    ("mongodb", "sales", "customers"),
    ("elasticsearch", "logs", "requests"),
];

const QUERIES: &[&str] = &[
    "SELECT * FROM customers",
    "SELECT c.name, o.total FROM postgres.public.customers c JOIN postgres.public.orders o ON c.id = o.customer_id",
    "SELECT count(*) FROM mongodb.sales.customers",
    "SELECT status, count(*) FROM elasticsearch.logs.requests GROUP BY status",
];

const USERS: &[&str] = &["analyst", "etl-batch", "dashboard"];

#[derive(Deserialize)]
pub struct SimulateParams {
    pub queries: Option<usize>,
    pub events_per_query: Option<usize>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulateResult {
    pub queries_created: usize,
    pub events_processed: usize,
}

/// Run a batch of synthetic lifecycles: each query moves from QUEUED
/// through RUNNING to FINISHED, with a structured plan attached to the
/// final event.
pub async fn run(aggregator: &QueryAggregator, params: &SimulateParams) -> SimulateResult {
    let query_count = params.queries.unwrap_or(5).min(1000);
    let events_per_query = params.events_per_query.unwrap_or(3).clamp(1, 20);

    let mut events_processed = 0;
    for i in 0..query_count {
        let query_id = format!("sim-{}", uuid::Uuid::new_v4().as_simple());
        let (catalog, schema, table) = SOURCES[i % SOURCES.len()];
        let query = QUERIES[i % QUERIES.len()];
        let user = USERS[i % USERS.len()];

        for k in 0..events_per_query {
            let last = k + 1 == events_per_query;
            let (event_type, state) = if last {
                ("QueryCompleted", "FINISHED")
            } else if k == 0 {
                ("QueryCreated", "QUEUED")
            } else {
                ("SplitCompleted", "RUNNING")
            };

            // ThreadRng is not Send; keep it out of the await below.
            let event = {
                let mut rng = rand::thread_rng();
                QueryEvent {
                    query_id: query_id.clone(),
                    event_type: event_type.to_string(),
                    timestamp: Some(Utc::now()),
                    query: Some(query.to_string()),
                    user: Some(user.to_string()),
                    state: Some(state.to_string()),
                    catalog: Some(catalog.to_string()),
                    schema: Some(schema.to_string()),
                    table_name: Some(table.to_string()),
                    cpu_time: Some(rng.gen_range(50..500)),
                    wall_time: Some(rng.gen_range(100..1000)),
                    queued_time_ms: (k == 0).then(|| rng.gen_range(0..50)),
                    peak_memory_bytes: Some(rng.gen_range(1..64) * 1024 * 1024),
                    execution_time: last.then(|| rng.gen_range(500..5000)),
                    total_rows: last.then(|| rng.gen_range(10..10_000)),
                    total_bytes: last.then(|| rng.gen_range(1_000..10_000_000)),
                    completed_splits: last.then(|| rng.gen_range(1..64)),
                    json_plan: last.then(|| sample_plan(catalog, schema, table)),
                    ..Default::default()
                }
            };

            aggregator.process_event(event).await;
            events_processed += 1;
        }
    }

    SimulateResult {
        queries_created: query_count,
        events_processed,
    }
}

fn sample_plan(catalog: &str, schema: &str, table: &str) -> String {
    format!(
        concat!(
            r#"{{"0": {{"id": "0", "name": "Output", "descriptor": {{}}, "#,
            r#""outputs": [], "details": [], "estimates": [], "children": ["#,
            r#"{{"id": "1", "name": "TableScan", "descriptor": {{"table": "{}:{}.{}"}}, "#,
            r#""outputs": [], "details": [], "estimates": [], "children": []}}]}}}}"#
        ),
        catalog, schema, table
    )
}
