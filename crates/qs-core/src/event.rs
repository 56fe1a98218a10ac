use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One lifecycle observation about one query at one instant.
///
/// Everything except `queryId` and `eventType` is optional: the engine
/// emits partial events (a creation event has no runtime counters, a
/// split-completion event has no plan) and the aggregator merges
/// whatever is present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryEvent {
    pub query_id: String,
    pub event_type: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub query: Option<String>,
    pub user: Option<String>,
    /// Free-form state label from the engine, e.g. "QUEUED" or "RUNNING".
    pub state: Option<String>,
    pub catalog: Option<String>,
    pub schema: Option<String>,
    pub table_name: Option<String>,
    /// Milliseconds.
    pub execution_time: Option<i64>,
    /// Milliseconds.
    pub cpu_time: Option<i64>,
    /// Milliseconds.
    pub wall_time: Option<i64>,
    pub queued_time_ms: Option<i64>,
    pub peak_memory_bytes: Option<i64>,
    pub total_rows: Option<i64>,
    pub total_bytes: Option<i64>,
    pub completed_splits: Option<i64>,
    /// Structured plan payload, present only on some events.
    pub json_plan: Option<String>,
    pub statistics: Option<HashMap<String, serde_json::Value>>,
    pub metadata: Option<HashMap<String, serde_json::Value>>,
    pub error_message: Option<String>,
}
