use crate::event::QueryEvent;
use crate::plan::{json, PlanNode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The continuously-updated aggregate for one query id.
///
/// Numeric fields merge per-field with a fixed policy: execution, CPU,
/// wall and queued time accumulate (sum), peak memory keeps the largest
/// observation, row/byte totals and the remaining fields take the
/// latest non-null value. The event list is append-only and never
/// reordered.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRecord {
    pub query_id: String,
    pub query: Option<String>,
    pub user: Option<String>,
    pub state: Option<String>,
    pub catalog: Option<String>,
    pub schema: Option<String>,
    pub table_name: Option<String>,
    /// Timestamp of the first event seen for this query.
    pub start_time: Option<DateTime<Utc>>,
    /// Timestamp of the latest event seen for this query.
    pub end_time: Option<DateTime<Utc>>,
    pub total_execution_time: Option<i64>,
    pub total_cpu_time: Option<i64>,
    pub total_wall_time: Option<i64>,
    pub total_queued_time: Option<i64>,
    pub peak_memory_bytes: Option<i64>,
    pub total_rows: Option<i64>,
    pub total_bytes: Option<i64>,
    pub completed_splits: Option<i64>,
    pub statistics: Option<HashMap<String, serde_json::Value>>,
    /// Present once a structured plan has been successfully parsed.
    pub root: Option<PlanNode>,
    /// Every event received for this id, in arrival order.
    pub events: Vec<QueryEvent>,
    pub error_message: Option<String>,
}

impl QueryRecord {
    pub fn new(query_id: impl Into<String>) -> Self {
        Self {
            query_id: query_id.into(),
            ..Default::default()
        }
    }

    /// Fold one event into the aggregate.
    ///
    /// A plan payload that fails to parse leaves the existing tree
    /// untouched; only a successful parse replaces it.
    pub fn apply(&mut self, event: QueryEvent) {
        if self.start_time.is_none() {
            self.start_time = event.timestamp;
        }
        if event.timestamp.is_some() {
            self.end_time = event.timestamp;
        }

        latest(&mut self.query, &event.query);
        latest(&mut self.user, &event.user);
        latest(&mut self.state, &event.state);
        latest(&mut self.catalog, &event.catalog);
        latest(&mut self.schema, &event.schema);
        latest(&mut self.table_name, &event.table_name);
        latest(&mut self.statistics, &event.statistics);
        latest(&mut self.error_message, &event.error_message);

        add(&mut self.total_execution_time, event.execution_time);
        add(&mut self.total_cpu_time, event.cpu_time);
        add(&mut self.total_wall_time, event.wall_time);
        add(&mut self.total_queued_time, event.queued_time_ms);

        max_of(&mut self.peak_memory_bytes, event.peak_memory_bytes);

        latest(&mut self.total_rows, &event.total_rows);
        latest(&mut self.total_bytes, &event.total_bytes);
        latest(&mut self.completed_splits, &event.completed_splits);

        if let Some(plan) = event.json_plan.as_deref() {
            if !plan.trim().is_empty() {
                if let Some(root) = json::parse(plan) {
                    self.root = Some(root);
                }
            }
        }

        self.events.push(event);
    }
}

fn latest<T: Clone>(slot: &mut Option<T>, observed: &Option<T>) {
    if let Some(value) = observed {
        *slot = Some(value.clone());
    }
}

fn add(slot: &mut Option<i64>, observed: Option<i64>) {
    if let Some(value) = observed {
        *slot = Some(slot.unwrap_or(0) + value);
    }
}

fn max_of(slot: &mut Option<i64>, observed: Option<i64>) {
    if let Some(value) = observed {
        *slot = Some(slot.map_or(value, |current| current.max(value)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(state: &str) -> QueryEvent {
        QueryEvent {
            query_id: "query-123".to_string(),
            event_type: "QueryCreated".to_string(),
            query: Some("SELECT * FROM users".to_string()),
            user: Some("test-user".to_string()),
            state: Some(state.to_string()),
            ..Default::default()
        }
    }

    fn ts(raw: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(raw)
            .unwrap()
            .with_timezone(&Utc)
    }

    const SAMPLE_PLAN: &str = r#"{"0": {"id": "0", "name": "Output", "children": []}}"#;

    #[test]
    fn appends_every_event_in_call_order() {
        let mut record = QueryRecord::new("query-123");
        for kind in ["QueryCreated", "SplitCompleted", "QueryCompleted"] {
            let mut e = event("RUNNING");
            e.event_type = kind.to_string();
            record.apply(e);
        }

        assert_eq!(record.events.len(), 3);
        let kinds: Vec<&str> = record.events.iter().map(|e| e.event_type.as_str()).collect();
        assert_eq!(kinds, vec!["QueryCreated", "SplitCompleted", "QueryCompleted"]);
    }

    #[test]
    fn sums_cpu_wall_and_queued_time() {
        let mut record = QueryRecord::new("query-123");

        let mut first = event("RUNNING");
        first.cpu_time = Some(500);
        first.wall_time = Some(800);
        first.queued_time_ms = Some(40);
        record.apply(first);

        // an event with no counters must not disturb the sums
        record.apply(event("RUNNING"));

        let mut third = event("FINISHED");
        third.cpu_time = Some(300);
        third.wall_time = Some(200);
        record.apply(third);

        assert_eq!(record.total_cpu_time, Some(800));
        assert_eq!(record.total_wall_time, Some(1000));
        assert_eq!(record.total_queued_time, Some(40));
    }

    #[test]
    fn keeps_the_largest_peak_memory() {
        let mut record = QueryRecord::new("query-123");
        for bytes in [1024, 4096, 2048] {
            let mut e = event("RUNNING");
            e.peak_memory_bytes = Some(bytes);
            record.apply(e);
        }
        assert_eq!(record.peak_memory_bytes, Some(4096));
    }

    #[test]
    fn row_and_byte_totals_take_the_latest_value() {
        let mut record = QueryRecord::new("query-123");

        let mut first = event("RUNNING");
        first.total_rows = Some(100);
        first.total_bytes = Some(5000);
        record.apply(first);

        let mut second = event("FINISHED");
        second.total_rows = Some(250);
        second.total_bytes = Some(12000);
        record.apply(second);

        assert_eq!(record.total_rows, Some(250));
        assert_eq!(record.total_bytes, Some(12000));
    }

    #[test]
    fn state_survives_an_event_without_one() {
        let mut record = QueryRecord::new("query-123");
        record.apply(event("FINISHED"));

        let mut bare = event("FINISHED");
        bare.state = None;
        bare.query = None;
        record.apply(bare);

        assert_eq!(record.state.as_deref(), Some("FINISHED"));
        assert_eq!(record.query.as_deref(), Some("SELECT * FROM users"));
    }

    #[test]
    fn first_timestamp_is_start_latest_is_end() {
        let mut record = QueryRecord::new("query-123");

        let mut first = event("QUEUED");
        first.timestamp = Some(ts("2026-08-04T10:00:00Z"));
        record.apply(first);

        let mut second = event("FINISHED");
        second.timestamp = Some(ts("2026-08-04T10:00:05Z"));
        record.apply(second);

        assert_eq!(record.start_time, Some(ts("2026-08-04T10:00:00Z")));
        assert_eq!(record.end_time, Some(ts("2026-08-04T10:00:05Z")));
    }

    #[test]
    fn successful_plan_parse_sets_the_root() {
        let mut record = QueryRecord::new("query-123");
        let mut e = event("RUNNING");
        e.json_plan = Some(SAMPLE_PLAN.to_string());
        record.apply(e);

        assert_eq!(
            record.root.as_ref().map(|r| r.operator_type.as_str()),
            Some("Output")
        );
    }

    #[test]
    fn failed_plan_parse_keeps_the_existing_root() {
        let mut record = QueryRecord::new("query-123");
        let mut good = event("RUNNING");
        good.json_plan = Some(SAMPLE_PLAN.to_string());
        record.apply(good);

        let mut bad = event("RUNNING");
        bad.json_plan = Some("{\"0\": {\"id\": \"0\", \"name\": \"Output\"".to_string());
        record.apply(bad);

        assert_eq!(
            record.root.as_ref().map(|r| r.operator_type.as_str()),
            Some("Output")
        );
        assert_eq!(record.events.len(), 2);
    }

    #[test]
    fn error_message_takes_the_latest_value() {
        let mut record = QueryRecord::new("query-123");
        record.apply(event("RUNNING"));

        let mut failed = event("FAILED");
        failed.error_message = Some("Division by zero".to_string());
        record.apply(failed);

        assert_eq!(record.error_message.as_deref(), Some("Division by zero"));
    }
}
