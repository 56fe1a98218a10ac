use serde::{Deserialize, Serialize};

/// One fragment of a text-based execution plan: a numbered
/// "Fragment N [partitioning]" block and the metrics scraped from it.
///
/// Timing and size fields carry both the original textual form (for
/// display) and a normalized numeric form (for comparison). Fragments
/// are produced as an ordered sequence by one parse call and have no
/// further lifecycle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fragment {
    pub fragment_id: i64,
    /// Raw bracket contents of the header, e.g. "HASH" or "SINGLE".
    pub partitioning_type: String,
    pub cpu_time: Option<String>,
    pub cpu_time_ms: Option<f64>,
    pub scheduled_time: Option<String>,
    pub scheduled_time_ms: Option<f64>,
    pub blocked_time: Option<String>,
    pub blocked_time_ms: Option<f64>,
    pub input_rows: Option<i64>,
    pub input_bytes: Option<String>,
    pub input_bytes_value: Option<i64>,
    pub output_rows: Option<i64>,
    pub output_bytes: Option<String>,
    pub output_bytes_value: Option<i64>,
    pub peak_memory: Option<String>,
    pub peak_memory_bytes: Option<i64>,
    pub task_count: Option<i64>,
    pub output_layout: Option<String>,
    pub output_partitioning: Option<String>,
    /// Operator-tree lines, verbatim and untrimmed, in source order.
    pub operators: Vec<String>,
    /// The whole block as it appeared in the source text.
    pub raw_text: Option<String>,
}

impl Fragment {
    pub fn new(fragment_id: i64, partitioning_type: String) -> Self {
        Self {
            fragment_id,
            partitioning_type,
            ..Default::default()
        }
    }
}
