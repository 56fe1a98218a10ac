//! # Execution plan parsing
//!
//! Two independently-evolving, loosely-specified plan formats come out
//! of the engine: a nested JSON representation ([`json`]) and a verbose
//! human-readable explain-analyze text ([`text`]). Neither has a
//! contractual grammar, so both parsers are best-effort: malformed
//! input degrades to "no plan" or a partial fragment, never an error.

pub mod json;
pub mod text;
pub mod units;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Node kind tag carried by every parsed operator node.
pub const OPERATOR_NODE_TYPE: &str = "OPERATOR";

/// One node of a parsed structured plan.
///
/// `metadata` is an open bag: descriptor fields verbatim, the output
/// column layout, detail strings, and a nested "estimates" map whose
/// values keep their original textual form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanNode {
    pub id: String,
    pub node_type: String,
    /// Open string set: "TableScan", "InnerJoin", "Output", ...
    pub operator_type: String,
    pub source_catalog: Option<String>,
    pub source_table: Option<String>,
    pub metadata: HashMap<String, serde_json::Value>,
    /// Children in the source plan's order. A node owns its children;
    /// a fresh parse fully replaces the previous tree.
    pub children: Vec<PlanNode>,
}
