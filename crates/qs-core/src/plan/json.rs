//! # Structured plan parser
//!
//! Turns the engine's JSON plan payload into a [`PlanNode`] tree. The
//! payload is a map from fragment key to plan-node object; fragment "0"
//! is the canonical entry point. A payload that fails to parse yields
//! `None`, never a partial tree, so callers keep whatever tree they
//! already have.

use super::{PlanNode, OPERATOR_NODE_TYPE};
use serde_json::Value;
use std::collections::HashMap;

/// Parse a JSON plan payload into an operator tree.
///
/// Returns `None` for empty or whitespace-only input, for JSON that
/// fails to parse, and for payloads that are not objects. When the map
/// has no "0" key the first key in iteration order is used as a
/// last-resort entry point.
pub fn parse(json_plan: &str) -> Option<PlanNode> {
    if json_plan.trim().is_empty() {
        return None;
    }

    let doc = match serde_json::from_str::<Value>(json_plan) {
        Ok(Value::Object(map)) => map,
        Ok(_) => {
            tracing::warn!("plan payload is not a JSON object");
            return None;
        }
        Err(e) => {
            tracing::warn!("unparseable plan payload: {}", e);
            return None;
        }
    };

    let entry = doc.get("0").or_else(|| doc.values().next())?;
    build_node(entry)
}

/// Pre-order sequence of operator type names for the whole tree.
/// Empty on unparseable input.
pub fn extract_operator_list(json_plan: &str) -> Vec<String> {
    let mut operators = Vec::new();
    if let Some(root) = parse(json_plan) {
        collect_operators(&root, &mut operators);
    }
    operators
}

fn collect_operators(node: &PlanNode, out: &mut Vec<String>) {
    out.push(node.operator_type.clone());
    for child in &node.children {
        collect_operators(child, out);
    }
}

fn build_node(value: &Value) -> Option<PlanNode> {
    let obj = value.as_object()?;

    let id = match obj.get("id") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    };
    let operator_type = obj
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or("Unknown")
        .to_string();

    let mut metadata = HashMap::new();
    let mut source_catalog = None;
    let mut source_table = None;

    if let Some(Value::Object(descriptor)) = obj.get("descriptor") {
        for (key, val) in descriptor {
            if key == "table" {
                if let Some(table_ref) = val.as_str() {
                    let (catalog, table) = split_table_ref(table_ref);
                    source_catalog = catalog;
                    source_table = table;
                }
            }
            metadata.insert(key.clone(), val.clone());
        }
    }

    if let Some(Value::Array(columns)) = obj.get("outputs") {
        if !columns.is_empty() {
            metadata.insert("outputs".to_string(), Value::Array(columns.clone()));
        }
    }
    if let Some(Value::Array(details)) = obj.get("details") {
        if !details.is_empty() {
            metadata.insert("details".to_string(), Value::Array(details.clone()));
        }
    }

    // Cost estimates keep their original textual form so nothing is
    // lost to a narrower numeric type.
    if let Some(Value::Array(estimates)) = obj.get("estimates") {
        if let Some(Value::Object(first)) = estimates.first() {
            let rendered: serde_json::Map<String, Value> = first
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(render_estimate(v))))
                .collect();
            metadata.insert("estimates".to_string(), Value::Object(rendered));
        }
    }

    let children = obj
        .get("children")
        .and_then(Value::as_array)
        .map(|kids| kids.iter().filter_map(build_node).collect())
        .unwrap_or_default();

    Some(PlanNode {
        id,
        node_type: OPERATOR_NODE_TYPE.to_string(),
        operator_type,
        source_catalog,
        source_table,
        metadata,
        children,
    })
}

fn render_estimate(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Split a descriptor table reference like "postgres:public.customers"
/// into its catalog and table name.
fn split_table_ref(raw: &str) -> (Option<String>, Option<String>) {
    let (catalog, rest) = match raw.split_once(':') {
        Some((catalog, rest)) => (Some(catalog.to_string()), rest),
        None => (None, raw),
    };
    let table = rest
        .rsplit('.')
        .next()
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string());
    (catalog, table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_select_plan() {
        let json_plan = r#"
            {
              "0": {
                "id": "0",
                "name": "Output",
                "descriptor": {},
                "outputs": [
                  {"name": "customer_id", "type": "integer"},
                  {"name": "customer_name", "type": "varchar"}
                ],
                "details": [],
                "estimates": [
                  {
                    "outputRowCount": 1000.0,
                    "outputSizeInBytes": 50000.0,
                    "cpuCost": 50000.0,
                    "memoryCost": 0.0,
                    "networkCost": 0.0
                  }
                ],
                "children": [
                  {
                    "id": "1",
                    "name": "TableScan",
                    "descriptor": {"table": "postgres:public.customers"},
                    "outputs": [],
                    "details": ["Layout: postgres:public.customers"],
                    "estimates": [],
                    "children": []
                  }
                ]
              }
            }
        "#;

        let root = parse(json_plan).unwrap();
        assert_eq!(root.id, "0");
        assert_eq!(root.operator_type, "Output");
        assert_eq!(root.node_type, OPERATOR_NODE_TYPE);
        assert_eq!(root.children.len(), 1);

        let child = &root.children[0];
        assert_eq!(child.id, "1");
        assert_eq!(child.operator_type, "TableScan");
        assert_eq!(
            child.metadata.get("table"),
            Some(&serde_json::json!("postgres:public.customers"))
        );
    }

    #[test]
    fn parses_join_plan_with_multiple_children() {
        let json_plan = r#"
            {
              "0": {
                "id": "0",
                "name": "Output",
                "descriptor": {},
                "outputs": [],
                "details": [],
                "estimates": [],
                "children": [
                  {
                    "id": "1",
                    "name": "InnerJoin",
                    "descriptor": {"criteria": "orders.customer_id = customers.id"},
                    "outputs": [],
                    "details": ["Join Distribution: PARTITIONED"],
                    "estimates": [],
                    "children": [
                      {
                        "id": "2",
                        "name": "TableScan",
                        "descriptor": {"table": "postgres:public.orders"},
                        "outputs": [],
                        "details": [],
                        "estimates": [],
                        "children": []
                      },
                      {
                        "id": "3",
                        "name": "TableScan",
                        "descriptor": {"table": "mongodb:sales.customers"},
                        "outputs": [],
                        "details": [],
                        "estimates": [],
                        "children": []
                      }
                    ]
                  }
                ]
              }
            }
        "#;

        let root = parse(json_plan).unwrap();
        assert_eq!(root.operator_type, "Output");
        assert_eq!(root.children.len(), 1);

        let join = &root.children[0];
        assert_eq!(join.operator_type, "InnerJoin");
        assert_eq!(join.children.len(), 2);
        assert_eq!(join.children[0].operator_type, "TableScan");
        assert_eq!(join.children[1].operator_type, "TableScan");
    }

    #[test]
    fn empty_input_yields_none() {
        assert!(parse("").is_none());
    }

    #[test]
    fn whitespace_input_yields_none() {
        assert!(parse("   \n\t  ").is_none());
    }

    #[test]
    fn malformed_json_yields_none() {
        let malformed = r#"{"0": {"id": "0", "name": "Output" // missing closing braces"#;
        assert!(parse(malformed).is_none());
    }

    #[test]
    fn non_object_payload_yields_none() {
        assert!(parse(r#"["not", "a", "plan"]"#).is_none());
    }

    #[test]
    fn estimates_keep_their_textual_form() {
        let json_plan = r#"
            {
              "0": {
                "id": "0",
                "name": "Output",
                "descriptor": {},
                "outputs": [],
                "details": [],
                "estimates": [
                  {
                    "outputRowCount": 2500.0,
                    "outputSizeInBytes": 125000.0,
                    "cpuCost": 75000.0,
                    "memoryCost": 25000.0,
                    "networkCost": 10000.0
                  }
                ],
                "children": []
              }
            }
        "#;

        let root = parse(json_plan).unwrap();
        let estimates = root
            .metadata
            .get("estimates")
            .and_then(|v| v.as_object())
            .unwrap();
        assert_eq!(estimates.get("outputRowCount"), Some(&serde_json::json!("2500.0")));
        assert_eq!(
            estimates.get("outputSizeInBytes"),
            Some(&serde_json::json!("125000.0"))
        );
        assert_eq!(estimates.get("cpuCost"), Some(&serde_json::json!("75000.0")));
        assert_eq!(estimates.get("memoryCost"), Some(&serde_json::json!("25000.0")));
        assert_eq!(estimates.get("networkCost"), Some(&serde_json::json!("10000.0")));
    }

    #[test]
    fn extracts_operator_list_in_preorder() {
        let json_plan = r#"
            {
              "0": {
                "id": "0",
                "name": "Output",
                "children": [
                  {"id": "1", "name": "TableScan", "children": []}
                ]
              }
            }
        "#;

        let operators = extract_operator_list(json_plan);
        assert_eq!(operators, vec!["Output", "TableScan"]);
    }

    #[test]
    fn extracts_operator_list_from_nested_tree() {
        let json_plan = r#"
            {
              "0": {
                "id": "0",
                "name": "Output",
                "children": [
                  {
                    "id": "1",
                    "name": "InnerJoin",
                    "children": [
                      {"id": "2", "name": "TableScan", "children": []},
                      {
                        "id": "3",
                        "name": "Filter",
                        "children": [
                          {"id": "4", "name": "TableScan", "children": []}
                        ]
                      }
                    ]
                  }
                ]
              }
            }
        "#;

        let operators = extract_operator_list(json_plan);
        assert_eq!(
            operators,
            vec!["Output", "InnerJoin", "TableScan", "Filter", "TableScan"]
        );
    }

    #[test]
    fn operator_list_is_empty_on_unparseable_input() {
        assert!(extract_operator_list("").is_empty());
        assert!(extract_operator_list("{oops").is_empty());
    }

    #[test]
    fn derives_source_from_table_descriptor() {
        let json_plan = r#"
            {
              "0": {
                "id": "0",
                "name": "TableScan",
                "descriptor": {"table": "postgres:public.users"},
                "children": []
              }
            }
        "#;

        let root = parse(json_plan).unwrap();
        assert_eq!(
            root.metadata.get("table"),
            Some(&serde_json::json!("postgres:public.users"))
        );
        assert_eq!(root.source_catalog.as_deref(), Some("postgres"));
        assert_eq!(root.source_table.as_deref(), Some("users"));
    }

    #[test]
    fn falls_back_to_first_key_when_zero_is_missing() {
        let json_plan = r#"
            {
              "1": {
                "id": "1",
                "name": "Output",
                "children": []
              }
            }
        "#;

        let root = parse(json_plan).unwrap();
        assert_eq!(root.operator_type, "Output");
    }
}
