//! Structural validation of imported snapshot payloads.
//!
//! Validation runs on the raw JSON value so that a record missing a required
//! field is reported as a validation problem rather than a parse error.

use serde_json::Value;

/// Returns `true` if `record[field]` is a non-empty string.
fn has_text(record: &Value, field: &str) -> bool {
    record
        .get(field)
        .and_then(Value::as_str)
        .is_some_and(|s| !s.is_empty())
}

fn check_records(
    payload: &Value,
    collection: &str,
    required: &[&str],
    problems: &mut Vec<String>,
) {
    let Some(records) = payload.get(collection) else {
        problems.push(format!("missing '{collection}' array"));
        return;
    };
    let Some(records) = records.as_array() else {
        problems.push(format!("'{collection}' is not an array"));
        return;
    };

    for (index, record) in records.iter().enumerate() {
        let missing: Vec<&str> = required
            .iter()
            .copied()
            .filter(|field| !has_text(record, field))
            .collect();
        if missing.is_empty() {
            continue;
        }
        let id = record.get("id").and_then(Value::as_str).unwrap_or("?");
        problems.push(format!(
            "{collection}[{index}] (id '{id}'): missing or empty {}",
            missing.join(", ")
        ));
    }
}

/// Lists every structural problem in a snapshot payload.
///
/// Nodes need a non-empty string `id` and `label`; edges need a non-empty
/// string `id`, `source` and `target`. An empty list means the payload is
/// valid.
#[must_use]
pub fn validate_snapshot(payload: &Value) -> Vec<String> {
    if !payload.is_object() {
        return vec!["graph data must be a JSON object".to_string()];
    }

    let mut problems = Vec::new();
    check_records(payload, "nodes", &["id", "label"], &mut problems);
    check_records(payload, "edges", &["id", "source", "target"], &mut problems);
    problems
}
