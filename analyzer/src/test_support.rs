//! Shared constructors for unit tests.

use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};

use crate::models::Node;

pub fn at(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap()
}

/// Bare node with the given timing (epoch milliseconds) and no relations.
pub fn node(id: &str, node_type: &str, start_ms: Option<i64>, finish_ms: Option<i64>) -> Node {
    let start_time = start_ms.map(at);
    let finish_time = finish_ms.map(at);
    let duration_ms = match (start_ms, finish_ms) {
        (Some(s), Some(f)) => (f - s).max(0),
        _ => 0,
    };
    Node {
        id: id.to_string(),
        parent_id: None,
        node_type: node_type.to_string(),
        name: id.to_string(),
        identifier: None,
        ref_name: None,
        order: None,
        start_time,
        finish_time,
        duration_ms,
        state: None,
        result: None,
        worker_name: None,
        queue_id: None,
        task_name: None,
        task_id: None,
        child_ids: Vec::new(),
        depth: 0,
        extra: Map::new(),
    }
}

/// ISO timestamp `secs` seconds after the epoch.
pub fn iso(secs: i64) -> String {
    at(secs * 1_000).to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Raw JSON record as the timeline API would emit it. Times are in seconds.
pub fn record(
    id: &str,
    parent: Option<&str>,
    record_type: &str,
    name: &str,
    start_secs: Option<i64>,
    finish_secs: Option<i64>,
) -> Value {
    json!({
        "id": id,
        "parentId": parent,
        "type": record_type,
        "name": name,
        "startTime": start_secs.map(iso),
        "finishTime": finish_secs.map(iso),
    })
}

pub fn timeline(records: Vec<Value>) -> Value {
    json!({ "records": records })
}
