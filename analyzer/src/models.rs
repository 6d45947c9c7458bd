//! Core data types for timeline analysis.
//!
//! `TimelineRecord` is the decoded input shape; `Node` is its normalized form
//! stored in the `TimelineGraph` arena.

use chrono::{DateTime, Utc};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::TimelineWarning;
use crate::interner::NodeIdInterner;

pub const TYPE_STAGE: &str = "Stage";
pub const TYPE_PHASE: &str = "Phase";
pub const TYPE_JOB: &str = "Job";
pub const TYPE_TASK: &str = "Task";
pub const TYPE_CHECKPOINT: &str = "Checkpoint";
const CHECKPOINT_PREFIX: &str = "Checkpoint.";

/// Fields of a raw record that are interpreted. Everything else is kept in
/// `TimelineRecord::extra`.
const KNOWN_FIELDS: &[&str] = &[
    "id",
    "parentId",
    "type",
    "name",
    "identifier",
    "refName",
    "order",
    "startTime",
    "finishTime",
    "state",
    "result",
    "workerName",
    "queueId",
    "task",
];

/// `Checkpoint` or any `Checkpoint.*` type.
pub fn is_checkpoint_type(node_type: &str) -> bool {
    node_type == TYPE_CHECKPOINT || node_type.starts_with(CHECKPOINT_PREFIX)
}

/// Step-like types are the leaves that do real work: tasks and checkpoints.
pub fn is_step_like_type(node_type: &str) -> bool {
    node_type == TYPE_TASK || is_checkpoint_type(node_type)
}

/// Nested task metadata of a step record.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskReference {
    pub id: Option<String>,
    pub name: Option<String>,
}

/// Why a raw record could not be decoded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordRejection {
    NotAnObject,
    MissingId,
}

/// A timeline record as decoded from the input document.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineRecord {
    pub id: String,
    pub parent_id: Option<String>,
    #[serde(rename = "type")]
    pub record_type: Option<String>,
    pub name: Option<String>,
    pub identifier: Option<String>,
    pub ref_name: Option<String>,
    pub order: Option<f64>,
    pub start_time: Option<String>,
    pub finish_time: Option<String>,
    pub state: Option<String>,
    pub result: Option<String>,
    pub worker_name: Option<String>,
    pub queue_id: Option<String>,
    pub task: Option<TaskReference>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn string_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    match map.get(key) {
        Some(Value::String(s)) => Some(s.clone()),
        _ => None,
    }
}

/// Like `string_field`, but numbers are rendered to text (queue ids are
/// integers in some API versions).
fn text_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    match map.get(key) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

impl TimelineRecord {
    /// Decode one raw record.
    ///
    /// Only the id is mandatory. Optional fields with an unexpected JSON type
    /// decode to `None` rather than rejecting the record.
    pub fn from_value(value: &Value) -> Result<Self, RecordRejection> {
        let map = value.as_object().ok_or(RecordRejection::NotAnObject)?;
        let id = non_empty(string_field(map, "id")).ok_or(RecordRejection::MissingId)?;

        let task = map.get("task").and_then(Value::as_object).map(|t| TaskReference {
            id: text_field(t, "id"),
            name: string_field(t, "name"),
        });

        let extra = map
            .iter()
            .filter(|(k, _)| !KNOWN_FIELDS.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Ok(Self {
            id,
            parent_id: non_empty(string_field(map, "parentId")),
            record_type: string_field(map, "type"),
            name: string_field(map, "name"),
            identifier: string_field(map, "identifier"),
            ref_name: string_field(map, "refName"),
            order: map.get("order").and_then(Value::as_f64).filter(|o| o.is_finite()),
            start_time: string_field(map, "startTime"),
            finish_time: string_field(map, "finishTime"),
            state: string_field(map, "state"),
            result: string_field(map, "result"),
            worker_name: string_field(map, "workerName"),
            queue_id: text_field(map, "queueId"),
            task,
            extra,
        })
    }
}

/// A normalized timeline entity.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    pub parent_id: Option<String>,
    #[serde(rename = "type")]
    pub node_type: String,
    pub name: String,
    pub identifier: Option<String>,
    pub ref_name: Option<String>,
    pub order: Option<f64>,
    pub start_time: Option<DateTime<Utc>>,
    pub finish_time: Option<DateTime<Utc>>,
    pub duration_ms: i64,
    pub state: Option<String>,
    pub result: Option<String>,
    pub worker_name: Option<String>,
    pub queue_id: Option<String>,
    pub task_name: Option<String>,
    pub task_id: Option<String>,
    pub child_ids: Vec<String>,
    pub depth: usize,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl Node {
    #[inline]
    pub fn start_ms(&self) -> Option<i64> {
        self.start_time.map(|t| t.timestamp_millis())
    }

    #[inline]
    pub fn finish_ms(&self) -> Option<i64> {
        self.finish_time.map(|t| t.timestamp_millis())
    }

    pub fn is_step_like(&self) -> bool {
        is_step_like_type(&self.node_type)
    }

    pub fn is_job(&self) -> bool {
        self.node_type == TYPE_JOB
    }

    /// Both timestamps known.
    pub fn is_timed(&self) -> bool {
        self.start_time.is_some() && self.finish_time.is_some()
    }
}

/// Why a dependency edge was inferred.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum EdgeReason {
    #[serde(rename = "parent-child")]
    ParentChild,
    #[serde(rename = "sibling-order")]
    SiblingOrder,
}

impl EdgeReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ParentChild => "parent-child",
            Self::SiblingOrder => "sibling-order",
        }
    }
}

/// An inferred directed dependency between two nodes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DependencyEdge {
    pub from: String,
    pub to: String,
    pub reason: EdgeReason,
}

/// Adjacency lookup keyed by node id. Every node has an entry.
pub type Adjacency = FxHashMap<String, Vec<String>>;

/// The normalized timeline: node arena plus derived structure.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineGraph {
    /// Arena in record acceptance order.
    pub(crate) nodes: Vec<Node>,
    #[serde(skip)]
    pub(crate) index: NodeIdInterner,
    /// All node ids, stably sorted by the sibling ordering.
    pub sorted_ids: Vec<String>,
    pub root_ids: Vec<String>,
    pub leaf_ids: Vec<String>,
    pub stage_ids: Vec<String>,
    pub phase_ids: Vec<String>,
    pub job_ids: Vec<String>,
    pub step_ids: Vec<String>,
    pub edges: Vec<DependencyEdge>,
    pub incoming: Adjacency,
    pub outgoing: Adjacency,
    pub warnings: Vec<TimelineWarning>,
}

impl TimelineGraph {
    /// Look up a node by id.
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.index
            .get(id)
            .and_then(|idx| self.nodes.get(idx as usize))
    }

    /// All nodes in acceptance order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Resolve a list of ids into nodes, skipping unknown ids.
    pub fn nodes_for<'a>(&'a self, ids: &'a [String]) -> impl Iterator<Item = &'a Node> + 'a {
        ids.iter().filter_map(move |id| self.node(id))
    }

    /// Step-like nodes in sorted order.
    pub fn steps(&self) -> impl Iterator<Item = &Node> + '_ {
        self.nodes_for(&self.step_ids)
    }

    /// Job nodes in sorted order.
    pub fn jobs(&self) -> impl Iterator<Item = &Node> + '_ {
        self.nodes_for(&self.job_ids)
    }

    /// All descendants of `id` (excluding itself), in depth-first preorder.
    ///
    /// Uses an explicit stack and a visited set, so cyclic input terminates.
    pub fn descendants(&self, id: &str) -> Vec<&Node> {
        let Some(root) = self.node(id) else {
            return Vec::new();
        };
        let mut visited: FxHashSet<&str> = FxHashSet::default();
        visited.insert(root.id.as_str());

        let mut result = Vec::new();
        let mut stack: Vec<&str> = root.child_ids.iter().rev().map(String::as_str).collect();
        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            let Some(node) = self.node(current) else {
                continue;
            };
            result.push(node);
            stack.extend(node.child_ids.iter().rev().map(String::as_str));
        }
        result
    }

    /// Warning messages rendered for display.
    pub fn warning_messages(&self) -> Vec<String> {
        self.warnings.iter().map(ToString::to_string).collect()
    }
}
