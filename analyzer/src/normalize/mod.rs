//! Timeline normalization.
//!
//! Turns the raw `{ "records": [...] }` document into a `TimelineGraph`:
//! records are decoded and deduplicated into an arena, parents are linked by
//! id, children and roots are ordered, depths are assigned, and dependency
//! edges are inferred. Per-record anomalies become warnings on the graph;
//! only a payload without a `records` array is an error.

mod depth;
mod ordering;
mod timestamp;

pub use ordering::{sort_group, SiblingOrder};
pub use timestamp::parse_timestamp;

use serde_json::Value;

use crate::config::AnalysisConfig;
use crate::dependencies::{build_adjacency, infer_dependencies};
use crate::error::{MalformedInputError, TimelineWarning};
use crate::interner::{NodeIdInterner, NodeIdx};
use crate::models::{
    is_step_like_type, Node, TimelineGraph, TimelineRecord, TYPE_JOB, TYPE_PHASE, TYPE_STAGE,
};
use crate::{log_changes, log_checks};

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn extract_records(raw: &Value) -> Result<&[Value], MalformedInputError> {
    let object = raw.as_object().ok_or(MalformedInputError::NotAnObject)?;
    match object.get("records") {
        None | Some(Value::Null) => Err(MalformedInputError::MissingRecords),
        Some(Value::Array(records)) => Ok(records),
        Some(other) => Err(MalformedInputError::RecordsNotArray(json_type_name(other))),
    }
}

fn push_warning(warnings: &mut Vec<TimelineWarning>, warning: TimelineWarning) {
    tracing::warn!("{}", warning);
    warnings.push(warning);
}

fn build_node(record: TimelineRecord) -> Node {
    let TimelineRecord {
        id,
        parent_id,
        record_type,
        name,
        identifier,
        ref_name,
        order,
        start_time,
        finish_time,
        state,
        result,
        worker_name,
        queue_id,
        task,
        extra,
    } = record;

    let start_time = start_time.as_deref().and_then(parse_timestamp);
    let finish_time = finish_time.as_deref().and_then(parse_timestamp);
    let duration_ms = match (start_time, finish_time) {
        (Some(start), Some(finish)) => (finish - start).num_milliseconds().max(0),
        _ => 0,
    };
    let (task_id, task_name) = task.map_or((None, None), |t| (t.id, t.name));
    let name = name.filter(|n| !n.is_empty()).unwrap_or_else(|| id.clone());

    Node {
        id,
        parent_id,
        node_type: record_type.unwrap_or_default(),
        name,
        identifier,
        ref_name,
        order,
        start_time,
        finish_time,
        duration_ms,
        state,
        result,
        worker_name,
        queue_id,
        task_name,
        task_id,
        child_ids: Vec::new(),
        depth: 0,
        extra,
    }
}

/// Normalize a timeline document with default configuration.
pub fn normalize(raw: &Value) -> Result<TimelineGraph, MalformedInputError> {
    normalize_with(raw, &AnalysisConfig::default())
}

/// Parse and normalize timeline JSON text.
pub fn normalize_str(input: &str) -> Result<TimelineGraph, MalformedInputError> {
    let raw: Value = serde_json::from_str(input)
        .map_err(|e| MalformedInputError::InvalidJson(e.to_string()))?;
    normalize(&raw)
}

/// Normalize a timeline document.
///
/// # Returns
/// * `Ok(TimelineGraph)` with every accepted record as a node; anomalies are
///   listed in `TimelineGraph::warnings`
/// * `Err(MalformedInputError)` if the payload is not an object with a
///   `records` array
pub fn normalize_with(
    raw: &Value,
    config: &AnalysisConfig,
) -> Result<TimelineGraph, MalformedInputError> {
    let verbosity = config.verbosity;
    let records = extract_records(raw)?;

    let mut warnings: Vec<TimelineWarning> = Vec::new();
    let mut index = NodeIdInterner::with_capacity(records.len());
    let mut nodes: Vec<Node> = Vec::with_capacity(records.len());

    // Phase 1: decode and deduplicate into the arena
    for (position, value) in records.iter().enumerate() {
        let record = match TimelineRecord::from_value(value) {
            Ok(record) => record,
            Err(rejection) => {
                log_checks!(verbosity, "  record #{} rejected: {:?}", position, rejection);
                push_warning(&mut warnings, TimelineWarning::MissingId { index: position });
                continue;
            }
        };
        if index.insert_new(&record.id).is_none() {
            push_warning(
                &mut warnings,
                TimelineWarning::DuplicateId {
                    id: record.id,
                    index: position,
                },
            );
            continue;
        }
        nodes.push(build_node(record));
    }
    log_changes!(
        verbosity,
        "Accepted {} of {} timeline records",
        nodes.len(),
        records.len()
    );

    // Phase 2: link parents by id
    let mut children: Vec<Vec<NodeIdx>> = vec![Vec::new(); nodes.len()];
    let mut roots: Vec<NodeIdx> = Vec::new();
    for slot in 0..nodes.len() {
        let Some(parent_id) = nodes[slot].parent_id.clone() else {
            roots.push(slot as NodeIdx);
            continue;
        };
        match index.get(&parent_id) {
            Some(parent) => children[parent as usize].push(slot as NodeIdx),
            None => {
                push_warning(
                    &mut warnings,
                    TimelineWarning::MissingParent {
                        id: nodes[slot].id.clone(),
                        parent_id,
                    },
                );
                nodes[slot].parent_id = None;
                roots.push(slot as NodeIdx);
            }
        }
    }

    // Phase 3: ordering, one key set per group
    let node_of = |slot: &NodeIdx| &nodes[*slot as usize];
    for kids in &mut children {
        sort_group(kids, node_of);
    }
    sort_group(&mut roots, node_of);
    let mut sorted: Vec<NodeIdx> = (0..nodes.len() as NodeIdx).collect();
    sort_group(&mut sorted, node_of);

    // Phase 4: depths
    let resolve = |slot: NodeIdx| index.resolve(slot).unwrap_or_default().to_string();
    let assignment = depth::assign_depths(&children, &roots, &sorted, &resolve, verbosity);
    for warning in assignment.warnings {
        push_warning(&mut warnings, warning);
    }
    for &promoted in &assignment.promoted_roots {
        log_checks!(verbosity, "  promoted {} to root", resolve(promoted));
    }
    roots.extend(assignment.promoted_roots);

    for (slot, kids) in children.iter().enumerate() {
        nodes[slot].child_ids = kids
            .iter()
            .filter_map(|&k| index.resolve(k))
            .map(str::to_string)
            .collect();
        nodes[slot].depth = assignment.depths[slot].unwrap_or(0);
    }

    // Phase 5: id lists
    let ids_of = |slots: &[NodeIdx]| -> Vec<String> {
        slots
            .iter()
            .map(|&s| nodes[s as usize].id.clone())
            .collect()
    };
    let root_ids = ids_of(&roots);
    let sorted_ids = ids_of(&sorted);
    let select = |predicate: &dyn Fn(&Node) -> bool| -> Vec<String> {
        sorted
            .iter()
            .map(|&s| &nodes[s as usize])
            .filter(|n| predicate(n))
            .map(|n| n.id.clone())
            .collect()
    };
    let leaf_ids = select(&|n: &Node| n.child_ids.is_empty());
    let stage_ids = select(&|n: &Node| n.node_type == TYPE_STAGE);
    let phase_ids = select(&|n: &Node| n.node_type == TYPE_PHASE);
    let job_ids = select(&|n: &Node| n.node_type == TYPE_JOB);
    let step_ids = select(&|n: &Node| is_step_like_type(&n.node_type));

    let mut graph = TimelineGraph {
        nodes,
        index,
        sorted_ids,
        root_ids,
        leaf_ids,
        stage_ids,
        phase_ids,
        job_ids,
        step_ids,
        warnings,
        ..TimelineGraph::default()
    };

    // Phase 6: dependency edges
    let edges = infer_dependencies(&graph);
    let (incoming, outgoing) = build_adjacency(graph.nodes(), &edges);
    log_changes!(
        verbosity,
        "Built graph: {} nodes, {} roots, {} edges, {} warnings",
        graph.len(),
        graph.root_ids.len(),
        edges.len(),
        graph.warnings.len()
    );
    graph.edges = edges;
    graph.incoming = incoming;
    graph.outgoing = outgoing;

    Ok(graph)
}
