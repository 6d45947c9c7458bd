//! Pipeline metrics: wall clock, agent wait, machine time, record counts.

use chrono::{DateTime, Utc};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;

use crate::models::{
    is_checkpoint_type, EdgeReason, Node, TimelineGraph, TYPE_JOB, TYPE_PHASE, TYPE_STAGE,
    TYPE_TASK,
};

/// Node counts partitioned by type.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordCounts {
    pub stages: usize,
    pub phases: usize,
    pub jobs: usize,
    /// Step-like nodes (tasks and checkpoints)
    pub steps: usize,
    pub tasks: usize,
    pub checkpoints: usize,
    pub total: usize,
}

/// Dependency edge counts by reason.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyCounts {
    pub total: usize,
    pub parent_child: usize,
    pub sibling_order: usize,
}

/// Aggregate timing metrics for one pipeline run.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineMetrics {
    /// Earliest start among fully timed nodes.
    pub pipeline_start: Option<DateTime<Utc>>,
    /// Latest finish among fully timed nodes.
    pub pipeline_finish: Option<DateTime<Utc>>,
    pub wall_clock_ms: i64,
    /// Wait before the first step of each job, by job id.
    pub job_wait_by_id: FxHashMap<String, i64>,
    pub total_agent_wait_ms: i64,
    /// Sum of job durations (not adjusted for parallelism).
    pub machine_running_ms: i64,
    /// Wall clock if no job had to wait for an agent.
    pub no_wait_wall_clock_ms: i64,
    pub record_counts: RecordCounts,
    pub dependency_counts: DependencyCounts,
}

/// A flat time range used by the critical-path and parallelism engines.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimedActivity {
    pub id: String,
    pub name: String,
    pub start_ms: i64,
    pub finish_ms: i64,
    pub duration_ms: i64,
}

impl TimedActivity {
    /// Activity for a node with both times and a positive duration.
    pub fn from_node(node: &Node) -> Option<Self> {
        let (start_ms, finish_ms) = (node.start_ms()?, node.finish_ms()?);
        if node.duration_ms <= 0 {
            return None;
        }
        Some(Self {
            id: node.id.clone(),
            name: node.name.clone(),
            start_ms,
            finish_ms,
            duration_ms: node.duration_ms,
        })
    }
}

/// Step-level activities, falling back to jobs when no step is usable.
pub fn timed_activities(graph: &TimelineGraph) -> Vec<TimedActivity> {
    let steps: Vec<TimedActivity> = graph.steps().filter_map(TimedActivity::from_node).collect();
    if !steps.is_empty() {
        return steps;
    }
    graph.jobs().filter_map(TimedActivity::from_node).collect()
}

/// Earliest start among the step-like descendants of `job`.
///
/// Explicit stack with a visited set; cyclic input terminates.
fn earliest_step_start(graph: &TimelineGraph, job: &Node) -> Option<i64> {
    let mut visited: FxHashSet<&str> = FxHashSet::default();
    visited.insert(job.id.as_str());
    let mut stack: Vec<&str> = job.child_ids.iter().map(String::as_str).collect();
    let mut earliest: Option<i64> = None;

    while let Some(id) = stack.pop() {
        if !visited.insert(id) {
            continue;
        }
        let Some(node) = graph.node(id) else {
            continue;
        };
        if node.is_step_like() {
            if let Some(start) = node.start_ms() {
                earliest = Some(earliest.map_or(start, |e| e.min(start)));
            }
        }
        stack.extend(node.child_ids.iter().map(String::as_str));
    }
    earliest
}

/// Agent wait of a job: first step start minus job start, floored at 0.
pub fn job_wait_ms(graph: &TimelineGraph, job: &Node) -> i64 {
    let Some(job_start) = job.start_ms() else {
        return 0;
    };
    earliest_step_start(graph, job).map_or(0, |first| (first - job_start).max(0))
}

fn wall_clock(graph: &TimelineGraph) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>, i64) {
    let mut start: Option<DateTime<Utc>> = None;
    let mut finish: Option<DateTime<Utc>> = None;
    for node in graph.nodes() {
        if let (Some(s), Some(f)) = (node.start_time, node.finish_time) {
            start = Some(start.map_or(s, |current| current.min(s)));
            finish = Some(finish.map_or(f, |current| current.max(f)));
        }
    }
    let wall_clock_ms = match (start, finish) {
        (Some(s), Some(f)) => (f - s).num_milliseconds().max(0),
        _ => 0,
    };
    (start, finish, wall_clock_ms)
}

/// Shift each timed job back by its own wait and measure the resulting span.
fn no_wait_wall_clock(graph: &TimelineGraph, waits: &FxHashMap<String, i64>) -> i64 {
    let mut earliest: Option<i64> = None;
    let mut latest: Option<i64> = None;
    for job in graph.jobs() {
        let (Some(start), Some(finish)) = (job.start_ms(), job.finish_ms()) else {
            continue;
        };
        let wait = waits.get(&job.id).copied().unwrap_or(0);
        let (shifted_start, shifted_finish) = (start - wait, finish - wait);
        earliest = Some(earliest.map_or(shifted_start, |e| e.min(shifted_start)));
        latest = Some(latest.map_or(shifted_finish, |l| l.max(shifted_finish)));
    }
    match (earliest, latest) {
        (Some(s), Some(f)) => (f - s).max(0),
        _ => 0,
    }
}

fn record_counts(graph: &TimelineGraph) -> RecordCounts {
    let mut counts = RecordCounts {
        total: graph.len(),
        ..RecordCounts::default()
    };
    for node in graph.nodes() {
        match node.node_type.as_str() {
            TYPE_STAGE => counts.stages += 1,
            TYPE_PHASE => counts.phases += 1,
            TYPE_JOB => counts.jobs += 1,
            TYPE_TASK => counts.tasks += 1,
            other if is_checkpoint_type(other) => counts.checkpoints += 1,
            _ => {}
        }
        if node.is_step_like() {
            counts.steps += 1;
        }
    }
    counts
}

fn dependency_counts(graph: &TimelineGraph) -> DependencyCounts {
    let parent_child = graph
        .edges
        .iter()
        .filter(|e| e.reason == EdgeReason::ParentChild)
        .count();
    DependencyCounts {
        total: graph.edges.len(),
        parent_child,
        sibling_order: graph.edges.len() - parent_child,
    }
}

/// Compute pipeline metrics from a normalized graph.
pub fn compute_metrics(graph: &TimelineGraph) -> PipelineMetrics {
    let (pipeline_start, pipeline_finish, wall_clock_ms) = wall_clock(graph);

    let job_wait_by_id: FxHashMap<String, i64> = graph
        .jobs()
        .map(|job| (job.id.clone(), job_wait_ms(graph, job)))
        .collect();
    let total_agent_wait_ms = job_wait_by_id.values().sum();
    let machine_running_ms = graph.jobs().map(|job| job.duration_ms).sum();
    let no_wait_wall_clock_ms = no_wait_wall_clock(graph, &job_wait_by_id);

    PipelineMetrics {
        pipeline_start,
        pipeline_finish,
        wall_clock_ms,
        job_wait_by_id,
        total_agent_wait_ms,
        machine_running_ms,
        no_wait_wall_clock_ms,
        record_counts: record_counts(graph),
        dependency_counts: dependency_counts(graph),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;
    use crate::test_support::{record, timeline};
    use serde_json::json;

    fn sample() -> TimelineGraph {
        normalize(&timeline(vec![
            record("s", None, "Stage", "Build", Some(0), Some(10)),
            record("j", Some("s"), "Job", "Job", Some(0), Some(10)),
            record("a", Some("j"), "Task", "Build", Some(0), Some(4)),
            record("b", Some("j"), "Task", "Test", Some(4), Some(10)),
        ]))
        .unwrap()
    }

    #[test]
    fn test_single_job_metrics() {
        let metrics = compute_metrics(&sample());
        assert_eq!(metrics.wall_clock_ms, 10_000);
        assert_eq!(metrics.job_wait_by_id["j"], 0);
        assert_eq!(metrics.total_agent_wait_ms, 0);
        assert_eq!(metrics.machine_running_ms, 10_000);
        assert_eq!(metrics.no_wait_wall_clock_ms, 10_000);
        assert_eq!(
            metrics.record_counts,
            RecordCounts {
                stages: 1,
                phases: 0,
                jobs: 1,
                steps: 2,
                tasks: 2,
                checkpoints: 0,
                total: 4,
            }
        );
        assert_eq!(metrics.dependency_counts.parent_child, 3);
        assert_eq!(metrics.dependency_counts.sibling_order, 1);
        assert_eq!(metrics.dependency_counts.total, 4);
    }

    #[test]
    fn test_job_wait_before_first_step() {
        let graph = normalize(&timeline(vec![
            record("j1", None, "Job", "Slow agent", Some(0), Some(10)),
            record("t1", Some("j1"), "Task", "Build", Some(2), Some(10)),
            record("j2", None, "Job", "Fast agent", Some(0), Some(5)),
            record("t2", Some("j2"), "Task", "Lint", Some(0), Some(5)),
        ]))
        .unwrap();
        let metrics = compute_metrics(&graph);

        assert_eq!(metrics.job_wait_by_id["j1"], 2_000);
        assert_eq!(metrics.job_wait_by_id["j2"], 0);
        assert_eq!(metrics.total_agent_wait_ms, 2_000);
        // j1 shifted to [-2s, 8s], j2 stays at [0s, 5s]
        assert_eq!(metrics.no_wait_wall_clock_ms, 10_000);
        assert_eq!(metrics.machine_running_ms, 15_000);
    }

    #[test]
    fn test_wait_uses_nested_steps_and_ignores_untimed() {
        let graph = normalize(&json!({"records": [
            {"id": "j", "type": "Job", "name": "J",
             "startTime": "2024-01-01T00:00:00Z", "finishTime": "2024-01-01T00:01:00Z"},
            {"id": "p", "parentId": "j", "type": "Phase", "name": "Group"},
            {"id": "c", "parentId": "p", "type": "Checkpoint.Approval", "name": "Gate",
             "startTime": "2024-01-01T00:00:30Z", "finishTime": "2024-01-01T00:00:40Z"},
            {"id": "t", "parentId": "j", "type": "Task", "name": "Untimed"}
        ]}))
        .unwrap();
        let job = graph.node("j").unwrap();
        assert_eq!(job_wait_ms(&graph, job), 30_000);
    }

    #[test]
    fn test_wait_zero_without_job_start_or_steps() {
        let graph = normalize(&timeline(vec![
            record("j1", None, "Job", "No start", None, Some(10)),
            record("t1", Some("j1"), "Task", "Build", Some(2), Some(10)),
            record("j2", None, "Job", "Empty", Some(0), Some(10)),
        ]))
        .unwrap();
        let metrics = compute_metrics(&graph);
        assert_eq!(metrics.job_wait_by_id["j1"], 0);
        assert_eq!(metrics.job_wait_by_id["j2"], 0);
    }

    #[test]
    fn test_step_before_job_start_floors_at_zero() {
        let graph = normalize(&timeline(vec![
            record("j", None, "Job", "J", Some(5), Some(10)),
            record("t", Some("j"), "Task", "Early", Some(1), Some(10)),
        ]))
        .unwrap();
        assert_eq!(compute_metrics(&graph).job_wait_by_id["j"], 0);
    }

    #[test]
    fn test_empty_graph_metrics() {
        let graph = normalize(&json!({"records": []})).unwrap();
        let metrics = compute_metrics(&graph);
        assert_eq!(metrics.wall_clock_ms, 0);
        assert_eq!(metrics.no_wait_wall_clock_ms, 0);
        assert_eq!(metrics.pipeline_start, None);
    }

    #[test]
    fn test_timed_activities_fall_back_to_jobs() {
        let graph = normalize(&timeline(vec![
            record("j", None, "Job", "J", Some(0), Some(10)),
            record("t", Some("j"), "Task", "Zero", Some(3), Some(3)),
        ]))
        .unwrap();
        let activities = timed_activities(&graph);
        assert_eq!(activities.len(), 1);
        assert_eq!(activities[0].id, "j");

        let steps = timed_activities(&sample());
        let ids: Vec<&str> = steps.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
