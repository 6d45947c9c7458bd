//! Critical path inference by weighted interval scheduling.
//!
//! The timeline does not record real dependencies between steps, so the
//! critical path is approximated as the chain of non-overlapping activities
//! with the largest total duration. Activities are flat time ranges; the
//! hierarchy and the inferred dependency edges are not consulted.

use serde::Serialize;

use crate::log_debug;
use crate::metrics::TimedActivity;

pub const CRITICAL_PATH_EXPLANATION: &str = "Longest chain of non-overlapping activities by total \
     duration, chosen with weighted interval scheduling over step start and finish times.";
pub const NOT_ENOUGH_DATA_EXPLANATION: &str =
    "Not enough timing data to infer a critical path: no activity has both a start and a finish time.";

/// The inferred critical path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CriticalPath {
    /// Chosen activity ids in chronological order.
    pub node_ids: Vec<String>,
    pub duration_ms: i64,
    pub explanation: String,
}

impl CriticalPath {
    fn empty() -> Self {
        Self {
            node_ids: Vec::new(),
            duration_ms: 0,
            explanation: NOT_ENOUGH_DATA_EXPLANATION.to_string(),
        }
    }
}

/// Compute the critical path with default (silent) logging.
pub fn compute_critical_path(activities: &[TimedActivity]) -> CriticalPath {
    compute_critical_path_with(activities, 0)
}

/// Select the maximum-duration set of mutually non-overlapping activities.
///
/// O(n log n): sort by finish, binary-search each activity's last compatible
/// predecessor, then a linear DP. On equal value the current activity is
/// included, which favours longer-looking paths.
pub fn compute_critical_path_with(activities: &[TimedActivity], verbosity: u8) -> CriticalPath {
    let mut sorted: Vec<&TimedActivity> = activities
        .iter()
        .filter(|a| a.finish_ms > a.start_ms && a.duration_ms > 0)
        .collect();
    if sorted.is_empty() {
        return CriticalPath::empty();
    }
    sorted.sort_by(|a, b| {
        a.finish_ms
            .cmp(&b.finish_ms)
            .then(a.start_ms.cmp(&b.start_ms))
    });

    let n = sorted.len();
    // compatible[i]: number of leading activities that finish by sorted[i]'s start
    let compatible: Vec<usize> = sorted
        .iter()
        .enumerate()
        .map(|(i, current)| {
            sorted[..i].partition_point(|prior| prior.finish_ms <= current.start_ms)
        })
        .collect();

    // best[k]: best total over the first k activities
    let mut best: Vec<i64> = vec![0; n + 1];
    let mut include: Vec<bool> = vec![false; n];
    for i in 0..n {
        let include_value = sorted[i].duration_ms + best[compatible[i]];
        let exclude_value = best[i];
        if include_value >= exclude_value {
            best[i + 1] = include_value;
            include[i] = true;
        } else {
            best[i + 1] = exclude_value;
        }
        log_debug!(
            verbosity,
            "  dp {} ({}): include={} exclude={} pred={}",
            i,
            sorted[i].id,
            include_value,
            exclude_value,
            compatible[i]
        );
    }

    let mut chosen: Vec<String> = Vec::new();
    let mut k = n;
    while k > 0 {
        let i = k - 1;
        if include[i] {
            chosen.push(sorted[i].id.clone());
            k = compatible[i];
        } else {
            k = i;
        }
    }
    chosen.reverse();

    CriticalPath {
        node_ids: chosen,
        duration_ms: best[n],
        explanation: CRITICAL_PATH_EXPLANATION.to_string(),
    }
}
