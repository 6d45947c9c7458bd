//! Concurrency analysis with a sweep line over activity start/finish events.

use serde::Serialize;

use crate::config::InsightThresholds;
use crate::format::format_duration;
use crate::log_debug;
use crate::metrics::TimedActivity;

/// How an insight should be presented.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightKind {
    Opportunity,
    Warning,
    Info,
}

/// A threshold-based observation about the run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Insight {
    pub kind: InsightKind,
    pub title: String,
    pub message: String,
}

impl Insight {
    fn new(kind: InsightKind, title: &str, message: String) -> Self {
        Self {
            kind,
            title: title.to_string(),
            message,
        }
    }
}

/// Parallelization statistics for one run.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParallelizationAnalysis {
    /// Sum of activity durations over wall clock (a utilization ratio).
    pub average_concurrency: f64,
    pub max_concurrency: usize,
    /// Critical path over wall clock, capped at 1.
    pub critical_path_ratio: f64,
    /// Covered time over wall clock, capped at 1.
    pub timeline_coverage_ratio: f64,
    /// Time during which at least one activity was running.
    pub covered_ms: i64,
    pub idle_wall_clock_ms: i64,
    pub insights: Vec<Insight>,
}

#[derive(Debug, Default, PartialEq, Eq)]
struct Sweep {
    covered_ms: i64,
    max_concurrency: usize,
}

/// Walk +1/-1 events in time order. At equal timestamps finishes are
/// processed before starts, so back-to-back activities never count as
/// overlapping.
fn sweep(activities: &[&TimedActivity], verbosity: u8) -> Sweep {
    let mut events: Vec<(i64, i32)> = activities
        .iter()
        .flat_map(|a| [(a.start_ms, 1), (a.finish_ms, -1)])
        .collect();
    events.sort_unstable();

    let mut result = Sweep::default();
    let mut active: i64 = 0;
    let mut previous: Option<i64> = None;
    for (time, delta) in events {
        if let Some(prev) = previous {
            if active > 0 {
                result.covered_ms += time - prev;
            }
        }
        active += i64::from(delta);
        result.max_concurrency = result.max_concurrency.max(active.max(0) as usize);
        previous = Some(time);
        log_debug!(verbosity, "  sweep t={} delta={} active={}", time, delta, active);
    }
    result
}

fn ratio(numerator: i64, denominator: i64) -> f64 {
    (numerator as f64 / denominator as f64).clamp(0.0, 1.0)
}

fn build_insights(
    analysis: &ParallelizationAnalysis,
    wall_clock_ms: i64,
    agent_wait_ms: i64,
    thresholds: &InsightThresholds,
) -> Vec<Insight> {
    let mut insights = Vec::new();
    let wait_ratio = agent_wait_ms as f64 / wall_clock_ms as f64;

    if wait_ratio > thresholds.agent_wait_ratio {
        insights.push(Insight::new(
            InsightKind::Opportunity,
            "Agent wait time is significant",
            format!(
                "Jobs waited {} for agents before their first step ({:.0}% of wall-clock time). \
                 More agents or a warm pool would shorten the run.",
                format_duration(agent_wait_ms),
                wait_ratio * 100.0
            ),
        ));
    }

    if analysis.critical_path_ratio > thresholds.dominant_critical_path_ratio
        && analysis.average_concurrency < thresholds.low_concurrency
    {
        insights.push(Insight::new(
            InsightKind::Opportunity,
            "Low parallelism on a dominant critical path",
            format!(
                "The critical path covers {:.0}% of the run while average concurrency is {:.2}. \
                 Splitting long sequential steps into parallel jobs would help most.",
                analysis.critical_path_ratio * 100.0,
                analysis.average_concurrency
            ),
        ));
    }

    if analysis.timeline_coverage_ratio < thresholds.min_coverage_ratio {
        insights.push(Insight::new(
            InsightKind::Warning,
            "Idle gaps in the timeline",
            format!(
                "Nothing was running for {} of the wall-clock time ({:.0}% coverage).",
                format_duration(analysis.idle_wall_clock_ms),
                analysis.timeline_coverage_ratio * 100.0
            ),
        ));
    }

    if analysis.average_concurrency > thresholds.high_concurrency
        && analysis.critical_path_ratio < thresholds.short_critical_path_ratio
    {
        insights.push(Insight::new(
            InsightKind::Info,
            "Pipeline is already well parallelized",
            format!(
                "Average concurrency is {:.2} and the critical path is only {:.0}% of the run.",
                analysis.average_concurrency,
                analysis.critical_path_ratio * 100.0
            ),
        ));
    }

    if insights.is_empty() {
        insights.push(Insight::new(
            InsightKind::Info,
            "Balanced pipeline",
            "No significant waiting, idle gaps or serialization bottlenecks were detected."
                .to_string(),
        ));
    }

    insights
}

/// Compute parallelization statistics with default thresholds.
pub fn compute_parallelization(
    activities: &[TimedActivity],
    wall_clock_ms: i64,
    critical_path_ms: i64,
    agent_wait_ms: i64,
) -> ParallelizationAnalysis {
    compute_parallelization_with(
        activities,
        wall_clock_ms,
        critical_path_ms,
        agent_wait_ms,
        &InsightThresholds::default(),
        0,
    )
}

/// Compute parallelization statistics.
///
/// # Arguments
/// * `activities` - Timed activities (steps, or jobs as a fallback)
/// * `wall_clock_ms` - Pipeline wall-clock duration
/// * `critical_path_ms` - Duration of the inferred critical path
/// * `agent_wait_ms` - Total agent wait across jobs
/// * `thresholds` - Insight thresholds
/// * `verbosity` - Logging verbosity
pub fn compute_parallelization_with(
    activities: &[TimedActivity],
    wall_clock_ms: i64,
    critical_path_ms: i64,
    agent_wait_ms: i64,
    thresholds: &InsightThresholds,
    verbosity: u8,
) -> ParallelizationAnalysis {
    let valid: Vec<&TimedActivity> = activities
        .iter()
        .filter(|a| a.finish_ms > a.start_ms)
        .collect();

    if valid.is_empty() || wall_clock_ms <= 0 {
        return ParallelizationAnalysis {
            insights: vec![Insight::new(
                InsightKind::Info,
                "Not enough timing data",
                "No activity has both a start and a finish time, so concurrency cannot be measured."
                    .to_string(),
            )],
            ..ParallelizationAnalysis::default()
        };
    }

    let total_duration_ms: i64 = valid.iter().map(|a| a.duration_ms).sum();
    let Sweep {
        covered_ms,
        max_concurrency,
    } = sweep(&valid, verbosity);

    let mut analysis = ParallelizationAnalysis {
        average_concurrency: total_duration_ms as f64 / wall_clock_ms as f64,
        max_concurrency,
        critical_path_ratio: ratio(critical_path_ms, wall_clock_ms),
        timeline_coverage_ratio: ratio(covered_ms, wall_clock_ms),
        covered_ms,
        idle_wall_clock_ms: (wall_clock_ms - covered_ms).max(0),
        insights: Vec::new(),
    };
    analysis.insights = build_insights(&analysis, wall_clock_ms, agent_wait_ms, thresholds);
    analysis
}

#[cfg(test)]
mod tests {
    use super::*;

    fn activity(id: &str, start_secs: i64, finish_secs: i64) -> TimedActivity {
        TimedActivity {
            id: id.to_string(),
            name: id.to_string(),
            start_ms: start_secs * 1_000,
            finish_ms: finish_secs * 1_000,
            duration_ms: (finish_secs - start_secs) * 1_000,
        }
    }

    fn titles(analysis: &ParallelizationAnalysis) -> Vec<&str> {
        analysis.insights.iter().map(|i| i.title.as_str()).collect()
    }

    #[test]
    fn test_degenerate_input() {
        let analysis = compute_parallelization(&[], 10_000, 0, 0);
        assert_eq!(analysis.max_concurrency, 0);
        assert_eq!(analysis.average_concurrency, 0.0);
        assert_eq!(analysis.insights.len(), 1);
        assert_eq!(analysis.insights[0].kind, InsightKind::Info);

        let zero_wall = compute_parallelization(&[activity("a", 0, 1)], 0, 0, 0);
        assert_eq!(zero_wall.insights.len(), 1);
        assert_eq!(zero_wall.covered_ms, 0);
    }

    #[test]
    fn test_back_to_back_is_not_concurrent() {
        let analysis = compute_parallelization(
            &[activity("a", 0, 4), activity("b", 4, 10)],
            10_000,
            10_000,
            0,
        );
        assert_eq!(analysis.max_concurrency, 1);
        assert!((analysis.average_concurrency - 1.0).abs() < 1e-9);
        assert_eq!(analysis.covered_ms, 10_000);
        assert_eq!(analysis.idle_wall_clock_ms, 0);
        assert!((analysis.timeline_coverage_ratio - 1.0).abs() < 1e-9);
        assert!((analysis.critical_path_ratio - 1.0).abs() < 1e-9);
        // Dominant path with concurrency 1.0
        assert_eq!(
            titles(&analysis),
            vec!["Low parallelism on a dominant critical path"]
        );
    }

    #[test]
    fn test_overlap_and_idle_gap() {
        let analysis = compute_parallelization(
            &[activity("a", 0, 4), activity("b", 2, 6), activity("c", 8, 10)],
            10_000,
            6_000,
            0,
        );
        assert_eq!(analysis.max_concurrency, 2);
        assert_eq!(analysis.covered_ms, 8_000);
        assert_eq!(analysis.idle_wall_clock_ms, 2_000);
        assert!((analysis.average_concurrency - 1.0).abs() < 1e-9);
        let warning = analysis
            .insights
            .iter()
            .find(|i| i.kind == InsightKind::Warning)
            .unwrap();
        assert!(warning.message.contains("2s"));
    }

    #[test]
    fn test_agent_wait_insight_comes_first() {
        let analysis = compute_parallelization(
            &[activity("a", 0, 10)],
            10_000,
            10_000,
            1_000,
        );
        let kinds: Vec<InsightKind> = analysis.insights.iter().map(|i| i.kind).collect();
        assert_eq!(kinds[0], InsightKind::Opportunity);
        assert_eq!(analysis.insights[0].title, "Agent wait time is significant");
    }

    #[test]
    fn test_well_parallelized() {
        let lanes: Vec<TimedActivity> = (0..8)
            .map(|i| activity(&format!("lane{i}"), 0, 10))
            .collect();
        let analysis = compute_parallelization(&lanes, 10_000, 5_000, 0);
        assert_eq!(analysis.max_concurrency, 8);
        assert!((analysis.average_concurrency - 8.0).abs() < 1e-9);
        assert_eq!(
            titles(&analysis),
            vec!["Pipeline is already well parallelized"]
        );
    }

    #[test]
    fn test_balanced_fallback() {
        let analysis = compute_parallelization(
            &[activity("a", 0, 10), activity("b", 0, 10)],
            10_000,
            7_000,
            0,
        );
        assert_eq!(titles(&analysis), vec!["Balanced pipeline"]);
    }

    #[test]
    fn test_ratios_capped() {
        let analysis = compute_parallelization(&[activity("a", 0, 10)], 5_000, 20_000, 0);
        assert!((analysis.critical_path_ratio - 1.0).abs() < 1e-9);
        assert!((analysis.timeline_coverage_ratio - 1.0).abs() < 1e-9);
        assert_eq!(analysis.idle_wall_clock_ms, 0);
    }
}
