//! Configuration types for the analysis pipeline.

use serde::{Deserialize, Serialize};

/// Thresholds that drive parallelization insight generation.
///
/// Ratios are fractions of wall-clock time; concurrency values are average
/// simultaneously running activities.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InsightThresholds {
    /// Agent wait / wall clock above which waiting is reported as significant
    pub agent_wait_ratio: f64,
    /// Critical-path ratio above which the path is considered dominant
    pub dominant_critical_path_ratio: f64,
    /// Average concurrency below which a dominant path is called low-parallelism
    pub low_concurrency: f64,
    /// Coverage ratio below which idle gaps are reported
    pub min_coverage_ratio: f64,
    /// Average concurrency above which the pipeline counts as well parallelized
    pub high_concurrency: f64,
    /// Critical-path ratio below which a highly concurrent pipeline is healthy
    pub short_critical_path_ratio: f64,
}

impl Default for InsightThresholds {
    fn default() -> Self {
        Self {
            agent_wait_ratio: 0.05,
            dominant_critical_path_ratio: 0.85,
            low_concurrency: 1.75,
            min_coverage_ratio: 0.92,
            high_concurrency: 5.0,
            short_critical_path_ratio: 0.55,
        }
    }
}

/// Configuration for a single analysis run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnalysisConfig {
    /// Verbosity level: 0=silent, 1=changes, 2=checks, 3=debug.
    pub verbosity: u8,
    /// Insight thresholds for the parallelism engine.
    pub insights: InsightThresholds,
}

impl AnalysisConfig {
    /// Config with the given verbosity and default thresholds.
    pub fn with_verbosity(verbosity: u8) -> Self {
        Self {
            verbosity,
            ..Self::default()
        }
    }
}
