//! Timeline analytics for CI/CD pipeline runs.
//!
//! Turns an Azure DevOps-style timeline document (a flat `records` array of
//! stages, phases, jobs and steps) into a normalized graph, then derives
//! wall-clock and agent-wait metrics, an inferred critical path, concurrency
//! statistics and a rule-based classification of steps.
//!
//! ```no_run
//! use pipeline_analyzer::{analyze_timeline_str, AnalysisConfig, RuleState};
//!
//! let text = std::fs::read_to_string("timeline.json").unwrap();
//! let analysis = analyze_timeline_str(&text, &AnalysisConfig::default()).unwrap();
//! println!("critical path: {}ms", analysis.critical_path.duration_ms);
//! let summary = analysis.classify_steps(&RuleState::default());
//! println!("useful: {}ms", summary.useful_duration_ms);
//! ```

pub mod analysis;
pub mod classification;
mod config;
pub mod critical_path;
pub mod dependencies;
mod error;
mod format;
mod interner;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod normalize;
pub mod parallelism;
pub mod persistence;

#[cfg(feature = "python")]
mod python;

#[cfg(test)]
pub(crate) mod test_support;

pub use analysis::{
    analyze_timeline, analyze_timeline_str, AnalysisSession, DisplayWarnings, TimelineAnalysis,
};
pub use classification::{
    classify, create_default_rules, parse_rule_set, serialize_rule_set, summarize_classification,
    ClassificationResult, ClassificationRule, ClassificationSource, ClassificationSummary,
    Overrides, RuleField, RuleOperator, RuleState, WorkCategory,
};
pub use config::{AnalysisConfig, InsightThresholds};
pub use critical_path::{compute_critical_path, CriticalPath};
pub use dependencies::infer_dependencies;
pub use error::{
    MalformedInputError, PersistenceError, RuleSetImportError, RuleWarning, TimelineWarning,
};
pub use format::format_duration;
pub use metrics::{compute_metrics, timed_activities, PipelineMetrics, TimedActivity};
pub use models::{DependencyEdge, EdgeReason, Node, TimelineGraph, TimelineRecord};
pub use normalize::{normalize, normalize_str, normalize_with};
pub use parallelism::{compute_parallelization, Insight, InsightKind, ParallelizationAnalysis};
pub use persistence::{FileStorage, KeyValueStorage, MemoryStorage, STORAGE_KEY};
