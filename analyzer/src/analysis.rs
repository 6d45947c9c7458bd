//! End-to-end analysis and the stateful session a host application drives.

use serde::Serialize;
use serde_json::Value;

use crate::classification::{
    parse_rule_set, serialize_rule_set, summarize_classification, ClassificationSummary, RuleState,
};
use crate::config::AnalysisConfig;
use crate::critical_path::{compute_critical_path_with, CriticalPath};
use crate::error::{MalformedInputError, PersistenceError, RuleSetImportError};
use crate::log_changes;
use crate::metrics::{compute_metrics, timed_activities, PipelineMetrics, TimedActivity};
use crate::models::TimelineGraph;
use crate::normalize::normalize_with;
use crate::parallelism::{compute_parallelization_with, ParallelizationAnalysis};
use crate::persistence::{load_rule_state, save_rule_state, KeyValueStorage};

/// Everything derived from one timeline document.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineAnalysis {
    pub graph: TimelineGraph,
    pub metrics: PipelineMetrics,
    /// Activities the critical path and parallelism engines ran on.
    pub activities: Vec<TimedActivity>,
    pub critical_path: CriticalPath,
    pub parallelization: ParallelizationAnalysis,
}

/// Warnings capped for display.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayWarnings {
    pub shown: Vec<String>,
    /// Warnings left out of `shown`.
    pub hidden: usize,
}

impl TimelineAnalysis {
    /// The first `limit` warning messages and the count of the rest.
    pub fn warnings_for_display(&self, limit: usize) -> DisplayWarnings {
        let total = self.graph.warnings.len();
        DisplayWarnings {
            shown: self
                .graph
                .warnings
                .iter()
                .take(limit)
                .map(ToString::to_string)
                .collect(),
            hidden: total.saturating_sub(limit),
        }
    }

    /// Classify the step-like nodes in sorted order.
    pub fn classify_steps(&self, state: &RuleState) -> ClassificationSummary {
        let steps = self
            .graph
            .sorted_ids
            .iter()
            .filter_map(|id| self.graph.node(id))
            .filter(|n| n.is_step_like());
        summarize_classification(steps, &state.rules, &state.overrides)
    }
}

/// Run normalize, metrics, critical path and parallelism on a document.
pub fn analyze_timeline(
    raw: &Value,
    config: &AnalysisConfig,
) -> Result<TimelineAnalysis, MalformedInputError> {
    let graph = normalize_with(raw, config)?;
    let metrics = compute_metrics(&graph);
    let activities = timed_activities(&graph);
    let critical_path = compute_critical_path_with(&activities, config.verbosity);
    let parallelization = compute_parallelization_with(
        &activities,
        metrics.wall_clock_ms,
        critical_path.duration_ms,
        metrics.total_agent_wait_ms,
        &config.insights,
        config.verbosity,
    );

    log_changes!(
        config.verbosity,
        "Analyzed {} nodes: wall clock {}ms, critical path {}ms over {} activities, {} warnings",
        graph.len(),
        metrics.wall_clock_ms,
        critical_path.duration_ms,
        critical_path.node_ids.len(),
        graph.warnings.len()
    );

    Ok(TimelineAnalysis {
        graph,
        metrics,
        activities,
        critical_path,
        parallelization,
    })
}

/// Parse timeline JSON text and analyze it.
pub fn analyze_timeline_str(
    input: &str,
    config: &AnalysisConfig,
) -> Result<TimelineAnalysis, MalformedInputError> {
    let raw: Value = serde_json::from_str(input)
        .map_err(|e| MalformedInputError::InvalidJson(e.to_string()))?;
    analyze_timeline(&raw, config)
}

/// The current analysis plus the persisted rule state.
///
/// A new timeline replaces the analysis but never the rules. Every rule
/// change is written to storage right away; a failed write is kept as a
/// warning while the in-memory change stands.
#[derive(Debug)]
pub struct AnalysisSession<S: KeyValueStorage> {
    storage: S,
    config: AnalysisConfig,
    analysis: Option<TimelineAnalysis>,
    rules: RuleState,
    persistence_warning: Option<String>,
}

impl<S: KeyValueStorage> AnalysisSession<S> {
    /// Open a session, loading stored rules (or defaults).
    pub fn new(storage: S, config: AnalysisConfig) -> Self {
        let rules = load_rule_state(&storage);
        Self {
            storage,
            config,
            analysis: None,
            rules,
            persistence_warning: None,
        }
    }

    pub fn analysis(&self) -> Option<&TimelineAnalysis> {
        self.analysis.as_ref()
    }

    pub fn rule_state(&self) -> &RuleState {
        &self.rules
    }

    /// Message of the last failed write, cleared by the next successful one.
    pub fn persistence_warning(&self) -> Option<&str> {
        self.persistence_warning.as_deref()
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Analyze a new timeline. On error the previous analysis is kept.
    pub fn load_timeline(&mut self, input: &str) -> Result<&TimelineAnalysis, MalformedInputError> {
        let analysis = analyze_timeline_str(input, &self.config)?;
        Ok(self.analysis.insert(analysis))
    }

    /// Apply a rule-state transition and persist the result.
    pub fn update_rules<F>(&mut self, update: F)
    where
        F: FnOnce(&RuleState) -> RuleState,
    {
        self.rules = update(&self.rules);
        self.persist();
    }

    /// Replace rules and overrides from a rule file. On error nothing changes.
    pub fn import_rules(&mut self, input: &str) -> Result<(), RuleSetImportError> {
        let imported = parse_rule_set(input)?;
        self.update_rules(|_| imported);
        Ok(())
    }

    pub fn export_rules(&self) -> Result<String, serde_json::Error> {
        serialize_rule_set(&self.rules)
    }

    /// Classification of the current analysis' steps, if a timeline is loaded.
    pub fn classification(&self) -> Option<ClassificationSummary> {
        self.analysis
            .as_ref()
            .map(|analysis| analysis.classify_steps(&self.rules))
    }

    fn persist(&mut self) {
        self.persistence_warning = match save_rule_state(&mut self.storage, &self.rules) {
            Ok(()) => None,
            Err(err) => {
                tracing::warn!("{}", err);
                Some(persistence_message(&err))
            }
        };
    }
}

fn persistence_message(err: &PersistenceError) -> String {
    format!("Rule changes could not be saved and will be lost on restart: {err}")
}
