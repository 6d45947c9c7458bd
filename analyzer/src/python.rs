//! Python bindings: JSON text in, JSON text out.

// Allow clippy warning triggered by PyO3 macro expansion
#![allow(clippy::useless_conversion)]

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use serde::Serialize;

use crate::analysis::analyze_timeline_str;
use crate::classification::{parse_rule_set, serialize_rule_set, RuleState};
use crate::config::AnalysisConfig;

fn to_json<T: Serialize>(value: &T) -> PyResult<String> {
    serde_json::to_string(value).map_err(|e| PyValueError::new_err(e.to_string()))
}

/// Analyze a timeline document.
///
/// # Arguments
/// * `timeline_json` - Timeline JSON with a `records` array
/// * `verbosity` - Logging verbosity (0-3)
///
/// # Returns
/// * The full analysis (graph, metrics, critical path, parallelization) as JSON
///
/// # Raises
/// * ValueError if the document is malformed
#[pyfunction]
#[pyo3(name = "analyze_timeline", signature = (timeline_json, verbosity=0))]
fn py_analyze_timeline(timeline_json: &str, verbosity: u8) -> PyResult<String> {
    let config = AnalysisConfig::with_verbosity(verbosity);
    let analysis = analyze_timeline_str(timeline_json, &config)
        .map_err(|e| PyValueError::new_err(e.to_string()))?;
    to_json(&analysis)
}

/// Classify the steps of a timeline with a rule file.
///
/// # Raises
/// * ValueError if either document is malformed or the rule file version is unsupported
#[pyfunction]
#[pyo3(name = "classify_steps")]
fn py_classify_steps(timeline_json: &str, rule_set_json: &str) -> PyResult<String> {
    let analysis = analyze_timeline_str(timeline_json, &AnalysisConfig::default())
        .map_err(|e| PyValueError::new_err(e.to_string()))?;
    let state = parse_rule_set(rule_set_json).map_err(|e| PyValueError::new_err(e.to_string()))?;
    to_json(&analysis.classify_steps(&state))
}

/// The built-in rules as a rule file.
#[pyfunction]
#[pyo3(name = "default_rule_set")]
fn py_default_rule_set() -> PyResult<String> {
    serialize_rule_set(&RuleState::default()).map_err(|e| PyValueError::new_err(e.to_string()))
}

#[pymodule]
fn pipeline_analyzer(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(py_analyze_timeline, m)?)?;
    m.add_function(wrap_pyfunction!(py_classify_steps, m)?)?;
    m.add_function(wrap_pyfunction!(py_default_rule_set, m)?)?;
    Ok(())
}
