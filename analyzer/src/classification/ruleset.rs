//! Rule-set files: `{ "version": 1, "rules": [...], "overrides": {...} }`.
//!
//! Import is strict about the document shape and lenient about individual
//! entries: a malformed rule is repaired field by field and an override with
//! an unknown category is dropped.

use rustc_hash::FxHashSet;
use serde::Serialize;
use serde_json::{Map, Value};

use super::rules::{
    unique_rule_id, ClassificationRule, Overrides, RuleField, RuleOperator, WorkCategory,
};
use super::store::RuleState;
use crate::error::RuleSetImportError;

/// The only rule file version this crate reads and the one it writes.
pub const RULE_SET_VERSION: u32 = 1;

const IMPORTED_RULE_ID_PREFIX: &str = "imported-rule";

#[derive(Serialize)]
struct RuleSetDocument<'a> {
    version: u32,
    rules: &'a [ClassificationRule],
    overrides: &'a Overrides,
}

/// Render the state as a rule file at the current version.
pub fn serialize_rule_set(state: &RuleState) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&RuleSetDocument {
        version: RULE_SET_VERSION,
        rules: &state.rules,
        overrides: &state.overrides,
    })
}

/// Parse a rule file from text.
pub fn parse_rule_set(input: &str) -> Result<RuleState, RuleSetImportError> {
    let value: Value =
        serde_json::from_str(input).map_err(|e| RuleSetImportError::InvalidJson(e.to_string()))?;
    parse_rule_set_value(&value)
}

/// Parse an already decoded rule file.
///
/// # Errors
/// Not an object, a `version` that is not the number 1 (including a missing one),
/// or a `rules` value that is not an array.
pub fn parse_rule_set_value(value: &Value) -> Result<RuleState, RuleSetImportError> {
    let doc = value.as_object().ok_or(RuleSetImportError::NotAnObject)?;
    check_version(doc.get("version"))?;

    let entries = doc
        .get("rules")
        .and_then(Value::as_array)
        .ok_or(RuleSetImportError::RulesNotArray)?;

    let mut taken: FxHashSet<String> = FxHashSet::default();
    let rules: Vec<ClassificationRule> = entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let rule = repair_rule(index, entry, &taken);
            taken.insert(rule.id.clone());
            rule
        })
        .collect();

    let overrides = doc
        .get("overrides")
        .and_then(Value::as_object)
        .map(parse_overrides)
        .unwrap_or_default();

    Ok(RuleState::new(rules, overrides))
}

fn check_version(version: Option<&Value>) -> Result<(), RuleSetImportError> {
    let found = match version {
        None => "missing".to_string(),
        Some(v) if v.as_f64() == Some(f64::from(RULE_SET_VERSION)) => return Ok(()),
        Some(v) => v.to_string(),
    };
    Err(RuleSetImportError::UnsupportedVersion {
        found,
        supported: RULE_SET_VERSION,
    })
}

fn string_field<'a>(entry: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    entry.get(key).and_then(Value::as_str)
}

/// Rebuild one rule, substituting a safe default for every missing or
/// invalid field. Non-object entries become an empty rule that never matches.
fn repair_rule(index: usize, entry: &Value, taken: &FxHashSet<String>) -> ClassificationRule {
    let empty = Map::new();
    let entry = entry.as_object().unwrap_or(&empty);

    let id = match string_field(entry, "id") {
        Some(id) if !id.is_empty() && !taken.contains(id) => id.to_string(),
        _ => unique_rule_id(IMPORTED_RULE_ID_PREFIX, taken),
    };
    let value = string_field(entry, "value").unwrap_or_default().to_string();
    let label = match string_field(entry, "label") {
        Some(label) if !label.is_empty() => label.to_string(),
        _ if !value.is_empty() => value.clone(),
        _ => format!("Rule {}", index + 1),
    };

    ClassificationRule {
        id,
        label,
        enabled: entry
            .get("enabled")
            .and_then(Value::as_bool)
            .unwrap_or(true),
        field: string_field(entry, "field")
            .and_then(RuleField::parse)
            .unwrap_or_default(),
        operator: string_field(entry, "operator")
            .and_then(RuleOperator::parse)
            .unwrap_or_default(),
        value,
        category: string_field(entry, "category")
            .and_then(WorkCategory::parse)
            .unwrap_or_default(),
        priority: index,
    }
}

fn parse_overrides(raw: &Map<String, Value>) -> Overrides {
    raw.iter()
        .filter_map(|(node_id, category)| {
            let category = category.as_str().and_then(WorkCategory::parse);
            if category.is_none() {
                tracing::warn!("Dropped override for \"{}\" with an unknown category", node_id);
            }
            category.map(|c| (node_id.clone(), c))
        })
        .collect()
}
