//! Rule and override state with immutable updates.
//!
//! Every setter returns a new `RuleState` and leaves `self` untouched. Rule
//! priorities are re-derived from list position after each change.

use rustc_hash::FxHashSet;
use serde::Serialize;

use super::rules::{
    create_default_rules, reprioritize, unique_rule_id, ClassificationRule, Overrides,
    WorkCategory,
};

const RULE_ID_PREFIX: &str = "rule";

/// The user-controlled classification state: ordered rules plus overrides.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RuleState {
    pub rules: Vec<ClassificationRule>,
    pub overrides: Overrides,
}

impl Default for RuleState {
    /// Built-in rules, no overrides.
    fn default() -> Self {
        Self {
            rules: create_default_rules(),
            overrides: Overrides::new(),
        }
    }
}

impl RuleState {
    /// Build a state from an arbitrary rule list, fixing priorities.
    pub fn new(mut rules: Vec<ClassificationRule>, overrides: Overrides) -> Self {
        reprioritize(&mut rules);
        Self { rules, overrides }
    }

    pub fn rule(&self, id: &str) -> Option<&ClassificationRule> {
        self.rules.iter().find(|r| r.id == id)
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.rules.iter().position(|r| r.id == id)
    }

    fn with_rules(&self, rules: Vec<ClassificationRule>) -> Self {
        Self::new(rules, self.overrides.clone())
    }

    fn with_overrides(&self, overrides: Overrides) -> Self {
        Self {
            rules: self.rules.clone(),
            overrides,
        }
    }

    /// Append a rule. An empty or already used id is replaced by a generated one.
    pub fn add_rule(&self, mut rule: ClassificationRule) -> Self {
        let taken: FxHashSet<String> = self.rules.iter().map(|r| r.id.clone()).collect();
        if rule.id.is_empty() || taken.contains(&rule.id) {
            rule.id = unique_rule_id(RULE_ID_PREFIX, &taken);
        }
        let mut rules = self.rules.clone();
        rules.push(rule);
        self.with_rules(rules)
    }

    /// Replace the rule with the same id, keeping its position.
    /// Unknown ids leave the state unchanged.
    pub fn update_rule(&self, rule: ClassificationRule) -> Self {
        let mut rules = self.rules.clone();
        if let Some(slot) = rules.iter_mut().find(|r| r.id == rule.id) {
            *slot = rule;
        }
        self.with_rules(rules)
    }

    pub fn remove_rule(&self, id: &str) -> Self {
        let rules = self.rules.iter().filter(|r| r.id != id).cloned().collect();
        self.with_rules(rules)
    }

    /// Move a rule to `to_index` (clamped to the end of the list).
    pub fn move_rule(&self, id: &str, to_index: usize) -> Self {
        let mut rules = self.rules.clone();
        if let Some(from) = self.position(id) {
            let rule = rules.remove(from);
            let to = to_index.min(rules.len());
            rules.insert(to, rule);
        }
        self.with_rules(rules)
    }

    pub fn toggle_rule(&self, id: &str) -> Self {
        let mut rules = self.rules.clone();
        if let Some(rule) = rules.iter_mut().find(|r| r.id == id) {
            rule.enabled = !rule.enabled;
        }
        self.with_rules(rules)
    }

    pub fn set_override(&self, node_id: &str, category: WorkCategory) -> Self {
        let mut overrides = self.overrides.clone();
        overrides.insert(node_id.to_string(), category);
        self.with_overrides(overrides)
    }

    pub fn clear_override(&self, node_id: &str) -> Self {
        let mut overrides = self.overrides.clone();
        overrides.remove(node_id);
        self.with_overrides(overrides)
    }

    pub fn clear_overrides(&self) -> Self {
        self.with_overrides(Overrides::new())
    }

    /// Restore the built-in rules. Overrides are kept.
    pub fn reset_rules(&self) -> Self {
        self.with_rules(create_default_rules())
    }
}
