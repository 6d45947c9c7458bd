//! Step classification: ordered first-match-wins rules plus manual overrides.

mod engine;
mod rules;
mod ruleset;
mod store;

pub use engine::{
    classify, summarize_classification, CategoryTotal, ClassificationResult,
    ClassificationSource, ClassificationSummary, CompiledRules, NodeClassification,
};
pub use rules::{
    create_default_rules, ClassificationRule, Overrides, RuleField, RuleOperator, WorkCategory,
};
pub use ruleset::{parse_rule_set, parse_rule_set_value, serialize_rule_set, RULE_SET_VERSION};
pub use store::RuleState;
