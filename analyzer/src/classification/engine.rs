//! Rule evaluation and per-category aggregation.
//!
//! Evaluation order: manual override, then the first enabled rule that
//! matches, then `unclassified`. Classification depends only on the node, the
//! rule list and the override map.

use std::collections::BTreeMap;

use regex::{Regex, RegexBuilder};
use serde::Serialize;

use super::rules::{ClassificationRule, Overrides, RuleOperator, WorkCategory};
use crate::error::RuleWarning;
use crate::models::Node;

/// Where a classification came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassificationSource {
    Override,
    Rule,
    Default,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    pub category: WorkCategory,
    pub matched_rule_id: Option<String>,
    pub source: ClassificationSource,
}

impl ClassificationResult {
    fn unclassified() -> Self {
        Self {
            category: WorkCategory::Unclassified,
            matched_rule_id: None,
            source: ClassificationSource::Default,
        }
    }
}

/// A rule's value prepared for matching.
#[derive(Debug)]
enum Matcher {
    /// Lowercased needle for the case-insensitive text operators.
    Text(RuleOperator, String),
    Pattern(Regex),
    /// Disabled rules, empty values and malformed patterns.
    Never,
}

impl Matcher {
    fn compile(rule: &ClassificationRule) -> Result<Self, RuleWarning> {
        if !rule.enabled || rule.value.is_empty() {
            return Ok(Self::Never);
        }
        match rule.operator {
            RuleOperator::Regex => RegexBuilder::new(&rule.value)
                .case_insensitive(true)
                .build()
                .map(Self::Pattern)
                .map_err(|err| RuleWarning::InvalidRegex {
                    rule_id: rule.id.clone(),
                    reason: err.to_string(),
                }),
            op => Ok(Self::Text(op, rule.value.to_lowercase())),
        }
    }

    fn is_match(&self, haystack: &str) -> bool {
        match self {
            Self::Never => false,
            Self::Pattern(re) => re.is_match(haystack),
            Self::Text(op, needle) => {
                let haystack = haystack.to_lowercase();
                match op {
                    RuleOperator::Contains => haystack.contains(needle.as_str()),
                    RuleOperator::StartsWith => haystack.starts_with(needle.as_str()),
                    RuleOperator::Equals => haystack == *needle,
                    RuleOperator::Regex => false,
                }
            }
        }
    }
}

/// A rule list with every pattern compiled once, for classifying many nodes.
#[derive(Debug)]
pub struct CompiledRules<'a> {
    rules: &'a [ClassificationRule],
    matchers: Vec<Matcher>,
    warnings: Vec<RuleWarning>,
}

impl<'a> CompiledRules<'a> {
    pub fn new(rules: &'a [ClassificationRule]) -> Self {
        let mut warnings = Vec::new();
        let matchers = rules
            .iter()
            .map(|rule| {
                Matcher::compile(rule).unwrap_or_else(|warning| {
                    tracing::warn!("{}", warning);
                    warnings.push(warning);
                    Matcher::Never
                })
            })
            .collect();
        Self {
            rules,
            matchers,
            warnings,
        }
    }

    /// Problems found while compiling, one per malformed enabled regex rule.
    pub fn warnings(&self) -> &[RuleWarning] {
        &self.warnings
    }

    pub fn classify(&self, node: &Node, overrides: &Overrides) -> ClassificationResult {
        if let Some(&category) = overrides.get(&node.id) {
            return ClassificationResult {
                category,
                matched_rule_id: None,
                source: ClassificationSource::Override,
            };
        }
        self.rules
            .iter()
            .zip(&self.matchers)
            .find(|(rule, matcher)| matcher.is_match(rule.field.value_of(node)))
            .map(|(rule, _)| ClassificationResult {
                category: rule.category,
                matched_rule_id: Some(rule.id.clone()),
                source: ClassificationSource::Rule,
            })
            .unwrap_or_else(ClassificationResult::unclassified)
    }
}

/// Classify a single node.
///
/// Malformed regex rules never match. Use [`CompiledRules`] to classify many
/// nodes or to collect the warnings for such rules.
pub fn classify(
    node: &Node,
    rules: &[ClassificationRule],
    overrides: &Overrides,
) -> ClassificationResult {
    CompiledRules::new(rules).classify(node, overrides)
}

/// Classification of one node in a batch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeClassification {
    pub node_id: String,
    pub duration_ms: i64,
    #[serde(flatten)]
    pub result: ClassificationResult,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTotal {
    pub duration_ms: i64,
    pub count: usize,
}

/// Batch classification with per-category totals.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationSummary {
    pub results: Vec<NodeClassification>,
    /// Every category is present, including those with no nodes.
    pub by_category: BTreeMap<WorkCategory, CategoryTotal>,
    pub total_duration_ms: i64,
    pub useful_duration_ms: i64,
    pub non_useful_duration_ms: i64,
    pub warnings: Vec<RuleWarning>,
}

/// Classify a list of nodes and aggregate durations per category.
pub fn summarize_classification<'n>(
    nodes: impl IntoIterator<Item = &'n Node>,
    rules: &[ClassificationRule],
    overrides: &Overrides,
) -> ClassificationSummary {
    let compiled = CompiledRules::new(rules);
    let mut by_category: BTreeMap<WorkCategory, CategoryTotal> = WorkCategory::ALL
        .into_iter()
        .map(|c| (c, CategoryTotal::default()))
        .collect();
    let mut results = Vec::new();
    let mut total_duration_ms = 0;

    for node in nodes {
        let result = compiled.classify(node, overrides);
        let entry = by_category.entry(result.category).or_default();
        entry.duration_ms += node.duration_ms;
        entry.count += 1;
        total_duration_ms += node.duration_ms;
        results.push(NodeClassification {
            node_id: node.id.clone(),
            duration_ms: node.duration_ms,
            result,
        });
    }

    let useful_duration_ms = by_category
        .get(&WorkCategory::Useful)
        .map_or(0, |t| t.duration_ms);

    ClassificationSummary {
        results,
        by_category,
        total_duration_ms,
        useful_duration_ms,
        non_useful_duration_ms: total_duration_ms - useful_duration_ms,
        warnings: compiled.warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::rules::{create_default_rules, RuleField};
    use crate::test_support::node;

    fn named(id: &str, name: &str, duration_secs: i64) -> Node {
        let mut n = node(id, "Task", Some(0), Some(duration_secs * 1_000));
        n.name = name.to_string();
        n
    }

    fn rule(id: &str, operator: RuleOperator, value: &str, category: WorkCategory) -> ClassificationRule {
        ClassificationRule::new(id, id, RuleField::Name, operator, value, category)
    }

    #[test]
    fn test_rule_then_override() {
        let rules = vec![rule("tests", RuleOperator::Contains, "test", WorkCategory::Useful)];
        let step = named("t1", "Run Tests", 5);

        let result = classify(&step, &rules, &Overrides::new());
        assert_eq!(result.category, WorkCategory::Useful);
        assert_eq!(result.source, ClassificationSource::Rule);
        assert_eq!(result.matched_rule_id.as_deref(), Some("tests"));

        let overrides: Overrides = [("t1".to_string(), WorkCategory::Setup)].into_iter().collect();
        let result = classify(&step, &rules, &overrides);
        assert_eq!(result.category, WorkCategory::Setup);
        assert_eq!(result.source, ClassificationSource::Override);
        assert_eq!(result.matched_rule_id, None);
    }

    #[test]
    fn test_first_enabled_match_wins() {
        let mut first = rule("first", RuleOperator::StartsWith, "run", WorkCategory::Setup);
        let second = rule("second", RuleOperator::Contains, "tests", WorkCategory::Useful);
        let step = named("t1", "Run Tests", 5);

        let rules = vec![first.clone(), second.clone()];
        assert_eq!(classify(&step, &rules, &Overrides::new()).category, WorkCategory::Setup);

        first.enabled = false;
        let rules = vec![first, second];
        assert_eq!(classify(&step, &rules, &Overrides::new()).category, WorkCategory::Useful);
    }

    #[test]
    fn test_operators_are_case_insensitive() {
        let step = named("t1", "Initialize Job", 1);
        let overrides = Overrides::new();
        for operator in [RuleOperator::Equals, RuleOperator::StartsWith, RuleOperator::Contains] {
            let rules = vec![rule("r", operator, "initialize job", WorkCategory::Infrastructure)];
            assert_eq!(classify(&step, &rules, &overrides).category, WorkCategory::Infrastructure);
        }
        let rules = vec![rule("re", RuleOperator::Regex, "^INIT.*JOB$", WorkCategory::Setup)];
        assert_eq!(classify(&step, &rules, &overrides).category, WorkCategory::Setup);
    }

    #[test]
    fn test_empty_value_never_matches() {
        let rules = vec![rule("empty", RuleOperator::Contains, "", WorkCategory::Useful)];
        let result = classify(&named("t1", "anything", 1), &rules, &Overrides::new());
        assert_eq!(result.source, ClassificationSource::Default);
        assert_eq!(result.category, WorkCategory::Unclassified);
    }

    #[test]
    fn test_malformed_regex_is_skipped_with_warning() {
        let rules = vec![
            rule("broken", RuleOperator::Regex, "(unclosed", WorkCategory::Setup),
            rule("fallback", RuleOperator::Contains, "unclosed", WorkCategory::Teardown),
        ];
        let compiled = CompiledRules::new(&rules);
        assert_eq!(compiled.warnings().len(), 1);
        assert!(compiled.warnings()[0].to_string().contains("broken"));

        let step = named("t1", "(unclosed", 1);
        let result = compiled.classify(&step, &Overrides::new());
        assert_eq!(result.matched_rule_id.as_deref(), Some("fallback"));
        assert_eq!(classify(&step, &rules, &Overrides::new()), result);
    }

    #[test]
    fn test_disabled_malformed_regex_is_not_reported() {
        let mut broken = rule("broken", RuleOperator::Regex, "[", WorkCategory::Setup);
        broken.enabled = false;
        let rules = vec![broken];
        assert!(CompiledRules::new(&rules).warnings().is_empty());
    }

    #[test]
    fn test_default_rules_on_common_steps() {
        let rules = create_default_rules();
        let overrides = Overrides::new();
        let cases = [
            ("Initialize job", WorkCategory::Infrastructure),
            ("Checkout repo@main to s", WorkCategory::Setup),
            ("Use Node 18.x", WorkCategory::Setup),
            ("npm run build", WorkCategory::Useful),
            ("Run Tests", WorkCategory::Useful),
            ("Post-job: Checkout repo", WorkCategory::Teardown),
            ("Finalize Job", WorkCategory::Teardown),
            ("Send notification", WorkCategory::Unclassified),
        ];
        for (name, expected) in cases {
            let result = classify(&named("t", name, 1), &rules, &overrides);
            assert_eq!(result.category, expected, "step {name:?}");
        }
    }

    #[test]
    fn test_summarize_totals() {
        let rules = vec![
            rule("build", RuleOperator::Contains, "build", WorkCategory::Useful),
            rule("checkout", RuleOperator::StartsWith, "checkout", WorkCategory::Setup),
        ];
        let nodes = vec![
            named("a", "Checkout", 2),
            named("b", "Build", 6),
            named("c", "Notify", 1),
            named("d", "Build docs", 3),
        ];
        let overrides: Overrides = [("d".to_string(), WorkCategory::Teardown)].into_iter().collect();

        let summary = summarize_classification(&nodes, &rules, &overrides);
        assert_eq!(summary.results.len(), 4);
        assert_eq!(summary.total_duration_ms, 12_000);
        assert_eq!(summary.useful_duration_ms, 6_000);
        assert_eq!(summary.non_useful_duration_ms, 6_000);
        assert_eq!(summary.by_category.len(), WorkCategory::ALL.len());
        assert_eq!(
            summary.by_category[&WorkCategory::Setup],
            CategoryTotal { duration_ms: 2_000, count: 1 }
        );
        assert_eq!(summary.by_category[&WorkCategory::Teardown].count, 1);
        assert_eq!(summary.by_category[&WorkCategory::Unclassified].duration_ms, 1_000);
        assert_eq!(summary.by_category[&WorkCategory::Infrastructure].count, 0);
    }

    #[test]
    fn test_summary_serializes_category_keys() {
        let nodes = vec![named("a", "Build", 1)];
        let summary = summarize_classification(&nodes, &create_default_rules(), &Overrides::new());
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["byCategory"]["useful"]["count"], 1);
        assert_eq!(json["results"][0]["source"], "rule");
    }
}
