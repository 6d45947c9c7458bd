//! Classification rule types and the built-in rule set.

use std::collections::BTreeMap;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::models::Node;

/// Semantic category of a pipeline step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkCategory {
    Useful,
    Setup,
    Teardown,
    Infrastructure,
    #[default]
    Unclassified,
}

impl WorkCategory {
    pub const ALL: [WorkCategory; 5] = [
        Self::Useful,
        Self::Setup,
        Self::Teardown,
        Self::Infrastructure,
        Self::Unclassified,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Useful => "useful",
            Self::Setup => "setup",
            Self::Teardown => "teardown",
            Self::Infrastructure => "infrastructure",
            Self::Unclassified => "unclassified",
        }
    }

    /// Parse a category name. Unknown names yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == s)
    }
}

/// Manual per-node categories, keyed by node id. Ordered so exported files
/// are stable.
pub type Overrides = BTreeMap<String, WorkCategory>;

/// Node attribute a rule inspects.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RuleField {
    #[default]
    Name,
    Type,
    Identifier,
    RefName,
    TaskName,
}

impl RuleField {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "name" => Some(Self::Name),
            "type" => Some(Self::Type),
            "identifier" => Some(Self::Identifier),
            "refName" => Some(Self::RefName),
            "taskName" => Some(Self::TaskName),
            _ => None,
        }
    }

    /// The node's value for this field; absent optional fields read as "".
    pub fn value_of<'a>(&self, node: &'a Node) -> &'a str {
        match self {
            Self::Name => &node.name,
            Self::Type => &node.node_type,
            Self::Identifier => node.identifier.as_deref().unwrap_or_default(),
            Self::RefName => node.ref_name.as_deref().unwrap_or_default(),
            Self::TaskName => node.task_name.as_deref().unwrap_or_default(),
        }
    }
}

/// How a rule's value is compared to the field value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RuleOperator {
    #[default]
    Contains,
    StartsWith,
    Equals,
    Regex,
}

impl RuleOperator {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "contains" => Some(Self::Contains),
            "startsWith" => Some(Self::StartsWith),
            "equals" => Some(Self::Equals),
            "regex" => Some(Self::Regex),
            _ => None,
        }
    }
}

/// One first-match-wins classification rule.
///
/// `priority` always equals the rule's position in its list. It is written
/// out for readers of exported files but never trusted on the way in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationRule {
    pub id: String,
    pub label: String,
    pub enabled: bool,
    pub field: RuleField,
    pub operator: RuleOperator,
    pub value: String,
    pub category: WorkCategory,
    #[serde(default)]
    pub priority: usize,
}

impl ClassificationRule {
    /// An enabled rule. Priority is assigned when it is placed in a list.
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        field: RuleField,
        operator: RuleOperator,
        value: impl Into<String>,
        category: WorkCategory,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            enabled: true,
            field,
            operator,
            value: value.into(),
            category,
            priority: 0,
        }
    }
}

/// Re-derive contiguous priorities from list position.
pub(crate) fn reprioritize(rules: &mut [ClassificationRule]) {
    for (position, rule) in rules.iter_mut().enumerate() {
        rule.priority = position;
    }
}

/// First `<prefix>-<n>` (n from 1) that is not already taken.
pub(crate) fn unique_rule_id(prefix: &str, taken: &FxHashSet<String>) -> String {
    (1..)
        .map(|n| format!("{prefix}-{n}"))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| prefix.to_string())
}

type RuleRow = (
    &'static str,
    &'static str,
    RuleField,
    RuleOperator,
    &'static str,
    WorkCategory,
);

/// Built-in rule table: id, label, field, operator, value, category.
const DEFAULT_RULES: &[RuleRow] = {
    use RuleField::{Name, Type};
    use RuleOperator::{Contains, Equals, Regex, StartsWith};
    use WorkCategory::{Infrastructure, Setup, Teardown, Useful};
    &[
        (
            "default-initialize-job",
            "Initialize job",
            Name,
            Equals,
            "Initialize job",
            Infrastructure,
        ),
        ("default-finalize-job", "Finalize job", Name, Equals, "Finalize Job", Teardown),
        ("default-post-job", "Post-job steps", Name, StartsWith, "Post-job", Teardown),
        (
            "default-checkpoint",
            "Checkpoints and approvals",
            Type,
            StartsWith,
            "Checkpoint",
            Infrastructure,
        ),
        ("default-checkout", "Source checkout", Name, StartsWith, "Checkout", Setup),
        (
            "default-tool-installers",
            "Tool installers",
            Name,
            Regex,
            r"^(use|install|set ?up)\b",
            Setup,
        ),
        ("default-restore", "Package restore", Name, Contains, "restore", Setup),
        ("default-cache", "Pipeline caching", Name, Contains, "cache", Infrastructure),
        ("default-cleanup", "Cleanup", Name, Contains, "clean", Teardown),
        ("default-build", "Build", Name, Contains, "build", Useful),
        ("default-test", "Tests", Name, Contains, "test", Useful),
        ("default-publish", "Publish artifacts", Name, Contains, "publish", Useful),
        ("default-deploy", "Deploy", Name, Contains, "deploy", Useful),
    ]
};

/// Built-in rules for Azure DevOps pipelines.
///
/// Agent bookkeeping and tool setup come first so that a step such as
/// "Checkout build-tools" is not mistaken for a build.
pub fn create_default_rules() -> Vec<ClassificationRule> {
    let mut rules: Vec<ClassificationRule> = DEFAULT_RULES
        .iter()
        .map(|&(id, label, field, operator, value, category)| {
            ClassificationRule::new(id, label, field, operator, value, category)
        })
        .collect();
    reprioritize(&mut rules);
    rules
}
