//! Invariants that hold for any timeline, including cyclic and partial ones.

use chrono::{DateTime, SecondsFormat};
use pipeline_analyzer::{
    analyze_timeline, classify, create_default_rules, parse_rule_set, serialize_rule_set,
    AnalysisConfig, Overrides, RuleState, TimelineWarning, WorkCategory,
};
use proptest::prelude::*;
use rustc_hash::FxHashSet;
use serde_json::{json, Value};

const TYPES: &[&str] = &["Stage", "Phase", "Job", "Task", "Checkpoint", "Checkpoint.Approval", "Other"];

/// (id, parent, type, start, signed duration, order), all small so ids and
/// parents collide often.
type RawRecord = (u8, Option<u8>, usize, Option<i64>, Option<i64>, Option<u8>);

fn arb_record() -> impl Strategy<Value = RawRecord> {
    (
        0u8..30,
        proptest::option::of(0u8..34),
        0..TYPES.len(),
        proptest::option::of(0i64..3_600),
        proptest::option::of(-60i64..600),
        proptest::option::of(0u8..5),
    )
}

fn iso(secs: i64) -> Value {
    match DateTime::from_timestamp(1_700_000_000 + secs, 0) {
        Some(t) => json!(t.to_rfc3339_opts(SecondsFormat::Millis, true)),
        None => Value::Null,
    }
}

fn to_timeline(records: &[RawRecord]) -> Value {
    let records: Vec<Value> = records
        .iter()
        .map(|&(id, parent, type_idx, start, duration, order)| {
            let finish = duration.map(|d| start.unwrap_or(0) + d);
            json!({
                "id": format!("n{id}"),
                "parentId": parent.map(|p| format!("n{p}")),
                "type": TYPES[type_idx],
                "name": format!("step {id}"),
                "order": order,
                "startTime": start.map(iso),
                "finishTime": finish.map(iso),
            })
        })
        .collect();
    json!({ "records": records })
}

/// Parent choice per record: `Some(k)` points at an earlier record (k is
/// reduced modulo the position), `None` makes a root. Position 0 and the
/// 99 sentinel point at an id that does not exist.
fn arb_forest() -> impl Strategy<Value = Vec<Option<u8>>> {
    proptest::collection::vec(proptest::option::of(prop_oneof![0u8..40, Just(99u8)]), 0..40)
}

fn forest_timeline(parents: &[Option<u8>]) -> Value {
    let records: Vec<Value> = parents
        .iter()
        .enumerate()
        .map(|(i, parent)| {
            let parent_id = parent.map(|k| match k {
                99 => "ghost".to_string(),
                _ if i == 0 => "ghost".to_string(),
                _ => format!("n{}", usize::from(k) % i),
            });
            json!({"id": format!("n{i}"), "parentId": parent_id, "type": "Task", "name": format!("step {i}")})
        })
        .collect();
    json!({ "records": records })
}

fn arb_category() -> impl Strategy<Value = WorkCategory> {
    proptest::sample::select(WorkCategory::ALL.to_vec())
}

proptest! {
    #[test]
    fn prop_graph_invariants(records in proptest::collection::vec(arb_record(), 0..40)) {
        let analysis = analyze_timeline(&to_timeline(&records), &AnalysisConfig::default()).unwrap();
        let graph = &analysis.graph;

        let unique: FxHashSet<u8> = records.iter().map(|r| r.0).collect();
        prop_assert_eq!(graph.len(), unique.len());
        prop_assert_eq!(graph.sorted_ids.len(), graph.len());

        for node in graph.nodes() {
            prop_assert!(node.duration_ms >= 0);
            if node.start_time.is_none() || node.finish_time.is_none() {
                prop_assert_eq!(node.duration_ms, 0);
            }
            prop_assert!(node.depth < graph.len().max(1));
            for child in &node.child_ids {
                prop_assert!(graph.node(child).is_some());
            }
        }

        let mut pairs = FxHashSet::default();
        for edge in &graph.edges {
            prop_assert_ne!(&edge.from, &edge.to);
            prop_assert!(pairs.insert((edge.from.clone(), edge.to.clone())));
        }
    }

    #[test]
    fn prop_child_counts_rebuild_node_count(parents in arb_forest()) {
        let analysis = analyze_timeline(&forest_timeline(&parents), &AnalysisConfig::default()).unwrap();
        let graph = &analysis.graph;

        let children: usize = graph.nodes().iter().map(|n| n.child_ids.len()).sum();
        prop_assert_eq!(graph.len(), parents.len());
        prop_assert_eq!(children + graph.root_ids.len(), graph.len());
        prop_assert!(graph
            .warnings
            .iter()
            .all(|w| !matches!(w, TimelineWarning::Cycle { .. })),
            "assertion failed: graph has no Cycle warnings");
    }

    #[test]
    fn prop_critical_path_bounded(records in proptest::collection::vec(arb_record(), 0..40)) {
        let analysis = analyze_timeline(&to_timeline(&records), &AnalysisConfig::default()).unwrap();
        let total: i64 = analysis.activities.iter().map(|a| a.duration_ms).sum();

        prop_assert!(analysis.critical_path.duration_ms <= analysis.metrics.wall_clock_ms);
        prop_assert!(analysis.critical_path.duration_ms <= total);
        prop_assert!(analysis.parallelization.covered_ms <= analysis.metrics.wall_clock_ms);
        prop_assert!(analysis.parallelization.critical_path_ratio <= 1.0);
        prop_assert!(analysis.parallelization.timeline_coverage_ratio <= 1.0);
        prop_assert!(!analysis.parallelization.insights.is_empty());
    }

    #[test]
    fn prop_classify_is_pure(
        records in proptest::collection::vec(arb_record(), 1..20),
        override_ids in proptest::collection::vec((0u8..30, arb_category()), 0..5),
    ) {
        let analysis = analyze_timeline(&to_timeline(&records), &AnalysisConfig::default()).unwrap();
        let rules = create_default_rules();
        let overrides: Overrides = override_ids
            .into_iter()
            .map(|(id, category)| (format!("n{id}"), category))
            .collect();

        for node in analysis.graph.nodes() {
            let first = classify(node, &rules, &overrides);
            let second = classify(node, &rules, &overrides);
            prop_assert_eq!(first, second);
        }
    }

    #[test]
    fn prop_rule_set_round_trip(
        overrides in proptest::collection::btree_map("[a-z0-9-]{1,12}", arb_category(), 0..8),
        removed in proptest::option::of(0usize..13),
    ) {
        let mut state = RuleState::new(create_default_rules(), overrides);
        if let Some(position) = removed {
            if let Some(id) = state.rules.get(position).map(|r| r.id.clone()) {
                state = state.remove_rule(&id);
            }
        }

        let text = serialize_rule_set(&state).unwrap();
        let parsed = parse_rule_set(&text).unwrap();
        prop_assert_eq!(parsed, state);
    }
}
