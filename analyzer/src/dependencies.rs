//! Dependency inference over the normalized tree.
//!
//! Two kinds of edges are inferred:
//! - `parent-child`: every child depends on its parent
//! - `sibling-order`: each sibling depends on the one ordered before it, when
//!   the evidence says they ran in sequence
//!
//! Timing evidence wins over structure: siblings that overlap in time are never
//! chained, whatever their `order` says. With no timing and no usable `order`
//! the siblings are assumed sequential.

use rustc_hash::FxHashSet;

use crate::models::{Adjacency, DependencyEdge, EdgeReason, Node, TimelineGraph};

/// Decide whether `later` runs after `earlier` among consecutive siblings.
pub fn is_sequential(earlier: &Node, later: &Node) -> bool {
    if let (Some(finish), Some(start)) = (earlier.finish_time, later.start_time) {
        return finish <= start;
    }
    match (earlier.order, later.order) {
        (Some(a), Some(b)) => a < b,
        // Permissive default: nothing contradicts a sequence
        _ => true,
    }
}

struct EdgeSet<'a> {
    seen: FxHashSet<(&'a str, &'a str)>,
    edges: Vec<DependencyEdge>,
}

impl<'a> EdgeSet<'a> {
    fn add(&mut self, from: &'a str, to: &'a str, reason: EdgeReason) {
        if from == to || !self.seen.insert((from, to)) {
            return;
        }
        self.edges.push(DependencyEdge {
            from: from.to_string(),
            to: to.to_string(),
            reason,
        });
    }

    fn chain_siblings(&mut self, siblings: impl IntoIterator<Item = &'a Node>) {
        let siblings: Vec<&Node> = siblings.into_iter().collect();
        for pair in siblings.windows(2) {
            if is_sequential(pair[0], pair[1]) {
                self.add(&pair[0].id, &pair[1].id, EdgeReason::SiblingOrder);
            }
        }
    }
}

/// Infer the dependency edge set of a linked and ordered graph.
///
/// Declared roots (no parent) are treated as one sibling group: top-level
/// stages run in order. Roots promoted out of a parent cycle keep their
/// `parent_id` and are left out of that chain.
/// Edges are deduplicated by `(from, to)` and never self-loop.
pub fn infer_dependencies(graph: &TimelineGraph) -> Vec<DependencyEdge> {
    let mut set = EdgeSet {
        seen: FxHashSet::default(),
        edges: Vec::new(),
    };

    set.chain_siblings(
        graph
            .nodes_for(&graph.root_ids)
            .filter(|root| root.parent_id.is_none()),
    );
    for node in graph.nodes() {
        for child in &node.child_ids {
            set.add(&node.id, child, EdgeReason::ParentChild);
        }
        set.chain_siblings(graph.nodes_for(&node.child_ids));
    }

    set.edges
}

/// Build incoming / outgoing adjacency maps. Every node gets an entry.
pub fn build_adjacency(nodes: &[Node], edges: &[DependencyEdge]) -> (Adjacency, Adjacency) {
    let mut incoming: Adjacency = nodes.iter().map(|n| (n.id.clone(), Vec::new())).collect();
    let mut outgoing: Adjacency = incoming.clone();

    for edge in edges {
        if let Some(targets) = outgoing.get_mut(&edge.from) {
            targets.push(edge.to.clone());
        }
        if let Some(sources) = incoming.get_mut(&edge.to) {
            sources.push(edge.from.clone());
        }
    }

    (incoming, outgoing)
}
