//! Sibling ordering for timeline nodes.
//!
//! Keys, in order: explicit `order`, start time, finish time, name, id.
//! Missing times sort last. The `order` key only takes part when every member
//! of the group carries one; a group that mixes ordered and unordered nodes is
//! sorted by timing alone. Deciding per group rather than per pair keeps the
//! comparator transitive.

use std::cmp::Ordering;

use crate::models::Node;

/// Compare f64 values for sorting. `order` values are always finite.
fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

/// Missing timestamps behave as +infinity.
fn compare_time(a: Option<i64>, b: Option<i64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Sort keys for one group of nodes (a child list, the roots, or the whole
/// arena).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SiblingOrder {
    use_order: bool,
}

impl SiblingOrder {
    /// Keys for `group`: `order` is used only if every member has one.
    pub fn for_group<'a>(group: impl IntoIterator<Item = &'a Node>) -> Self {
        let mut members = group.into_iter().peekable();
        let non_empty = members.peek().is_some();
        Self {
            use_order: non_empty && members.all(|n| n.order.is_some()),
        }
    }

    /// Total, deterministic comparison within the group.
    pub fn compare(&self, a: &Node, b: &Node) -> Ordering {
        let by_order = match (self.use_order, a.order, b.order) {
            (true, Some(x), Some(y)) => cmp_f64(x, y),
            _ => Ordering::Equal,
        };
        by_order
            .then_with(|| compare_time(a.start_ms(), b.start_ms()))
            .then_with(|| compare_time(a.finish_ms(), b.finish_ms()))
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.id.cmp(&b.id))
    }
}

/// Sort `items` as one group. `node_of` maps an item to its node.
pub fn sort_group<'n, T>(items: &mut [T], node_of: impl Fn(&T) -> &'n Node) {
    let keys = SiblingOrder::for_group(items.iter().map(&node_of));
    items.sort_by(|a, b| keys.compare(node_of(a), node_of(b)));
}
