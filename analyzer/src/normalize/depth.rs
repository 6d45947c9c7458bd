//! Cycle-safe depth assignment.
//!
//! Iterative depth-first walk with an explicit stack. A child that is already
//! on the current path closes a cycle: it is reported and not descended into.
//! Nodes reachable by several paths keep the smallest depth. Whatever is left
//! unvisited after the declared roots is promoted to a root, so every node
//! ends up with a depth.

use crate::error::TimelineWarning;
use crate::interner::NodeIdx;
use crate::log_debug;

/// Result of depth assignment over the arena.
#[derive(Debug, Default)]
pub(crate) struct DepthAssignment {
    /// Depth per arena slot. Always `Some` after `assign_depths`.
    pub depths: Vec<Option<usize>>,
    /// Nodes promoted to roots by the fallback pass, in promotion order.
    pub promoted_roots: Vec<NodeIdx>,
    pub warnings: Vec<TimelineWarning>,
}

struct Frame {
    node: NodeIdx,
    depth: usize,
    next_child: usize,
}

struct Walker<'a> {
    children: &'a [Vec<NodeIdx>],
    ids: &'a dyn Fn(NodeIdx) -> String,
    on_stack: Vec<bool>,
    result: DepthAssignment,
    verbosity: u8,
}

impl Walker<'_> {
    /// Visit `node` at `depth` coming from `parent`; returns a frame to push
    /// if the node needs (re)descending.
    fn enter(&mut self, node: NodeIdx, depth: usize, parent: Option<NodeIdx>) -> Option<Frame> {
        let slot = node as usize;
        if self.on_stack[slot] {
            let from = parent.map_or_else(|| (self.ids)(node), |p| (self.ids)(p));
            self.result.warnings.push(TimelineWarning::Cycle {
                from,
                to: (self.ids)(node),
            });
            return None;
        }
        if matches!(self.result.depths[slot], Some(existing) if existing <= depth) {
            return None;
        }
        self.result.depths[slot] = Some(depth);
        self.on_stack[slot] = true;
        log_debug!(self.verbosity, "depth {} -> {}", (self.ids)(node), depth);
        Some(Frame {
            node,
            depth,
            next_child: 0,
        })
    }

    fn walk_from(&mut self, root: NodeIdx) {
        let mut stack: Vec<Frame> = Vec::new();
        if let Some(frame) = self.enter(root, 0, None) {
            stack.push(frame);
        }

        while let Some(top) = stack.last_mut() {
            let kids = &self.children[top.node as usize];
            if top.next_child < kids.len() {
                let child = kids[top.next_child];
                top.next_child += 1;
                let (parent, depth) = (top.node, top.depth + 1);
                if let Some(frame) = self.enter(child, depth, Some(parent)) {
                    stack.push(frame);
                }
            } else {
                self.on_stack[top.node as usize] = false;
                stack.pop();
            }
        }
    }
}

/// Assign a depth to every arena slot.
///
/// * `children` - child slots per slot, already in sibling order
/// * `roots` - declared roots, in order
/// * `fallback_order` - every slot in the order unvisited nodes are promoted
/// * `ids` - resolves a slot to its id for warning messages
pub(crate) fn assign_depths(
    children: &[Vec<NodeIdx>],
    roots: &[NodeIdx],
    fallback_order: &[NodeIdx],
    ids: &dyn Fn(NodeIdx) -> String,
    verbosity: u8,
) -> DepthAssignment {
    let mut walker = Walker {
        children,
        ids,
        on_stack: vec![false; children.len()],
        result: DepthAssignment {
            depths: vec![None; children.len()],
            ..DepthAssignment::default()
        },
        verbosity,
    };

    for &root in roots {
        walker.walk_from(root);
    }

    for &candidate in fallback_order {
        if walker.result.depths[candidate as usize].is_some() {
            continue;
        }
        walker
            .result
            .warnings
            .push(TimelineWarning::Disconnected { id: ids(candidate) });
        walker.result.promoted_roots.push(candidate);
        walker.walk_from(candidate);
    }

    walker.result
}
