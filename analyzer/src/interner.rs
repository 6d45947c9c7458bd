//! Node-id interning for the graph arena.
//!
//! Maps record id strings to dense integer slots so the normalized nodes can
//! live in a flat `Vec` and be addressed by index.

use rustc_hash::FxHashMap;

/// Interned node slot (u32 for compact storage and fast hashing).
pub type NodeIdx = u32;

/// String interner that maps node id strings to arena slots.
#[derive(Debug, Clone, Default)]
pub struct NodeIdInterner {
    to_int: FxHashMap<String, NodeIdx>,
    from_int: Vec<String>,
}

impl NodeIdInterner {
    /// Create a new interner with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            to_int: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            from_int: Vec::with_capacity(capacity),
        }
    }

    /// Intern a new id. Returns `None` if the id was already interned, so the
    /// caller can report the duplicate while the first occurrence keeps its slot.
    pub fn insert_new(&mut self, s: &str) -> Option<NodeIdx> {
        if self.to_int.contains_key(s) {
            return None;
        }
        let idx = self.from_int.len() as NodeIdx;
        self.from_int.push(s.to_string());
        self.to_int.insert(s.to_string(), idx);
        Some(idx)
    }

    /// Get the slot for an id, if it exists.
    #[inline]
    pub fn get(&self, s: &str) -> Option<NodeIdx> {
        self.to_int.get(s).copied()
    }

    /// Get the id string for a slot.
    #[inline]
    pub fn resolve(&self, idx: NodeIdx) -> Option<&str> {
        self.from_int.get(idx as usize).map(|s| s.as_str())
    }
}
