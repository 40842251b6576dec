//! Node pool and open list used by the graph searches
//!

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use zonenav_common::PolyRef;

/// Node flags for search state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NodeFlags(u8);

impl NodeFlags {
    pub const OPEN: NodeFlags = NodeFlags(0x01);
    pub const CLOSED: NodeFlags = NodeFlags(0x02);

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn contains(&self, flag: NodeFlags) -> bool {
        self.0 & flag.0 != 0
    }

    pub fn insert(&mut self, flag: NodeFlags) {
        self.0 |= flag.0;
    }

    pub fn remove(&mut self, flag: NodeFlags) {
        self.0 &= !flag.0;
    }
}

/// Node index type
pub type NodeIndex = u16;

/// Largest node budget a pool can address
pub const MAX_POOL_NODES: usize = NodeIndex::MAX as usize;

/// Search node, one per visited polygon
#[derive(Debug, Clone)]
pub struct Node {
    /// Position the search entered the polygon at
    pub pos: [f32; 3],
    /// Cost from the start to this node
    pub cost: f32,
    /// Cost plus heuristic
    pub total: f32,
    pub parent: Option<NodeIndex>,
    pub flags: NodeFlags,
    pub id: PolyRef,
}

/// Fixed budget pool of search nodes
#[derive(Debug)]
pub struct NodePool {
    nodes: Vec<Node>,
    lookup: HashMap<PolyRef, NodeIndex>,
    max_nodes: usize,
}

impl NodePool {
    /// Creates a pool holding at most `max_nodes` nodes, capped at [`MAX_POOL_NODES`]
    pub fn new(max_nodes: usize) -> Self {
        let max_nodes = max_nodes.min(MAX_POOL_NODES);
        Self {
            nodes: Vec::with_capacity(max_nodes),
            lookup: HashMap::with_capacity(max_nodes),
            max_nodes,
        }
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.lookup.clear();
    }

    /// Returns the node for `id`, allocating it if needed
    ///
    /// Returns `None` when the budget is exhausted.
    pub fn get_node(&mut self, id: PolyRef) -> Option<NodeIndex> {
        if let Some(&idx) = self.lookup.get(&id) {
            return Some(idx);
        }
        if self.nodes.len() >= self.max_nodes {
            return None;
        }

        let idx = self.nodes.len() as NodeIndex;
        self.nodes.push(Node {
            pos: [0.0; 3],
            cost: 0.0,
            total: 0.0,
            parent: None,
            flags: NodeFlags::default(),
            id,
        });
        self.lookup.insert(id, idx);
        Some(idx)
    }

    pub fn find_node(&self, id: PolyRef) -> Option<NodeIndex> {
        self.lookup.get(&id).copied()
    }

    pub fn node(&self, idx: NodeIndex) -> &Node {
        &self.nodes[idx as usize]
    }

    pub fn node_mut(&mut self, idx: NodeIndex) -> &mut Node {
        &mut self.nodes[idx as usize]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn max_nodes(&self) -> usize {
        self.max_nodes
    }
}

#[derive(Debug, Clone, Copy)]
struct OpenEntry {
    total: f32,
    idx: NodeIndex,
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenEntry {}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenEntry {
    // Reversed so the max-heap pops the cheapest node first
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .total
            .total_cmp(&self.total)
            .then_with(|| other.idx.cmp(&self.idx))
    }
}

/// Open list ordered by node total cost
///
/// Lowering a node's cost pushes a fresh entry; outdated entries are dropped
/// when they surface.
#[derive(Debug, Default)]
pub struct NodeQueue {
    heap: BinaryHeap<OpenEntry>,
}

impl NodeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }

    /// Adds or re-prioritizes a node using its current total
    pub fn push(&mut self, pool: &NodePool, idx: NodeIndex) {
        self.heap.push(OpenEntry {
            total: pool.node(idx).total,
            idx,
        });
    }

    /// Pops the open node with the lowest total
    pub fn pop(&mut self, pool: &NodePool) -> Option<NodeIndex> {
        while let Some(entry) = self.heap.pop() {
            let node = pool.node(entry.idx);
            if node.flags.contains(NodeFlags::OPEN) && node.total == entry.total {
                return Some(entry.idx);
            }
        }
        None
    }
}
