use std::collections::HashMap;

use chrono::{DateTime, Utc};
use log::{debug, trace};

use crate::record::{Pid, ProcessRecord};

/// Index of a node in a [`ProcessForest`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A process record placed in a forest
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessNode {
    pub record: ProcessRecord,
    /// Normalized creation time, for display only
    pub created_at: Option<DateTime<Utc>>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    shadowed: bool,
}

impl ProcessNode {
    fn new(record: ProcessRecord) -> Self {
        Self {
            created_at: record.details.created_at(),
            record,
            parent: None,
            children: Vec::new(),
            shadowed: false,
        }
    }

    pub fn pid(&self) -> Pid {
        self.record.pid
    }

    pub fn ppid(&self) -> Option<Pid> {
        self.record.ppid
    }

    /// The resolved parent, `None` for roots
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in input order
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Whether a later record with the same pid took this one's place in the
    /// pid lookup. Shadowed nodes are always childless roots.
    pub fn is_shadowed(&self) -> bool {
        self.shadowed
    }
}

/// Process trees rebuilt from one snapshot of process records.
///
/// Nodes live in an arena and reference each other by [`NodeId`]. Nodes that
/// belong to a parent reference cycle, or hang below one, are kept in the
/// arena but cannot be reached from any root.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessForest {
    nodes: Vec<ProcessNode>,
    lookup: HashMap<Pid, NodeId>,
    roots: Vec<NodeId>,
    detected_cycles: bool,
    duplicate_pids: usize,
}

/// Build the process forest of a snapshot.
///
/// A record whose `ppid` is absent or does not match any pid of the snapshot
/// becomes a root. When several records share a pid, the last one wins the
/// pid lookup: the earlier ones stay in the forest as childless roots that no
/// other record can attach to. Roots and children keep the input order of
/// their records.
pub fn build_forest<I>(records: I) -> ProcessForest
where
    I: IntoIterator<Item = ProcessRecord>,
{
    let mut nodes: Vec<ProcessNode> = records.into_iter().map(ProcessNode::new).collect();

    let mut lookup: HashMap<Pid, NodeId> = HashMap::with_capacity(nodes.len());
    for (index, node) in nodes.iter().enumerate() {
        lookup.insert(node.pid(), NodeId(index));
    }
    let duplicate_pids = nodes.len() - lookup.len();

    for index in 0..nodes.len() {
        if lookup.get(&nodes[index].pid()) != Some(&NodeId(index)) {
            trace!(
                "Record at position {index} shadowed by a later record for pid {}",
                nodes[index].pid()
            );
            nodes[index].shadowed = true;
            continue;
        }
        let Some(ppid) = nodes[index].ppid() else {
            continue;
        };
        let Some(&parent) = lookup.get(&ppid) else {
            trace!("Parent {ppid} of pid {} is not in the snapshot", nodes[index].pid());
            continue;
        };
        nodes[index].parent = Some(parent);
        nodes[parent.0].children.push(NodeId(index));
    }

    let roots: Vec<NodeId> = nodes
        .iter()
        .enumerate()
        .filter(|(_, node)| node.parent.is_none())
        .map(|(index, _)| NodeId(index))
        .collect();

    let parents: Vec<Option<NodeId>> = nodes.iter().map(|node| node.parent).collect();
    let detected_cycles = detect_cycles(&parents);

    debug!(
        "Built process forest: {} nodes, {} roots, cycles: {detected_cycles}",
        nodes.len(),
        roots.len()
    );

    ProcessForest {
        nodes,
        lookup,
        roots,
        detected_cycles,
        duplicate_pids,
    }
}

/// Whether following resolved parent links from any node ever loops.
///
/// `parents[i]` is the resolved parent of node `i`. Each walk climbs from a
/// node towards its root and stops at a node without a parent or at a node a
/// previous walk already proved acyclic, so every node is climbed over at
/// most once.
pub(crate) fn detect_cycles(parents: &[Option<NodeId>]) -> bool {
    let mut visited = vec![false; parents.len()];
    let mut on_walk = vec![false; parents.len()];
    let mut walk = Vec::new();

    for start in 0..parents.len() {
        if visited[start] {
            continue;
        }

        let mut current = start;
        loop {
            if on_walk[current] {
                trace!("Node {current} is its own ancestor");
                return true;
            }
            if visited[current] {
                break;
            }
            on_walk[current] = true;
            walk.push(current);

            match parents[current] {
                Some(NodeId(parent)) => current = parent,
                None => break,
            }
        }

        for index in walk.drain(..) {
            on_walk[index] = false;
            visited[index] = true;
        }
    }

    false
}

impl ProcessForest {
    /// Number of nodes, reachable or not
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn detected_cycles(&self) -> bool {
        self.detected_cycles
    }

    /// Number of records shadowed by a later record with the same pid
    pub fn duplicate_pids(&self) -> usize {
        self.duplicate_pids
    }

    pub fn root_ids(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn roots(&self) -> impl Iterator<Item = &ProcessNode> {
        self.roots.iter().map(|id| self.node(*id))
    }

    pub fn node(&self, id: NodeId) -> &ProcessNode {
        &self.nodes[id.0]
    }

    /// The node that won the lookup for `pid`
    pub fn get(&self, pid: Pid) -> Option<&ProcessNode> {
        self.lookup.get(&pid).map(|id| self.node(*id))
    }

    pub fn children<'a>(
        &'a self,
        node: &'a ProcessNode,
    ) -> impl Iterator<Item = &'a ProcessNode> {
        node.children.iter().map(|id| self.node(*id))
    }

    pub fn parent(&self, node: &ProcessNode) -> Option<&ProcessNode> {
        node.parent.map(|id| self.node(id))
    }

    /// Depth-first traversal from the roots, yielding `(depth, node)` pairs
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            forest: self,
            stack: self.roots.iter().rev().map(|id| (0, *id)).collect(),
        }
    }

    /// Pids of the nodes that cannot be reached from any root, in input order.
    ///
    /// This is empty unless cycles were detected.
    pub fn unreachable_pids(&self) -> Vec<Pid> {
        let mut reachable = vec![false; self.nodes.len()];
        let mut stack = self.roots.clone();
        while let Some(NodeId(index)) = stack.pop() {
            reachable[index] = true;
            stack.extend_from_slice(&self.nodes[index].children);
        }

        self.nodes
            .iter()
            .zip(reachable)
            .filter(|(_, reachable)| !reachable)
            .map(|(node, _)| node.pid())
            .collect()
    }
}

/// Iterator returned by [`ProcessForest::walk`]
pub struct Walk<'a> {
    forest: &'a ProcessForest,
    stack: Vec<(usize, NodeId)>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = (usize, &'a ProcessNode);

    fn next(&mut self) -> Option<Self::Item> {
        let (depth, id) = self.stack.pop()?;
        let node = self.forest.node(id);
        self.stack
            .extend(node.children.iter().rev().map(|child| (depth + 1, *child)));
        Some((depth, node))
    }
}
