use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::forest::{NodeId, ProcessForest};
use crate::record::{Pid, ProcessRecord};

/// Deepest nesting a [`ForestView`] accepts, roots being at depth 0.
///
/// Serializers walk nested views recursively, so deeper trees are refused
/// instead of exhausting the stack.
pub const MAX_VIEW_DEPTH: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("process tree is nested deeper than {MAX_VIEW_DEPTH} levels (at pid {pid})")]
pub struct ViewDepthError {
    /// First process found beyond the limit
    pub pid: Pid,
}

/// Nested, serializable rendition of a [`ProcessForest`] for display layers.
///
/// Only nodes reachable from a root are nested, so a view is always finite
/// even when the forest contains cycles.
#[derive(Debug, Serialize)]
pub struct ForestView<'a> {
    pub root_nodes: Vec<NodeView<'a>>,
    pub detected_cycles: bool,
    pub duplicate_pids: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unreachable_pids: Option<Vec<Pid>>,
}

#[derive(Debug, Serialize)]
pub struct NodeView<'a> {
    #[serde(flatten)]
    pub record: &'a ProcessRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    pub children: Vec<NodeView<'a>>,
}

impl<'a> ForestView<'a> {
    pub fn new(forest: &'a ProcessForest) -> Result<Self, ViewDepthError> {
        // Pre-order listing of the reachable nodes, parents before children
        let mut order: Vec<NodeId> = Vec::with_capacity(forest.len());
        let mut stack: Vec<(usize, NodeId)> =
            forest.root_ids().iter().rev().map(|id| (0, *id)).collect();
        while let Some((depth, id)) = stack.pop() {
            let node = forest.node(id);
            if depth >= MAX_VIEW_DEPTH {
                return Err(ViewDepthError { pid: node.pid() });
            }
            order.push(id);
            stack.extend(node.children().iter().rev().map(|child| (depth + 1, *child)));
        }

        // Children are assembled before their parent by going through it backwards
        let mut built: Vec<Option<NodeView<'a>>> = (0..forest.len()).map(|_| None).collect();
        for id in order.into_iter().rev() {
            let node = forest.node(id);
            let children = node
                .children()
                .iter()
                .filter_map(|child| built[child.index()].take())
                .collect();
            built[id.index()] = Some(NodeView {
                record: &node.record,
                created_at: node.created_at,
                children,
            });
        }

        Ok(Self {
            root_nodes: forest
                .root_ids()
                .iter()
                .filter_map(|id| built[id.index()].take())
                .collect(),
            detected_cycles: forest.detected_cycles(),
            duplicate_pids: forest.duplicate_pids(),
            unreachable_pids: None,
        })
    }

    /// Also list the pids that are missing from the nested trees
    pub fn with_unreachable_pids(mut self, pids: Vec<Pid>) -> Self {
        self.unreachable_pids = Some(pids);
        self
    }
}

impl ProcessForest {
    pub fn to_view(&self) -> Result<ForestView<'_>, ViewDepthError> {
        ForestView::new(self)
    }
}
