use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use super::action::{Action, ActionType};
use super::definition::Threshold;
use super::Scope;

/// The kinds of node a tree can contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Action,
    Sequence,
    Selector,
    Parallel,
    Invert,
    Success,
    Failure,
}

impl NodeType {
    /// In the order the compiler scans a definition's keys.
    pub const ALL: [NodeType; 7] = [
        NodeType::Sequence,
        NodeType::Selector,
        NodeType::Parallel,
        NodeType::Invert,
        NodeType::Success,
        NodeType::Failure,
        NodeType::Action,
    ];

    /// The tag used for this kind in definitions, which is also the key that
    /// holds its children (or its action).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            NodeType::Action => "action",
            NodeType::Sequence => "seq",
            NodeType::Selector => "sel",
            NodeType::Parallel => "par",
            NodeType::Invert => "invert",
            NodeType::Success => "success",
            NodeType::Failure => "failure",
        }
    }

    #[must_use]
    pub fn is_leaf(self) -> bool {
        matches!(self, NodeType::Action)
    }

    #[must_use]
    pub fn is_decorator(self) -> bool {
        matches!(self, NodeType::Invert | NodeType::Success | NodeType::Failure)
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| s.to_owned())
    }
}

/// A compiled node. Immutable once built; shared between concurrent runs.
#[derive(Debug)]
pub(crate) struct Node {
    pub(crate) title: Option<String>,
    pub(crate) debug: Option<bool>,
    pub(crate) wait_for_me: bool,
    /// For leaves, the calling convention; otherwise the default handed to
    /// descendants.
    pub(crate) action_type: ActionType,
    pub(crate) scope: Scope,
    pub(crate) kind: NodeKind,
}

#[derive(Debug)]
pub(crate) enum NodeKind {
    Action {
        path: Option<String>,
        action: Action,
    },
    Sequence(Vec<Arc<Node>>),
    Selector(Vec<Arc<Node>>),
    Parallel {
        children: Vec<Arc<Node>>,
        policy: ParallelPolicy,
    },
    Invert(Arc<Node>),
    Success(Arc<Node>),
    Failure(Arc<Node>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ParallelPolicy {
    pub(crate) max_success: Threshold,
    pub(crate) max_fail: Threshold,
    pub(crate) wait_for_all: bool,
}

impl ParallelPolicy {
    /// Whether `reported` completions satisfy `threshold` for `total` children.
    pub(crate) fn reached(threshold: Threshold, reported: usize, total: usize) -> bool {
        match threshold {
            Threshold::Never => false,
            Threshold::All => reported >= total,
            Threshold::Count(n) => reported >= n,
        }
    }
}

impl Node {
    pub(crate) fn node_type(&self) -> NodeType {
        match self.kind {
            NodeKind::Action { .. } => NodeType::Action,
            NodeKind::Sequence(_) => NodeType::Sequence,
            NodeKind::Selector(_) => NodeType::Selector,
            NodeKind::Parallel { .. } => NodeType::Parallel,
            NodeKind::Invert(_) => NodeType::Invert,
            NodeKind::Success(_) => NodeType::Success,
            NodeKind::Failure(_) => NodeType::Failure,
        }
    }

    pub(crate) fn children(&self) -> &[Arc<Node>] {
        match &self.kind {
            NodeKind::Action { .. } => &[],
            NodeKind::Sequence(children)
            | NodeKind::Selector(children)
            | NodeKind::Parallel { children, .. } => children,
            NodeKind::Invert(child) | NodeKind::Success(child) | NodeKind::Failure(child) => {
                std::slice::from_ref(child)
            }
        }
    }

    /// Number of nodes in this subtree, this one included.
    pub(crate) fn count(&self) -> usize {
        1 + self.children().iter().map(|c| c.count()).sum::<usize>()
    }
}
