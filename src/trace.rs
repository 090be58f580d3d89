//! Hierarchical traces of node entry and exit.
//!
//! Tracing is scoped per subtree: a node whose definition sets `debug`
//! switches tracing on or off for itself and its descendants, and the previous
//! state comes back once the node finishes. The enabled flag and the indent
//! depth travel down the traversal as values, so concurrent runs of one tree
//! never interfere with each other's output.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::types::{Node, NodeKind, NodeType};
use crate::{Outcome, Value};

/// Destination for trace lines.
pub trait TraceSink: Send + Sync {
    fn write(&self, line: &str);
}

impl<F> TraceSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn write(&self, line: &str) {
        self(line);
    }
}

/// Emits trace lines as `tracing` events at `DEBUG` level under the
/// `bough::trace` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TraceSink for TracingSink {
    fn write(&self, line: &str) {
        tracing::debug!(target: "bough::trace", "{line}");
    }
}

/// Collects trace lines in memory.
#[derive(Debug, Clone, Default)]
pub struct BufferSink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl BufferSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A snapshot of the lines written so far.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    pub fn clear(&self) {
        self.lines.lock().clear();
    }
}

impl TraceSink for BufferSink {
    fn write(&self, line: &str) {
        self.lines.lock().push(line.to_owned());
    }
}

/// Trace state for one point of a traversal.
#[derive(Clone)]
pub(crate) struct Trace {
    sink: Arc<dyn TraceSink>,
    enabled: bool,
    depth: usize,
    indent: usize,
}

impl Trace {
    pub(crate) fn new(sink: Arc<dyn TraceSink>, enabled: bool, indent: usize) -> Self {
        Self {
            sink,
            enabled,
            depth: 0,
            indent,
        }
    }

    /// Record entry into `node` and return the state for its body.
    pub(crate) fn enter(&self, node: &Node) -> Trace {
        let enabled = node.debug.unwrap_or(self.enabled);
        if enabled {
            self.line(self.depth, &NodeLabel(node));
        }
        Trace {
            sink: Arc::clone(&self.sink),
            enabled,
            depth: if enabled { self.depth + 1 } else { self.depth },
            indent: self.indent,
        }
    }

    /// Record the input handed to a leaf. Called on the state returned by
    /// [`enter`](Self::enter).
    pub(crate) fn input(&self, input: &Value) {
        if self.enabled {
            self.line(self.depth, &format_args!("Input={input}"));
        }
    }

    /// Record the outcome of the node this state was entered for.
    pub(crate) fn exit(&self, outcome: &Outcome) {
        if self.enabled {
            self.line(self.depth.saturating_sub(1), &format_args!("=> {outcome}"));
        }
    }

    fn line(&self, depth: usize, text: &dyn fmt::Display) {
        let pad = depth * self.indent;
        self.sink.write(&format!("{:pad$}{text}", ""));
    }
}

struct NodeLabel<'a>(&'a Node);

impl fmt::Display for NodeLabel<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let node = self.0;
        write!(f, "NODE(type={}", node.node_type())?;
        if let Some(title) = &node.title {
            write!(f, ", title={title}")?;
        }
        if node.node_type() == NodeType::Action {
            write!(f, ", actionType={}", node.action_type)?;
            if let NodeKind::Action {
                path: Some(path), ..
            } = &node.kind
            {
                write!(f, ", action={path}")?;
            }
        }
        write!(f, ")")
    }
}
