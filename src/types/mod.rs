mod action;
mod definition;
mod error;
mod node;
mod outcome;
mod registry;
mod scope;
mod tree;
mod value;

pub use action::{Action, ActionResult, ActionType, Done};
pub use definition::{
    ActionRef, ChildDef, Children, NodeDef, Threshold, action, action_fn, failure, invert, par,
    sel, seq, success,
};
pub use error::{CompileError, RunError};
pub use node::NodeType;
pub use outcome::Outcome;
pub use registry::ActionRegistry;
pub use scope::Scope;
pub use tree::{Tree, TreeOptions};
pub use value::Value;

pub(crate) use node::{Node, NodeKind, ParallelPolicy};
pub(crate) use registry::Unresolved;
