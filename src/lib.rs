//! Behavior trees compiled from declarative definitions and run
//! asynchronously.
//!
//! A tree is described by a [`NodeDef`], built in code or loaded from JSON or
//! YAML through a [`TreeSource`], and compiled against an [`ActionRegistry`]
//! into an immutable [`Tree`]. Running the tree threads a [`Value`] through
//! its nodes and yields an [`Outcome`].

mod compile;
mod error;
mod source;
mod trace;
mod traverse;
mod types;

pub use error::BoughError;
pub use source::{SourceError, TreeSource};
pub use trace::{BufferSink, TraceSink, TracingSink};
pub use types::{
    Action, ActionRef, ActionRegistry, ActionResult, ActionType, ChildDef, Children, CompileError,
    Done, NodeDef, NodeType, Outcome, RunError, Scope, Threshold, Tree, TreeOptions, Value, action,
    action_fn, failure, invert, par, sel, seq, success,
};
