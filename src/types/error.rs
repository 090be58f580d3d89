use thiserror::Error;

use super::action::ActionType;

/// Reasons a tree definition fails to compile.
///
/// `at` locates the offending node as a slash-separated child index path from
/// the root (`root/1/0`), followed by the node's title when it has one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("node {at} has no type and no type-defining key")]
    MissingNodeType { at: String },

    #[error("node {at} is ambiguous: found {}", candidates.join(", "))]
    AmbiguousNodeType { at: String, candidates: Vec<String> },

    #[error("unknown node type '{node_type}' at {at}")]
    UnknownNodeType { at: String, node_type: String },

    #[error("invalid action type '{action_type}' at {at}")]
    InvalidActionType { at: String, action_type: String },

    #[error("action node {at} has no action")]
    MissingAction { at: String },

    #[error("unresolved action '{path}' at {at}")]
    UnresolvedAction { at: String, path: String },

    #[error("action path '{path}' at {at} names a namespace, not an action")]
    NotCallable { at: String, path: String },

    #[error("action '{path}' at {at} is declared {declared} but registered as {registered}")]
    ActionTypeMismatch {
        at: String,
        path: String,
        declared: ActionType,
        registered: ActionType,
    },

    #[error("{node_type} node {at} has no children")]
    MissingChildren { at: String, node_type: String },

    #[error("node {at} declares children under both '{key}' and 'nodes'")]
    ConflictingChildren { at: String, key: String },

    #[error("{node_type} decorator {at} needs exactly one child, found {count}")]
    DecoratorArity {
        at: String,
        node_type: String,
        count: usize,
    },

    #[error("{field} at {at} must be at least 1")]
    InvalidThreshold { at: String, field: String },

    #[error("variable '{name}' at {at} shadows a variable of an enclosing scope")]
    ShadowedVariable { at: String, name: String },
}

/// Returned by [`Tree::run()`](crate::Tree::run) when the tree cannot be run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunError {
    #[error("tree failed to compile: {reason}")]
    NotCompiled { reason: String },
}
