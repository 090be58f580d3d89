use std::sync::Arc;

use crate::types::{
    ActionRef, ChildDef, Children, Node, NodeKind, NodeType, ParallelPolicy, Unresolved,
};
use crate::{ActionRegistry, ActionType, CompileError, NodeDef, Scope, Threshold};

/// Compile a definition into a node graph rooted at the returned node.
///
/// `globals`, when given, becomes the parent of the root's scope.
pub(crate) fn compile(
    def: &NodeDef,
    actions: &ActionRegistry,
    globals: Option<&Scope>,
) -> Result<Arc<Node>, CompileError> {
    let ctx = Compiler { actions };
    ctx.node(def, "root", globals, ActionType::Plain)
}

struct Compiler<'a> {
    actions: &'a ActionRegistry,
}

impl Compiler<'_> {
    fn node(
        &self,
        def: &NodeDef,
        path: &str,
        parent_scope: Option<&Scope>,
        inherited: ActionType,
    ) -> Result<Arc<Node>, CompileError> {
        let at = match &def.title {
            Some(title) => format!("{path} ({title})"),
            None => path.to_owned(),
        };

        let node_type = resolve_node_type(def, &at)?;
        let action_type = resolve_action_type(def, inherited, &at)?;
        let scope = link_scope(def, parent_scope, &at)?;

        let kind = match node_type {
            NodeType::Action => self.action(def, action_type, &at)?,
            NodeType::Sequence => {
                NodeKind::Sequence(self.children(def, node_type, path, &at, &scope, action_type)?)
            }
            NodeType::Selector => {
                NodeKind::Selector(self.children(def, node_type, path, &at, &scope, action_type)?)
            }
            NodeType::Parallel => NodeKind::Parallel {
                children: self.children(def, node_type, path, &at, &scope, action_type)?,
                policy: parallel_policy(def, &at)?,
            },
            NodeType::Invert | NodeType::Success | NodeType::Failure => {
                let mut children =
                    self.children(def, node_type, path, &at, &scope, action_type)?;
                if children.len() != 1 {
                    return Err(CompileError::DecoratorArity {
                        at,
                        node_type: node_type.to_string(),
                        count: children.len(),
                    });
                }
                let child = children.remove(0);
                match node_type {
                    NodeType::Invert => NodeKind::Invert(child),
                    NodeType::Success => NodeKind::Success(child),
                    _ => NodeKind::Failure(child),
                }
            }
        };

        Ok(Arc::new(Node {
            title: def.title.clone(),
            debug: def.debug,
            wait_for_me: def.wait_for_me.unwrap_or(false),
            action_type,
            scope,
            kind,
        }))
    }

    fn action(
        &self,
        def: &NodeDef,
        action_type: ActionType,
        at: &str,
    ) -> Result<NodeKind, CompileError> {
        let reference = def
            .action
            .as_ref()
            .ok_or_else(|| CompileError::MissingAction { at: at.to_owned() })?;

        let (path, action) = match reference {
            ActionRef::Path(path) => {
                let action = self.actions.resolve(path).map_err(|reason| match reason {
                    Unresolved::Missing => CompileError::UnresolvedAction {
                        at: at.to_owned(),
                        path: path.clone(),
                    },
                    Unresolved::Namespace => CompileError::NotCallable {
                        at: at.to_owned(),
                        path: path.clone(),
                    },
                })?;
                (Some(path.clone()), action.clone())
            }
            ActionRef::Inline(action) => (None, action.clone()),
        };

        if action.action_type() != action_type {
            return Err(CompileError::ActionTypeMismatch {
                at: at.to_owned(),
                path: path.unwrap_or_else(|| "<inline>".to_owned()),
                declared: action_type,
                registered: action.action_type(),
            });
        }

        Ok(NodeKind::Action { path, action })
    }

    fn children(
        &self,
        def: &NodeDef,
        node_type: NodeType,
        path: &str,
        at: &str,
        scope: &Scope,
        action_type: ActionType,
    ) -> Result<Vec<Arc<Node>>, CompileError> {
        child_defs(def, node_type, at)?
            .iter()
            .enumerate()
            .map(|(i, child)| {
                let child_path = format!("{path}/{i}");
                match child {
                    ChildDef::Node(node) => {
                        self.node(node, &child_path, Some(scope), action_type)
                    }
                    ChildDef::Ref(action_path) => {
                        let sugar = crate::action(action_path);
                        self.node(&sugar, &child_path, Some(scope), action_type)
                    }
                }
            })
            .collect()
    }
}

fn kind_key(def: &NodeDef, node_type: NodeType) -> bool {
    match node_type {
        NodeType::Action => def.action.is_some(),
        _ => kind_children(def, node_type).is_some(),
    }
}

fn kind_children(def: &NodeDef, node_type: NodeType) -> Option<&Children> {
    match node_type {
        NodeType::Action => None,
        NodeType::Sequence => def.seq.as_ref(),
        NodeType::Selector => def.sel.as_ref(),
        NodeType::Parallel => def.par.as_ref(),
        NodeType::Invert => def.invert.as_ref(),
        NodeType::Success => def.success.as_ref(),
        NodeType::Failure => def.failure.as_ref(),
    }
}

/// Exactly one kind must be determinable: an explicit `type` tag, or a single
/// kind-defining key. Keys contradicting the tag, or several keys without a
/// tag, are ambiguous.
fn resolve_node_type(def: &NodeDef, at: &str) -> Result<NodeType, CompileError> {
    let present: Vec<NodeType> = NodeType::ALL
        .into_iter()
        .filter(|t| kind_key(def, *t))
        .collect();

    let ambiguous = |types: Vec<NodeType>| CompileError::AmbiguousNodeType {
        at: at.to_owned(),
        candidates: types.iter().map(ToString::to_string).collect(),
    };

    match &def.node_type {
        Some(tag) => {
            let explicit: NodeType =
                tag.parse()
                    .map_err(|node_type| CompileError::UnknownNodeType {
                        at: at.to_owned(),
                        node_type,
                    })?;
            if present.iter().any(|t| *t != explicit) {
                let mut candidates = vec![explicit];
                candidates.extend(present.into_iter().filter(|t| *t != explicit));
                return Err(ambiguous(candidates));
            }
            Ok(explicit)
        }
        None => match present.as_slice() {
            [] => Err(CompileError::MissingNodeType { at: at.to_owned() }),
            [only] => Ok(*only),
            _ => Err(ambiguous(present)),
        },
    }
}

fn resolve_action_type(
    def: &NodeDef,
    inherited: ActionType,
    at: &str,
) -> Result<ActionType, CompileError> {
    match &def.action_type {
        Some(name) => name
            .parse()
            .map_err(|action_type| CompileError::InvalidActionType {
                at: at.to_owned(),
                action_type,
            }),
        None => Ok(inherited),
    }
}

fn link_scope(def: &NodeDef, parent: Option<&Scope>, at: &str) -> Result<Scope, CompileError> {
    let vars = def.scope.clone().unwrap_or_default();
    if let Some(parent) = parent {
        if let Some(name) = vars.keys().find(|name| parent.is_defined(name)) {
            return Err(CompileError::ShadowedVariable {
                at: at.to_owned(),
                name: name.clone(),
            });
        }
    }
    Ok(Scope::linked(parent.cloned(), vars))
}

fn child_defs<'a>(
    def: &'a NodeDef,
    node_type: NodeType,
    at: &str,
) -> Result<&'a [ChildDef], CompileError> {
    match (kind_children(def, node_type), &def.nodes) {
        (Some(_), Some(_)) => Err(CompileError::ConflictingChildren {
            at: at.to_owned(),
            key: node_type.to_string(),
        }),
        (Some(children), None) | (None, Some(children)) => Ok(&children.0),
        (None, None) => Err(CompileError::MissingChildren {
            at: at.to_owned(),
            node_type: node_type.to_string(),
        }),
    }
}

fn parallel_policy(def: &NodeDef, at: &str) -> Result<ParallelPolicy, CompileError> {
    let check = |threshold: Option<Threshold>, field: &str| match threshold {
        Some(Threshold::Count(0)) => Err(CompileError::InvalidThreshold {
            at: at.to_owned(),
            field: field.to_owned(),
        }),
        other => Ok(other.unwrap_or_default()),
    };
    Ok(ParallelPolicy {
        max_success: check(def.max_success, "maxSuccess")?,
        max_fail: check(def.max_fail, "maxFail")?,
        wait_for_all: def.wait_for_all.unwrap_or(false),
    })
}
