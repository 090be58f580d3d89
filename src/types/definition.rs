use std::collections::BTreeMap;
use std::fmt;

use serde::de::value::{MapAccessDeserializer, SeqAccessDeserializer};
use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::Deserialize;

use super::action::{Action, ActionType};
use super::Value;

/// Uncompiled description of a node and its subtree.
///
/// Every field is optional: the compiler decides the node kind from the
/// `type` tag or from whichever kind-defining key (`seq`, `sel`, `par`,
/// `invert`, `success`, `failure`, `action`) is present, and reports a
/// [`CompileError`](crate::CompileError) when that is impossible.
///
/// Definitions deserialize from JSON and YAML using the camel-case keys of the
/// text format (`actionType`, `maxSuccess`, `waitForMe`, ...), or can be built
/// in code with [`seq`], [`sel`], [`par`], [`action`] and friends.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDef {
    /// Explicit node kind.
    #[serde(rename = "type")]
    pub node_type: Option<String>,
    /// Free-form label used in traces and error messages.
    pub title: Option<String>,
    /// Variables declared by this node, visible to its whole subtree.
    pub scope: Option<BTreeMap<String, Value>>,
    /// Calling convention for this leaf, or the default for descendants.
    pub action_type: Option<String>,
    /// Turns tracing on or off for this subtree.
    pub debug: Option<bool>,
    pub action: Option<ActionRef>,
    pub seq: Option<Children>,
    pub sel: Option<Children>,
    pub par: Option<Children>,
    pub invert: Option<Children>,
    pub success: Option<Children>,
    pub failure: Option<Children>,
    /// Kind-neutral alternative to the kind-specific child keys.
    pub nodes: Option<Children>,
    pub max_success: Option<Threshold>,
    pub max_fail: Option<Threshold>,
    pub wait_for_all: Option<bool>,
    pub wait_for_me: Option<bool>,
}

/// A child slot: either a full node or a bare action path.
#[derive(Debug, Clone)]
pub enum ChildDef {
    Ref(String),
    Node(Box<NodeDef>),
}

/// An ordered list of children. Deserializes from a list, or from a single
/// child for the decorator shorthand (`invert: door.is_open`).
#[derive(Debug, Clone, Default)]
pub struct Children(pub Vec<ChildDef>);

/// What a leaf runs.
#[derive(Debug, Clone, Deserialize)]
#[serde(from = "String")]
pub enum ActionRef {
    /// Dot-separated path into the tree's [`ActionRegistry`](crate::ActionRegistry).
    Path(String),
    /// A callable supplied directly, bypassing the registry.
    Inline(Action),
}

/// Completion threshold of a parallel node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Threshold {
    /// Never triggers (`false`).
    #[default]
    Never,
    /// Triggers once every child reported (`true`).
    All,
    /// Triggers once this many children reported.
    Count(usize),
}

impl From<String> for ActionRef {
    fn from(path: String) -> Self {
        ActionRef::Path(path)
    }
}

impl From<bool> for Threshold {
    fn from(flag: bool) -> Self {
        if flag { Threshold::All } else { Threshold::Never }
    }
}

impl From<usize> for Threshold {
    fn from(count: usize) -> Self {
        Threshold::Count(count)
    }
}

impl<'de> Deserialize<'de> for Threshold {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Flag(bool),
            Count(usize),
        }
        Ok(match Raw::deserialize(deserializer)? {
            Raw::Flag(flag) => flag.into(),
            Raw::Count(count) => count.into(),
        })
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Threshold::Never => write!(f, "false"),
            Threshold::All => write!(f, "true"),
            Threshold::Count(n) => write!(f, "{n}"),
        }
    }
}

impl<'de> Deserialize<'de> for ChildDef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ChildVisitor;

        impl<'de> Visitor<'de> for ChildVisitor {
            type Value = ChildDef;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an action path or a node")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<ChildDef, E> {
                Ok(ChildDef::Ref(v.to_owned()))
            }

            fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<ChildDef, A::Error> {
                NodeDef::deserialize(MapAccessDeserializer::new(map))
                    .map(|node| ChildDef::Node(Box::new(node)))
            }
        }

        deserializer.deserialize_any(ChildVisitor)
    }
}

impl<'de> Deserialize<'de> for Children {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ChildrenVisitor;

        impl<'de> Visitor<'de> for ChildrenVisitor {
            type Value = Children;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a list of children, an action path or a node")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Children, E> {
                Ok(Children(vec![ChildDef::Ref(v.to_owned())]))
            }

            fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<Children, A::Error> {
                NodeDef::deserialize(MapAccessDeserializer::new(map))
                    .map(|node| Children(vec![ChildDef::Node(Box::new(node))]))
            }

            fn visit_seq<A: SeqAccess<'de>>(self, seq: A) -> Result<Children, A::Error> {
                Vec::<ChildDef>::deserialize(SeqAccessDeserializer::new(seq)).map(Children)
            }
        }

        deserializer.deserialize_any(ChildrenVisitor)
    }
}

impl From<&str> for ChildDef {
    fn from(path: &str) -> Self {
        ChildDef::Ref(path.to_owned())
    }
}

impl From<String> for ChildDef {
    fn from(path: String) -> Self {
        ChildDef::Ref(path)
    }
}

impl From<NodeDef> for ChildDef {
    fn from(node: NodeDef) -> Self {
        ChildDef::Node(Box::new(node))
    }
}

impl<C: Into<ChildDef>> FromIterator<C> for Children {
    fn from_iter<I: IntoIterator<Item = C>>(iter: I) -> Self {
        Children(iter.into_iter().map(Into::into).collect())
    }
}

impl NodeDef {
    /// Set the explicit node kind (`"seq"`, `"action"`, ...).
    #[must_use]
    pub fn of_type(mut self, node_type: &str) -> Self {
        self.node_type = Some(node_type.to_owned());
        self
    }

    #[must_use]
    pub fn title(mut self, title: &str) -> Self {
        self.title = Some(title.to_owned());
        self
    }

    /// Declare a variable in this node's scope.
    #[must_use]
    pub fn var(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.scope
            .get_or_insert_with(BTreeMap::new)
            .insert(name.to_owned(), value.into());
        self
    }

    #[must_use]
    pub fn action_type(mut self, action_type: ActionType) -> Self {
        self.action_type = Some(action_type.as_str().to_owned());
        self
    }

    #[must_use]
    pub fn debug(mut self, enabled: bool) -> Self {
        self.debug = Some(enabled);
        self
    }

    /// Set the children through the kind-neutral `nodes` key.
    #[must_use]
    pub fn nodes<I>(mut self, children: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<ChildDef>,
    {
        self.nodes = Some(children.into_iter().collect());
        self
    }

    #[must_use]
    pub fn max_success(mut self, threshold: impl Into<Threshold>) -> Self {
        self.max_success = Some(threshold.into());
        self
    }

    #[must_use]
    pub fn max_fail(mut self, threshold: impl Into<Threshold>) -> Self {
        self.max_fail = Some(threshold.into());
        self
    }

    #[must_use]
    pub fn wait_for_all(mut self) -> Self {
        self.wait_for_all = Some(true);
        self
    }

    #[must_use]
    pub fn wait_for_me(mut self) -> Self {
        self.wait_for_me = Some(true);
        self
    }
}

/// A leaf running the registered action at `path`.
#[must_use]
pub fn action(path: &str) -> NodeDef {
    NodeDef {
        action: Some(ActionRef::Path(path.to_owned())),
        ..NodeDef::default()
    }
}

/// A leaf running `action` directly.
#[must_use]
pub fn action_fn(action: Action) -> NodeDef {
    NodeDef {
        action: Some(ActionRef::Inline(action)),
        ..NodeDef::default()
    }
}

fn many<I>(children: I) -> Option<Children>
where
    I: IntoIterator,
    I::Item: Into<ChildDef>,
{
    Some(children.into_iter().collect())
}

fn one(child: impl Into<ChildDef>) -> Option<Children> {
    Some(Children(vec![child.into()]))
}

/// A sequence: children run in order until one fails.
#[must_use]
pub fn seq<I>(children: I) -> NodeDef
where
    I: IntoIterator,
    I::Item: Into<ChildDef>,
{
    NodeDef {
        seq: many(children),
        ..NodeDef::default()
    }
}

/// A selector: children run in order until one succeeds.
#[must_use]
pub fn sel<I>(children: I) -> NodeDef
where
    I: IntoIterator,
    I::Item: Into<ChildDef>,
{
    NodeDef {
        sel: many(children),
        ..NodeDef::default()
    }
}

/// A parallel node: children run concurrently on the same input.
#[must_use]
pub fn par<I>(children: I) -> NodeDef
where
    I: IntoIterator,
    I::Item: Into<ChildDef>,
{
    NodeDef {
        par: many(children),
        ..NodeDef::default()
    }
}

/// Flips the child's outcome.
#[must_use]
pub fn invert(child: impl Into<ChildDef>) -> NodeDef {
    NodeDef {
        invert: one(child),
        ..NodeDef::default()
    }
}

/// Always succeeds with the child's payload.
#[must_use]
pub fn success(child: impl Into<ChildDef>) -> NodeDef {
    NodeDef {
        success: one(child),
        ..NodeDef::default()
    }
}

/// Always fails with the child's payload.
#[must_use]
pub fn failure(child: impl Into<ChildDef>) -> NodeDef {
    NodeDef {
        failure: one(child),
        ..NodeDef::default()
    }
}
