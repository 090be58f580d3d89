use std::collections::BTreeMap;
use std::future::Future;

use super::action::{Action, ActionResult, Done};
use super::{Scope, Value};

/// Actions available to a tree, addressed by dot-separated path.
///
/// Paths are namespaced: registering `"door.open"` creates a `door`
/// namespace holding an `open` action. Leaves reference actions by the same
/// path and are resolved segment by segment when the tree is compiled.
///
/// # Example
///
/// ```
/// use bough::{ActionRegistry, Value};
///
/// let actions = ActionRegistry::new()
///     .plain("math.double", |_, v| Ok(Value::Int(v.as_i64().unwrap_or(0) * 2)))
///     .boolean("math.is_positive", |_, v| v.as_f64().is_some_and(|x| x > 0.0));
///
/// assert!(actions.get("math.double").is_some());
/// assert!(actions.get("math").is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ActionRegistry {
    entries: BTreeMap<String, Entry>,
}

#[derive(Debug, Clone)]
enum Entry {
    Action(Action),
    Namespace(BTreeMap<String, Entry>),
}

/// Why a path failed to resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Unresolved {
    /// Some segment does not exist (or descends into an action).
    Missing,
    /// The path ends at a namespace rather than an action.
    Namespace,
}

impl ActionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an action at `path`, replacing whatever was there.
    #[must_use]
    pub fn register(mut self, path: &str, action: Action) -> Self {
        self.insert(path, action);
        self
    }

    /// Register a `plain` action.
    #[must_use]
    pub fn plain<F>(self, path: &str, f: F) -> Self
    where
        F: Fn(&Scope, Value) -> ActionResult + Send + Sync + 'static,
    {
        self.register(path, Action::plain(f))
    }

    /// Register a `boolean` action.
    #[must_use]
    pub fn boolean<F, R>(self, path: &str, f: F) -> Self
    where
        F: Fn(&Scope, Value) -> R + Send + Sync + 'static,
        R: Into<Value>,
    {
        self.register(path, Action::boolean(f))
    }

    /// Register a `promise` action.
    #[must_use]
    pub fn promise<F, Fut>(self, path: &str, f: F) -> Self
    where
        F: Fn(Scope, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ActionResult> + Send + 'static,
    {
        self.register(path, Action::promise(f))
    }

    /// Register a `callback` action.
    #[must_use]
    pub fn callback<F>(self, path: &str, f: F) -> Self
    where
        F: Fn(Scope, Value, Done) + Send + Sync + 'static,
    {
        self.register(path, Action::callback(f))
    }

    /// Mount every action of `other` under the `prefix` namespace.
    #[must_use]
    pub fn namespace(mut self, prefix: &str, other: ActionRegistry) -> Self {
        for (path, action) in other.iter() {
            self.insert(&format!("{prefix}.{path}"), action.clone());
        }
        self
    }

    /// Insert an action (mutable reference version).
    pub fn insert(&mut self, path: &str, action: Action) {
        let segments: Vec<&str> = path.split('.').collect();
        Self::insert_recursive(&mut self.entries, &segments, action);
    }

    /// Look up the action at `path`.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&Action> {
        self.resolve(path).ok()
    }

    pub(crate) fn resolve(&self, path: &str) -> Result<&Action, Unresolved> {
        let segments: Vec<&str> = path.split('.').collect();
        Self::get_recursive(&self.entries, &segments)
    }

    /// Every registered action with its full path, in sorted order.
    #[must_use]
    pub fn iter(&self) -> Vec<(String, &Action)> {
        let mut out = Vec::new();
        Self::collect(&self.entries, "", &mut out);
        out
    }

    /// Number of registered actions.
    #[must_use]
    pub fn len(&self) -> usize {
        Self::count(&self.entries)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn count(map: &BTreeMap<String, Entry>) -> usize {
        map.values()
            .map(|entry| match entry {
                Entry::Action(_) => 1,
                Entry::Namespace(nested) => Self::count(nested),
            })
            .sum()
    }

    fn insert_recursive(map: &mut BTreeMap<String, Entry>, segments: &[&str], action: Action) {
        match segments {
            [] => {}
            [last] => {
                map.insert((*last).to_owned(), Entry::Action(action));
            }
            [first, rest @ ..] => {
                let entry = map
                    .entry((*first).to_owned())
                    .or_insert_with(|| Entry::Namespace(BTreeMap::new()));
                match entry {
                    Entry::Namespace(nested) => {
                        Self::insert_recursive(nested, rest, action);
                    }
                    Entry::Action(_) => {
                        let mut nested = BTreeMap::new();
                        Self::insert_recursive(&mut nested, rest, action);
                        *entry = Entry::Namespace(nested);
                    }
                }
            }
        }
    }

    fn get_recursive<'a>(
        map: &'a BTreeMap<String, Entry>,
        segments: &[&str],
    ) -> Result<&'a Action, Unresolved> {
        match segments {
            [] => Err(Unresolved::Missing),
            [last] => match map.get(*last).ok_or(Unresolved::Missing)? {
                Entry::Action(action) => Ok(action),
                Entry::Namespace(_) => Err(Unresolved::Namespace),
            },
            [first, rest @ ..] => match map.get(*first).ok_or(Unresolved::Missing)? {
                Entry::Namespace(nested) => Self::get_recursive(nested, rest),
                Entry::Action(_) => Err(Unresolved::Missing),
            },
        }
    }

    fn collect<'a>(map: &'a BTreeMap<String, Entry>, prefix: &str, out: &mut Vec<(String, &'a Action)>) {
        for (key, entry) in map {
            let path = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}.{key}")
            };
            match entry {
                Entry::Action(action) => out.push((path, action)),
                Entry::Namespace(nested) => Self::collect(nested, &path, out),
            }
        }
    }
}
