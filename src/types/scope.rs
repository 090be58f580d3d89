use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::{ReentrantMutex, RwLock};

use super::Value;

/// A frame of variable bindings linked to its parent frame.
///
/// Every compiled node owns one scope whose parent is the scope of the
/// enclosing node. Reads walk the chain from the innermost frame outwards;
/// writes land in the nearest frame that declares the variable, or in the
/// innermost frame when nobody does.
///
/// Paths are dot-separated: the first segment names a variable, the remaining
/// segments descend into map values (`"in.a"` reads key `a` of variable `in`).
///
/// Cloning a `Scope` is cheap and yields a handle to the same frame.
#[derive(Clone, Default)]
pub struct Scope {
    frame: Arc<Frame>,
}

#[derive(Default)]
struct Frame {
    vars: RwLock<BTreeMap<String, Value>>,
    // Serializes `modify` calls on this frame. `vars` is never held while
    // user code runs.
    updates: ReentrantMutex<()>,
    parent: Option<Scope>,
}

impl Scope {
    /// Create an empty root scope.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a root scope with the given bindings.
    #[must_use]
    pub fn with_vars<K, V>(vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Self::linked(None, collect_vars(vars))
    }

    /// Create a scope whose parent is `self`.
    #[must_use]
    pub fn child<K, V>(&self, vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Self::linked(Some(self.clone()), collect_vars(vars))
    }

    pub(crate) fn linked(parent: Option<Scope>, vars: BTreeMap<String, Value>) -> Self {
        Self {
            frame: Arc::new(Frame {
                vars: RwLock::new(vars),
                updates: ReentrantMutex::new(()),
                parent,
            }),
        }
    }

    /// The enclosing scope, if any.
    #[must_use]
    pub fn parent(&self) -> Option<&Scope> {
        self.frame.parent.as_ref()
    }

    /// Read a value by path. Returns `None` if no frame in the chain declares
    /// the variable or the nested path does not exist.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<Value> {
        let (name, rest) = split_path(path);
        let owner = self.owner_of(name)?;
        let vars = owner.frame.vars.read();
        let root = vars.get(name)?;
        match rest {
            None => Some(root.clone()),
            Some(rest) => root.get(rest).cloned(),
        }
    }

    /// Write a value by path.
    ///
    /// The variable named by the first segment is updated in the nearest frame
    /// declaring it; otherwise it is created in this frame. Intermediate maps
    /// are created as needed.
    pub fn set(&self, path: &str, value: impl Into<Value>) {
        let value = value.into();
        let (name, rest) = split_path(path);
        let owner = self.owner_of(name).unwrap_or(self);
        let mut vars = owner.frame.vars.write();
        match rest {
            None => {
                vars.insert(name.to_owned(), value);
            }
            Some(rest) => vars.entry(name.to_owned()).or_default().insert(rest, value),
        }
    }

    /// Apply `f` to the value at `path` and store the result. Returns `None`
    /// without calling `f` when the path does not exist.
    ///
    /// Concurrent `modify` calls on the same frame are serialized, so
    /// read-modify-write updates are not lost. `f` runs on a copy of the value
    /// without the frame's variable lock held and may use the scope freely;
    /// a plain [`set`](Self::set) to the same path from inside `f` is
    /// overwritten when `f` returns.
    pub fn modify<R>(&self, path: &str, f: impl FnOnce(&mut Value) -> R) -> Option<R> {
        let (name, rest) = split_path(path);
        let owner = self.owner_of(name)?;
        let _update = owner.frame.updates.lock();

        let mut value = {
            let vars = owner.frame.vars.read();
            let root = vars.get(name)?;
            match rest {
                None => root.clone(),
                Some(rest) => root.get(rest)?.clone(),
            }
        };
        let result = f(&mut value);

        let mut vars = owner.frame.vars.write();
        let root = vars.entry(name.to_owned()).or_default();
        match rest {
            None => *root = value,
            Some(rest) => root.insert(rest, value),
        }
        Some(result)
    }

    /// Whether this frame itself declares `name`.
    #[must_use]
    pub fn declares(&self, name: &str) -> bool {
        self.frame.vars.read().contains_key(name)
    }

    /// Whether any frame in the chain declares `name`.
    #[must_use]
    pub fn is_defined(&self, name: &str) -> bool {
        self.owner_of(name).is_some()
    }

    /// Names declared by this frame, in sorted order.
    #[must_use]
    pub fn local_names(&self) -> Vec<String> {
        self.frame.vars.read().keys().cloned().collect()
    }

    /// Number of frames in the chain, this one included.
    #[must_use]
    pub fn depth(&self) -> usize {
        std::iter::successors(Some(self), |s| s.parent()).count()
    }

    fn owner_of(&self, name: &str) -> Option<&Scope> {
        std::iter::successors(Some(self), |s| s.parent()).find(|s| s.declares(name))
    }
}

fn split_path(path: &str) -> (&str, Option<&str>) {
    match path.split_once('.') {
        Some((name, rest)) => (name, Some(rest)),
        None => (path, None),
    }
}

fn collect_vars<K, V>(vars: impl IntoIterator<Item = (K, V)>) -> BTreeMap<String, Value>
where
    K: Into<String>,
    V: Into<Value>,
{
    vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("vars", &*self.frame.vars.read())
            .field("parent", &self.frame.parent)
            .finish()
    }
}
