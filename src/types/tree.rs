use std::fmt;
use std::sync::Arc;

use super::error::RunError;
use super::node::Node;
use super::registry::ActionRegistry;
use super::{Outcome, Scope, Value};
use crate::source::TreeSource;
use crate::trace::{TraceSink, TracingSink};
use crate::BoughError;

/// Settings applied when a tree is compiled and run.
#[derive(Clone)]
pub struct TreeOptions {
    pub(crate) debug: bool,
    pub(crate) indent: usize,
    pub(crate) sink: Arc<dyn TraceSink>,
    pub(crate) globals: Option<Scope>,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            debug: false,
            indent: 4,
            sink: Arc::new(TracingSink),
            globals: None,
        }
    }
}

impl TreeOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether tracing starts enabled at the root. Nodes can still switch it
    /// per subtree.
    #[must_use]
    pub fn debug(mut self, enabled: bool) -> Self {
        self.debug = enabled;
        self
    }

    /// Indent added per nesting level in trace output.
    #[must_use]
    pub fn indent(mut self, width: usize) -> Self {
        self.indent = width;
        self
    }

    /// Where trace lines go. Defaults to [`TracingSink`].
    #[must_use]
    pub fn sink(mut self, sink: impl TraceSink + 'static) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    /// A caller-owned scope installed as the parent of the root's scope.
    ///
    /// Its variables are visible to every action, and values written to them
    /// can be read back by the caller after a run.
    #[must_use]
    pub fn globals(mut self, scope: Scope) -> Self {
        self.globals = Some(scope);
        self
    }
}

impl fmt::Debug for TreeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeOptions")
            .field("debug", &self.debug)
            .field("indent", &self.indent)
            .field("globals", &self.globals)
            .finish_non_exhaustive()
    }
}

/// A compiled behavior tree.
///
/// The definition is compiled once, when the tree is created. A tree that
/// failed to compile keeps the error and refuses to run. A compiled tree is
/// immutable and can be run any number of times, concurrently if desired;
/// only the scopes its actions write to change between runs.
///
/// # Example
///
/// ```
/// use bough::{ActionRegistry, Outcome, Tree, TreeOptions, Value, seq};
///
/// # tokio_test_block_on(async {
/// let actions = ActionRegistry::new()
///     .plain("inc", |_, v| Ok(Value::Int(v.as_i64().unwrap_or(0) + 1)));
/// let tree = Tree::compile(seq(["inc", "inc"]), actions, TreeOptions::default()).unwrap();
///
/// assert_eq!(tree.run(1_i64).await.unwrap(), Outcome::Success(Value::Int(3)));
/// # });
/// # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
/// # }
/// ```
#[derive(Debug)]
pub struct Tree {
    pub(crate) root: Option<Arc<Node>>,
    pub(crate) actions: ActionRegistry,
    pub(crate) options: TreeOptions,
    pub(crate) error: Option<BoughError>,
}

impl Tree {
    /// Load and compile a tree. Never fails: check [`error()`](Self::error)
    /// before running, or let [`run()`](Self::run) refuse.
    pub fn create(
        source: impl Into<TreeSource>,
        actions: ActionRegistry,
        options: TreeOptions,
    ) -> Self {
        let compiled = source
            .into()
            .load()
            .map_err(BoughError::from)
            .and_then(|def| {
                crate::compile::compile(&def, &actions, options.globals.as_ref())
                    .map_err(BoughError::from)
            });
        match compiled {
            Ok(root) => {
                tracing::debug!(nodes = root.count(), actions = actions.len(), "compiled tree");
                Self {
                    root: Some(root),
                    actions,
                    options,
                    error: None,
                }
            }
            Err(error) => {
                tracing::debug!(%error, "tree failed to compile");
                Self {
                    root: None,
                    actions,
                    options,
                    error: Some(error),
                }
            }
        }
    }

    /// Load and compile a tree, failing fast.
    ///
    /// # Errors
    ///
    /// Returns [`BoughError`] if the source cannot be loaded or compiled.
    pub fn compile(
        source: impl Into<TreeSource>,
        actions: ActionRegistry,
        options: TreeOptions,
    ) -> Result<Self, BoughError> {
        let mut tree = Self::create(source, actions, options);
        match tree.error.take() {
            Some(error) => Err(error),
            None => Ok(tree),
        }
    }

    /// The compile error, if compilation failed.
    #[must_use]
    pub fn error(&self) -> Option<&BoughError> {
        self.error.as_ref()
    }

    /// Run the tree against `input`.
    ///
    /// Action failures are part of the [`Outcome`]; the only error is a tree
    /// that never compiled.
    ///
    /// Parallel nodes spawn their children onto the ambient Tokio runtime when
    /// there is one.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::NotCompiled`] if the tree is in error state.
    pub async fn run(&self, input: impl Into<Value>) -> Result<Outcome, RunError> {
        let root = self.compiled()?;
        let trace = crate::trace::Trace::new(
            Arc::clone(&self.options.sink),
            self.options.debug,
            self.options.indent,
        );
        Ok(crate::traverse::run(Arc::clone(root), input.into(), trace).await)
    }

    /// The scope of the root node, shared by the whole tree.
    #[must_use]
    pub fn root_scope(&self) -> Option<&Scope> {
        self.root.as_ref().map(|root| &root.scope)
    }

    /// The actions this tree was compiled against.
    #[must_use]
    pub fn actions(&self) -> &ActionRegistry {
        &self.actions
    }

    /// Number of compiled nodes, or zero for a tree in error state.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.root.as_ref().map_or(0, |root| root.count())
    }

    fn compiled(&self) -> Result<&Arc<Node>, RunError> {
        match (&self.root, &self.error) {
            (Some(root), None) => Ok(root),
            (_, Some(error)) => Err(RunError::NotCompiled {
                reason: error.to_string(),
            }),
            (None, None) => Err(RunError::NotCompiled {
                reason: "no root node".to_owned(),
            }),
        }
    }
}

impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error {
            Some(error) => write!(f, "Tree(error: {error})"),
            None => write!(
                f,
                "Tree({} nodes, {} actions)",
                self.node_count(),
                self.actions.len()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ActionRegistry, BoughError, CompileError, action, seq};

    fn actions() -> ActionRegistry {
        ActionRegistry::new().plain("echo", |_, v| Ok(v))
    }

    #[tokio::test]
    async fn create_and_run() {
        let tree = Tree::create(seq(["echo"]), actions(), TreeOptions::default());
        assert!(tree.error().is_none());
        assert_eq!(tree.node_count(), 2);
        assert_eq!(
            tree.run("hi").await.unwrap(),
            Outcome::Success(Value::from("hi"))
        );
    }

    #[tokio::test]
    async fn tree_in_error_state_refuses_to_run() {
        let tree = Tree::create(action("missing"), actions(), TreeOptions::default());
        assert!(matches!(
            tree.error(),
            Some(BoughError::Compile(CompileError::UnresolvedAction { .. }))
        ));
        assert_eq!(tree.node_count(), 0);
        assert!(matches!(
            tree.run(Value::Null).await,
            Err(RunError::NotCompiled { .. })
        ));
    }

    #[test]
    fn compile_fails_fast() {
        let err = Tree::compile(action("missing"), actions(), TreeOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            BoughError::Compile(CompileError::UnresolvedAction { path, .. }) if path == "missing"
        ));
    }

    #[test]
    fn display() {
        let tree = Tree::create(seq(["echo", "echo"]), actions(), TreeOptions::default());
        assert_eq!(tree.to_string(), "Tree(3 nodes, 1 actions)");

        let broken = Tree::create(action("nope"), actions(), TreeOptions::default());
        assert!(broken.to_string().starts_with("Tree(error: "));
    }

    #[test]
    fn options_builder() {
        let globals = Scope::with_vars([("g", 1_i64)]);
        let options = TreeOptions::new()
            .debug(true)
            .indent(2)
            .sink(crate::BufferSink::new())
            .globals(globals.clone());
        assert!(options.debug);
        assert_eq!(options.indent, 2);
        assert!(options.globals.is_some());
    }

    #[tokio::test]
    async fn root_scope_is_exposed() {
        let tree = Tree::create(
            seq(["echo"]).var("answer", 42_i64),
            actions(),
            TreeOptions::default(),
        );
        assert_eq!(
            tree.root_scope().and_then(|s| s.get("answer")),
            Some(Value::Int(42))
        );
    }
}
