use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::str::FromStr;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::oneshot;

use super::{Outcome, Scope, Value};

/// What a `plain`, `promise` or `callback` action produces: `Ok` for success,
/// `Err` for failure. Both sides carry a [`Value`].
pub type ActionResult = Result<Value, Value>;

type Invoke = dyn Fn(Scope, Value) -> BoxFuture<'static, Outcome> + Send + Sync;

/// The calling convention of an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ActionType {
    /// `fn(&Scope, Value) -> Result<Value, Value>`; succeeds on `Ok`.
    #[default]
    Plain,
    /// `fn(&Scope, Value) -> impl Into<Value>`; succeeds on a truthy result.
    Boolean,
    /// `fn(Scope, Value) -> impl Future<Output = Result<Value, Value>>`.
    Promise,
    /// `fn(Scope, Value, Done)`; succeeds when `Done` completes with `Ok`.
    Callback,
}

impl ActionType {
    pub const ALL: [ActionType; 4] = [
        ActionType::Plain,
        ActionType::Boolean,
        ActionType::Promise,
        ActionType::Callback,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ActionType::Plain => "plain",
            ActionType::Boolean => "boolean",
            ActionType::Promise => "promise",
            ActionType::Callback => "callback",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| s.to_owned())
    }
}

/// A callable leaf behavior, normalized to a single asynchronous shape.
///
/// Construct one with [`Action::plain`], [`Action::boolean`],
/// [`Action::promise`] or [`Action::callback`]. Panics raised by the wrapped
/// function are caught and reported as a [`Outcome::Failure`] carrying the
/// panic message.
#[derive(Clone)]
pub struct Action {
    action_type: ActionType,
    invoke: Arc<Invoke>,
}

impl Action {
    /// Wrap a synchronous function whose `Err` means failure.
    pub fn plain<F>(f: F) -> Self
    where
        F: Fn(&Scope, Value) -> ActionResult + Send + Sync + 'static,
    {
        Self::new(ActionType::Plain, move |scope, input| {
            let outcome = match catch_unwind(AssertUnwindSafe(|| f(&scope, input))) {
                Ok(result) => Outcome::from(result),
                Err(panic) => panicked(panic),
            };
            futures::future::ready(outcome).boxed()
        })
    }

    /// Wrap a synchronous predicate. The returned value is the payload in both
    /// cases; its truthiness decides the tag.
    pub fn boolean<F, R>(f: F) -> Self
    where
        F: Fn(&Scope, Value) -> R + Send + Sync + 'static,
        R: Into<Value>,
    {
        Self::new(ActionType::Boolean, move |scope, input| {
            let outcome = match catch_unwind(AssertUnwindSafe(|| f(&scope, input).into())) {
                Ok(value) if value.is_truthy() => Outcome::Success(value),
                Ok(value) => Outcome::Failure(value),
                Err(panic) => panicked(panic),
            };
            futures::future::ready(outcome).boxed()
        })
    }

    /// Wrap an asynchronous function. The scope handle is passed by value so
    /// the returned future can hold on to it.
    pub fn promise<F, Fut>(f: F) -> Self
    where
        F: Fn(Scope, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ActionResult> + Send + 'static,
    {
        Self::new(ActionType::Promise, move |scope, input| {
            match catch_unwind(AssertUnwindSafe(|| f(scope, input))) {
                Ok(fut) => AssertUnwindSafe(fut)
                    .catch_unwind()
                    .map(|result| match result {
                        Ok(result) => Outcome::from(result),
                        Err(panic) => panicked(panic),
                    })
                    .boxed(),
                Err(panic) => futures::future::ready(panicked(panic)).boxed(),
            }
        })
    }

    /// Wrap a function that reports completion through a [`Done`] handle,
    /// possibly after it has returned.
    pub fn callback<F>(f: F) -> Self
    where
        F: Fn(Scope, Value, Done) + Send + Sync + 'static,
    {
        Self::new(ActionType::Callback, move |scope, input| {
            let (tx, mut rx) = oneshot::channel();
            let done = Done { tx };
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| f(scope, input, done))) {
                // A completion delivered before the panic still counts.
                return match rx.try_recv() {
                    Ok(result) => futures::future::ready(Outcome::from(result)).boxed(),
                    Err(_) => futures::future::ready(panicked(panic)).boxed(),
                };
            }
            async move {
                match rx.await {
                    Ok(result) => Outcome::from(result),
                    Err(_) => {
                        tracing::warn!("callback action dropped its completion handle");
                        Outcome::Failure(Value::from("callback dropped without completing"))
                    }
                }
            }
            .boxed()
        })
    }

    fn new<F>(action_type: ActionType, invoke: F) -> Self
    where
        F: Fn(Scope, Value) -> BoxFuture<'static, Outcome> + Send + Sync + 'static,
    {
        Self {
            action_type,
            invoke: Arc::new(invoke),
        }
    }

    /// The calling convention this action was registered with.
    #[must_use]
    pub fn action_type(&self) -> ActionType {
        self.action_type
    }

    /// Invoke the action against a scope and input.
    pub fn call(&self, scope: Scope, input: Value) -> BoxFuture<'static, Outcome> {
        (self.invoke)(scope, input)
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("action_type", &self.action_type)
            .finish_non_exhaustive()
    }
}

/// Completion handle handed to `callback` actions.
///
/// Consumed on completion, so an action can finish at most once. Dropping it
/// without completing fails the action.
#[derive(Debug)]
pub struct Done {
    tx: oneshot::Sender<ActionResult>,
}

impl Done {
    /// Report the action's result.
    pub fn complete(self, result: ActionResult) {
        // The receiver is gone only if the run itself was dropped.
        let _ = self.tx.send(result);
    }

    pub fn succeed(self, value: impl Into<Value>) {
        self.complete(Ok(value.into()));
    }

    pub fn fail(self, error: impl Into<Value>) {
        self.complete(Err(error.into()));
    }
}

fn panicked(panic: Box<dyn Any + Send>) -> Outcome {
    let message = if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "action panicked".to_owned()
    };
    tracing::warn!(%message, "action panicked");
    Outcome::Failure(Value::String(message))
}
