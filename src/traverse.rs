use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::runtime::Handle;

use crate::trace::Trace;
use crate::types::{Node, NodeKind, ParallelPolicy};
use crate::{Outcome, Value};

/// Run `node` against `input`.
///
/// Boxed so composites can recurse into their children.
pub(crate) fn run(node: Arc<Node>, input: Value, trace: Trace) -> BoxFuture<'static, Outcome> {
    async move {
        let trace = trace.enter(&node);
        let outcome = match &node.kind {
            NodeKind::Action { action, .. } => {
                trace.input(&input);
                action.call(node.scope.clone(), input).await
            }
            NodeKind::Sequence(children) => chain(children, Outcome::Success(input), &trace).await,
            NodeKind::Selector(children) => chain(children, Outcome::Failure(input), &trace).await,
            NodeKind::Parallel { children, policy } => {
                parallel(children, *policy, input, &trace).await
            }
            NodeKind::Invert(child) => run(Arc::clone(child), input, trace.clone()).await.invert(),
            NodeKind::Success(child) => run(Arc::clone(child), input, trace.clone())
                .await
                .into_success(),
            NodeKind::Failure(child) => run(Arc::clone(child), input, trace.clone())
                .await
                .into_failure(),
        };
        trace.exit(&outcome);
        outcome
    }
    .boxed()
}

/// Feed each child the previous child's payload for as long as outcomes keep
/// the tag of `start`. Sequences start from `Success`, selectors from
/// `Failure`.
async fn chain(children: &[Arc<Node>], start: Outcome, trace: &Trace) -> Outcome {
    let continuing = start.is_success();
    let mut outcome = start;
    for child in children {
        if outcome.is_success() != continuing {
            break;
        }
        outcome = run(Arc::clone(child), outcome.into_value(), trace.clone()).await;
    }
    outcome
}

type Pending = FuturesUnordered<BoxFuture<'static, (usize, Outcome)>>;

async fn parallel(
    children: &[Arc<Node>],
    policy: ParallelPolicy,
    input: Value,
    trace: &Trace,
) -> Outcome {
    if children.is_empty() {
        return Outcome::Success(input);
    }

    let handle = Handle::try_current().ok();
    let mut pending: Pending = children
        .iter()
        .enumerate()
        .map(|(index, child)| {
            start(
                index,
                run(Arc::clone(child), input.clone(), trace.clone()),
                handle.as_ref(),
            )
        })
        .collect();

    let total = children.len();
    let mut waiting_on = children.iter().filter(|c| c.wait_for_me).count();
    let mut succeeded = 0;
    let mut failed = 0;
    let mut decision: Option<Outcome> = None;
    let mut last: Option<Outcome> = None;

    while let Some((index, outcome)) = pending.next().await {
        if children[index].wait_for_me {
            waiting_on -= 1;
        }

        if decision.is_some() {
            tracing::trace!(child = index, %outcome, "parallel child finished after decision");
        } else if outcome.is_success() {
            succeeded += 1;
            if ParallelPolicy::reached(policy.max_success, succeeded, total) {
                decision = Some(outcome.clone());
            }
        } else {
            failed += 1;
            if ParallelPolicy::reached(policy.max_fail, failed, total) {
                decision = Some(outcome.clone());
            }
        }
        last = Some(outcome);

        if decision.is_some() && !policy.wait_for_all && waiting_on == 0 {
            break;
        }
    }

    if !pending.is_empty() {
        match handle {
            Some(handle) => {
                handle.spawn(drain(pending));
            }
            // No runtime to spawn onto: finish the losers on a helper thread.
            None => {
                std::thread::spawn(move || futures::executor::block_on(drain(pending)));
            }
        }
    }

    decision.or(last).unwrap_or(Outcome::Success(input))
}

fn start(
    index: usize,
    child: BoxFuture<'static, Outcome>,
    handle: Option<&Handle>,
) -> BoxFuture<'static, (usize, Outcome)> {
    match handle {
        Some(handle) => {
            let task = handle.spawn(child);
            async move {
                let outcome = match task.await {
                    Ok(outcome) => outcome,
                    Err(err) => Outcome::Failure(Value::String(err.to_string())),
                };
                (index, outcome)
            }
            .boxed()
        }
        None => child.map(move |outcome| (index, outcome)).boxed(),
    }
}

async fn drain(mut pending: Pending) {
    while let Some((index, outcome)) = pending.next().await {
        tracing::trace!(child = index, %outcome, "parallel child finished after decision");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::compile::compile;
    use crate::{
        ActionRegistry, ActionType, BufferSink, NodeDef, Scope, action, failure, invert, par, sel,
        seq, success,
    };

    fn registry() -> ActionRegistry {
        ActionRegistry::new()
            .plain("inc", |_, v| Ok(Value::Int(v.as_i64().unwrap_or(0) + 1)))
            .plain("fail", |_, v| Err(v))
            .plain("echo", |_, v| Ok(v))
            .plain("remember", |scope: &Scope, v| {
                scope.set("seen", v.clone());
                Ok(v)
            })
    }

    fn quiet() -> Trace {
        Trace::new(Arc::new(BufferSink::new()), false, 4)
    }

    async fn eval(def: NodeDef, input: impl Into<Value>) -> Outcome {
        let root = compile(&def, &registry(), None).unwrap();
        run(root, input.into(), quiet()).await
    }

    #[tokio::test]
    async fn sequence_chains_payloads() {
        assert_eq!(
            eval(seq(["inc", "inc", "inc"]), 0_i64).await,
            Outcome::Success(Value::Int(3))
        );
    }

    #[tokio::test]
    async fn sequence_stops_at_first_failure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let actions = registry().plain("count", move |_, v| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(v)
        });
        let root = compile(&seq(["inc", "fail", "count"]), &actions, None).unwrap();
        let outcome = run(root, Value::Int(0), quiet()).await;
        assert_eq!(outcome, Outcome::Failure(Value::Int(1)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn selector_chains_failures() {
        assert_eq!(
            eval(sel(["fail", "inc", "fail"]), 5_i64).await,
            Outcome::Success(Value::Int(6))
        );
        assert_eq!(
            eval(sel(["fail", "fail"]), 5_i64).await,
            Outcome::Failure(Value::Int(5))
        );
    }

    #[tokio::test]
    async fn empty_composites() {
        let empty = || Vec::<crate::ChildDef>::new();
        assert_eq!(eval(seq(empty()), 1_i64).await, Outcome::Success(Value::Int(1)));
        assert_eq!(eval(sel(empty()), 1_i64).await, Outcome::Failure(Value::Int(1)));
        assert_eq!(eval(par(empty()), 1_i64).await, Outcome::Success(Value::Int(1)));
    }

    #[tokio::test]
    async fn decorators_keep_payload() {
        assert_eq!(eval(invert("inc"), 1_i64).await, Outcome::Failure(Value::Int(2)));
        assert_eq!(eval(invert("fail"), 1_i64).await, Outcome::Success(Value::Int(1)));
        assert_eq!(eval(success("fail"), 1_i64).await, Outcome::Success(Value::Int(1)));
        assert_eq!(eval(failure("inc"), 1_i64).await, Outcome::Failure(Value::Int(2)));
    }

    #[tokio::test]
    async fn actions_write_to_their_scope() {
        let def = seq(["remember"]).var("seen", Value::Null);
        let root = compile(&def, &registry(), None).unwrap();
        run(Arc::clone(&root), Value::from("hello"), quiet()).await;
        assert_eq!(root.scope.get("seen"), Some(Value::from("hello")));
    }

    fn delayed() -> ActionRegistry {
        ActionRegistry::new()
            .promise("ok", |_, v| async move {
                let ms = v.as_i64().unwrap_or(0) as u64;
                tokio::time::sleep(Duration::from_millis(ms)).await;
                Ok(v)
            })
            .promise("slow", |_, v| async move {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(v)
            })
            .promise("err", |_, v| async move {
                let ms = v.as_i64().unwrap_or(0) as u64;
                tokio::time::sleep(Duration::from_millis(ms)).await;
                Err(v)
            })
    }

    async fn eval_par(def: NodeDef, input: i64) -> Outcome {
        let root = compile(&def.action_type(ActionType::Promise), &delayed(), None).unwrap();
        run(root, Value::Int(input), quiet()).await
    }

    #[tokio::test(start_paused = true)]
    async fn parallel_without_threshold_returns_last() {
        let outcome = eval_par(par(["ok", "err"]), 10).await;
        assert_eq!(outcome.value(), &Value::Int(10));
    }

    #[tokio::test(start_paused = true)]
    async fn parallel_max_success_resolves_early() {
        let started = tokio::time::Instant::now();
        let outcome = eval_par(par(["slow", "ok"]).max_success(1_usize), 20).await;
        assert_eq!(outcome, Outcome::Success(Value::Int(20)));
        assert!(started.elapsed() < Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn parallel_max_fail_all() {
        let outcome = eval_par(par(["err", "err"]).max_fail(true), 5).await;
        assert_eq!(outcome, Outcome::Failure(Value::Int(5)));
    }

    #[test]
    fn parallel_in_place_without_runtime_handle() {
        let root = compile(&par(["inc", "inc"]).max_success(2_usize), &registry(), None).unwrap();
        let outcome = futures::executor::block_on(run(root, Value::Int(1), quiet()));
        assert_eq!(outcome, Outcome::Success(Value::Int(2)));
    }

    #[tokio::test]
    async fn trace_lines() {
        let sink = BufferSink::new();
        let def = seq([action("echo")]).title("T").debug(true);
        let root = compile(&def, &registry(), None).unwrap();
        let trace = Trace::new(Arc::new(sink.clone()), false, 4);
        run(root, Value::Int(1), trace).await;
        assert_eq!(
            sink.lines(),
            vec![
                "NODE(type=seq, title=T)",
                "    NODE(type=action, actionType=plain, action=echo)",
                "        Input=1",
                "    => Success(1)",
                "=> Success(1)",
            ]
        );
    }

    #[tokio::test]
    async fn debug_false_silences_subtree() {
        let sink = BufferSink::new();
        let def = seq([invert("fail").debug(false)]);
        let root = compile(&def, &registry(), None).unwrap();
        let trace = Trace::new(Arc::new(sink.clone()), true, 2);
        run(root, Value::Null, trace).await;
        assert_eq!(sink.lines(), vec!["NODE(type=seq)", "=> Success(null)"]);
    }
}
