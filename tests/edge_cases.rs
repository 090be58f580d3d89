use std::time::Duration;

use bough::{
    Action, ActionRegistry, ActionType, BoughError, BufferSink, ChildDef, CompileError, NodeDef,
    Outcome, RunError, Scope, Tree, TreeOptions, Value, action, action_fn, failure, invert, par,
    sel, seq, success,
};

fn echo() -> ActionRegistry {
    ActionRegistry::new().plain("echo", |_, v| Ok(v))
}

async fn run(def: NodeDef, actions: ActionRegistry, input: impl Into<Value>) -> Outcome {
    Tree::compile(def, actions, TreeOptions::default())
        .unwrap()
        .run(input)
        .await
        .unwrap()
}

#[tokio::test]
async fn single_leaf_tree() {
    assert_eq!(
        run(action("echo"), echo(), 7_i64).await,
        Outcome::Success(Value::Int(7))
    );
}

#[tokio::test]
async fn deeply_nested_decorators() {
    let mut def = action("echo");
    for _ in 0..200 {
        def = invert(def);
    }
    assert_eq!(
        run(def, echo(), "deep").await,
        Outcome::Success(Value::from("deep"))
    );
}

#[tokio::test]
async fn decorators_force_tag_and_keep_payload() {
    let actions = echo().plain("nope", |_, v| Err(v));
    assert_eq!(
        run(success("nope"), actions.clone(), 1_i64).await,
        Outcome::Success(Value::Int(1))
    );
    assert_eq!(
        run(failure("echo"), actions.clone(), 1_i64).await,
        Outcome::Failure(Value::Int(1))
    );
    assert_eq!(
        run(invert(invert("nope")), actions, 1_i64).await,
        Outcome::Failure(Value::Int(1))
    );
}

#[tokio::test]
async fn boolean_truthiness() {
    let actions = ActionRegistry::new().boolean("same", |_, v| v);
    let def = || action("same").action_type(ActionType::Boolean);

    for falsy in [
        Value::Null,
        Value::Bool(false),
        Value::Int(0),
        Value::Float(0.0),
        Value::from(""),
    ] {
        let outcome = run(def(), actions.clone(), falsy.clone()).await;
        assert_eq!(outcome, Outcome::Failure(falsy));
    }

    for truthy in [
        Value::Bool(true),
        Value::Int(-1),
        Value::from("no"),
        Value::List(vec![]),
        Value::from_iter(Vec::<(String, Value)>::new()),
    ] {
        let outcome = run(def(), actions.clone(), truthy.clone()).await;
        assert_eq!(outcome, Outcome::Success(truthy));
    }

    let nan = run(def(), actions, f64::NAN).await;
    assert!(nan.is_failure());
}

#[tokio::test]
async fn callback_completes_after_returning() {
    let actions = ActionRegistry::new().callback("later", |_, v, done| {
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(1)).await;
            done.succeed(Value::Int(v.as_i64().unwrap_or(0) * 10));
        });
    });
    let def = action("later").action_type(ActionType::Callback);
    assert_eq!(run(def, actions, 4_i64).await, Outcome::Success(Value::Int(40)));
}

#[tokio::test]
async fn callback_error_and_dropped_handle() {
    let actions = ActionRegistry::new()
        .callback("reject", |_, _, done| done.fail("refused"))
        .callback("forget", |_, _, done| drop(done));

    let def = action("reject").action_type(ActionType::Callback);
    assert_eq!(
        run(def, actions.clone(), Value::Null).await,
        Outcome::Failure(Value::from("refused"))
    );

    let def = action("forget").action_type(ActionType::Callback);
    assert!(run(def, actions, Value::Null).await.is_failure());
}

#[tokio::test]
async fn panicking_action_becomes_failure() {
    let actions = ActionRegistry::new().plain("boom", |_, v| {
        if v.is_null() {
            panic!("kaboom");
        }
        Ok(v)
    });
    let outcome = run(sel(["boom"]), actions, Value::Null).await;
    assert_eq!(outcome, Outcome::Failure(Value::from("kaboom")));
}

#[tokio::test]
async fn inline_actions_skip_the_registry() {
    let def = seq([
        action_fn(Action::plain(|_, v| Ok(Value::Int(v.as_i64().unwrap_or(0) + 1)))),
        action_fn(Action::plain(|_, v| Ok(Value::Int(v.as_i64().unwrap_or(0) * 3)))),
    ]);
    assert_eq!(
        run(def, ActionRegistry::new(), 1_i64).await,
        Outcome::Success(Value::Int(6))
    );
}

#[tokio::test]
async fn mixed_action_types_in_one_tree() {
    let actions = ActionRegistry::new()
        .plain("plain", |_, v| Ok(v))
        .boolean("check", |_, v| v)
        .promise("fetch", |_, v| async move { Ok(v) })
        .callback("notify", |_, v, done| done.succeed(v));

    let def = seq([
        ChildDef::from("plain"),
        action("check").action_type(ActionType::Boolean).into(),
        action("fetch").action_type(ActionType::Promise).into(),
        action("notify").action_type(ActionType::Callback).into(),
    ]);
    assert_eq!(
        run(def, actions, "go").await,
        Outcome::Success(Value::from("go"))
    );
}

#[tokio::test]
async fn writes_reach_the_declaring_scope() {
    let actions = ActionRegistry::new()
        .plain("bump", |scope, v| {
            scope.modify("count", |c| *c = Value::Int(c.as_i64().unwrap_or(0) + 1));
            Ok(v)
        })
        .plain("scratch", |scope, v| {
            scope.set("tmp", true);
            Ok(v)
        });
    let def = seq([seq([action("bump"), action("scratch")]).title("inner"), action("bump")])
        .var("count", 0_i64);
    let tree = Tree::compile(def, actions, TreeOptions::default()).unwrap();

    tree.run(Value::Null).await.unwrap();
    tree.run(Value::Null).await.unwrap();

    let root = tree.root_scope().unwrap();
    assert_eq!(root.get("count"), Some(Value::Int(4)));
    // Undeclared names land in the writing leaf's own frame.
    assert_eq!(root.get("tmp"), None);
}

#[tokio::test]
async fn globals_are_shared_with_the_caller() {
    let globals = Scope::with_vars([("greeting", Value::Null)]);
    let actions = ActionRegistry::new().plain("greet", |scope, name| {
        let text = format!("hello {}", name.as_str().unwrap_or("?"));
        scope.set("greeting", text.as_str());
        Ok(Value::from(text))
    });
    let options = TreeOptions::new().globals(globals.clone());
    let tree = Tree::compile(action("greet"), actions, options).unwrap();

    tree.run("bough").await.unwrap();
    assert_eq!(globals.get("greeting"), Some(Value::from("hello bough")));
}

#[tokio::test]
async fn error_state_is_sticky() {
    let tree = Tree::create(
        seq(["echo", "missing.action"]),
        echo(),
        TreeOptions::default(),
    );
    let Some(BoughError::Compile(CompileError::UnresolvedAction { at, path })) = tree.error()
    else {
        panic!("expected an unresolved action, got {:?}", tree.error());
    };
    assert_eq!(at, "root/1");
    assert_eq!(path, "missing.action");

    for _ in 0..2 {
        let err = tree.run(Value::Null).await.unwrap_err();
        let RunError::NotCompiled { reason } = err;
        assert!(reason.contains("missing.action"));
    }
}

#[test]
fn compile_errors_name_the_offending_node() {
    let def = seq([par(["echo"]).title("workers").max_fail(0_usize)]);
    let err = Tree::compile(def, echo(), TreeOptions::default()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "maxFail at root/0 (workers) must be at least 1"
    );
}

#[tokio::test]
async fn trace_follows_debug_flags() {
    let sink = BufferSink::new();
    let options = TreeOptions::new().sink(sink.clone()).indent(2);
    let def = sel([action("echo").debug(true), action("echo")]).title("pick");
    let tree = Tree::compile(def, echo(), options).unwrap();

    tree.run(1_i64).await.unwrap();
    assert_eq!(
        sink.lines(),
        vec![
            "NODE(type=action, actionType=plain, action=echo)",
            "  Input=1",
            "=> Success(1)",
        ]
    );

    sink.clear();
    let options = TreeOptions::new().sink(sink.clone()).debug(true);
    let tree = Tree::compile(invert("echo").title("flip"), echo(), options).unwrap();
    tree.run("x").await.unwrap();
    assert_eq!(
        sink.lines(),
        vec![
            "NODE(type=invert, title=flip)",
            "    NODE(type=action, actionType=plain, action=echo)",
            "        Input=\"x\"",
            "    => Success(\"x\")",
            "=> Failure(\"x\")",
        ]
    );
}

#[tokio::test]
async fn concurrent_runs_keep_separate_traces() {
    let sink = BufferSink::new();
    let options = TreeOptions::new().sink(sink.clone()).debug(true);
    let tree = Tree::compile(action("echo"), echo(), options).unwrap();

    let (a, b) = tokio::join!(tree.run(1_i64), tree.run(2_i64));
    assert!(a.unwrap().is_success() && b.unwrap().is_success());

    let lines = sink.lines();
    assert_eq!(lines.len(), 6);
    assert!(lines.iter().all(|l| !l.starts_with(' ') || l.starts_with("    Input=")));
}
