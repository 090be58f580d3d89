//! Print the trace of a small tree, with tracing switched on for one subtree.

use bough::{ActionRegistry, BufferSink, Tree, TreeOptions, Value, action, invert, par, sel, seq};

#[tokio::main]
async fn main() {
    let actions = ActionRegistry::new()
        .plain("inc", |_, v| Ok(Value::Int(v.as_i64().unwrap_or(0) + 1)))
        .plain("fail", |_, v| Err(v))
        .promise("fetch", |_, v| async move {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            Ok(v)
        });

    let def = seq([
        sel(["fail", "inc"]).title("first"),
        seq([
            invert("fail"),
            par([
                action("fetch").action_type(bough::ActionType::Promise),
                action("inc"),
            ])
            .max_success(true)
            .title("gather"),
        ])
        .title("second")
        .debug(true),
    ])
    .title("main");

    let sink = BufferSink::new();
    let tree = Tree::compile(def, actions, TreeOptions::new().sink(sink.clone()).indent(2))
        .expect("failed to compile tree");

    let outcome = tree.run(0_i64).await.expect("tree is compiled");
    for line in sink.lines() {
        println!("{line}");
    }
    println!("result: {outcome}");

    // Printing straight to stdout through a closure sink, everything traced.
    let tree = Tree::compile(
        seq(["inc", "inc"]).title("twice"),
        ActionRegistry::new().plain("inc", |_, v| Ok(Value::Int(v.as_i64().unwrap_or(0) + 1))),
        TreeOptions::new().debug(true).sink(|line: &str| println!("{line}")),
    )
    .expect("failed to compile tree");
    tree.run(40_i64).await.expect("tree is compiled");
}
