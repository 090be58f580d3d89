use std::sync::Arc;
use std::time::Duration;

use bough::{ActionRegistry, ActionType, Scope, Tree, TreeOptions, Value, action, par};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Query three mirrors, take the first answer but always wait for the
    // audit log to be written.
    let actions = ActionRegistry::new()
        .promise("mirror.fast", |_, v| reply(v, 20, "fast"))
        .promise("mirror.slow", |_, v| reply(v, 80, "slow"))
        .promise("mirror.down", |_, _| async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Err(Value::from("connection refused"))
        })
        .promise("audit", |scope: Scope, v| async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            scope.modify("audited", |n| *n = Value::Int(n.as_i64().unwrap_or(0) + 1));
            Ok(v)
        });

    let def = par([
        action("mirror.fast"),
        action("mirror.slow"),
        action("mirror.down"),
        action("audit").wait_for_me(),
    ])
    .max_success(1_usize)
    .var("audited", 0_i64)
    .action_type(ActionType::Promise);

    let tree = Arc::new(
        Tree::compile(def, actions, TreeOptions::default()).expect("failed to compile tree"),
    );

    let tasks: Vec<_> = (0..4_i64)
        .map(|request| {
            let tree = Arc::clone(&tree);
            tokio::spawn(async move { (request, tree.run(request).await) })
        })
        .collect();

    for task in tasks {
        match task.await {
            Ok((request, Ok(outcome))) => println!("request {request}: {outcome}"),
            Ok((request, Err(error))) => eprintln!("request {request}: {error}"),
            Err(error) => eprintln!("task failed: {error}"),
        }
    }

    let audited = tree.root_scope().and_then(|s| s.get("audited"));
    println!("audited: {}", audited.unwrap_or_default());
}

async fn reply(request: Value, delay_ms: u64, from: &'static str) -> Result<Value, Value> {
    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    Ok(Value::from(format!("{from} answered request {request}")))
}
