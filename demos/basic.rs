use bough::{ActionRegistry, ChildDef, Tree, TreeOptions, Value, invert, sel, seq};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let actions = ActionRegistry::new()
        .plain("double", |_, v| Ok(Value::Int(v.as_i64().unwrap_or(0) * 2)))
        .plain("small", |_, v| match v.as_i64() {
            Some(n) if n < 100 => Ok(v),
            _ => Err(v),
        })
        .plain("reset", |_, _| Ok(Value::Int(1)));

    // Double while small, otherwise start over.
    let tree = Tree::compile(
        sel([
            seq(["small", "double"]),
            seq([ChildDef::from(invert("small")), "reset".into()]),
        ]),
        actions,
        TreeOptions::default(),
    )
    .expect("failed to compile tree");

    println!("{tree}");

    let mut value = Value::Int(3);
    for _ in 0..8 {
        let outcome = tree.run(value).await.expect("tree is compiled");
        println!("{outcome}");
        value = outcome.into_value();
    }
}
