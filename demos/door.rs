//! Enter a room through a door, trying gentler approaches first.
//!
//! Run with `RUST_LOG=bough::trace=debug` to see every node visited.

use std::path::Path;

use bough::{ActionRegistry, Scope, Tree, TreeOptions, TreeSource, Value};
use tracing_subscriber::EnvFilter;

/// (open, locked, have key, kickable)
fn status(name: &str) -> Option<(bool, bool, bool, bool)> {
    match name {
        "open" => Some((true, false, false, false)),
        "closed" => Some((false, false, false, false)),
        "locked" => Some((false, true, true, false)),
        "kickable" => Some((false, true, false, true)),
        "rock" => Some((false, true, false, false)),
        _ => None,
    }
}

fn current(scope: &Scope) -> (bool, bool, bool, bool) {
    scope
        .get("vars.doorStatus")
        .as_ref()
        .and_then(Value::as_str)
        .and_then(status)
        .unwrap_or((false, true, false, false))
}

fn is_set(scope: &Scope, path: &str) -> bool {
    scope.get(path).is_some_and(|v| v.is_truthy())
}

fn report(ok: bool) -> &'static str {
    if ok { "OK" } else { "FAILED" }
}

fn actions() -> ActionRegistry {
    let door = ActionRegistry::new()
        .boolean("isOpen", |scope, _| {
            let open = is_set(scope, "vars.open");
            println!("  door is {}open", if open { "" } else { "not " });
            open
        })
        .boolean("open", |scope, _| {
            if !is_set(scope, "vars.locked") {
                scope.set("vars.open", true);
            }
            println!("  door.open() .... {}", report(is_set(scope, "vars.open")));
            true
        })
        .boolean("unlock", |scope, _| {
            if current(scope).2 {
                scope.set("vars.locked", false);
            }
            println!("  door.unlock() .. {}", report(!is_set(scope, "vars.locked")));
            true
        })
        .boolean("kick", |scope, _| {
            if current(scope).3 {
                scope.set("vars.locked", false);
                scope.set("vars.open", true);
            }
            println!("  door.kick() .... {}", report(is_set(scope, "vars.open")));
            true
        });

    let room = ActionRegistry::new()
        .boolean("moveInto", |_, _| {
            println!("  room.moveInto()");
            true
        })
        .boolean("abandon", |_, _| {
            println!("  room.abandon()");
            true
        });

    ActionRegistry::new()
        .boolean("readInput", |scope, input| {
            let name = input.get("doorStatus").and_then(Value::as_str).unwrap_or_default();
            let Some((open, locked, _, _)) = status(name) else {
                println!("unknown door status '{name}'");
                return false;
            };
            println!("initial status is {name}");
            scope.set("vars.doorStatus", name);
            scope.set("vars.open", open);
            scope.set("vars.locked", locked);
            true
        })
        .namespace("door", door)
        .namespace("room", room)
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/trees/door.yaml");
    let tree = Tree::create(TreeSource::YamlFile(path), actions(), TreeOptions::default());
    if let Some(error) = tree.error() {
        eprintln!("ERROR: {error}");
        std::process::exit(1);
    }

    for name in ["open", "closed", "locked", "kickable", "rock"] {
        let input = Value::from_iter([("doorStatus", name)]);
        match tree.run(input).await {
            Ok(outcome) => println!("=> {outcome}\n"),
            Err(error) => eprintln!("ERROR: {error}"),
        }
    }
}
