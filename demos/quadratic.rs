//! Solve `a*x^2 + b*x + c = 0`, organizing the case analysis as a tree.

use bough::{ActionRegistry, ChildDef, NodeDef, Scope, Tree, TreeOptions, Value, sel, seq};
use tracing_subscriber::EnvFilter;

/// Run `then` if the output of `expr` passes `test`, else run `otherwise`.
fn if_node(
    expr: impl Into<ChildDef>,
    test: impl Into<ChildDef>,
    then: impl Into<ChildDef>,
    otherwise: impl Into<ChildDef>,
) -> NodeDef {
    sel([
        ChildDef::from(seq([expr.into(), test.into(), then.into()])),
        otherwise.into(),
    ])
}

fn definition() -> NodeDef {
    let all_or_none = if_node("get.c", "is.zero", "calc.allSolutions", "calc.noSolution");
    let first_order = if_node("get.b", "is.zero", all_or_none, "calc.firstOrder");
    let double_or_complex = if_node("get.d", "is.zero", "calc.doubleRoot", "calc.complexRoots");
    let second_order = seq([
        ChildDef::from("calc.discriminant"),
        if_node("get.d", "is.positive", "calc.realRoots", double_or_complex).into(),
    ]);

    seq([
        ChildDef::from("io.read"),
        if_node("get.a", "is.zero", first_order, second_order).into(),
        "io.show".into(),
    ])
    .title("quadratic")
    .var(
        "in",
        Value::from_iter([("a", Value::Null), ("b", Value::Null), ("c", Value::Null)]),
    )
    .var("med", Value::from_iter([("d", Value::Null)]))
    .var(
        "out",
        Value::from_iter([("roots", Value::List(vec![])), ("description", Value::from(""))]),
    )
}

fn num(scope: &Scope, path: &str) -> f64 {
    scope.get(path).and_then(|v| v.as_f64()).unwrap_or(0.0)
}

fn answer(scope: &Scope, description: &str, roots: Vec<Value>) -> bough::ActionResult {
    scope.set("out.description", description);
    scope.set("out.roots", roots);
    Ok(Value::Null)
}

fn actions() -> ActionRegistry {
    let io = ActionRegistry::new()
        .plain("read", |s, args| {
            for name in ["a", "b", "c"] {
                s.set(&format!("in.{name}"), args.get(name).cloned().unwrap_or_default());
            }
            println!("a={}, b={}, c={}", num(s, "in.a"), num(s, "in.b"), num(s, "in.c"));
            Ok(Value::Null)
        })
        .plain("show", |s, _| {
            let out = s.get("out").unwrap_or_default();
            let description = out.get("description").cloned().unwrap_or_default();
            let roots = out.get("roots").cloned().unwrap_or_default();
            println!("{} {roots}\n", description.as_str().unwrap_or_default());
            Ok(out)
        });

    let get = ActionRegistry::new()
        .plain("a", |s, _| Ok(s.get("in.a").unwrap_or_default()))
        .plain("b", |s, _| Ok(s.get("in.b").unwrap_or_default()))
        .plain("c", |s, _| Ok(s.get("in.c").unwrap_or_default()))
        .plain("d", |s, _| Ok(s.get("med.d").unwrap_or_default()));

    let is = ActionRegistry::new()
        .plain("zero", |_, x| match x.as_f64() {
            Some(n) if n == 0.0 => Ok(x),
            _ => Err(Value::Bool(false)),
        })
        .plain("positive", |_, x| match x.as_f64() {
            Some(n) if n > 0.0 => Ok(x),
            _ => Err(Value::Bool(false)),
        });

    let calc = ActionRegistry::new()
        .plain("discriminant", |s, _| {
            let (a, b, c) = (num(s, "in.a"), num(s, "in.b"), num(s, "in.c"));
            s.set("med.d", b * b - 4.0 * a * c);
            Ok(Value::Null)
        })
        .plain("firstOrder", |s, _| {
            let root = -num(s, "in.c") / num(s, "in.b");
            answer(s, "First order solution", vec![root.into()])
        })
        .plain("realRoots", |s, _| {
            let (a, b, dr) = (num(s, "in.a"), num(s, "in.b"), num(s, "med.d").sqrt());
            let roots = vec![((-b - dr) / (2.0 * a)).into(), ((-b + dr) / (2.0 * a)).into()];
            answer(s, "Real roots", roots)
        })
        .plain("doubleRoot", |s, _| {
            let root = -num(s, "in.b") / (2.0 * num(s, "in.a"));
            answer(s, "Double root", vec![root.into()])
        })
        .plain("complexRoots", |s, _| {
            let (a, b, dr) = (num(s, "in.a"), num(s, "in.b"), (-num(s, "med.d")).sqrt());
            let (real, imag) = (-b / (2.0 * a), (dr / (2.0 * a)).abs());
            let roots = vec![
                format!("{real}+i{imag}").into(),
                format!("{real}-i{imag}").into(),
            ];
            answer(s, "Complex roots", roots)
        })
        .plain("allSolutions", |s, _| {
            answer(s, "Any number is a solution", vec!["*".into()])
        })
        .plain("noSolution", |s, _| {
            answer(s, "There are no solutions", vec!["-".into()])
        });

    ActionRegistry::new()
        .namespace("io", io)
        .namespace("get", get)
        .namespace("is", is)
        .namespace("calc", calc)
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let tree = Tree::create(definition(), actions(), TreeOptions::default());
    if let Some(error) = tree.error() {
        eprintln!("ERROR: {error}");
        std::process::exit(1);
    }

    let equations = [
        (1, 0, -1),  // real roots
        (2, 4, -6),  // real roots
        (1, -4, 4),  // double root
        (5, 2, 2),   // complex roots
        (0, 1, -4),  // first order
        (0, 0, 0),   // all solutions
        (0, 0, 4),   // no solution
    ];

    for (a, b, c) in equations {
        let input = Value::from_iter([("a", a), ("b", b), ("c", c)]);
        if let Err(error) = tree.run(input).await {
            eprintln!("ERROR: {error}");
        }
    }
}
