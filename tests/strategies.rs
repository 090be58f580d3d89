#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use bough::{ActionRegistry, ChildDef, NodeDef, failure, invert, sel, seq, success};
use proptest::prelude::*;

// --- Generated trees over two actions ---
// ok  : Success(input + 1)
// err : Failure(input)
// Both count their invocations so tests can check which children ran.

#[derive(Debug, Clone)]
pub enum GenNode {
    Ok,
    Err,
    Seq(Vec<GenNode>),
    Sel(Vec<GenNode>),
    Invert(Box<GenNode>),
    Success(Box<GenNode>),
    Failure(Box<GenNode>),
}

/// What running a [`GenNode`] must produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expected {
    pub success: bool,
    pub value: i64,
    pub calls: usize,
}

impl GenNode {
    pub fn to_def(&self) -> ChildDef {
        match self {
            GenNode::Ok => "ok".into(),
            GenNode::Err => "err".into(),
            GenNode::Seq(children) => seq(children.iter().map(GenNode::to_def)).into(),
            GenNode::Sel(children) => sel(children.iter().map(GenNode::to_def)).into(),
            GenNode::Invert(child) => invert(child.to_def()).into(),
            GenNode::Success(child) => success(child.to_def()).into(),
            GenNode::Failure(child) => failure(child.to_def()).into(),
        }
    }

    /// The tree as a root definition. Bare actions get wrapped in a
    /// one-element sequence so the root is always a node.
    pub fn to_root(&self) -> NodeDef {
        match self.to_def() {
            ChildDef::Node(node) => *node,
            leaf @ ChildDef::Ref(_) => seq([leaf]),
        }
    }

    /// Reference model of the traversal.
    pub fn expected(&self, input: i64) -> Expected {
        match self {
            GenNode::Ok => Expected {
                success: true,
                value: input + 1,
                calls: 1,
            },
            GenNode::Err => Expected {
                success: false,
                value: input,
                calls: 1,
            },
            GenNode::Seq(children) => chain(children, true, input),
            GenNode::Sel(children) => chain(children, false, input),
            GenNode::Invert(child) => {
                let inner = child.expected(input);
                Expected {
                    success: !inner.success,
                    ..inner
                }
            }
            GenNode::Success(child) => Expected {
                success: true,
                ..child.expected(input)
            },
            GenNode::Failure(child) => Expected {
                success: false,
                ..child.expected(input)
            },
        }
    }
}

fn chain(children: &[GenNode], continue_on: bool, input: i64) -> Expected {
    let mut state = Expected {
        success: continue_on,
        value: input,
        calls: 0,
    };
    for child in children {
        if state.success != continue_on {
            break;
        }
        let next = child.expected(state.value);
        state = Expected {
            calls: state.calls + next.calls,
            ..next
        };
    }
    state
}

pub fn arb_leaf() -> impl Strategy<Value = GenNode> {
    prop_oneof![Just(GenNode::Ok), Just(GenNode::Err)]
}

/// Trees up to four levels deep with at most five children per composite.
pub fn arb_tree() -> impl Strategy<Value = GenNode> {
    arb_leaf().prop_recursive(4, 48, 5, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..5).prop_map(GenNode::Seq),
            prop::collection::vec(inner.clone(), 0..5).prop_map(GenNode::Sel),
            inner.clone().prop_map(|c| GenNode::Invert(Box::new(c))),
            inner.clone().prop_map(|c| GenNode::Success(Box::new(c))),
            inner.prop_map(|c| GenNode::Failure(Box::new(c))),
        ]
    })
}

/// Flat lists of leaves, for sequence and selector properties.
pub fn arb_leaves() -> impl Strategy<Value = Vec<GenNode>> {
    prop::collection::vec(arb_leaf(), 0..12)
}

/// Registry for generated trees, plus the shared invocation counter.
pub fn counting_actions() -> (ActionRegistry, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let ok_calls = Arc::clone(&calls);
    let err_calls = Arc::clone(&calls);
    let actions = ActionRegistry::new()
        .plain("ok", move |_, v| {
            ok_calls.fetch_add(1, Ordering::SeqCst);
            Ok(bough::Value::Int(v.as_i64().unwrap_or(0) + 1))
        })
        .plain("err", move |_, v| {
            err_calls.fetch_add(1, Ordering::SeqCst);
            Err(v)
        });
    (actions, calls)
}

// --- Parallel children: distinct completion delays, in arbitrary order ---

#[derive(Debug, Clone, Copy)]
pub struct GenChild {
    pub delay_ms: u64,
    pub succeeds: bool,
}

/// Between one and eight children with pairwise distinct delays, shuffled.
pub fn arb_parallel_children() -> impl Strategy<Value = Vec<GenChild>> {
    prop::collection::btree_set(1_u64..500, 1..8)
        .prop_flat_map(|delays| {
            let n = delays.len();
            (
                Just(delays.into_iter().collect::<Vec<_>>()),
                prop::collection::vec(any::<bool>(), n),
            )
        })
        .prop_map(|(delays, flags)| {
            delays
                .into_iter()
                .zip(flags)
                .map(|(delay_ms, succeeds)| GenChild { delay_ms, succeeds })
                .collect::<Vec<_>>()
        })
        .prop_shuffle()
}

// --- Scope chains ---

pub const NAMES: &[&str] = &["a", "b", "c", "d"];

/// For each level, outermost first, the subset of [`NAMES`] it declares.
pub fn arb_scope_levels() -> impl Strategy<Value = Vec<Vec<&'static str>>> {
    prop::collection::vec(prop::sample::subsequence(NAMES, 0..=NAMES.len()), 1..8)
}
