#![forbid(unsafe_code)]

//! Property tests: random tree mutations keep parent/child links consistent.
//!
//! Run: `cargo test -p overlay-core --test tree_invariants`

use overlay_core::{Document, NodeId};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Append { parent: usize, child: usize },
    InsertBefore { parent: usize, child: usize, reference: usize },
    Remove { node: usize },
    Focus { node: usize },
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0usize..12, 0usize..12).prop_map(|(parent, child)| Op::Append { parent, child }),
        (0usize..12, 0usize..12, 0usize..12).prop_map(|(parent, child, reference)| {
            Op::InsertBefore {
                parent,
                child,
                reference,
            }
        }),
        (0usize..12).prop_map(|node| Op::Remove { node }),
        (0usize..12).prop_map(|node| Op::Focus { node }),
    ]
}

fn assert_consistent(doc: &Document, nodes: &[NodeId]) {
    for &node in nodes {
        if let Some(parent) = doc.parent(node) {
            let hits = doc.children(parent).iter().filter(|c| **c == node).count();
            assert_eq!(hits, 1, "node listed exactly once by its parent");
            assert!(!doc.contains(node, parent), "no cycles");
        }
        for &child in doc.children(node) {
            assert_eq!(doc.parent(child), Some(node));
        }
    }
    if let Some(active) = doc.active_element() {
        assert!(doc.is_connected(active), "focus rests on a connected node");
    }
}

proptest! {
    #[test]
    fn random_mutations_preserve_tree_shape(ops in prop::collection::vec(op(), 1..60)) {
        let mut doc = Document::default();
        let mut nodes = vec![doc.body()];
        for _ in 0..11 {
            nodes.push(doc.create_element("div"));
        }

        for op in ops {
            match op {
                Op::Append { parent, child } => {
                    let _ = doc.append_child(nodes[parent], nodes[child]);
                }
                Op::InsertBefore { parent, child, reference } => {
                    let _ = doc.insert_before(nodes[parent], nodes[child], Some(nodes[reference]));
                }
                Op::Remove { node } => {
                    if nodes[node] != doc.body() {
                        doc.remove(nodes[node]);
                    }
                }
                Op::Focus { node } => {
                    let _ = doc.focus(nodes[node]);
                }
            }
            assert_consistent(&doc, &nodes);
        }
    }
}
