#![forbid(unsafe_code)]

//! Background inerting.
//!
//! While a modal is frontmost, every element that is not an ancestor of the
//! modal's container (or the container itself) is made inert: for each node
//! on the path from the container up to `<body>`, its element siblings get
//! `inert` and `aria-hidden="true"`. Prior attribute values are recorded and
//! written back exactly on release.
//!
//! Toast dock regions are skipped so notifications stay reachable.

use overlay_core::{Document, NodeId};

use crate::attr;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Marked {
    node: NodeId,
    inert: Option<String>,
    aria_hidden: Option<String>,
}

/// Applies and releases the inert marking for one kept subtree at a time.
#[derive(Debug, Default)]
pub struct InertManager {
    keep: Option<NodeId>,
    marked: Vec<Marked>,
}

impl InertManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Container currently kept interactive.
    #[must_use]
    pub fn kept(&self) -> Option<NodeId> {
        self.keep
    }

    #[must_use]
    pub fn is_applied(&self) -> bool {
        self.keep.is_some()
    }

    /// Nodes currently marked, in marking order.
    #[must_use]
    pub fn marked_nodes(&self) -> Vec<NodeId> {
        self.marked.iter().map(|m| m.node).collect()
    }

    /// Make everything except `keep` and its ancestors inert. Any previous
    /// marking is released first.
    pub fn apply(&mut self, doc: &mut Document, keep: NodeId) {
        if self.keep == Some(keep) {
            return;
        }
        self.release(doc);
        let body = doc.body();
        if keep == body || !doc.contains(body, keep) {
            return;
        }
        let mut cursor = keep;
        while let Some(parent) = doc.parent(cursor) {
            for sibling in doc.children(parent).to_vec() {
                if sibling != cursor && doc.is_element(sibling) && !is_exempt(doc, sibling) {
                    self.mark(doc, sibling);
                }
            }
            if parent == body {
                break;
            }
            cursor = parent;
        }
        self.keep = Some(keep);
        tracing::debug!(kept = keep.raw(), marked = self.marked.len(), "background inert");
    }

    /// Restore every marked node's prior attribute state.
    pub fn release(&mut self, doc: &mut Document) {
        if self.keep.take().is_none() && self.marked.is_empty() {
            return;
        }
        for marked in self.marked.drain(..).rev() {
            restore(doc, marked.node, "inert", marked.inert);
            restore(doc, marked.node, "aria-hidden", marked.aria_hidden);
        }
        tracing::debug!("background inert released");
    }

    fn mark(&mut self, doc: &mut Document, node: NodeId) {
        self.marked.push(Marked {
            node,
            inert: doc.attribute(node, "inert").map(str::to_owned),
            aria_hidden: doc.attribute(node, "aria-hidden").map(str::to_owned),
        });
        doc.set_attribute(node, "inert", "");
        doc.set_attribute(node, "aria-hidden", "true");
    }
}

fn is_exempt(doc: &Document, node: NodeId) -> bool {
    doc.has_attribute(node, attr::DOCK_REGION) || matches!(doc.tag(node), "script" | "style" | "template")
}

fn restore(doc: &mut Document, node: NodeId, name: &str, value: Option<String>) {
    match value {
        Some(value) => doc.set_attribute(node, name, value),
        None => {
            doc.remove_attribute(node, name);
        }
    }
}
