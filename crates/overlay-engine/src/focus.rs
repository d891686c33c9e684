#![forbid(unsafe_code)]

//! Focus trapping.
//!
//! [`focusable_set_of`] is a pure query over the document; [`FocusTrap`]
//! uses it on every Tab so changes to the dialog's content are picked up
//! without any bookkeeping.

use overlay_core::{Document, DomError, NodeId};

use crate::options::InitialFocus;

/// Focus failures. Callers treat these as best-effort.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FocusError {
    #[error("focus target {0:?} is no longer connected")]
    Disconnected(NodeId),
    #[error(transparent)]
    Dom(#[from] DomError),
}

/// Focusable descendants of `container` in document order.
#[must_use]
pub fn focusable_set_of(doc: &Document, container: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut stack: Vec<NodeId> = doc.children(container).iter().rev().copied().collect();
    while let Some(node) = stack.pop() {
        if !doc.is_element(node) || is_excluded_subtree(doc, node) {
            continue;
        }
        if is_focusable(doc, node) {
            out.push(node);
        }
        stack.extend(doc.children(node).iter().rev().copied());
    }
    out
}

fn is_excluded_subtree(doc: &Document, node: NodeId) -> bool {
    doc.has_attribute(node, "hidden")
        || doc.has_attribute(node, "inert")
        || doc.style(node, "display") == Some("none")
}

fn is_focusable(doc: &Document, node: NodeId) -> bool {
    if doc.has_attribute(node, "disabled") {
        return false;
    }
    if let Some(tabindex) = doc.attribute(node, "tabindex") {
        return tabindex.trim().parse::<i32>().map_or(true, |t| t >= 0);
    }
    match doc.tag(node) {
        "a" => doc.has_attribute(node, "href"),
        "button" | "select" | "textarea" | "iframe" | "summary" => true,
        "input" => doc.attribute(node, "type") != Some("hidden"),
        "audio" | "video" => doc.has_attribute(node, "controls"),
        _ => matches!(doc.attribute(node, "contenteditable"), Some("" | "true")),
    }
}

/// What the trap did with a Tab key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabOutcome {
    /// Focus wrapped to this node; the host must suppress default traversal.
    Wrapped(NodeId),
    /// Nothing focusable: focus stays on the container.
    Pinned,
    /// The host performs default traversal.
    Passthrough,
}

/// Constrains Tab traversal to one container.
#[derive(Debug, Clone)]
pub struct FocusTrap {
    container: NodeId,
    active: bool,
}

impl FocusTrap {
    #[must_use]
    pub fn new(container: NodeId) -> Self {
        Self {
            container,
            active: false,
        }
    }

    #[must_use]
    pub fn container(&self) -> NodeId {
        self.container
    }

    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Start intercepting Tab. The popup remembers the focus to return to.
    pub fn activate(&mut self) {
        self.active = true;
    }

    /// Stop intercepting. Focus is not restored here.
    pub fn deactivate(&mut self) {
        self.active = false;
    }

    /// Handle Tab (`backwards` for Shift+Tab).
    pub fn handle_tab(&self, doc: &mut Document, backwards: bool) -> TabOutcome {
        if !self.active {
            return TabOutcome::Passthrough;
        }
        let set = focusable_set_of(doc, self.container);
        let (Some(&first), Some(&last)) = (set.first(), set.last()) else {
            if doc.focus(self.container).is_err() {
                tracing::trace!("focus trap container not connected");
            }
            return TabOutcome::Pinned;
        };
        let current = doc.active_element();
        let inside = current.is_some_and(|c| c != self.container && doc.contains(self.container, c));
        let target = if backwards {
            (!inside || current == Some(first)).then_some(last)
        } else {
            (!inside || current == Some(last)).then_some(first)
        };
        match target {
            Some(node) if doc.focus(node).is_ok() => TabOutcome::Wrapped(node),
            _ => TabOutcome::Passthrough,
        }
    }
}

/// Move focus into a freshly opened dialog.
pub fn focus_initial(
    doc: &mut Document,
    dialog: NodeId,
    initial: InitialFocus,
) -> Result<NodeId, FocusError> {
    let target = match initial {
        InitialFocus::Node(node) if doc.contains(dialog, node) => node,
        InitialFocus::Node(_) | InitialFocus::FirstFocusable => {
            focusable_set_of(doc, dialog).first().copied().unwrap_or(dialog)
        }
        InitialFocus::Dialog => dialog,
    };
    doc.focus(target)?;
    Ok(target)
}

/// Return focus to `target` after a close.
pub fn restore_focus(doc: &mut Document, target: NodeId) -> Result<(), FocusError> {
    if !doc.is_connected(target) {
        return Err(FocusError::Disconnected(target));
    }
    doc.focus(target)?;
    Ok(())
}
