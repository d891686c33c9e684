#![forbid(unsafe_code)]

//! Modal stack with z-ordering and aggregate page policy.
//!
//! The `ModalManager` keeps the open modals of one engine in LIFO order and
//! derives the page-wide state from the whole stack after every change:
//!
//! - z-index of each container is `base + step × position` (0 = bottom);
//! - scroll is locked iff **any** member requested it;
//! - the background is inert iff the **top** member requested it, keeping
//!   only the top container interactive.
//!
//! # Invariants
//!
//! - A popup appears at most once in the stack.
//! - Only the top entry is authoritative for Escape, backdrop and drag.
//! - An empty stack releases both the scroll lock and the inert marking.
//!
//! # Failure Modes
//!
//! - `remove()` for an id not in the stack returns `false` (no panic).
//! - `top_id()` on an empty stack returns `None`.

use overlay_core::{Document, NodeId};

use crate::inert::InertManager;
use crate::options::PopupId;
use crate::scroll_lock::ScrollLock;

/// Base z-index for modal layer.
pub const BASE_MODAL_Z: i32 = 1000;

/// Z-index increment between modals (leaves room for internal layers).
pub const Z_INCREMENT: i32 = 10;

/// Page policy a modal requests while it is on the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModalPolicy {
    pub lock_scroll: bool,
    pub inert_background: bool,
}

#[derive(Debug, Clone)]
struct StackEntry {
    id: PopupId,
    container: NodeId,
    policy: ModalPolicy,
}

/// Stack of open modals.
#[derive(Debug)]
pub struct ModalManager {
    /// Open modals, bottom to top.
    modals: Vec<StackEntry>,
    base_z: i32,
    z_step: i32,
    scroll_lock: ScrollLock,
    inert: InertManager,
}

impl Default for ModalManager {
    fn default() -> Self {
        Self::new(BASE_MODAL_Z, Z_INCREMENT)
    }
}

impl ModalManager {
    #[must_use]
    pub fn new(base_z: i32, z_step: i32) -> Self {
        Self {
            modals: Vec::new(),
            base_z,
            z_step,
            scroll_lock: ScrollLock::new(),
            inert: InertManager::new(),
        }
    }

    // --- Stack Operations ---

    /// Push a modal on top and recompute policy. A popup already in the
    /// stack is moved to the top.
    pub fn push(&mut self, doc: &mut Document, id: PopupId, container: NodeId, policy: ModalPolicy) {
        self.modals.retain(|m| m.id != id);
        tracing::debug!(popup = %id, depth = self.modals.len() + 1, "modal pushed");
        self.modals.push(StackEntry { id, container, policy });
        self.recompute(doc);
    }

    /// Remove a modal from any position and recompute policy.
    pub fn remove(&mut self, doc: &mut Document, id: &PopupId) -> bool {
        let Some(idx) = self.modals.iter().position(|m| &m.id == id) else {
            return false;
        };
        let entry = self.modals.remove(idx);
        doc.remove_style(entry.container, "z-index");
        tracing::debug!(popup = %id, depth = self.modals.len(), "modal removed");
        self.recompute(doc);
        true
    }

    fn recompute(&mut self, doc: &mut Document) {
        let mut z = self.base_z;
        for entry in &self.modals {
            doc.set_style(entry.container, "z-index", z.to_string());
            z += self.z_step;
        }

        let lock = self.modals.iter().any(|m| m.policy.lock_scroll);
        self.scroll_lock.set(doc, lock);

        match self.modals.last() {
            Some(top) if top.policy.inert_background => self.inert.apply(doc, top.container),
            _ => self.inert.release(doc),
        }
    }

    // --- State Queries ---

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modals.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn depth(&self) -> usize {
        self.modals.len()
    }

    #[must_use]
    pub fn contains(&self, id: &PopupId) -> bool {
        self.modals.iter().any(|m| &m.id == id)
    }

    #[must_use]
    pub fn top_id(&self) -> Option<&PopupId> {
        self.modals.last().map(|m| &m.id)
    }

    #[must_use]
    pub fn is_top(&self, id: &PopupId) -> bool {
        self.top_id() == Some(id)
    }

    /// Ids bottom to top.
    #[must_use]
    pub fn ids(&self) -> Vec<PopupId> {
        self.modals.iter().map(|m| m.id.clone()).collect()
    }

    #[must_use]
    pub fn z_index_of(&self, id: &PopupId) -> Option<i32> {
        let pos = self.modals.iter().position(|m| &m.id == id)?;
        Some(self.base_z + self.z_step * pos as i32)
    }

    #[must_use]
    pub fn is_scroll_locked(&self) -> bool {
        self.scroll_lock.is_locked()
    }

    #[must_use]
    pub fn inert(&self) -> &InertManager {
        &self.inert
    }
}
