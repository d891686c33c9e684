#![forbid(unsafe_code)]

//! Document scroll suppression.
//!
//! A single lock for the whole document. Locking snapshots the `overflow`
//! styles of `<html>` and `<body>` and forces them to `hidden`; unlocking
//! writes the snapshot back, removing properties that were unset before.

use overlay_core::Document;

use crate::attr;

#[derive(Debug, Clone, PartialEq, Eq)]
struct SavedOverflow {
    root: Option<String>,
    body: Option<String>,
}

/// Global scroll lock with state restore.
#[derive(Debug, Default)]
pub struct ScrollLock {
    saved: Option<SavedOverflow>,
}

impl ScrollLock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.saved.is_some()
    }

    /// Lock scrolling. Returns `false` if it was already locked.
    pub fn lock(&mut self, doc: &mut Document) -> bool {
        if self.saved.is_some() {
            return false;
        }
        let (root, body) = (doc.root(), doc.body());
        self.saved = Some(SavedOverflow {
            root: doc.style(root, "overflow").map(str::to_owned),
            body: doc.style(body, "overflow").map(str::to_owned),
        });
        doc.set_style(root, "overflow", "hidden");
        doc.set_style(body, "overflow", "hidden");
        doc.set_attribute(body, attr::SCROLL_LOCKED, "");
        tracing::debug!("scroll locked");
        true
    }

    /// Unlock scrolling. Returns `false` if it was not locked.
    pub fn unlock(&mut self, doc: &mut Document) -> bool {
        let Some(saved) = self.saved.take() else {
            return false;
        };
        let (root, body) = (doc.root(), doc.body());
        restore_style(doc, root, saved.root);
        restore_style(doc, body, saved.body);
        doc.remove_attribute(body, attr::SCROLL_LOCKED);
        tracing::debug!("scroll unlocked");
        true
    }

    /// Bring the lock to `locked`.
    pub fn set(&mut self, doc: &mut Document, locked: bool) {
        if locked {
            self.lock(doc);
        } else {
            self.unlock(doc);
        }
    }
}

fn restore_style(doc: &mut Document, node: overlay_core::NodeId, value: Option<String>) {
    match value {
        Some(value) => doc.set_style(node, "overflow", value),
        None => {
            doc.remove_style(node, "overflow");
        }
    }
}
