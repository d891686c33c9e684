#![forbid(unsafe_code)]

//! Toast docking regions and the per-dock visibility cap.
//!
//! Each [`Dock`] gets its own region container, created on first use and
//! appended to the body with `pointer-events: none` so only the toasts inside
//! it receive pointer input.
//!
//! Every entry receives a strictly increasing insertion sequence number.
//! "Oldest" and "newest" are decided by that number, and a toast's z-index
//! is the dock base plus its sequence, so later toasts render above earlier
//! ones even when several are added in the same turn.

use overlay_core::{Document, DomError, NodeId};

use crate::attr;
use crate::options::{Dock, PopupId};

/// Cap enforcement for one add.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvictionPolicy {
    /// Zero disables the cap.
    pub max_visible: usize,
    pub dismiss_newest_first: bool,
}

#[derive(Debug, Clone)]
struct DockEntry {
    id: PopupId,
    seq: u64,
}

#[derive(Debug, Default)]
struct DockSlot {
    region: Option<NodeId>,
    entries: Vec<DockEntry>,
}

/// Seven docks of toasts, each ordered oldest first.
#[derive(Debug)]
pub struct ToastDockManager {
    slots: [DockSlot; 7],
    next_seq: u64,
    base_z: i32,
}

impl Default for ToastDockManager {
    fn default() -> Self {
        Self::new(2000)
    }
}

fn slot_index(dock: Dock) -> usize {
    Dock::ALL.iter().position(|d| *d == dock).unwrap_or(0)
}

impl ToastDockManager {
    #[must_use]
    pub fn new(base_z: i32) -> Self {
        Self {
            slots: Default::default(),
            next_seq: 0,
            base_z,
        }
    }

    /// Append `container` to the dock and enforce the cap. Returns the ids
    /// that no longer fit; the caller closes them with reason `overflow`.
    pub fn add(
        &mut self,
        doc: &mut Document,
        dock: Dock,
        id: PopupId,
        container: NodeId,
        policy: EvictionPolicy,
    ) -> Result<Vec<PopupId>, DomError> {
        let region = self.ensure_region(doc, dock)?;
        doc.append_child(region, container)?;

        self.next_seq += 1;
        let seq = self.next_seq;
        doc.set_style(container, "z-index", (i64::from(self.base_z) + seq as i64).to_string());

        let slot = &mut self.slots[slot_index(dock)];
        slot.entries.retain(|e| e.id != id);
        slot.entries.push(DockEntry { id, seq });

        let mut evicted = Vec::new();
        if policy.max_visible > 0 {
            while slot.entries.len() > policy.max_visible {
                let candidates = slot.entries.iter().enumerate().filter(|(_, e)| e.seq != seq);
                let victim = if policy.dismiss_newest_first {
                    candidates.max_by_key(|(_, e)| e.seq)
                } else {
                    candidates.min_by_key(|(_, e)| e.seq)
                };
                let Some((idx, _)) = victim else {
                    break;
                };
                evicted.push(slot.entries.remove(idx).id);
            }
        }
        if !evicted.is_empty() {
            tracing::debug!(dock = dock.as_str(), evicted = evicted.len(), "toast cap enforced");
        }
        Ok(evicted)
    }

    /// Drop `id` from its dock's list. The container is left to its owner.
    pub fn remove(&mut self, dock: Dock, id: &PopupId) -> bool {
        let entries = &mut self.slots[slot_index(dock)].entries;
        let before = entries.len();
        entries.retain(|e| &e.id != id);
        entries.len() != before
    }

    /// Ids in a dock, oldest first.
    #[must_use]
    pub fn ids(&self, dock: Dock) -> Vec<PopupId> {
        self.slots[slot_index(dock)]
            .entries
            .iter()
            .map(|e| e.id.clone())
            .collect()
    }

    #[must_use]
    pub fn len(&self, dock: Dock) -> usize {
        self.slots[slot_index(dock)].entries.len()
    }

    /// Region container of a dock, if it has been created.
    #[must_use]
    pub fn region(&self, dock: Dock) -> Option<NodeId> {
        self.slots[slot_index(dock)].region
    }

    fn ensure_region(&mut self, doc: &mut Document, dock: Dock) -> Result<NodeId, DomError> {
        let slot = &mut self.slots[slot_index(dock)];
        if let Some(region) = slot.region
            && doc.is_connected(region)
        {
            return Ok(region);
        }
        let region = match slot.region {
            Some(region) => region,
            None => {
                let region = doc.create_element("div");
                doc.set_attribute(region, attr::DOCK_REGION, dock.as_str());
                doc.set_style(region, "position", "fixed");
                doc.set_style(region, "pointer-events", "none");
                doc.set_style(region, "z-index", self.base_z.to_string());
                for (property, value) in dock.anchor_styles() {
                    doc.set_style(region, property, *value);
                }
                region
            }
        };
        let body = doc.body();
        doc.append_child(body, region)?;
        slot.region = Some(region);
        tracing::trace!(dock = dock.as_str(), "dock region mounted");
        Ok(region)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const FIFO_3: EvictionPolicy = EvictionPolicy {
        max_visible: 3,
        dismiss_newest_first: false,
    };

    fn add(
        docks: &mut ToastDockManager,
        doc: &mut Document,
        id: &str,
        policy: EvictionPolicy,
    ) -> Vec<PopupId> {
        let container = doc.create_element("div");
        docks
            .add(doc, Dock::TopRight, id.into(), container, policy)
            .unwrap()
    }

    fn ids(v: &[&str]) -> Vec<PopupId> {
        v.iter().map(|s| PopupId::from(*s)).collect()
    }

    #[test]
    fn region_is_created_lazily_once() {
        let mut doc = Document::default();
        let mut docks = ToastDockManager::default();
        assert_eq!(docks.region(Dock::TopRight), None);
        add(&mut docks, &mut doc, "a", FIFO_3);
        add(&mut docks, &mut doc, "b", FIFO_3);
        let region = docks.region(Dock::TopRight).unwrap();
        assert_eq!(doc.query_attribute(doc.body(), attr::DOCK_REGION), vec![region]);
        assert_eq!(doc.style(region, "pointer-events"), Some("none"));
        assert_eq!(doc.attribute(region, attr::DOCK_REGION), Some("top-right"));
        assert_eq!(doc.children(region).len(), 2);
    }

    #[test]
    fn fifo_evicts_oldest() {
        let mut doc = Document::default();
        let mut docks = ToastDockManager::default();
        for id in ["a", "b", "c"] {
            assert!(add(&mut docks, &mut doc, id, FIFO_3).is_empty());
        }
        assert_eq!(add(&mut docks, &mut doc, "d", FIFO_3), ids(&["a"]));
        assert_eq!(docks.ids(Dock::TopRight), ids(&["b", "c", "d"]));
    }

    #[test]
    fn newest_first_never_evicts_the_incoming_toast() {
        let policy = EvictionPolicy {
            max_visible: 2,
            dismiss_newest_first: true,
        };
        let mut doc = Document::default();
        let mut docks = ToastDockManager::default();
        add(&mut docks, &mut doc, "a", policy);
        add(&mut docks, &mut doc, "b", policy);
        assert_eq!(add(&mut docks, &mut doc, "c", policy), ids(&["b"]));
        assert_eq!(docks.ids(Dock::TopRight), ids(&["a", "c"]));
    }

    #[test]
    fn shrinking_cap_evicts_several() {
        let mut doc = Document::default();
        let mut docks = ToastDockManager::default();
        for id in ["a", "b", "c"] {
            add(&mut docks, &mut doc, id, FIFO_3);
        }
        let one = EvictionPolicy {
            max_visible: 1,
            dismiss_newest_first: false,
        };
        assert_eq!(add(&mut docks, &mut doc, "d", one), ids(&["a", "b", "c"]));
        assert_eq!(docks.len(Dock::TopRight), 1);
    }

    #[test]
    fn zero_cap_is_unbounded() {
        let unbounded = EvictionPolicy {
            max_visible: 0,
            dismiss_newest_first: false,
        };
        let mut doc = Document::default();
        let mut docks = ToastDockManager::default();
        for i in 0..10 {
            assert!(add(&mut docks, &mut doc, &format!("t{i}"), unbounded).is_empty());
        }
        assert_eq!(docks.len(Dock::TopRight), 10);
    }

    #[test]
    fn z_index_follows_insertion_sequence() {
        let mut doc = Document::default();
        let mut docks = ToastDockManager::new(2000);
        let first = doc.create_element("div");
        let second = doc.create_element("div");
        docks.add(&mut doc, Dock::BottomLeft, "a".into(), first, FIFO_3).unwrap();
        docks.add(&mut doc, Dock::BottomLeft, "b".into(), second, FIFO_3).unwrap();
        assert_eq!(doc.style(first, "z-index"), Some("2001"));
        assert_eq!(doc.style(second, "z-index"), Some("2002"));
    }

    #[test]
    fn remove_only_touches_the_list() {
        let mut doc = Document::default();
        let mut docks = ToastDockManager::default();
        let container = doc.create_element("div");
        docks.add(&mut doc, Dock::TopRight, "a".into(), container, FIFO_3).unwrap();
        assert!(docks.remove(Dock::TopRight, &"a".into()));
        assert!(!docks.remove(Dock::TopRight, &"a".into()));
        assert!(doc.is_connected(container));
    }
}
