#![forbid(unsafe_code)]

//! Content relocation.
//!
//! A teleport moves (or clones) an existing subtree into a destination
//! inside an overlay and remembers enough about its origin to put it back
//! exactly. Moving keeps node identity, so anything wired to the node keeps
//! working while it is displayed in the overlay.
//!
//! # Invariants
//!
//! - A node is registered at most once.
//! - Restoring removes the node's entry; restoring an unregistered node is a
//!   no-op.
//! - After a move-mode restore no placeholder remains in the document.

use ahash::AHashMap;
use overlay_core::{Document, DomError, NodeId};

use crate::attr;
use crate::options::TeleportMode;

/// Teleport failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TeleportError {
    #[error("node {0:?} is already teleported")]
    AlreadyTeleported(NodeId),
    #[error("node {0:?} has no parent to return to")]
    Detached(NodeId),
    #[error(transparent)]
    Dom(#[from] DomError),
}

/// Where a teleported node came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeleportOrigin {
    Moved { parent: NodeId, placeholder: NodeId },
    Cloned { clone: NodeId },
}

/// Registry entry for one teleported node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeleportRecord {
    pub node: NodeId,
    pub origin: TeleportOrigin,
}

impl TeleportRecord {
    /// The node actually placed in the destination.
    #[must_use]
    pub fn placed(&self) -> NodeId {
        match self.origin {
            TeleportOrigin::Moved { .. } => self.node,
            TeleportOrigin::Cloned { clone } => clone,
        }
    }
}

/// Map from original node to its teleport record.
#[derive(Debug, Default)]
pub struct TeleportRegistry {
    records: AHashMap<NodeId, TeleportRecord>,
}

impl TeleportRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn is_teleported(&self, node: NodeId) -> bool {
        self.records.contains_key(&node)
    }

    #[must_use]
    pub fn record(&self, node: NodeId) -> Option<TeleportRecord> {
        self.records.get(&node).copied()
    }

    /// Teleport `node` into `destination`. Returns the node placed there
    /// (the node itself, or its clone).
    pub fn teleport(
        &mut self,
        doc: &mut Document,
        node: NodeId,
        destination: NodeId,
        mode: TeleportMode,
        preserve_size: bool,
    ) -> Result<NodeId, TeleportError> {
        if self.records.contains_key(&node) {
            return Err(TeleportError::AlreadyTeleported(node));
        }
        let record = match mode {
            TeleportMode::Clone => {
                let clone = doc.deep_clone(node)?;
                doc.append_child(destination, clone)?;
                TeleportRecord {
                    node,
                    origin: TeleportOrigin::Cloned { clone },
                }
            }
            TeleportMode::Move => {
                let parent = doc.parent(node).ok_or(TeleportError::Detached(node))?;
                if doc.contains(node, destination) {
                    return Err(DomError::HierarchyRequest {
                        parent: destination,
                        child: node,
                    }
                    .into());
                }
                let placeholder = doc.create_element("div");
                doc.set_attribute(placeholder, attr::PLACEHOLDER, "");
                if preserve_size {
                    let rect = doc.bounding_rect(node);
                    doc.set_style(placeholder, "width", format!("{}px", rect.width));
                    doc.set_style(placeholder, "height", format!("{}px", rect.height));
                    doc.set_layout(placeholder, rect);
                } else {
                    doc.set_style(placeholder, "display", "none");
                }
                doc.insert_before(parent, placeholder, Some(node))?;
                if let Err(err) = doc.append_child(destination, node) {
                    doc.remove(placeholder);
                    return Err(err.into());
                }
                TeleportRecord {
                    node,
                    origin: TeleportOrigin::Moved { parent, placeholder },
                }
            }
        };
        tracing::debug!(node = node.raw(), ?mode, "teleported");
        self.records.insert(node, record);
        Ok(record.placed())
    }

    /// Put `node` back where it came from. Returns `false` when the node was
    /// not teleported.
    pub fn restore(&mut self, doc: &mut Document, node: NodeId) -> Result<bool, TeleportError> {
        let Some(record) = self.records.get(&node).copied() else {
            return Ok(false);
        };
        match record.origin {
            TeleportOrigin::Moved { parent, placeholder } => {
                match doc.parent(placeholder) {
                    Some(at) => doc.insert_before(at, node, Some(placeholder))?,
                    None => doc.append_child(parent, node)?,
                }
                doc.remove(placeholder);
            }
            TeleportOrigin::Cloned { clone } => doc.remove(clone),
        }
        self.records.remove(&node);
        tracing::debug!(node = node.raw(), "teleport restored");
        Ok(true)
    }

    /// Drop the record without restoring: the node stays where it is now.
    /// A move-mode placeholder is removed.
    pub fn release(&mut self, doc: &mut Document, node: NodeId) -> Option<TeleportRecord> {
        let record = self.records.remove(&node)?;
        if let TeleportOrigin::Moved { placeholder, .. } = record.origin {
            doc.remove(placeholder);
        }
        Some(record)
    }
}
