#![forbid(unsafe_code)]

//! Draggable positioning.
//!
//! A [`DragController`] tracks a translation offset applied on top of the
//! dialog's base placement. Every update is clamped so the dialog's bounding
//! rectangle stays inside `[padding, viewport - padding]` on both axes. The
//! correction is computed from the *current* rectangle, so the clamp holds
//! whatever base transform the surface uses.
//!
//! # Gesture
//!
//! ```text
//! pointer down on handle ──► dragging ──pointer move──► offset = origin + delta, clamp
//!                                     ──pointer up────► snap to edges, clamp, (persist)
//!                                     ──cancel────────► stop where it is
//! ```

use overlay_core::{Document, KeyEvent, LocalStorage, Modifiers, NodeId, Point, PointerEvent, StorageError};
use serde::{Deserialize, Serialize};

use crate::attr;
use crate::options::{DragOptions, Surface};

/// Position stored under the persistence key.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StoredPosition {
    pub x: f64,
    pub y: f64,
}

/// Persistence failures. Callers treat these as best-effort.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("stored position is malformed: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Gesture {
    pointer_id: u32,
    origin: Point,
    start: Point,
}

/// Per-popup drag state.
#[derive(Debug, Clone)]
pub struct DragController {
    dialog: NodeId,
    handle: NodeId,
    base_transform: Option<&'static str>,
    options: DragOptions,
    offset: Point,
    gesture: Option<Gesture>,
}

impl DragController {
    /// Attach to `dialog`. The handle is the first element carrying the
    /// configured handle attribute, else the header, else the dialog.
    pub fn new(doc: &mut Document, dialog: NodeId, surface: Surface, options: DragOptions) -> Self {
        let explicit = options
            .handle_attribute
            .as_deref()
            .and_then(|name| doc.query_attribute(dialog, name).first().copied());
        let handle = explicit
            .or_else(|| doc.query_attribute(dialog, attr::HEADER).first().copied())
            .unwrap_or(dialog);
        doc.set_attribute(handle, attr::DRAG_HANDLE, "");
        doc.set_style(handle, "cursor", "move");
        doc.set_style(handle, "touch-action", "none");

        let controller = Self {
            dialog,
            handle,
            base_transform: match surface {
                Surface::Modal => Some("translate(-50%, -50%)"),
                Surface::Toast => None,
            },
            options,
            offset: Point::ORIGIN,
            gesture: None,
        };
        controller.apply(doc);
        controller
    }

    #[must_use]
    pub fn handle(&self) -> NodeId {
        self.handle
    }

    #[must_use]
    pub fn offset(&self) -> Point {
        self.offset
    }

    #[must_use]
    pub fn options(&self) -> &DragOptions {
        &self.options
    }

    #[inline]
    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.gesture.is_some()
    }

    /// Load the persisted position, if a key is configured and present.
    pub fn load(&mut self, doc: &mut Document, storage: &dyn LocalStorage) -> Result<bool, PersistError> {
        let Some(key) = self.options.persist_key.as_deref() else {
            return Ok(false);
        };
        let Some(raw) = storage.get_item(key)? else {
            return Ok(false);
        };
        let stored: StoredPosition = serde_json::from_str(&raw)?;
        self.offset = Point::new(stored.x, stored.y);
        self.apply(doc);
        Ok(true)
    }

    /// Store the current position, if a key is configured.
    pub fn persist(&self, storage: &dyn LocalStorage) -> Result<bool, PersistError> {
        let Some(key) = self.options.persist_key.as_deref() else {
            return Ok(false);
        };
        let json = serde_json::to_string(&StoredPosition {
            x: self.offset.x,
            y: self.offset.y,
        })?;
        storage.set_item(key, json)?;
        Ok(true)
    }

    /// Begin a gesture if `event` hit the handle outside any interactive
    /// control. Returns `true` when a drag started.
    pub fn pointer_down(&mut self, doc: &Document, event: &PointerEvent) -> bool {
        if self.gesture.is_some() || !doc.contains(self.handle, event.target) {
            return false;
        }
        if self.on_interactive(doc, event.target) {
            return false;
        }
        self.gesture = Some(Gesture {
            pointer_id: event.pointer_id,
            origin: self.offset,
            start: event.position,
        });
        tracing::trace!(x = self.offset.x, y = self.offset.y, "drag start");
        true
    }

    /// Follow the pointer. Returns the new offset while dragging.
    pub fn pointer_move(&mut self, doc: &mut Document, event: &PointerEvent) -> Option<Point> {
        let gesture = self.gesture.filter(|g| g.pointer_id == event.pointer_id)?;
        let axis = self.options.axis;
        let dx = if axis.allows_x() { event.position.x - gesture.start.x } else { 0.0 };
        let dy = if axis.allows_y() { event.position.y - gesture.start.y } else { 0.0 };
        self.offset = gesture.origin.offset_by(dx, dy);
        self.apply(doc);
        self.clamp(doc);
        tracing::trace!(x = self.offset.x, y = self.offset.y, "drag");
        Some(self.offset)
    }

    /// Finish the gesture: snap, clamp, and return the final offset.
    pub fn pointer_up(&mut self, doc: &mut Document, event: &PointerEvent) -> Option<Point> {
        self.gesture.filter(|g| g.pointer_id == event.pointer_id)?;
        self.gesture = None;
        if self.options.snap {
            self.snap(doc);
        }
        self.clamp(doc);
        tracing::trace!(x = self.offset.x, y = self.offset.y, "drag end");
        Some(self.offset)
    }

    /// Abort the gesture without snapping. Returns `true` if one was active.
    pub fn cancel(&mut self) -> bool {
        self.gesture.take().is_some()
    }

    /// Alt+arrow nudging while focus is inside the dialog.
    pub fn nudge(&mut self, doc: &mut Document, key: &KeyEvent) -> Option<Point> {
        if !self.options.keyboard || !key.modifiers.contains(Modifiers::ALT) {
            return None;
        }
        let (ux, uy) = key.code.arrow_direction()?;
        let focus = doc.active_element()?;
        if !doc.contains(self.dialog, focus) {
            return None;
        }
        let step = if key.modifiers.contains(Modifiers::SHIFT) {
            self.options.fine_step
        } else {
            self.options.step
        };
        let axis = self.options.axis;
        let dx = if axis.allows_x() { ux * step } else { 0.0 };
        let dy = if axis.allows_y() { uy * step } else { 0.0 };
        self.offset = self.offset.offset_by(dx, dy);
        self.apply(doc);
        self.clamp(doc);
        Some(self.offset)
    }

    /// Re-establish the clamp after the viewport or layout changed.
    pub fn reclamp(&mut self, doc: &mut Document) -> Point {
        self.clamp(doc);
        self.offset
    }

    fn on_interactive(&self, doc: &Document, target: NodeId) -> bool {
        let mut cursor = Some(target);
        while let Some(node) = cursor {
            if node == self.handle {
                return false;
            }
            let interactive = matches!(
                doc.tag(node),
                "button" | "input" | "select" | "textarea" | "a" | "option"
            ) || doc.has_attribute(node, attr::NO_DRAG)
                || doc
                    .attribute(node, "contenteditable")
                    .is_some_and(|v| v != "false");
            if interactive {
                return true;
            }
            cursor = doc.parent(node);
        }
        false
    }

    fn apply(&self, doc: &mut Document) {
        doc.set_offset(self.dialog, self.offset);
        let translate = format!("translate({}px, {}px)", self.offset.x, self.offset.y);
        let transform = match self.base_transform {
            Some(base) => format!("{base} {translate}"),
            None => translate,
        };
        doc.set_style(self.dialog, "transform", transform);
    }

    fn clamp(&mut self, doc: &mut Document) {
        let viewport = doc.viewport();
        let pad = self.options.padding;
        let rect = doc.bounding_rect(self.dialog);
        let dx = correction(rect.x, rect.right(), pad, viewport.width - pad);
        let dy = correction(rect.y, rect.bottom(), pad, viewport.height - pad);
        if dx != 0.0 || dy != 0.0 {
            self.offset = self.offset.offset_by(dx, dy);
            self.apply(doc);
        }
    }

    fn snap(&mut self, doc: &mut Document) {
        let viewport = doc.viewport();
        let pad = self.options.padding;
        let threshold = self.options.snap_threshold;
        let rect = doc.bounding_rect(self.dialog);
        let axis = self.options.axis;
        let dx = if axis.allows_x() {
            snap_delta(rect.x, rect.right(), pad, viewport.width - pad, threshold)
        } else {
            0.0
        };
        let dy = if axis.allows_y() {
            snap_delta(rect.y, rect.bottom(), pad, viewport.height - pad, threshold)
        } else {
            0.0
        };
        if dx != 0.0 || dy != 0.0 {
            self.offset = self.offset.offset_by(dx, dy);
            self.apply(doc);
        }
    }
}

/// Shift needed to bring `[start, end]` inside `[min, max]`. A box larger
/// than the range is pinned at `min`.
fn correction(start: f64, end: f64, min: f64, max: f64) -> f64 {
    if end - start > max - min || start < min {
        min - start
    } else if end > max {
        max - end
    } else {
        0.0
    }
}

/// Shift that makes an edge within `threshold` of a bound sit flush on it.
fn snap_delta(start: f64, end: f64, min: f64, max: f64, threshold: f64) -> f64 {
    if (start - min).abs() <= threshold {
        min - start
    } else if (max - end).abs() <= threshold {
        max - end
    } else {
        0.0
    }
}
