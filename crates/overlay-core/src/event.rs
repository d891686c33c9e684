#![forbid(unsafe_code)]

//! Input events delivered by the host page.
//!
//! Events carry the [`NodeId`] they were dispatched to, the way a browser
//! event carries `event.target`. Keyboard events have no explicit target:
//! the engine reads the document's active element instead.

use bitflags::bitflags;

use crate::dom::NodeId;
use crate::geometry::{Point, Size};

bitflags! {
    /// Modifier keys held during a key or pointer event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0001;
        const ALT   = 0b0010;
        const CTRL  = 0b0100;
        const META  = 0b1000;
    }
}

/// Keys the overlay engine reacts to. Everything else is `Char` or `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    Escape,
    Tab,
    Enter,
    Up,
    Down,
    Left,
    Right,
    Char(char),
    Other,
}

impl KeyCode {
    /// Unit direction for arrow keys, `None` otherwise.
    #[must_use]
    pub fn arrow_direction(self) -> Option<(f64, f64)> {
        match self {
            Self::Up => Some((0.0, -1.0)),
            Self::Down => Some((0.0, 1.0)),
            Self::Left => Some((-1.0, 0.0)),
            Self::Right => Some((1.0, 0.0)),
            _ => None,
        }
    }
}

/// A key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub code: KeyCode,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    #[must_use]
    pub const fn new(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: Modifiers::empty(),
        }
    }

    #[must_use]
    pub const fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
}

/// Pointer event phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerEventKind {
    Down,
    Move,
    Up,
    Cancel,
    Enter,
    Leave,
}

/// A pointer event in client coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub kind: PointerEventKind,
    pub target: NodeId,
    pub position: Point,
    pub pointer_id: u32,
}

impl PointerEvent {
    #[must_use]
    pub const fn new(kind: PointerEventKind, target: NodeId, x: f64, y: f64) -> Self {
        Self {
            kind,
            target,
            position: Point::new(x, y),
            pointer_id: 1,
        }
    }

    #[must_use]
    pub const fn with_pointer_id(mut self, pointer_id: u32) -> Self {
        self.pointer_id = pointer_id;
        self
    }
}

/// Everything the host can feed into the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    Key(KeyEvent),
    Pointer(PointerEvent),
    Click { target: NodeId },
    Resize(Size),
}

impl From<KeyEvent> for InputEvent {
    fn from(event: KeyEvent) -> Self {
        Self::Key(event)
    }
}

impl From<PointerEvent> for InputEvent {
    fn from(event: PointerEvent) -> Self {
        Self::Pointer(event)
    }
}
