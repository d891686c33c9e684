#![forbid(unsafe_code)]

//! Host boundary primitives for the overlay engine.
//!
//! The overlay engine never talks to a browser directly. Everything it needs
//! from the page is expressed through the types in this crate:
//!
//! - [`geometry`]: points, sizes and rectangles in CSS pixels.
//! - [`event`]: keyboard, pointer, click and resize input delivered by the host.
//! - [`dom`]: a headless, arena-allocated [`Document`](dom::Document) that
//!   models the subset of the DOM the engine mutates.
//! - [`clock`]: monotonic time, real ([`SystemClock`](clock::SystemClock)) or
//!   driven by hand ([`ManualClock`](clock::ManualClock)).
//! - [`storage`]: client-local key/value storage.

pub mod clock;
pub mod dom;
pub mod event;
pub mod geometry;
pub mod storage;

pub use clock::{Clock, ManualClock, SystemClock};
pub use dom::{Document, DomError, NodeId};
pub use event::{InputEvent, KeyCode, KeyEvent, Modifiers, PointerEvent, PointerEventKind};
pub use geometry::{Point, Rect, Size};
pub use storage::{LocalStorage, MemoryStorage, StorageError};
