#![forbid(unsafe_code)]

//! Attribute names making up the DOM contract shared with collaborators.

/// Popup id, on the container.
pub const ID: &str = "data-popup-id";
/// `modal` or `toast`, on the container.
pub const SURFACE: &str = "data-popup-surface";
/// Dock name, on the container.
pub const DOCK: &str = "data-popup-dock";
/// `open` or `closed`, on the container.
pub const STATE: &str = "data-popup-state";
pub const BACKDROP: &str = "data-popup-backdrop";
pub const DIALOG: &str = "data-popup-dialog";
/// Header region: holds the title and is the default drag handle.
pub const HEADER: &str = "data-popup-header";
pub const HEADING: &str = "data-popup-heading";
pub const CONTENT: &str = "data-popup-content";
/// Any element inside a dialog carrying this closes it on click.
pub const CLOSE: &str = "data-popup-close";
/// Marks a toast dock region container.
pub const DOCK_REGION: &str = "data-popup-dock-region";
/// Marks the placeholder left behind by a move-mode teleport.
pub const PLACEHOLDER: &str = "data-popup-placeholder";
pub const DRAG_HANDLE: &str = "data-popup-drag-handle";
/// Pointer-downs inside an element carrying this never start a drag.
pub const NO_DRAG: &str = "data-no-drag";
pub const SCROLL_LOCKED: &str = "data-scroll-locked";
