#![forbid(unsafe_code)]

//! Modal and toast overlays over a headless document.
//!
//! A [`PopupEngine`] owns every popup it creates and routes host input to
//! them. Each [`Popup`] runs the lifecycle `Idle -> Opening -> Open ->
//! Closing -> Idle`, with `Destroyed` reachable from anywhere. Open and close
//! pass through interceptors (option hooks, then subscribers) that may veto,
//! synchronously or after an `await`.
//!
//! Modals share one [`ModalManager`] stack: z-index, background inertness and
//! scroll locking are recomputed from it after every push and pop. Toasts live
//! in per-dock regions managed by [`ToastDockManager`], with a visible cap and
//! an auto-dismiss timer driven by [`PopupEngine::tick`].
//!
//! # Example
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use overlay_core::{Document, KeyCode, KeyEvent, ManualClock};
//! use overlay_engine::{PopupEngine, PopupOptions, PopupState};
//!
//! let document = Rc::new(RefCell::new(Document::default()));
//! let engine = PopupEngine::builder(document)
//!     .clock(ManualClock::new())
//!     .build();
//!
//! pollster::block_on(async {
//!     let popup = engine
//!         .open(PopupOptions::modal().id("confirm").content("Delete?"), None)
//!         .await
//!         .unwrap();
//!     assert_eq!(popup.state(), PopupState::Open);
//!
//!     engine.dispatch(KeyEvent::new(KeyCode::Escape)).await.unwrap();
//!     assert_eq!(popup.state(), PopupState::Idle);
//! });
//! ```

pub mod attr;
pub mod context;
pub mod dock;
pub mod drag;
pub mod engine;
pub mod error;
pub mod events;
pub mod focus;
pub mod inert;
pub mod intercept;
pub mod options;
pub mod plugin;
pub mod popup;
pub mod scroll_lock;
pub mod stack;
pub mod state;
pub mod teleport;
pub mod timer;

pub use context::OverlayContext;
pub use dock::{EvictionPolicy, ToastDockManager};
pub use drag::{DragController, PersistError, StoredPosition};
pub use engine::{EngineBuilder, PopupEngine, PopupTarget};
pub use error::PopupError;
pub use events::{Handler, ListenerId, PopupEvent, PopupEventKind};
pub use focus::{FocusTrap, TabOutcome};
pub use intercept::{Interception, Verdict};
pub use options::{
    AriaLive, ContentSpec, Dock, DragAxis, DragOptions, EngineConfig, HoverPause, InitialFocus,
    PopupId, PopupOptions, Surface, TeleportMode, TeleportSpec, TeleportTarget, ToastOptions,
};
pub use plugin::PopupPlugin;
pub use popup::{Popup, PopupNodes};
pub use stack::{ModalManager, ModalPolicy};
pub use state::{CloseReason, PopupState, Transition};
pub use teleport::{TeleportError, TeleportRegistry};
