#![forbid(unsafe_code)]

//! Popup and engine configuration.
//!
//! [`PopupOptions`] is a builder in the style of a widget config: start from
//! [`PopupOptions::modal`] or [`PopupOptions::toast`] and chain setters.
//! [`EngineConfig`] holds engine-wide settings and deserializes from JSON
//! with every field defaulted.

use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use overlay_core::NodeId;
use serde::{Deserialize, Serialize};

use crate::events::{Handler, PopupEvent};
use crate::intercept::Interception;
use crate::plugin::PopupPlugin;

/// Unique string key of a popup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PopupId(String);

impl PopupId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PopupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PopupId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for PopupId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl PartialEq<str> for PopupId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for PopupId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Kind of overlay. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Surface {
    Modal,
    Toast,
}

impl Surface {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Modal => "modal",
            Self::Toast => "toast",
        }
    }

    #[must_use]
    pub fn default_dock(self) -> Dock {
        match self {
            Self::Modal => Dock::Center,
            Self::Toast => Dock::TopRight,
        }
    }
}

/// Screen region a surface is anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Dock {
    Center,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    TopCenter,
    BottomCenter,
}

impl Dock {
    pub const ALL: [Self; 7] = [
        Self::Center,
        Self::TopLeft,
        Self::TopRight,
        Self::BottomLeft,
        Self::BottomRight,
        Self::TopCenter,
        Self::BottomCenter,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Center => "center",
            Self::TopLeft => "top-left",
            Self::TopRight => "top-right",
            Self::BottomLeft => "bottom-left",
            Self::BottomRight => "bottom-right",
            Self::TopCenter => "top-center",
            Self::BottomCenter => "bottom-center",
        }
    }

    /// Inline style declarations anchoring a dock region container.
    #[must_use]
    pub(crate) fn anchor_styles(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Self::Center => &[("top", "50%"), ("left", "50%"), ("transform", "translate(-50%, -50%)")],
            Self::TopLeft => &[("top", "0"), ("left", "0")],
            Self::TopRight => &[("top", "0"), ("right", "0")],
            Self::BottomLeft => &[("bottom", "0"), ("left", "0")],
            Self::BottomRight => &[("bottom", "0"), ("right", "0")],
            Self::TopCenter => &[("top", "0"), ("left", "50%"), ("transform", "translateX(-50%)")],
            Self::BottomCenter => &[("bottom", "0"), ("left", "50%"), ("transform", "translateX(-50%)")],
        }
    }
}

// ---------------------------------------------------------------------------
// Content
// ---------------------------------------------------------------------------

/// How a teleported node reaches the popup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TeleportMode {
    /// Move the node itself, leaving a placeholder behind.
    #[default]
    Move,
    /// Append a deep clone and leave the original untouched.
    Clone,
}

/// Node to teleport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TeleportTarget {
    Node(NodeId),
    /// Resolved through the `id` attribute when the content is applied.
    ElementId(String),
}

/// Teleport descriptor accepted by [`ContentSpec::Teleport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeleportSpec {
    pub target: TeleportTarget,
    pub mode: TeleportMode,
    pub preserve_size: bool,
    /// `false` hands the node to the popup for good.
    pub restore: bool,
    /// Skip restoration on close; the node waits inside the hidden popup.
    pub keep_alive: bool,
}

impl TeleportSpec {
    #[must_use]
    pub fn node(node: NodeId) -> Self {
        Self::new(TeleportTarget::Node(node))
    }

    #[must_use]
    pub fn element_id(id: impl Into<String>) -> Self {
        Self::new(TeleportTarget::ElementId(id.into()))
    }

    fn new(target: TeleportTarget) -> Self {
        Self {
            target,
            mode: TeleportMode::Move,
            preserve_size: false,
            restore: true,
            keep_alive: false,
        }
    }

    #[must_use]
    pub fn mode(mut self, mode: TeleportMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn preserve_size(mut self, preserve: bool) -> Self {
        self.preserve_size = preserve;
        self
    }

    #[must_use]
    pub fn restore(mut self, restore: bool) -> Self {
        self.restore = restore;
        self
    }

    #[must_use]
    pub fn keep_alive(mut self, keep_alive: bool) -> Self {
        self.keep_alive = keep_alive;
        self
    }
}

/// Popup content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSpec {
    /// Inserted as a text node; the engine does not parse markup.
    Markup(String),
    /// An existing node, appended as-is.
    Node(NodeId),
    Teleport(TeleportSpec),
}

impl From<&str> for ContentSpec {
    fn from(markup: &str) -> Self {
        Self::Markup(markup.to_owned())
    }
}

impl From<String> for ContentSpec {
    fn from(markup: String) -> Self {
        Self::Markup(markup)
    }
}

impl From<NodeId> for ContentSpec {
    fn from(node: NodeId) -> Self {
        Self::Node(node)
    }
}

impl From<TeleportSpec> for ContentSpec {
    fn from(spec: TeleportSpec) -> Self {
        Self::Teleport(spec)
    }
}

// ---------------------------------------------------------------------------
// Focus, toast, drag
// ---------------------------------------------------------------------------

/// Where focus lands when a trapped modal opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InitialFocus {
    /// First focusable descendant, falling back to the dialog.
    #[default]
    FirstFocusable,
    Dialog,
    Node(NodeId),
}

/// Hover pause/resume policy for toast timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoverPause {
    /// One pause/resume cycle per open.
    #[default]
    Once,
    EveryHover,
}

/// `aria-live` politeness of a toast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AriaLive {
    Off,
    #[default]
    Polite,
    Assertive,
}

impl AriaLive {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Polite => "polite",
            Self::Assertive => "assertive",
        }
    }
}

/// Toast-only settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToastOptions {
    /// Zero disables auto-dismiss.
    pub duration: Duration,
    /// Cap per dock. Zero disables the cap.
    pub max_visible: usize,
    pub pause_on_hover: bool,
    pub hover_pause: HoverPause,
    pub dismiss_newest_first: bool,
    pub aria_live: AriaLive,
    pub aria_atomic: bool,
}

impl Default for ToastOptions {
    fn default() -> Self {
        Self {
            duration: Duration::from_millis(5000),
            max_visible: 5,
            pause_on_hover: true,
            hover_pause: HoverPause::Once,
            dismiss_newest_first: false,
            aria_live: AriaLive::Polite,
            aria_atomic: true,
        }
    }
}

/// Axis a drag may move along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DragAxis {
    #[default]
    Both,
    X,
    Y,
}

impl DragAxis {
    #[must_use]
    pub fn allows_x(self) -> bool {
        matches!(self, Self::Both | Self::X)
    }

    #[must_use]
    pub fn allows_y(self) -> bool {
        matches!(self, Self::Both | Self::Y)
    }
}

/// Draggable positioning settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DragOptions {
    /// Attribute marking the handle; falls back to the header, then the dialog.
    pub handle_attribute: Option<String>,
    pub axis: DragAxis,
    pub padding: f64,
    pub snap: bool,
    pub snap_threshold: f64,
    /// Local-storage key for the final position.
    pub persist_key: Option<String>,
    pub keyboard: bool,
    pub step: f64,
    pub fine_step: f64,
}

impl Default for DragOptions {
    fn default() -> Self {
        Self {
            handle_attribute: None,
            axis: DragAxis::Both,
            padding: 8.0,
            snap: true,
            snap_threshold: 16.0,
            persist_key: None,
            keyboard: true,
            step: 10.0,
            fine_step: 1.0,
        }
    }
}

impl DragOptions {
    #[must_use]
    pub fn handle_attribute(mut self, name: impl Into<String>) -> Self {
        self.handle_attribute = Some(name.into());
        self
    }

    #[must_use]
    pub fn axis(mut self, axis: DragAxis) -> Self {
        self.axis = axis;
        self
    }

    #[must_use]
    pub fn padding(mut self, padding: f64) -> Self {
        self.padding = padding;
        self
    }

    #[must_use]
    pub fn snap(mut self, snap: bool) -> Self {
        self.snap = snap;
        self
    }

    #[must_use]
    pub fn persist_key(mut self, key: impl Into<String>) -> Self {
        self.persist_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn keyboard(mut self, keyboard: bool) -> Self {
        self.keyboard = keyboard;
        self
    }
}

// ---------------------------------------------------------------------------
// PopupOptions
// ---------------------------------------------------------------------------

/// Configuration snapshot of a popup, immutable after construction.
#[derive(Clone)]
pub struct PopupOptions {
    pub id: Option<PopupId>,
    pub surface: Surface,
    /// `None` picks the surface default.
    pub dock: Option<Dock>,
    pub title: Option<String>,
    pub close_button: bool,
    /// Defaults to the body.
    pub mount: Option<NodeId>,
    pub content: Option<ContentSpec>,
    pub trap_focus: bool,
    pub initial_focus: InitialFocus,
    pub return_focus: bool,
    /// Focus target on close, overriding the remembered element.
    pub final_focus: Option<NodeId>,
    pub close_on_escape: bool,
    pub close_on_backdrop: bool,
    pub lock_scroll: bool,
    pub inert_background: bool,
    pub stacking: bool,
    pub pause_media_on_close: bool,
    pub drag: Option<DragOptions>,
    pub toast: ToastOptions,
    pub before_open: Option<Handler>,
    pub before_close: Option<Handler>,
    pub plugins: Vec<Rc<dyn PopupPlugin>>,
}

impl Default for PopupOptions {
    fn default() -> Self {
        Self::modal()
    }
}

impl PopupOptions {
    /// Modal defaults.
    #[must_use]
    pub fn modal() -> Self {
        Self {
            id: None,
            surface: Surface::Modal,
            dock: None,
            title: None,
            close_button: true,
            mount: None,
            content: None,
            trap_focus: true,
            initial_focus: InitialFocus::FirstFocusable,
            return_focus: true,
            final_focus: None,
            close_on_escape: true,
            close_on_backdrop: true,
            lock_scroll: true,
            inert_background: true,
            stacking: true,
            pause_media_on_close: true,
            drag: None,
            toast: ToastOptions::default(),
            before_open: None,
            before_close: None,
            plugins: Vec::new(),
        }
    }

    /// Toast defaults.
    #[must_use]
    pub fn toast() -> Self {
        Self {
            surface: Surface::Toast,
            ..Self::modal()
        }
        .resolved()
    }

    /// Apply surface-aware defaults. Toasts never block the page, whatever
    /// the caller asked for.
    #[must_use]
    pub fn resolved(mut self) -> Self {
        if self.dock.is_none() {
            self.dock = Some(self.surface.default_dock());
        }
        if self.surface == Surface::Toast {
            self.lock_scroll = false;
            self.inert_background = false;
            self.trap_focus = false;
            self.return_focus = false;
            self.close_on_backdrop = false;
        }
        self
    }

    /// Dock after defaults.
    #[must_use]
    pub fn effective_dock(&self) -> Dock {
        self.dock.unwrap_or_else(|| self.surface.default_dock())
    }

    #[must_use]
    pub fn id(mut self, id: impl Into<PopupId>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn surface(mut self, surface: Surface) -> Self {
        self.surface = surface;
        self
    }

    #[must_use]
    pub fn dock(mut self, dock: Dock) -> Self {
        self.dock = Some(dock);
        self
    }

    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn close_button(mut self, close_button: bool) -> Self {
        self.close_button = close_button;
        self
    }

    #[must_use]
    pub fn mount(mut self, node: NodeId) -> Self {
        self.mount = Some(node);
        self
    }

    #[must_use]
    pub fn content(mut self, content: impl Into<ContentSpec>) -> Self {
        self.content = Some(content.into());
        self
    }

    #[must_use]
    pub fn trap_focus(mut self, trap: bool) -> Self {
        self.trap_focus = trap;
        self
    }

    #[must_use]
    pub fn initial_focus(mut self, focus: InitialFocus) -> Self {
        self.initial_focus = focus;
        self
    }

    #[must_use]
    pub fn return_focus(mut self, restore: bool) -> Self {
        self.return_focus = restore;
        self
    }

    #[must_use]
    pub fn final_focus(mut self, node: NodeId) -> Self {
        self.final_focus = Some(node);
        self
    }

    #[must_use]
    pub fn close_on_escape(mut self, close: bool) -> Self {
        self.close_on_escape = close;
        self
    }

    #[must_use]
    pub fn close_on_backdrop(mut self, close: bool) -> Self {
        self.close_on_backdrop = close;
        self
    }

    #[must_use]
    pub fn lock_scroll(mut self, lock: bool) -> Self {
        self.lock_scroll = lock;
        self
    }

    #[must_use]
    pub fn inert_background(mut self, inert: bool) -> Self {
        self.inert_background = inert;
        self
    }

    #[must_use]
    pub fn stacking(mut self, stacking: bool) -> Self {
        self.stacking = stacking;
        self
    }

    #[must_use]
    pub fn pause_media_on_close(mut self, pause: bool) -> Self {
        self.pause_media_on_close = pause;
        self
    }

    #[must_use]
    pub fn draggable(mut self, drag: DragOptions) -> Self {
        self.drag = Some(drag);
        self
    }

    #[must_use]
    pub fn duration(mut self, duration: Duration) -> Self {
        self.toast.duration = duration;
        self
    }

    #[must_use]
    pub fn max_visible(mut self, max: usize) -> Self {
        self.toast.max_visible = max;
        self
    }

    #[must_use]
    pub fn pause_on_hover(mut self, pause: bool) -> Self {
        self.toast.pause_on_hover = pause;
        self
    }

    #[must_use]
    pub fn hover_pause(mut self, policy: HoverPause) -> Self {
        self.toast.hover_pause = policy;
        self
    }

    #[must_use]
    pub fn dismiss_newest_first(mut self, newest: bool) -> Self {
        self.toast.dismiss_newest_first = newest;
        self
    }

    #[must_use]
    pub fn aria_live(mut self, live: AriaLive) -> Self {
        self.toast.aria_live = live;
        self
    }

    #[must_use]
    pub fn aria_atomic(mut self, atomic: bool) -> Self {
        self.toast.aria_atomic = atomic;
        self
    }

    /// Interceptor run before subscribers on `open()`.
    #[must_use]
    pub fn before_open<F, R>(mut self, hook: F) -> Self
    where
        F: Fn(&PopupEvent) -> R + 'static,
        R: Into<Interception>,
    {
        self.before_open = Some(Handler::new(hook));
        self
    }

    /// Interceptor run before subscribers on `close()`.
    #[must_use]
    pub fn before_close<F, R>(mut self, hook: F) -> Self
    where
        F: Fn(&PopupEvent) -> R + 'static,
        R: Into<Interception>,
    {
        self.before_close = Some(Handler::new(hook));
        self
    }

    #[must_use]
    pub fn plugin(mut self, plugin: impl PopupPlugin + 'static) -> Self {
        self.plugins.push(Rc::new(plugin));
        self
    }
}

impl fmt::Debug for PopupOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PopupOptions")
            .field("id", &self.id)
            .field("surface", &self.surface)
            .field("dock", &self.dock)
            .field("title", &self.title)
            .field("content", &self.content)
            .field("trap_focus", &self.trap_focus)
            .field("close_on_escape", &self.close_on_escape)
            .field("close_on_backdrop", &self.close_on_backdrop)
            .field("lock_scroll", &self.lock_scroll)
            .field("inert_background", &self.inert_background)
            .field("stacking", &self.stacking)
            .field("drag", &self.drag)
            .field("toast", &self.toast)
            .field("plugins", &self.plugins.iter().map(|p| p.name()).collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// EngineConfig
// ---------------------------------------------------------------------------

/// Engine-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// z-index of the bottom modal.
    pub modal_base_z: i32,
    /// z-index distance between stacked modals.
    pub modal_z_step: i32,
    /// Base z-index of toast dock regions.
    pub toast_dock_z: i32,
    /// Open popups from clicks on trigger elements.
    pub declarative: bool,
    pub open_attribute: String,
    pub title_attribute: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            modal_base_z: crate::stack::BASE_MODAL_Z,
            modal_z_step: crate::stack::Z_INCREMENT,
            toast_dock_z: 2000,
            declarative: true,
            open_attribute: "data-popup-open".to_owned(),
            title_attribute: "data-popup-title".to_owned(),
        }
    }
}

impl EngineConfig {
    /// Parse from JSON; absent fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn toast_defaults_never_block_the_page() {
        let opts = PopupOptions::modal()
            .surface(Surface::Toast)
            .lock_scroll(true)
            .inert_background(true)
            .trap_focus(true)
            .close_on_backdrop(true)
            .resolved();
        assert!(!opts.lock_scroll);
        assert!(!opts.inert_background);
        assert!(!opts.trap_focus);
        assert!(!opts.return_focus);
        assert!(!opts.close_on_backdrop);
        assert_eq!(opts.dock, Some(Dock::TopRight));
    }

    #[test]
    fn modal_defaults() {
        let opts = PopupOptions::modal().resolved();
        assert_eq!(opts.dock, Some(Dock::Center));
        assert!(opts.trap_focus && opts.return_focus && opts.lock_scroll);
        assert!(opts.close_on_escape && opts.close_on_backdrop && opts.stacking);
    }

    #[test]
    fn toast_options_defaults() {
        let toast = ToastOptions::default();
        assert_eq!(toast.duration, Duration::from_millis(5000));
        assert_eq!(toast.max_visible, 5);
        assert!(toast.pause_on_hover);
        assert_eq!(toast.hover_pause, HoverPause::Once);
        assert_eq!(toast.aria_live, AriaLive::Polite);
    }

    #[test]
    fn engine_config_partial_json_keeps_defaults() {
        let config = EngineConfig::from_json(r#"{"modal_base_z": 50, "declarative": false}"#).unwrap();
        assert_eq!(
            config,
            EngineConfig {
                modal_base_z: 50,
                declarative: false,
                ..EngineConfig::default()
            }
        );
    }

    #[test]
    fn drag_options_deserialize_with_defaults() {
        let drag: DragOptions = serde_json::from_str(r#"{"axis": "x", "persist_key": "k"}"#).unwrap();
        assert_eq!(drag.axis, DragAxis::X);
        assert_eq!(drag.persist_key.as_deref(), Some("k"));
        assert_eq!(drag.padding, 8.0);
        assert_eq!(drag.snap_threshold, 16.0);
    }

    #[test]
    fn dock_names() {
        let names: Vec<_> = Dock::ALL.iter().map(|d| d.as_str()).collect();
        assert_eq!(
            names,
            vec!["center", "top-left", "top-right", "bottom-left", "bottom-right", "top-center", "bottom-center"]
        );
    }
}
