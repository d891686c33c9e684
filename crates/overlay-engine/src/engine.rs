#![forbid(unsafe_code)]

//! The engine facade.
//!
//! [`PopupEngine`] owns the [`OverlayContext`] and the registry of popups it
//! created. Hosts feed it input through [`PopupEngine::dispatch`] and drive
//! toast timers through [`PopupEngine::tick`].
//!
//! # Input routing
//!
//! | Input | Receiver |
//! |-------|----------|
//! | Escape | Topmost modal, if it closes on Escape |
//! | Tab / Shift+Tab | Topmost modal with an active focus trap |
//! | Alt+arrow | Draggable popup holding focus |
//! | Pointer down | Drag handle of the popup under the pointer |
//! | Pointer move / up / cancel | Popup with an active drag gesture |
//! | Pointer enter / leave | Toast dialog (hover pause) |
//! | Click | Backdrop of the topmost modal, close buttons, open triggers |
//! | Resize | Every open draggable popup re-clamps |

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use overlay_core::{
    Clock, Document, InputEvent, KeyCode, KeyEvent, LocalStorage, MemoryStorage, Modifiers,
    NodeId, PointerEvent, PointerEventKind, SystemClock,
};
use serde_json::Value;

use crate::attr;
use crate::context::OverlayContext;
use crate::error::PopupError;
use crate::focus::TabOutcome;
use crate::options::{EngineConfig, PopupId, PopupOptions, Surface, TeleportSpec};
use crate::popup::Popup;
use crate::state::{CloseReason, Transition};

/// What an engine call acts on.
#[derive(Debug, Clone)]
pub enum PopupTarget {
    Id(PopupId),
    Popup(Popup),
    /// Creates a popup (replacing one with the same id) when opening.
    Options(Box<PopupOptions>),
}

impl From<&str> for PopupTarget {
    fn from(id: &str) -> Self {
        Self::Id(id.into())
    }
}

impl From<String> for PopupTarget {
    fn from(id: String) -> Self {
        Self::Id(id.into())
    }
}

impl From<PopupId> for PopupTarget {
    fn from(id: PopupId) -> Self {
        Self::Id(id)
    }
}

impl From<Popup> for PopupTarget {
    fn from(popup: Popup) -> Self {
        Self::Popup(popup)
    }
}

impl From<&Popup> for PopupTarget {
    fn from(popup: &Popup) -> Self {
        Self::Popup(popup.clone())
    }
}

impl From<PopupOptions> for PopupTarget {
    fn from(options: PopupOptions) -> Self {
        Self::Options(Box::new(options))
    }
}

/// Builder for [`PopupEngine`].
pub struct EngineBuilder {
    document: Rc<RefCell<Document>>,
    config: EngineConfig,
    clock: Option<Rc<dyn Clock>>,
    storage: Option<Rc<dyn LocalStorage>>,
}

impl EngineBuilder {
    #[must_use]
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Rc::new(clock));
        self
    }

    #[must_use]
    pub fn storage(mut self, storage: Rc<dyn LocalStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    #[must_use]
    pub fn build(self) -> PopupEngine {
        let clock = self.clock.unwrap_or_else(|| Rc::new(SystemClock::new()));
        let storage = self
            .storage
            .unwrap_or_else(|| Rc::new(MemoryStorage::new()));
        PopupEngine {
            ctx: OverlayContext::new(self.document, self.config, clock, storage),
            registry: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
        }
    }
}

/// Registry of popups plus input routing.
#[derive(Debug)]
pub struct PopupEngine {
    ctx: OverlayContext,
    /// Popups in creation order.
    registry: RefCell<Vec<Popup>>,
    next_id: Cell<u64>,
}

impl PopupEngine {
    /// Engine with default config, the system clock and in-memory storage.
    #[must_use]
    pub fn new(document: Rc<RefCell<Document>>) -> Self {
        Self::builder(document).build()
    }

    #[must_use]
    pub fn builder(document: Rc<RefCell<Document>>) -> EngineBuilder {
        EngineBuilder {
            document,
            config: EngineConfig::default(),
            clock: None,
            storage: None,
        }
    }

    #[must_use]
    pub fn context(&self) -> &OverlayContext {
        &self.ctx
    }

    #[must_use]
    pub fn document(&self) -> Rc<RefCell<Document>> {
        self.ctx.shared_document()
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        self.ctx.config()
    }

    // --- Registry ---

    /// Create a popup. An existing popup with the same id is destroyed first.
    pub async fn create(&self, options: PopupOptions) -> Result<Popup, PopupError> {
        let id = options.id.clone().unwrap_or_else(|| self.generate_id());
        let prior = self.take(&id);
        if let Some(prior) = prior {
            tracing::debug!(popup = %id, "replacing popup");
            prior.destroy().await;
        }
        let popup = Popup::new(self.ctx.clone(), id, options)?;
        self.registry.borrow_mut().push(popup.clone());
        Ok(popup)
    }

    fn generate_id(&self) -> PopupId {
        loop {
            let n = self.next_id.get() + 1;
            self.next_id.set(n);
            let id = PopupId::new(format!("popup-{n}"));
            if self.get(id.as_str()).is_none() {
                return id;
            }
        }
    }

    fn take(&self, id: &PopupId) -> Option<Popup> {
        let mut registry = self.registry.borrow_mut();
        let idx = registry.iter().position(|p| p.id() == id)?;
        Some(registry.remove(idx))
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<Popup> {
        self.registry
            .borrow()
            .iter()
            .find(|p| p.id() == id)
            .cloned()
    }

    /// Registered ids in creation order.
    #[must_use]
    pub fn ids(&self) -> Vec<PopupId> {
        self.registry.borrow().iter().map(|p| p.id().clone()).collect()
    }

    #[must_use]
    pub fn popups(&self) -> Vec<Popup> {
        self.registry.borrow().clone()
    }

    fn lookup(&self, target: PopupTarget) -> Result<Popup, PopupError> {
        let id = match target {
            PopupTarget::Popup(popup) => return Ok(popup),
            PopupTarget::Id(id) => id,
            PopupTarget::Options(options) => options
                .id
                .ok_or_else(|| PopupError::UnknownPopup(PopupId::new("")))?,
        };
        self.get(id.as_str()).ok_or(PopupError::UnknownPopup(id))
    }

    // --- Lifecycle wrappers ---

    /// Open by id, handle, or inline options (which create the popup).
    pub async fn open(
        &self,
        target: impl Into<PopupTarget>,
        data: Option<Value>,
    ) -> Result<Popup, PopupError> {
        let popup = match target.into() {
            PopupTarget::Options(options) => self.create(*options).await?,
            other => self.lookup(other)?,
        };
        popup.open(data).await?;
        Ok(popup)
    }

    /// Close by id or handle; `reason` defaults to programmatic.
    pub async fn close(
        &self,
        target: impl Into<PopupTarget>,
        reason: Option<CloseReason>,
    ) -> Result<Transition, PopupError> {
        let popup = self.lookup(target.into())?;
        Ok(popup
            .close(reason.unwrap_or(CloseReason::Programmatic), None)
            .await)
    }

    /// Destroy by id or handle and drop it from the registry.
    pub async fn destroy(&self, target: impl Into<PopupTarget>) -> Result<(), PopupError> {
        let popup = self.lookup(target.into())?;
        popup.destroy().await;
        self.registry.borrow_mut().retain(|p| !p.ptr_eq(&popup));
        Ok(())
    }

    /// Create and open a toast.
    pub async fn toast(&self, options: PopupOptions) -> Result<Popup, PopupError> {
        let popup = self.create(options.surface(Surface::Toast)).await?;
        popup.open(None).await?;
        Ok(popup)
    }

    /// Close every open popup, modals top-down first. Returns how many closed.
    pub async fn close_all(&self, reason: CloseReason) -> usize {
        let stacked = self.ctx.modals().ids();
        let mut order: Vec<Popup> = stacked
            .iter()
            .rev()
            .filter_map(|id| self.ctx.lookup(id))
            .collect();
        for popup in self.popups() {
            if popup.is_open() && !order.iter().any(|p| p.ptr_eq(&popup)) {
                order.push(popup);
            }
        }
        let mut closed = 0;
        for popup in order {
            if popup.close(reason, None).await == Transition::Completed {
                closed += 1;
            }
        }
        closed
    }

    // --- Time ---

    /// Fire due toast timers. Returns how many toasts closed.
    pub async fn tick(&self) -> usize {
        let now = self.ctx.clock().now();
        let mut due: Vec<(Duration, Popup)> = self
            .popups()
            .into_iter()
            .filter_map(|p| p.timer_deadline().filter(|d| *d <= now).map(|d| (d, p)))
            .collect();
        due.sort_by_key(|(deadline, _)| *deadline);

        let mut closed = 0;
        for (_, popup) in due {
            if !popup.take_due_timer(now) {
                continue;
            }
            tracing::trace!(popup = %popup.id(), "toast timer fired");
            if popup.close(CloseReason::Timeout, None).await == Transition::Completed {
                closed += 1;
            }
        }
        closed
    }

    /// Earliest pending toast deadline, for hosts that schedule ticks.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        self.popups().iter().filter_map(Popup::timer_deadline).min()
    }

    // --- Input ---

    /// Route one input event. Returns `true` when the engine consumed it
    /// (the host should suppress the default action).
    pub async fn dispatch(&self, event: impl Into<InputEvent>) -> Result<bool, PopupError> {
        match event.into() {
            InputEvent::Key(key) => Ok(self.handle_key(key).await),
            InputEvent::Pointer(pointer) => Ok(self.handle_pointer(&pointer)),
            InputEvent::Click { target } => self.handle_click(target).await,
            InputEvent::Resize(size) => {
                self.ctx.document_mut().set_viewport(size);
                for popup in self.popups() {
                    if popup.is_open() {
                        popup.reclamp();
                    }
                }
                Ok(false)
            }
        }
    }

    fn top_modal(&self) -> Option<Popup> {
        let id = self.ctx.modals().top_id().cloned()?;
        self.ctx.lookup(&id)
    }

    /// Popup whose container holds `node`.
    fn popup_at(&self, node: NodeId) -> Option<Popup> {
        let id = {
            let doc = self.ctx.document();
            let container = doc.closest_with_attribute(node, attr::ID)?;
            PopupId::from(doc.attribute(container, attr::ID)?)
        };
        self.ctx.lookup(&id)
    }

    async fn handle_key(&self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Escape => {
                let Some(top) = self.top_modal() else {
                    return false;
                };
                if !top.options().close_on_escape {
                    return false;
                }
                top.close(CloseReason::Escape, None).await;
                true
            }
            KeyCode::Tab => {
                let stacked = self.ctx.modals().ids();
                let trapping = stacked
                    .iter()
                    .rev()
                    .filter_map(|id| self.ctx.lookup(id))
                    .find(Popup::has_active_trap);
                trapping.is_some_and(|popup| {
                    popup.handle_tab(key.modifiers.contains(Modifiers::SHIFT))
                        != TabOutcome::Passthrough
                })
            }
            code if code.arrow_direction().is_some() && key.modifiers.contains(Modifiers::ALT) => {
                let focused = self.ctx.document().active_element();
                focused
                    .and_then(|node| self.popup_at(node))
                    .is_some_and(|popup| popup.drag_nudge(&key))
            }
            _ => false,
        }
    }

    fn handle_pointer(&self, event: &PointerEvent) -> bool {
        let dragging = || self.popups().into_iter().find(Popup::is_dragging);
        match event.kind {
            PointerEventKind::Down => self
                .popup_at(event.target)
                .is_some_and(|popup| popup.drag_pointer_down(event)),
            PointerEventKind::Move => dragging().is_some_and(|popup| popup.drag_pointer_move(event)),
            PointerEventKind::Up => dragging().is_some_and(|popup| popup.drag_pointer_up(event)),
            PointerEventKind::Cancel => dragging().is_some_and(|popup| popup.drag_cancel()),
            PointerEventKind::Enter | PointerEventKind::Leave => {
                let Some(popup) = self.popup_at(event.target) else {
                    return false;
                };
                if popup.surface() != Surface::Toast || event.target != popup.nodes().dialog {
                    return false;
                }
                if event.kind == PointerEventKind::Enter {
                    popup.pointer_enter()
                } else {
                    popup.pointer_leave()
                }
            }
        }
    }

    async fn handle_click(&self, target: NodeId) -> Result<bool, PopupError> {
        if let Some(popup) = self.popup_at(target) {
            let nodes = popup.nodes();
            if Some(target) == nodes.backdrop {
                let is_top = self.ctx.modals().is_top(popup.id());
                if is_top && popup.options().close_on_backdrop {
                    popup.close(CloseReason::Backdrop, None).await;
                    return Ok(true);
                }
                return Ok(false);
            }
            let closer = {
                let doc = self.ctx.document();
                doc.closest_with_attribute(target, attr::CLOSE)
                    .filter(|closer| doc.contains(nodes.dialog, *closer))
            };
            if closer.is_some() {
                popup.close(CloseReason::CloseButton, None).await;
                return Ok(true);
            }
        }

        if !self.ctx.config().declarative {
            return Ok(false);
        }
        let trigger = {
            let doc = self.ctx.document();
            let open_attribute = self.ctx.config().open_attribute.as_str();
            doc.closest_with_attribute(target, open_attribute)
                .and_then(|t| doc.attribute(t, open_attribute).map(|id| (t, id.to_owned())))
        };
        let Some((trigger, id)) = trigger else {
            return Ok(false);
        };
        self.open_declarative(trigger, &id).await?;
        Ok(true)
    }

    /// Open `id`, creating a modal that teleports the element `#id` if no
    /// popup is registered under it yet.
    async fn open_declarative(&self, trigger: NodeId, id: &str) -> Result<(), PopupError> {
        if let Some(popup) = self.get(id) {
            popup.open(None).await?;
            return Ok(());
        }
        let title = {
            let doc = self.ctx.document();
            doc.attribute(trigger, &self.ctx.config().title_attribute)
                .map(str::to_owned)
        };
        let mut options = PopupOptions::modal()
            .id(id)
            .content(TeleportSpec::element_id(id));
        if let Some(title) = title {
            options = options.title(title);
        }
        tracing::debug!(popup = id, "declarative open");
        let popup = self.create(options).await?;
        popup.open(None).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use overlay_core::ManualClock;

    fn engine() -> PopupEngine {
        PopupEngine::builder(Rc::new(RefCell::new(Document::default())))
            .clock(ManualClock::new())
            .build()
    }

    #[test]
    fn generated_ids_are_sequential_and_unique() {
        let engine = engine();
        let a = pollster::block_on(engine.create(PopupOptions::modal())).unwrap();
        let b = pollster::block_on(engine.create(PopupOptions::modal())).unwrap();
        assert_eq!(a.id().as_str(), "popup-1");
        assert_eq!(b.id().as_str(), "popup-2");
        assert_eq!(engine.ids(), vec![a.id().clone(), b.id().clone()]);
    }

    #[test]
    fn create_replaces_same_id() {
        let engine = engine();
        let first = pollster::block_on(engine.create(PopupOptions::modal().id("m"))).unwrap();
        let second = pollster::block_on(engine.create(PopupOptions::modal().id("m"))).unwrap();
        assert_eq!(first.state(), crate::PopupState::Destroyed);
        assert!(engine.get("m").unwrap().ptr_eq(&second));
        assert_eq!(engine.ids().len(), 1);
    }

    #[test]
    fn unknown_ids_are_errors() {
        let engine = engine();
        let err = pollster::block_on(engine.close("nope", None)).unwrap_err();
        assert!(matches!(err, PopupError::UnknownPopup(id) if id == "nope"));
    }

    #[test]
    fn destroy_drops_from_registry() {
        let engine = engine();
        pollster::block_on(engine.create(PopupOptions::modal().id("m"))).unwrap();
        pollster::block_on(engine.destroy("m")).unwrap();
        assert!(engine.get("m").is_none());
        assert!(engine.ids().is_empty());
    }
}
