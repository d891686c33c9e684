#![forbid(unsafe_code)]

//! A single overlay instance.
//!
//! A [`Popup`] owns its DOM skeleton and drives it through the lifecycle
//! state machine:
//!
//! ```text
//! <div data-popup-id data-popup-surface data-popup-dock data-popup-state>
//!   <div data-popup-backdrop/>                      (modal only)
//!   <div data-popup-dialog role=dialog|status>
//!     <div data-popup-header>                       (title or close button)
//!       <h2 data-popup-heading/> <button data-popup-close/>
//!     </div>
//!     <div data-popup-content/>
//!   </div>
//! </div>
//! ```
//!
//! # Transitions
//!
//! `open()` and `close()` suspend only while their interceptor chain
//! resolves. Everything after that (stack and dock membership, scroll lock,
//! inert marking, focus, timers) is applied synchronously, so no other
//! transition can observe a half-applied state. After each suspension the
//! state is checked again: a `destroy()` that ran in the meantime wins and
//! the pending call resolves as [`Transition::Ignored`].
//!
//! # Failure Modes
//!
//! | Failure | Behavior |
//! |---------|----------|
//! | `open()` after `destroy()` | `Err(PopupError::Destroyed)` |
//! | Teleport target missing at open | `Err`, popup stays `Idle` |
//! | Focus restore fails | Logged, close still completes |
//! | Position persistence fails | Logged, drag still completes |

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;

use overlay_core::{Document, DomError, KeyEvent, NodeId, Point, PointerEvent};
use serde_json::Value;
use tracing::Instrument;

use crate::attr;
use crate::context::OverlayContext;
use crate::dock::EvictionPolicy;
use crate::drag::DragController;
use crate::error::{PopupError, best_effort};
use crate::events::{Handler, ListenerId, Listeners, PopupEvent, PopupEventKind};
use crate::focus::{self, FocusTrap, TabOutcome};
use crate::intercept::{Interception, Interceptor, Verdict, run_chain};
use crate::options::{
    AriaLive, ContentSpec, Dock, PopupId, PopupOptions, Surface, TeleportSpec, TeleportTarget,
};
use crate::stack::ModalPolicy;
use crate::state::{CloseReason, PopupState, Request, Transition};
use crate::timer::ToastTimer;

/// DOM handles owned by a popup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopupNodes {
    pub container: NodeId,
    pub backdrop: Option<NodeId>,
    pub dialog: NodeId,
    pub header: Option<NodeId>,
    pub close_button: Option<NodeId>,
    pub content: NodeId,
}

#[derive(Debug, Clone, Copy)]
struct TeleportBinding {
    node: NodeId,
    restore: bool,
    keep_alive: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RestoreMode {
    Close,
    Replace,
    Destroy,
}

struct PopupInner {
    id: PopupId,
    options: PopupOptions,
    ctx: OverlayContext,
    nodes: PopupNodes,
    state: Cell<PopupState>,
    content: RefCell<Option<ContentSpec>>,
    teleported: Cell<Option<TeleportBinding>>,
    remembered_focus: Cell<Option<NodeId>>,
    last_close_reason: Cell<Option<CloseReason>>,
    trap: RefCell<Option<FocusTrap>>,
    timer: RefCell<Option<ToastTimer>>,
    drag: RefCell<Option<DragController>>,
    listeners: RefCell<Listeners>,
}

/// Handle to a popup. Clones refer to the same instance.
#[derive(Clone)]
pub struct Popup {
    inner: Rc<PopupInner>,
}

/// Non-owning handle, used by the context directory.
#[derive(Debug, Clone)]
pub(crate) struct WeakPopup(Weak<PopupInner>);

impl WeakPopup {
    pub(crate) fn upgrade(&self) -> Option<Popup> {
        self.0.upgrade().map(|inner| Popup { inner })
    }

    pub(crate) fn points_to(&self, popup: &Popup) -> bool {
        std::ptr::eq(self.0.as_ptr(), Rc::as_ptr(&popup.inner))
    }
}

impl Popup {
    /// Build the DOM skeleton and attach drag, focus trap, content and
    /// plugins. Options are resolved against the surface defaults.
    pub(crate) fn new(
        ctx: OverlayContext,
        id: PopupId,
        options: PopupOptions,
    ) -> Result<Self, PopupError> {
        let options = options.resolved();
        let nodes = {
            let mut doc = ctx.document_mut();
            let mount = options.mount.unwrap_or_else(|| doc.body());
            if !doc.is_connected(mount) {
                return Err(PopupError::MountPointMissing(mount));
            }
            let nodes = build_skeleton(&mut doc, &id, &options)?;
            // Toasts are mounted by their dock on open.
            if options.surface == Surface::Modal {
                doc.append_child(mount, nodes.container)?;
            }
            nodes
        };

        let drag = options.drag.clone().map(|drag_options| {
            let mut doc = ctx.document_mut();
            let mut controller =
                DragController::new(&mut doc, nodes.dialog, options.surface, drag_options);
            best_effort("drag position load", controller.load(&mut doc, ctx.storage()));
            controller
        });
        let trap = (options.surface == Surface::Modal && options.trap_focus)
            .then(|| FocusTrap::new(nodes.dialog));
        let content = options.content.clone();

        let popup = Self {
            inner: Rc::new(PopupInner {
                id,
                options,
                ctx,
                nodes,
                state: Cell::new(PopupState::Idle),
                content: RefCell::new(None),
                teleported: Cell::new(None),
                remembered_focus: Cell::new(None),
                last_close_reason: Cell::new(None),
                trap: RefCell::new(trap),
                timer: RefCell::new(None),
                drag: RefCell::new(drag),
                listeners: RefCell::new(Listeners::default()),
            }),
        };

        if let Some(content) = content
            && let Err(err) = popup.set_content(content)
        {
            popup.inner.ctx.document_mut().remove(nodes.container);
            return Err(err);
        }

        popup.inner.ctx.register(&popup);
        for plugin in &popup.inner.options.plugins {
            tracing::debug!(popup = %popup.id(), plugin = plugin.name(), "plugin installed");
            plugin.install(&popup);
        }
        tracing::debug!(
            popup = %popup.id(),
            surface = popup.surface().as_str(),
            dock = popup.dock().as_str(),
            "popup created"
        );
        Ok(popup)
    }

    // --- Accessors ---

    #[must_use]
    pub fn id(&self) -> &PopupId {
        &self.inner.id
    }

    #[must_use]
    pub fn surface(&self) -> Surface {
        self.inner.options.surface
    }

    #[must_use]
    pub fn dock(&self) -> Dock {
        self.inner.options.effective_dock()
    }

    #[must_use]
    pub fn state(&self) -> PopupState {
        self.inner.state.get()
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state() == PopupState::Open
    }

    /// Resolved configuration snapshot.
    #[must_use]
    pub fn options(&self) -> &PopupOptions {
        &self.inner.options
    }

    #[must_use]
    pub fn nodes(&self) -> PopupNodes {
        self.inner.nodes
    }

    #[must_use]
    pub fn context(&self) -> &OverlayContext {
        &self.inner.ctx
    }

    /// Reason of the most recent completed close.
    #[must_use]
    pub fn last_close_reason(&self) -> Option<CloseReason> {
        self.inner.last_close_reason.get()
    }

    /// Current drag offset, for draggable popups.
    #[must_use]
    pub fn drag_offset(&self) -> Option<Point> {
        self.inner.drag.borrow().as_ref().map(DragController::offset)
    }

    /// Auto-dismiss time left, for open toasts with a running timer.
    #[must_use]
    pub fn toast_remaining(&self) -> Option<Duration> {
        let now = self.inner.ctx.clock().now();
        self.inner.timer.borrow().as_ref().map(|t| t.remaining(now))
    }

    /// Whether two handles refer to the same popup.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn downgrade(&self) -> WeakPopup {
        WeakPopup(Rc::downgrade(&self.inner))
    }

    // --- Subscriptions ---

    /// Subscribe to `kind`. For `BeforeOpen`/`BeforeClose` the handler's
    /// result is a verdict; for every other event it is ignored.
    pub fn on<F, R>(&self, kind: PopupEventKind, handler: F) -> ListenerId
    where
        F: Fn(&PopupEvent) -> R + 'static,
        R: Into<Interception>,
    {
        self.inner.listeners.borrow_mut().add(kind, Handler::new(handler))
    }

    pub fn off(&self, kind: PopupEventKind, id: ListenerId) -> bool {
        self.inner.listeners.borrow_mut().remove(kind, id)
    }

    #[must_use]
    pub fn listener_count(&self, kind: PopupEventKind) -> usize {
        self.inner.listeners.borrow().len(kind)
    }

    fn event(
        &self,
        kind: PopupEventKind,
        reason: Option<CloseReason>,
        data: Option<Value>,
        position: Option<Point>,
    ) -> PopupEvent {
        PopupEvent {
            kind,
            popup: self.clone(),
            reason,
            data,
            position,
        }
    }

    /// Notify subscribers of a non-cancelable event.
    fn emit(
        &self,
        kind: PopupEventKind,
        reason: Option<CloseReason>,
        data: Option<Value>,
        position: Option<Point>,
    ) {
        let handlers = self.inner.listeners.borrow().snapshot(kind);
        if handlers.is_empty() {
            return;
        }
        let event = self.event(kind, reason, data, position);
        for handler in handlers {
            // Verdicts of non-cancelable events are dropped unpolled.
            drop(handler.call(&event));
        }
    }

    /// Run the before-hook and then the subscribers of a cancelable event.
    async fn intercept(
        &self,
        kind: PopupEventKind,
        reason: Option<CloseReason>,
        data: Option<Value>,
    ) -> Verdict {
        let hook = match kind {
            PopupEventKind::BeforeOpen => self.inner.options.before_open.as_ref(),
            PopupEventKind::BeforeClose => self.inner.options.before_close.as_ref(),
            _ => None,
        };
        let subscribers = self.inner.listeners.borrow().snapshot(kind);
        let stages: Vec<Interceptor<PopupEvent>> = hook
            .into_iter()
            .chain(subscribers.iter())
            .map(Handler::as_interceptor)
            .collect();
        if stages.is_empty() {
            return Verdict::Proceed;
        }
        let event = self.event(kind, reason, data, None);
        run_chain(&stages, &event).await
    }

    fn advance(&self, request: Request) -> bool {
        let from = self.state();
        let Some(to) = from.transition(request) else {
            return false;
        };
        self.inner.state.set(to);
        tracing::trace!(
            popup = %self.id(),
            from = from.as_str(),
            to = to.as_str(),
            "state transition"
        );
        true
    }

    // --- Lifecycle ---

    /// Open the popup.
    ///
    /// Resolves `Ignored` when already open or a transition is in flight,
    /// `Vetoed` when an interceptor cancelled, `Completed` otherwise.
    pub async fn open(&self, data: Option<Value>) -> Result<Transition, PopupError> {
        let span = tracing::debug_span!("popup_open", popup = %self.id());
        self.open_inner(data).instrument(span).await
    }

    async fn open_inner(&self, data: Option<Value>) -> Result<Transition, PopupError> {
        if self.state() == PopupState::Destroyed {
            return Err(PopupError::Destroyed(self.id().clone()));
        }
        if !self.advance(Request::BeginOpen) {
            tracing::trace!(state = self.state().as_str(), "open ignored");
            return Ok(Transition::Ignored);
        }

        let verdict = self
            .intercept(PopupEventKind::BeforeOpen, None, data.clone())
            .await;
        if self.state() != PopupState::Opening {
            return Ok(Transition::Ignored);
        }
        if verdict == Verdict::Cancel {
            self.advance(Request::AbortOpen);
            tracing::debug!(popup = %self.id(), "open vetoed");
            return Ok(Transition::Vetoed);
        }

        let evicted = match self.commit_open() {
            Ok(evicted) => evicted,
            Err(err) => {
                self.advance(Request::AbortOpen);
                return Err(err);
            }
        };
        for id in evicted {
            if let Some(victim) = self.inner.ctx.lookup(&id) {
                victim.evict().await;
            }
        }

        self.emit(PopupEventKind::AfterOpen, None, data.clone(), None);
        self.emit(PopupEventKind::Open, None, data, None);
        Ok(Transition::Completed)
    }

    /// Apply every open side effect, or none of them.
    fn commit_open(&self) -> Result<Vec<PopupId>, PopupError> {
        let inner = &self.inner;
        let ctx = &inner.ctx;
        let options = &inner.options;
        let nodes = inner.nodes;

        self.ensure_content()?;

        let evicted = match options.surface {
            Surface::Toast => {
                let policy = EvictionPolicy {
                    max_visible: options.toast.max_visible,
                    dismiss_newest_first: options.toast.dismiss_newest_first,
                };
                let added = ctx.docks_mut().add(
                    &mut ctx.document_mut(),
                    options.effective_dock(),
                    inner.id.clone(),
                    nodes.container,
                    policy,
                );
                match added {
                    Ok(evicted) => evicted,
                    Err(err) => {
                        self.restore_content(RestoreMode::Replace);
                        return Err(err.into());
                    }
                }
            }
            Surface::Modal => Vec::new(),
        };

        let now = ctx.clock().now();
        let mut doc = ctx.document_mut();
        if options.surface == Surface::Modal {
            inner.remembered_focus.set(doc.active_element());
        }
        doc.set_style(nodes.container, "display", "block");
        doc.set_attribute(nodes.container, attr::STATE, "open");
        doc.remove_attribute(nodes.container, "aria-hidden");

        match options.surface {
            Surface::Modal => {
                if options.stacking {
                    let policy = ModalPolicy {
                        lock_scroll: options.lock_scroll,
                        inert_background: options.inert_background,
                    };
                    ctx.modals_mut()
                        .push(&mut doc, inner.id.clone(), nodes.container, policy);
                }
                if let Some(trap) = inner.trap.borrow_mut().as_mut() {
                    trap.activate();
                    best_effort(
                        "initial focus",
                        focus::focus_initial(&mut doc, nodes.dialog, options.initial_focus),
                    );
                }
            }
            Surface::Toast => {
                let hover = options
                    .toast
                    .pause_on_hover
                    .then_some(options.toast.hover_pause);
                *inner.timer.borrow_mut() = ToastTimer::start(options.toast.duration, hover, now);
            }
        }
        if let Some(drag) = inner.drag.borrow_mut().as_mut() {
            drag.reclamp(&mut doc);
        }
        drop(doc);

        self.advance(Request::CommitOpen);
        tracing::debug!(
            popup = %inner.id,
            surface = options.surface.as_str(),
            "popup opened"
        );
        Ok(evicted)
    }

    /// Close the popup with `reason`.
    ///
    /// Resolves `Ignored` unless the popup is open.
    pub async fn close(&self, reason: CloseReason, data: Option<Value>) -> Transition {
        let span = tracing::debug_span!("popup_close", popup = %self.id(), reason = reason.as_str());
        self.close_inner(reason, data, false).instrument(span).await
    }

    /// `forced` closes still run the chain for observation but ignore its verdict.
    async fn close_inner(&self, reason: CloseReason, data: Option<Value>, forced: bool) -> Transition {
        if !self.advance(Request::BeginClose) {
            tracing::trace!(state = self.state().as_str(), "close ignored");
            return Transition::Ignored;
        }

        let verdict = self
            .intercept(PopupEventKind::BeforeClose, Some(reason), data.clone())
            .await;
        if self.state() != PopupState::Closing {
            return Transition::Ignored;
        }
        if verdict == Verdict::Cancel && !forced {
            self.advance(Request::AbortClose);
            tracing::debug!(popup = %self.id(), reason = reason.as_str(), "close vetoed");
            return Transition::Vetoed;
        }

        self.commit_close(reason);
        self.emit(PopupEventKind::AfterClose, Some(reason), data.clone(), None);
        self.emit(PopupEventKind::Close, Some(reason), data, None);
        Transition::Completed
    }

    /// Overflow close. The victim has already left its dock list, so a
    /// close of its own that is still awaiting its chain is taken over and
    /// committed here; that pending call then resolves `Ignored`.
    async fn evict(&self) {
        if self.state() == PopupState::Closing {
            tracing::debug!(popup = %self.id(), "pending close taken over by eviction");
            self.commit_close(CloseReason::Overflow);
            self.emit(PopupEventKind::AfterClose, Some(CloseReason::Overflow), None, None);
            self.emit(PopupEventKind::Close, Some(CloseReason::Overflow), None, None);
            return;
        }
        self.close_inner(CloseReason::Overflow, None, true).await;
    }

    fn commit_close(&self, reason: CloseReason) {
        let inner = &self.inner;
        let ctx = &inner.ctx;
        let options = &inner.options;
        let nodes = inner.nodes;

        inner.timer.borrow_mut().take();
        if options.pause_media_on_close {
            self.pause_media();
        }
        self.restore_content(RestoreMode::Close);
        if let Some(trap) = inner.trap.borrow_mut().as_mut() {
            trap.deactivate();
        }
        if let Some(drag) = inner.drag.borrow_mut().as_mut() {
            drag.cancel();
        }

        let mut doc = ctx.document_mut();
        doc.set_style(nodes.container, "display", "none");
        doc.set_attribute(nodes.container, attr::STATE, "closed");
        doc.set_attribute(nodes.container, "aria-hidden", "true");
        match options.surface {
            Surface::Modal => {
                ctx.modals_mut().remove(&mut doc, &inner.id);
                let remembered = inner.remembered_focus.take();
                if options.return_focus
                    && let Some(target) = options.final_focus.or(remembered)
                {
                    best_effort("focus restore", focus::restore_focus(&mut doc, target));
                }
            }
            Surface::Toast => {
                ctx.docks_mut().remove(options.effective_dock(), &inner.id);
                doc.remove(nodes.container);
            }
        }
        drop(doc);

        inner.last_close_reason.set(Some(reason));
        self.advance(Request::CommitClose);
        tracing::debug!(
            popup = %inner.id,
            surface = options.surface.as_str(),
            reason = reason.as_str(),
            "popup closed"
        );
    }

    /// Close (if open), release the DOM and every subscription. Idempotent
    /// and not vetoable.
    pub async fn destroy(&self) {
        let span = tracing::debug_span!("popup_destroy", popup = %self.id());
        async {
            if self.state() == PopupState::Open {
                self.close_inner(CloseReason::Destroy, None, true).await;
            }
            self.finalize_destroy();
        }
        .instrument(span)
        .await;
    }

    fn finalize_destroy(&self) {
        match self.state() {
            PopupState::Destroyed => return,
            // A close is awaiting its chain, or a close listener reopened.
            PopupState::Closing | PopupState::Open => {
                if self.state() == PopupState::Open {
                    self.advance(Request::BeginClose);
                }
                self.commit_close(CloseReason::Destroy);
                self.emit(PopupEventKind::AfterClose, Some(CloseReason::Destroy), None, None);
                self.emit(PopupEventKind::Close, Some(CloseReason::Destroy), None, None);
            }
            PopupState::Idle | PopupState::Opening => {}
        }

        self.restore_content(RestoreMode::Destroy);
        self.inner.timer.borrow_mut().take();
        if let Some(drag) = self.inner.drag.borrow_mut().as_mut() {
            drag.cancel();
        }
        self.inner.ctx.document_mut().remove(self.inner.nodes.container);
        self.inner.ctx.unregister(self);
        self.advance(Request::Destroy);
        tracing::debug!(popup = %self.id(), "popup destroyed");

        self.emit(PopupEventKind::Destroy, None, None, None);
        self.inner.listeners.borrow_mut().clear();
    }

    // --- Content ---

    /// Replace the content. A previously teleported node is restored first.
    ///
    /// Teleport content is applied immediately while open, otherwise on the
    /// next open; the target is validated either way.
    pub fn set_content(&self, spec: impl Into<ContentSpec>) -> Result<(), PopupError> {
        if self.state() == PopupState::Destroyed {
            return Err(PopupError::Destroyed(self.id().clone()));
        }
        let spec = spec.into();
        self.restore_content(RestoreMode::Replace);

        let content = self.inner.nodes.content;
        {
            let mut doc = self.inner.ctx.document_mut();
            doc.clear_children(content);
            match &spec {
                ContentSpec::Markup(markup) => {
                    let text = doc.create_text(markup.clone());
                    doc.append_child(content, text)?;
                }
                ContentSpec::Node(node) => doc.append_child(content, *node)?,
                ContentSpec::Teleport(teleport) => {
                    resolve_target(&doc, &teleport.target)?;
                }
            }
        }

        let teleport = match &spec {
            ContentSpec::Teleport(teleport) => Some(teleport.clone()),
            _ => None,
        };
        *self.inner.content.borrow_mut() = Some(spec);
        if let Some(teleport) = teleport
            && self.is_open()
        {
            self.teleport_in(&teleport)?;
        }
        Ok(())
    }

    fn ensure_content(&self) -> Result<(), PopupError> {
        if self.inner.teleported.get().is_some() {
            return Ok(());
        }
        let teleport = match self.inner.content.borrow().as_ref() {
            Some(ContentSpec::Teleport(teleport)) => teleport.clone(),
            _ => return Ok(()),
        };
        self.teleport_in(&teleport)
    }

    fn teleport_in(&self, spec: &TeleportSpec) -> Result<(), PopupError> {
        let ctx = &self.inner.ctx;
        let mut doc = ctx.document_mut();
        let node = resolve_target(&doc, &spec.target)?;
        let mut teleports = ctx.teleports_mut();
        teleports.teleport(
            &mut doc,
            node,
            self.inner.nodes.content,
            spec.mode,
            spec.preserve_size,
        )?;
        if !spec.restore {
            teleports.release(&mut doc, node);
        }
        self.inner.teleported.set(Some(TeleportBinding {
            node,
            restore: spec.restore,
            keep_alive: spec.keep_alive,
        }));
        Ok(())
    }

    fn restore_content(&self, mode: RestoreMode) {
        let Some(binding) = self.inner.teleported.get() else {
            return;
        };
        if !binding.restore {
            // Owned for good: it stays in the content and leaves with it.
            if mode != RestoreMode::Close {
                self.inner.teleported.set(None);
            }
            return;
        }
        if mode == RestoreMode::Close && binding.keep_alive {
            return;
        }
        let ctx = &self.inner.ctx;
        best_effort(
            "teleport restore",
            ctx.teleports_mut().restore(&mut ctx.document_mut(), binding.node),
        );
        self.inner.teleported.set(None);
    }

    fn pause_media(&self) {
        let mut doc = self.inner.ctx.document_mut();
        for node in doc.descendants(self.inner.nodes.content) {
            if doc.is_media(node) {
                doc.pause_media(node);
            }
        }
    }

    // --- Input hooks used by the engine ---

    pub(crate) fn has_active_trap(&self) -> bool {
        self.inner
            .trap
            .borrow()
            .as_ref()
            .is_some_and(FocusTrap::is_active)
    }

    pub(crate) fn handle_tab(&self, backwards: bool) -> TabOutcome {
        let trap = self.inner.trap.borrow();
        match trap.as_ref() {
            Some(trap) => trap.handle_tab(&mut self.inner.ctx.document_mut(), backwards),
            None => TabOutcome::Passthrough,
        }
    }

    pub(crate) fn pointer_enter(&self) -> bool {
        let now = self.inner.ctx.clock().now();
        self.inner
            .timer
            .borrow_mut()
            .as_mut()
            .is_some_and(|t| t.pointer_enter(now))
    }

    pub(crate) fn pointer_leave(&self) -> bool {
        let now = self.inner.ctx.clock().now();
        self.inner
            .timer
            .borrow_mut()
            .as_mut()
            .is_some_and(|t| t.pointer_leave(now))
    }

    /// Deadline of a running auto-dismiss timer.
    pub(crate) fn timer_deadline(&self) -> Option<Duration> {
        self.inner.timer.borrow().as_ref().and_then(ToastTimer::deadline)
    }

    /// Consume the timer if it is due at `now`. A fired timer is gone even
    /// when the resulting close is vetoed.
    pub(crate) fn take_due_timer(&self, now: Duration) -> bool {
        let mut timer = self.inner.timer.borrow_mut();
        if timer.as_ref().is_some_and(|t| t.is_due(now)) {
            timer.take();
            return true;
        }
        false
    }

    fn can_drag(&self) -> bool {
        if self.surface() == Surface::Toast {
            return true;
        }
        let modals = self.inner.ctx.modals();
        !modals.contains(self.id()) || modals.is_top(self.id())
    }

    pub(crate) fn is_dragging(&self) -> bool {
        self.inner
            .drag
            .borrow()
            .as_ref()
            .is_some_and(DragController::is_dragging)
    }

    pub(crate) fn drag_pointer_down(&self, event: &PointerEvent) -> bool {
        if !self.is_open() || !self.can_drag() {
            return false;
        }
        let started = {
            let mut drag = self.inner.drag.borrow_mut();
            let Some(drag) = drag.as_mut() else {
                return false;
            };
            drag.pointer_down(&self.inner.ctx.document(), event)
                .then(|| drag.offset())
        };
        match started {
            Some(position) => {
                self.emit(PopupEventKind::DragStart, None, None, Some(position));
                true
            }
            None => false,
        }
    }

    pub(crate) fn drag_pointer_move(&self, event: &PointerEvent) -> bool {
        let moved = self
            .inner
            .drag
            .borrow_mut()
            .as_mut()
            .and_then(|drag| drag.pointer_move(&mut self.inner.ctx.document_mut(), event));
        match moved {
            Some(position) => {
                self.emit(PopupEventKind::Drag, None, None, Some(position));
                true
            }
            None => false,
        }
    }

    pub(crate) fn drag_pointer_up(&self, event: &PointerEvent) -> bool {
        let ended = self
            .inner
            .drag
            .borrow_mut()
            .as_mut()
            .and_then(|drag| drag.pointer_up(&mut self.inner.ctx.document_mut(), event));
        match ended {
            Some(position) => {
                self.persist_position();
                self.emit(PopupEventKind::DragEnd, None, None, Some(position));
                true
            }
            None => false,
        }
    }

    pub(crate) fn drag_cancel(&self) -> bool {
        let offset = {
            let mut drag = self.inner.drag.borrow_mut();
            match drag.as_mut() {
                Some(drag) => drag.cancel().then(|| drag.offset()),
                None => None,
            }
        };
        match offset {
            Some(position) => {
                self.emit(PopupEventKind::DragEnd, None, None, Some(position));
                true
            }
            None => false,
        }
    }

    pub(crate) fn drag_nudge(&self, key: &KeyEvent) -> bool {
        if !self.is_open() {
            return false;
        }
        let moved = self
            .inner
            .drag
            .borrow_mut()
            .as_mut()
            .and_then(|drag| drag.nudge(&mut self.inner.ctx.document_mut(), key));
        match moved {
            Some(position) => {
                self.persist_position();
                self.emit(PopupEventKind::Drag, None, None, Some(position));
                true
            }
            None => false,
        }
    }

    pub(crate) fn reclamp(&self) {
        if let Some(drag) = self.inner.drag.borrow_mut().as_mut() {
            drag.reclamp(&mut self.inner.ctx.document_mut());
        }
    }

    fn persist_position(&self) {
        if let Some(drag) = self.inner.drag.borrow().as_ref() {
            best_effort("drag position persist", drag.persist(self.inner.ctx.storage()));
        }
    }
}

impl fmt::Debug for Popup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Popup")
            .field("id", self.id())
            .field("surface", &self.surface())
            .field("dock", &self.dock())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

fn resolve_target(doc: &Document, target: &TeleportTarget) -> Result<NodeId, PopupError> {
    match target {
        TeleportTarget::Node(node) => Ok(*node),
        TeleportTarget::ElementId(id) => doc
            .find_by_id(id)
            .ok_or_else(|| PopupError::TeleportTargetMissing(id.clone())),
    }
}

fn build_skeleton(
    doc: &mut Document,
    id: &PopupId,
    options: &PopupOptions,
) -> Result<PopupNodes, DomError> {
    let surface = options.surface;

    let container = doc.create_element("div");
    doc.set_attribute(container, attr::ID, id.as_str());
    doc.set_attribute(container, attr::SURFACE, surface.as_str());
    doc.set_attribute(container, attr::DOCK, options.effective_dock().as_str());
    doc.set_attribute(container, attr::STATE, "closed");
    doc.set_attribute(container, "aria-hidden", "true");
    doc.set_style(container, "display", "none");

    let backdrop = match surface {
        Surface::Modal => {
            let backdrop = doc.create_element("div");
            doc.set_attribute(backdrop, attr::BACKDROP, "");
            doc.append_child(container, backdrop)?;
            Some(backdrop)
        }
        Surface::Toast => None,
    };

    let dialog = doc.create_element("div");
    doc.set_attribute(dialog, attr::DIALOG, "");
    doc.set_attribute(dialog, "tabindex", "-1");
    match surface {
        Surface::Modal => {
            doc.set_attribute(dialog, "role", "dialog");
            doc.set_attribute(dialog, "aria-modal", "true");
        }
        Surface::Toast => {
            let live = options.toast.aria_live;
            let role = if live == AriaLive::Assertive { "alert" } else { "status" };
            doc.set_attribute(dialog, "role", role);
            doc.set_attribute(dialog, "aria-live", live.as_str());
            doc.set_attribute(
                dialog,
                "aria-atomic",
                if options.toast.aria_atomic { "true" } else { "false" },
            );
            doc.set_style(dialog, "pointer-events", "auto");
        }
    }
    doc.append_child(container, dialog)?;

    let mut close_button = None;
    let header = if options.title.is_some() || options.close_button {
        let header = doc.create_element("div");
        doc.set_attribute(header, attr::HEADER, "");
        if let Some(title) = &options.title {
            let heading = doc.create_element("h2");
            let heading_id = format!("{id}-title");
            doc.set_attribute(heading, attr::HEADING, "");
            doc.set_attribute(heading, "id", heading_id.clone());
            let text = doc.create_text(title.clone());
            doc.append_child(heading, text)?;
            doc.append_child(header, heading)?;
            doc.set_attribute(dialog, "aria-labelledby", heading_id);
        }
        if options.close_button {
            let button = doc.create_element("button");
            doc.set_attribute(button, attr::CLOSE, "");
            doc.set_attribute(button, "type", "button");
            doc.set_attribute(button, "aria-label", "Close");
            let text = doc.create_text("\u{00d7}");
            doc.append_child(button, text)?;
            doc.append_child(header, button)?;
            close_button = Some(button);
        }
        doc.append_child(dialog, header)?;
        Some(header)
    } else {
        None
    };

    let content = doc.create_element("div");
    doc.set_attribute(content, attr::CONTENT, "");
    doc.append_child(dialog, content)?;

    Ok(PopupNodes {
        container,
        backdrop,
        dialog,
        header,
        close_button,
        content,
    })
}
