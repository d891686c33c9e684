#![forbid(unsafe_code)]

//! Lifecycle events and the per-popup subscriber table.

use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;
use overlay_core::Point;
use serde_json::Value;

use crate::intercept::Interception;
use crate::popup::Popup;
use crate::state::CloseReason;

/// Event names a popup emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PopupEventKind {
    BeforeOpen,
    AfterOpen,
    Open,
    BeforeClose,
    AfterClose,
    Close,
    Destroy,
    DragStart,
    Drag,
    DragEnd,
}

impl PopupEventKind {
    pub const ALL: [Self; 10] = [
        Self::BeforeOpen,
        Self::AfterOpen,
        Self::Open,
        Self::BeforeClose,
        Self::AfterClose,
        Self::Close,
        Self::Destroy,
        Self::DragStart,
        Self::Drag,
        Self::DragEnd,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BeforeOpen => "beforeOpen",
            Self::AfterOpen => "afterOpen",
            Self::Open => "open",
            Self::BeforeClose => "beforeClose",
            Self::AfterClose => "afterClose",
            Self::Close => "close",
            Self::Destroy => "destroy",
            Self::DragStart => "dragstart",
            Self::Drag => "drag",
            Self::DragEnd => "dragend",
        }
    }

    /// Only the `before*` events honour a subscriber's verdict.
    #[must_use]
    pub fn is_cancelable(self) -> bool {
        matches!(self, Self::BeforeOpen | Self::BeforeClose)
    }
}

/// Payload handed to subscribers.
#[derive(Debug, Clone)]
pub struct PopupEvent {
    pub kind: PopupEventKind,
    pub popup: Popup,
    /// Set for close events.
    pub reason: Option<CloseReason>,
    /// Data passed to `open()` / `close()`.
    pub data: Option<Value>,
    /// Drag offset for drag events.
    pub position: Option<Point>,
}

/// A subscriber or hook.
#[derive(Clone)]
pub struct Handler(Rc<dyn Fn(&PopupEvent) -> Interception>);

impl Handler {
    pub fn new<F, R>(f: F) -> Self
    where
        F: Fn(&PopupEvent) -> R + 'static,
        R: Into<Interception>,
    {
        Self(Rc::new(move |event: &PopupEvent| f(event).into()))
    }

    pub fn call(&self, event: &PopupEvent) -> Interception {
        (self.0)(event)
    }

    pub(crate) fn as_interceptor(&self) -> Rc<dyn Fn(&PopupEvent) -> Interception> {
        Rc::clone(&self.0)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Handler(..)")
    }
}

/// Handle returned by `on`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Subscriber table keyed by event kind; registration order is call order.
#[derive(Debug, Default)]
pub(crate) struct Listeners {
    next_id: u64,
    table: AHashMap<PopupEventKind, Vec<(ListenerId, Handler)>>,
}

impl Listeners {
    pub(crate) fn add(&mut self, kind: PopupEventKind, handler: Handler) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.table.entry(kind).or_default().push((id, handler));
        id
    }

    pub(crate) fn remove(&mut self, kind: PopupEventKind, id: ListenerId) -> bool {
        let Some(list) = self.table.get_mut(&kind) else {
            return false;
        };
        let before = list.len();
        list.retain(|(existing, _)| *existing != id);
        list.len() != before
    }

    /// Copy of the current subscribers, so handlers may (un)subscribe while
    /// an emission is in progress.
    pub(crate) fn snapshot(&self, kind: PopupEventKind) -> Vec<Handler> {
        self.table
            .get(&kind)
            .map(|list| list.iter().map(|(_, h)| h.clone()).collect())
            .unwrap_or_default()
    }

    pub(crate) fn len(&self, kind: PopupEventKind) -> usize {
        self.table.get(&kind).map_or(0, Vec::len)
    }

    pub(crate) fn clear(&mut self) {
        self.table.clear();
    }
}
