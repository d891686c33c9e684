#![forbid(unsafe_code)]

//! Shared state of one engine.
//!
//! Everything that is process-wide for a page (the modal stack, the toast
//! docks, the teleport registry, scroll lock and inert state) lives in an
//! [`OverlayContext`] owned by the engine and handed to each popup at
//! construction. Two engines never share state.
//!
//! Borrows of the inner `RefCell`s are short and never held across an
//! `.await`.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;
use overlay_core::{Clock, Document, LocalStorage};

use crate::dock::ToastDockManager;
use crate::options::{EngineConfig, PopupId};
use crate::popup::{Popup, WeakPopup};
use crate::stack::ModalManager;
use crate::teleport::TeleportRegistry;

struct ContextInner {
    document: Rc<RefCell<Document>>,
    config: EngineConfig,
    clock: Rc<dyn Clock>,
    storage: Rc<dyn LocalStorage>,
    modals: RefCell<ModalManager>,
    docks: RefCell<ToastDockManager>,
    teleports: RefCell<TeleportRegistry>,
    directory: RefCell<AHashMap<PopupId, WeakPopup>>,
}

/// Cheaply clonable handle to an engine's shared state.
#[derive(Clone)]
pub struct OverlayContext {
    inner: Rc<ContextInner>,
}

impl OverlayContext {
    pub fn new(
        document: Rc<RefCell<Document>>,
        config: EngineConfig,
        clock: Rc<dyn Clock>,
        storage: Rc<dyn LocalStorage>,
    ) -> Self {
        let modals = ModalManager::new(config.modal_base_z, config.modal_z_step);
        let docks = ToastDockManager::new(config.toast_dock_z);
        Self {
            inner: Rc::new(ContextInner {
                document,
                config,
                clock,
                storage,
                modals: RefCell::new(modals),
                docks: RefCell::new(docks),
                teleports: RefCell::new(TeleportRegistry::new()),
                directory: RefCell::new(AHashMap::new()),
            }),
        }
    }

    #[must_use]
    pub fn document(&self) -> Ref<'_, Document> {
        self.inner.document.borrow()
    }

    #[must_use]
    pub fn document_mut(&self) -> RefMut<'_, Document> {
        self.inner.document.borrow_mut()
    }

    /// The shared document handle itself.
    #[must_use]
    pub fn shared_document(&self) -> Rc<RefCell<Document>> {
        Rc::clone(&self.inner.document)
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn clock(&self) -> &dyn Clock {
        &*self.inner.clock
    }

    #[must_use]
    pub fn storage(&self) -> &dyn LocalStorage {
        &*self.inner.storage
    }

    #[must_use]
    pub fn modals(&self) -> Ref<'_, ModalManager> {
        self.inner.modals.borrow()
    }

    #[must_use]
    pub fn modals_mut(&self) -> RefMut<'_, ModalManager> {
        self.inner.modals.borrow_mut()
    }

    #[must_use]
    pub fn docks(&self) -> Ref<'_, ToastDockManager> {
        self.inner.docks.borrow()
    }

    #[must_use]
    pub fn docks_mut(&self) -> RefMut<'_, ToastDockManager> {
        self.inner.docks.borrow_mut()
    }

    #[must_use]
    pub fn teleports(&self) -> Ref<'_, TeleportRegistry> {
        self.inner.teleports.borrow()
    }

    #[must_use]
    pub fn teleports_mut(&self) -> RefMut<'_, TeleportRegistry> {
        self.inner.teleports.borrow_mut()
    }

    /// Live popup registered under `id`.
    #[must_use]
    pub fn lookup(&self, id: &PopupId) -> Option<Popup> {
        self.inner.directory.borrow().get(id).and_then(WeakPopup::upgrade)
    }

    pub(crate) fn register(&self, popup: &Popup) {
        self.inner
            .directory
            .borrow_mut()
            .insert(popup.id().clone(), popup.downgrade());
    }

    pub(crate) fn unregister(&self, popup: &Popup) {
        let mut directory = self.inner.directory.borrow_mut();
        if directory.get(popup.id()).is_some_and(|w| w.points_to(popup)) {
            directory.remove(popup.id());
        }
    }
}

impl fmt::Debug for OverlayContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverlayContext")
            .field("config", &self.inner.config)
            .field("modals", &self.inner.modals)
            .field("docks", &self.inner.docks)
            .field("teleports", &self.inner.teleports)
            .finish_non_exhaustive()
    }
}
