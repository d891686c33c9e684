#![forbid(unsafe_code)]

//! Lifecycle transitions: interceptor vetoes (sync and deferred), re-entrant
//! calls while a transition is pending, destroy semantics, event order and
//! plugins.
//!
//! Run: `cargo test -p overlay-engine --test lifecycle`

use std::cell::{Cell, RefCell};
use std::future::{Future, poll_fn};
use std::pin::pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use overlay_core::{Document, ManualClock};
use overlay_engine::{
    CloseReason, Interception, Popup, PopupEngine, PopupError, PopupEvent, PopupEventKind,
    PopupOptions, PopupPlugin, PopupState, Transition, Verdict,
};
use pretty_assertions::assert_eq;
use serde_json::json;

fn engine() -> PopupEngine {
    PopupEngine::builder(Rc::new(RefCell::new(Document::default())))
        .clock(ManualClock::new())
        .build()
}

fn create(engine: &PopupEngine, options: PopupOptions) -> Popup {
    pollster::block_on(engine.create(options)).expect("create")
}

/// A verdict released by the test, pending until then.
#[derive(Clone, Default)]
struct Gate(Rc<Cell<Option<bool>>>);

impl Gate {
    fn release(&self, proceed: bool) {
        self.0.set(Some(proceed));
    }

    fn interception(&self) -> Interception {
        let slot = Rc::clone(&self.0);
        Interception::deferred(poll_fn(move |_| match slot.get() {
            Some(proceed) => Poll::Ready(proceed),
            None => Poll::Pending,
        }))
    }
}

#[test]
fn before_open_hook_vetoes() {
    let engine = engine();
    let popup = create(&engine, PopupOptions::modal().id("m").before_open(|_: &PopupEvent| false));
    let outcome = pollster::block_on(popup.open(None)).unwrap();
    assert_eq!(outcome, Transition::Vetoed);
    assert_eq!(popup.state(), PopupState::Idle);
    assert!(engine.context().modals().is_empty());
    let doc = engine.context().document();
    assert_eq!(doc.style(popup.nodes().container, "display"), Some("none"));
}

#[test]
fn subscriber_vetoes_after_the_hook_proceeds() {
    let engine = engine();
    let calls = Rc::new(RefCell::new(Vec::new()));
    let hook_calls = Rc::clone(&calls);
    let popup = create(
        &engine,
        PopupOptions::modal().id("m").before_open(move |_: &PopupEvent| {
            hook_calls.borrow_mut().push("hook");
        }),
    );
    let first = Rc::clone(&calls);
    popup.on(PopupEventKind::BeforeOpen, move |_| {
        first.borrow_mut().push("veto");
        Verdict::Cancel
    });
    let second = Rc::clone(&calls);
    popup.on(PopupEventKind::BeforeOpen, move |_| {
        second.borrow_mut().push("never");
    });

    let outcome = pollster::block_on(popup.open(None)).unwrap();
    assert_eq!(outcome, Transition::Vetoed);
    assert_eq!(*calls.borrow(), vec!["hook", "veto"]);
}

#[test]
fn deferred_veto_cancels_close() {
    let engine = engine();
    let popup = create(&engine, PopupOptions::modal().id("m"));
    pollster::block_on(popup.open(None)).unwrap();
    popup.on(PopupEventKind::BeforeClose, |_| {
        Interception::deferred(async { false })
    });

    let outcome = pollster::block_on(popup.close(CloseReason::Programmatic, None));
    assert_eq!(outcome, Transition::Vetoed);
    assert!(popup.is_open());
    assert_eq!(engine.context().modals().depth(), 1);
}

#[test]
fn reentrant_calls_are_ignored_while_opening() {
    let engine = engine();
    let gate = Gate::default();
    let hook_gate = gate.clone();
    let popup = create(
        &engine,
        PopupOptions::modal().id("m").before_open(move |_: &PopupEvent| hook_gate.interception()),
    );

    let mut cx = Context::from_waker(Waker::noop());
    let mut pending = pin!(popup.open(None));
    assert!(pending.as_mut().poll(&mut cx).is_pending());
    assert_eq!(popup.state(), PopupState::Opening);

    assert_eq!(pollster::block_on(popup.open(None)).unwrap(), Transition::Ignored);
    assert_eq!(
        pollster::block_on(popup.close(CloseReason::Programmatic, None)),
        Transition::Ignored
    );

    gate.release(true);
    match pending.as_mut().poll(&mut cx) {
        Poll::Ready(result) => assert_eq!(result.unwrap(), Transition::Completed),
        Poll::Pending => panic!("open still pending after release"),
    }
    assert!(popup.is_open());
    assert_eq!(engine.context().modals().depth(), 1);
}

#[test]
fn destroy_wins_over_a_pending_open() {
    let engine = engine();
    let gate = Gate::default();
    let hook_gate = gate.clone();
    let popup = create(
        &engine,
        PopupOptions::modal().id("m").before_open(move |_: &PopupEvent| hook_gate.interception()),
    );

    let mut cx = Context::from_waker(Waker::noop());
    let mut pending = pin!(popup.open(None));
    assert!(pending.as_mut().poll(&mut cx).is_pending());

    pollster::block_on(engine.destroy("m")).unwrap();
    assert_eq!(popup.state(), PopupState::Destroyed);

    gate.release(true);
    match pending.as_mut().poll(&mut cx) {
        Poll::Ready(result) => assert_eq!(result.unwrap(), Transition::Ignored),
        Poll::Pending => panic!("open still pending after release"),
    }
    assert_eq!(popup.state(), PopupState::Destroyed);
    assert!(engine.context().modals().is_empty());
    assert!(!engine.context().document().is_connected(popup.nodes().container));
}

#[test]
fn destroy_during_a_pending_close_completes_the_close() {
    let engine = engine();
    let gate = Gate::default();
    let hook_gate = gate.clone();
    let popup = create(
        &engine,
        PopupOptions::modal().id("m").before_close(move |_: &PopupEvent| hook_gate.interception()),
    );
    pollster::block_on(popup.open(None)).unwrap();

    let mut cx = Context::from_waker(Waker::noop());
    let mut pending = pin!(popup.close(CloseReason::Programmatic, None));
    assert!(pending.as_mut().poll(&mut cx).is_pending());
    assert_eq!(popup.state(), PopupState::Closing);

    pollster::block_on(popup.destroy());
    assert_eq!(popup.state(), PopupState::Destroyed);
    assert!(engine.context().modals().is_empty());
    assert_eq!(popup.last_close_reason(), Some(CloseReason::Destroy));

    gate.release(false);
    assert_eq!(pending.as_mut().poll(&mut cx), Poll::Ready(Transition::Ignored));
}

#[test]
fn destroy_cannot_be_vetoed_and_is_idempotent() {
    let engine = engine();
    let popup = create(
        &engine,
        PopupOptions::modal().id("m").before_close(|_: &PopupEvent| false),
    );
    pollster::block_on(popup.open(None)).unwrap();
    assert_eq!(
        pollster::block_on(popup.close(CloseReason::Escape, None)),
        Transition::Vetoed
    );

    let destroys = Rc::new(Cell::new(0));
    let counter = Rc::clone(&destroys);
    popup.on(PopupEventKind::Destroy, move |_| counter.set(counter.get() + 1));

    pollster::block_on(popup.destroy());
    pollster::block_on(popup.destroy());
    assert_eq!(popup.state(), PopupState::Destroyed);
    assert_eq!(popup.last_close_reason(), Some(CloseReason::Destroy));
    assert_eq!(destroys.get(), 1);
    assert_eq!(popup.listener_count(PopupEventKind::Destroy), 0);
    assert!(engine.context().lookup(popup.id()).is_none());
}

#[test]
fn destroyed_popups_reject_open_and_ignore_close() {
    let engine = engine();
    let popup = create(&engine, PopupOptions::modal().id("m"));
    pollster::block_on(popup.destroy());

    let err = pollster::block_on(popup.open(None)).unwrap_err();
    assert!(matches!(err, PopupError::Destroyed(id) if id == "m"));
    assert_eq!(
        pollster::block_on(popup.close(CloseReason::Programmatic, None)),
        Transition::Ignored
    );
    assert!(popup.set_content("late").is_err());
}

#[test]
fn close_while_idle_is_ignored() {
    let engine = engine();
    let popup = create(&engine, PopupOptions::modal().id("m"));
    let closes = Rc::new(Cell::new(0));
    let counter = Rc::clone(&closes);
    popup.on(PopupEventKind::BeforeClose, move |_| counter.set(counter.get() + 1));

    assert_eq!(
        pollster::block_on(popup.close(CloseReason::Programmatic, None)),
        Transition::Ignored
    );
    assert_eq!(closes.get(), 0, "interceptors never run for a no-op");
}

#[test]
fn events_fire_in_lifecycle_order_with_payloads() {
    let engine = engine();
    let popup = create(&engine, PopupOptions::modal().id("m"));
    let log = Rc::new(RefCell::new(Vec::new()));
    for kind in PopupEventKind::ALL {
        let sink = Rc::clone(&log);
        popup.on(kind, move |event: &PopupEvent| {
            sink.borrow_mut()
                .push((event.kind.as_str(), event.reason, event.data.clone()));
        });
    }

    let payload = json!({ "step": 1 });
    pollster::block_on(popup.open(Some(payload.clone()))).unwrap();
    pollster::block_on(popup.close(CloseReason::Escape, Some(json!("bye"))));
    pollster::block_on(popup.destroy());

    let bye = Some(json!("bye"));
    let esc = Some(CloseReason::Escape);
    assert_eq!(
        *log.borrow(),
        vec![
            ("beforeOpen", None, Some(payload.clone())),
            ("afterOpen", None, Some(payload.clone())),
            ("open", None, Some(payload)),
            ("beforeClose", esc, bye.clone()),
            ("afterClose", esc, bye.clone()),
            ("close", esc, bye),
            ("destroy", None, None),
        ]
    );
}

#[test]
fn unsubscribed_handlers_stop_receiving() {
    let engine = engine();
    let popup = create(&engine, PopupOptions::modal().id("m"));
    let opens = Rc::new(Cell::new(0));
    let counter = Rc::clone(&opens);
    let id = popup.on(PopupEventKind::Open, move |_| counter.set(counter.get() + 1));

    pollster::block_on(popup.open(None)).unwrap();
    pollster::block_on(popup.close(CloseReason::Programmatic, None));
    assert!(popup.off(PopupEventKind::Open, id));
    pollster::block_on(popup.open(None)).unwrap();
    assert_eq!(opens.get(), 1);
}

struct OpenCounter {
    opens: Rc<Cell<u32>>,
}

impl PopupPlugin for OpenCounter {
    fn name(&self) -> &str {
        "open-counter"
    }

    fn install(&self, popup: &Popup) {
        let opens = Rc::clone(&self.opens);
        popup.on(PopupEventKind::Open, move |_| opens.set(opens.get() + 1));
    }
}

#[test]
fn plugins_install_once_and_observe_events() {
    let engine = engine();
    let opens = Rc::new(Cell::new(0));
    let popup = create(
        &engine,
        PopupOptions::modal().id("m").plugin(OpenCounter {
            opens: Rc::clone(&opens),
        }),
    );
    assert_eq!(popup.listener_count(PopupEventKind::Open), 1);

    for _ in 0..2 {
        pollster::block_on(popup.open(None)).unwrap();
        pollster::block_on(popup.close(CloseReason::Programmatic, None));
    }
    assert_eq!(opens.get(), 2);
}

#[test]
fn close_all_closes_modals_top_down_then_toasts() {
    let engine = engine();
    let order = Rc::new(RefCell::new(Vec::new()));
    let track = |popup: &Popup| {
        let sink = Rc::clone(&order);
        let id = popup.id().to_string();
        popup.on(PopupEventKind::Close, move |_| sink.borrow_mut().push(id.clone()));
    };
    for id in ["a", "b"] {
        let popup = pollster::block_on(engine.open(PopupOptions::modal().id(id), None)).unwrap();
        track(&popup);
    }
    let toast = pollster::block_on(engine.toast(PopupOptions::toast().id("t"))).unwrap();
    track(&toast);

    let closed = pollster::block_on(engine.close_all(CloseReason::Programmatic));
    assert_eq!(closed, 3);
    assert_eq!(*order.borrow(), vec!["b", "a", "t"]);
}

#[test]
fn engine_open_by_unknown_id_fails() {
    let engine = engine();
    let err = pollster::block_on(engine.open("ghost", None)).unwrap_err();
    assert!(matches!(err, PopupError::UnknownPopup(id) if id == "ghost"));
}
