#![forbid(unsafe_code)]

//! Dragging through the engine: viewport clamping, resize re-clamping,
//! keyboard nudging, top-modal gating and position persistence.
//!
//! Run: `cargo test -p overlay-engine --test drag`

use std::cell::RefCell;
use std::rc::Rc;

use overlay_core::{
    Document, InputEvent, KeyCode, KeyEvent, LocalStorage, ManualClock, MemoryStorage, Modifiers,
    NodeId, Point, PointerEvent, PointerEventKind, Rect, Size, StorageError,
};
use overlay_engine::{DragAxis, DragOptions, Popup, PopupEngine, PopupEventKind, PopupOptions};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use tracing_test::traced_test;

const PAD: f64 = 8.0;

fn engine_with(storage: Rc<dyn LocalStorage>) -> PopupEngine {
    PopupEngine::builder(Rc::new(RefCell::new(Document::new(Size::new(800.0, 600.0)))))
        .clock(ManualClock::new())
        .storage(storage)
        .build()
}

fn engine() -> PopupEngine {
    engine_with(Rc::new(MemoryStorage::new()))
}

/// Open a titled draggable modal whose dialog is laid out 200x100 at
/// (300, 250); the header is the drag handle.
fn open_draggable(engine: &PopupEngine, id: &str, drag: DragOptions) -> Popup {
    let popup = pollster::block_on(engine.create(
        PopupOptions::modal()
            .id(id)
            .title("Drag me")
            .close_button(false)
            .draggable(drag),
    ))
    .unwrap();
    engine
        .context()
        .document_mut()
        .set_layout(popup.nodes().dialog, Rect::new(300.0, 250.0, 200.0, 100.0));
    pollster::block_on(popup.open(None)).unwrap();
    popup
}

fn pointer(engine: &PopupEngine, kind: PointerEventKind, target: NodeId, x: f64, y: f64) -> bool {
    let event = PointerEvent::new(kind, target, x, y);
    pollster::block_on(engine.dispatch(event)).unwrap()
}

fn drag_to(engine: &PopupEngine, popup: &Popup, x: f64, y: f64) {
    let handle = popup.nodes().header.expect("header");
    assert!(pointer(engine, PointerEventKind::Down, handle, 400.0, 260.0));
    pointer(engine, PointerEventKind::Move, handle, x, y);
    pointer(engine, PointerEventKind::Up, handle, x, y);
}

fn dialog_rect(engine: &PopupEngine, popup: &Popup) -> Rect {
    engine.context().document().bounding_rect(popup.nodes().dialog)
}

fn assert_within(rect: Rect, viewport: Size) {
    assert!(rect.x >= PAD - 1e-9, "left edge {rect:?}");
    assert!(rect.y >= PAD - 1e-9, "top edge {rect:?}");
    assert!(rect.right() <= viewport.width - PAD + 1e-9, "right edge {rect:?}");
    assert!(rect.bottom() <= viewport.height - PAD + 1e-9, "bottom edge {rect:?}");
}

#[test]
fn drag_past_the_corner_is_clamped() {
    let engine = engine();
    let popup = open_draggable(&engine, "m", DragOptions::default());
    drag_to(&engine, &popup, 5000.0, 5000.0);

    assert_eq!(
        dialog_rect(&engine, &popup),
        Rect::new(592.0, 492.0, 200.0, 100.0)
    );
    assert_eq!(popup.drag_offset(), Some(Point::new(292.0, 242.0)));
    let doc = engine.context().document();
    assert_eq!(
        doc.style(popup.nodes().dialog, "transform"),
        Some("translate(-50%, -50%) translate(292px, 242px)")
    );
}

#[test]
fn release_near_an_edge_snaps_flush() {
    let engine = engine();
    let popup = open_draggable(&engine, "m", DragOptions::default());
    // Left edge lands at 18: within the 16 px threshold of the 8 px bound.
    drag_to(&engine, &popup, 118.0, 260.0);
    assert_eq!(dialog_rect(&engine, &popup).x, PAD);
}

#[test]
fn axis_lock_ignores_the_other_axis() {
    let engine = engine();
    let popup = open_draggable(&engine, "m", DragOptions::default().axis(DragAxis::X).snap(false));
    drag_to(&engine, &popup, 450.0, 500.0);
    assert_eq!(popup.drag_offset(), Some(Point::new(50.0, 0.0)));
}

#[test]
fn resize_reclamps_without_a_new_drag() {
    let engine = engine();
    let popup = open_draggable(&engine, "m", DragOptions::default());
    drag_to(&engine, &popup, 5000.0, 5000.0);

    let smaller = Size::new(500.0, 400.0);
    let consumed = pollster::block_on(engine.dispatch(InputEvent::Resize(smaller))).unwrap();
    assert!(!consumed);
    assert_within(dialog_rect(&engine, &popup), smaller);
}

#[test]
fn drag_events_carry_positions() {
    let engine = engine();
    let popup = open_draggable(&engine, "m", DragOptions::default().snap(false));
    let seen = Rc::new(RefCell::new(Vec::new()));
    for kind in [PopupEventKind::DragStart, PopupEventKind::Drag, PopupEventKind::DragEnd] {
        let sink = Rc::clone(&seen);
        popup.on(kind, move |event| {
            sink.borrow_mut().push((event.kind, event.position));
        });
    }
    drag_to(&engine, &popup, 420.0, 270.0);

    let moved = Some(Point::new(20.0, 10.0));
    assert_eq!(
        *seen.borrow(),
        vec![
            (PopupEventKind::DragStart, Some(Point::ORIGIN)),
            (PopupEventKind::Drag, moved),
            (PopupEventKind::DragEnd, moved),
        ]
    );
}

#[test]
fn pointer_cancel_ends_the_gesture_where_it_is() {
    let storage = Rc::new(MemoryStorage::new());
    let engine = engine_with(storage.clone());
    let popup = open_draggable(&engine, "m", DragOptions::default().persist_key("pos"));
    let ends = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&ends);
    popup.on(PopupEventKind::DragEnd, move |event| {
        sink.borrow_mut().push(event.position);
    });

    let handle = popup.nodes().header.unwrap();
    assert!(pointer(&engine, PointerEventKind::Down, handle, 400.0, 260.0));
    // Left edge at 18: a release here would snap to 8.
    pointer(&engine, PointerEventKind::Move, handle, 118.0, 260.0);
    assert!(pointer(&engine, PointerEventKind::Cancel, handle, 118.0, 260.0));

    assert_eq!(dialog_rect(&engine, &popup).x, 18.0);
    assert_eq!(*ends.borrow(), vec![Some(Point::new(-282.0, 0.0))]);
    assert_eq!(storage.get_item("pos").unwrap(), None);

    assert!(!pointer(&engine, PointerEventKind::Up, handle, 118.0, 260.0));
    assert!(!pointer(&engine, PointerEventKind::Cancel, handle, 118.0, 260.0));
    assert_eq!(ends.borrow().len(), 1);
}

#[test]
fn controls_inside_the_handle_do_not_start_a_drag() {
    let engine = engine();
    let popup = pollster::block_on(engine.open(
        PopupOptions::modal()
            .id("m")
            .title("Drag me")
            .draggable(DragOptions::default()),
        None,
    ))
    .unwrap();
    let close_button = popup.nodes().close_button.unwrap();
    assert!(!pointer(&engine, PointerEventKind::Down, close_button, 0.0, 0.0));
}

#[test]
fn only_the_top_modal_can_be_dragged() {
    let engine = engine();
    let below = open_draggable(&engine, "below", DragOptions::default());
    let _above = open_draggable(&engine, "above", DragOptions::default());
    let handle = below.nodes().header.unwrap();
    assert!(!pointer(&engine, PointerEventKind::Down, handle, 400.0, 260.0));
}

#[test]
fn alt_arrows_nudge_the_focused_dialog() {
    let engine = engine();
    let popup = open_draggable(&engine, "m", DragOptions::default());
    engine.context().document_mut().focus(popup.nodes().dialog).unwrap();

    let right = KeyEvent::new(KeyCode::Right).with_modifiers(Modifiers::ALT);
    assert!(pollster::block_on(engine.dispatch(right)).unwrap());
    let fine_down = KeyEvent::new(KeyCode::Down).with_modifiers(Modifiers::ALT | Modifiers::SHIFT);
    assert!(pollster::block_on(engine.dispatch(fine_down)).unwrap());
    assert_eq!(popup.drag_offset(), Some(Point::new(10.0, 1.0)));

    let plain = KeyEvent::new(KeyCode::Left);
    assert!(!pollster::block_on(engine.dispatch(plain)).unwrap());
}

#[test]
fn position_persists_across_popups() {
    let storage = Rc::new(MemoryStorage::new());
    let engine = engine_with(storage.clone());
    let drag = DragOptions::default().persist_key("settings-pos").snap(false);

    let first = open_draggable(&engine, "first", drag.clone());
    drag_to(&engine, &first, 450.0, 300.0);
    let stored = storage.get_item("settings-pos").unwrap().expect("stored");
    let value: serde_json::Value = serde_json::from_str(&stored).unwrap();
    assert_eq!(value, serde_json::json!({ "x": 50.0, "y": 40.0 }));

    pollster::block_on(engine.destroy("first")).unwrap();
    let second = open_draggable(&engine, "second", drag);
    assert_eq!(second.drag_offset(), Some(Point::new(50.0, 40.0)));
}

/// Storage holding a malformed entry and refusing every write.
struct FullStorage;

impl LocalStorage for FullStorage {
    fn get_item(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Ok(Some("not json".to_owned()))
    }

    fn set_item(&self, key: &str, _value: String) -> Result<(), StorageError> {
        Err(StorageError::QuotaExceeded(key.to_owned()))
    }

    fn remove_item(&self, _key: &str) -> Result<(), StorageError> {
        Err(StorageError::Unavailable)
    }
}

#[test]
#[traced_test]
fn storage_failures_do_not_interrupt_dragging() {
    let engine = engine_with(Rc::new(FullStorage));
    let popup = open_draggable(
        &engine,
        "m",
        DragOptions::default().persist_key("pos").snap(false),
    );
    assert_eq!(popup.drag_offset(), Some(Point::ORIGIN), "malformed entry ignored");

    drag_to(&engine, &popup, 450.0, 300.0);
    assert_eq!(popup.drag_offset(), Some(Point::new(50.0, 40.0)));
    assert!(logs_contain("drag position load"));
    assert!(logs_contain("drag position persist"));
    assert!(logs_contain("best-effort step skipped"));
}

proptest! {
    #[test]
    fn any_release_point_stays_inside_the_viewport(
        x in -3000.0f64..3000.0,
        y in -3000.0f64..3000.0,
        width in 260.0f64..1600.0,
        height in 160.0f64..1200.0,
    ) {
        let engine = engine();
        let popup = open_draggable(&engine, "m", DragOptions::default());
        drag_to(&engine, &popup, x, y);
        assert_within(dialog_rect(&engine, &popup), Size::new(800.0, 600.0));

        let viewport = Size::new(width, height);
        pollster::block_on(engine.dispatch(InputEvent::Resize(viewport))).unwrap();
        assert_within(dialog_rect(&engine, &popup), viewport);
    }
}
