//! Integration tests: drawing gestures driven through `Engine::apply` with
//! raw screen-space input, the way the browser host delivers it.

use pretty_assertions::assert_eq;
use takeoff_core::{MarkupType, Measurements, Point, Vec2};
use takeoff_editor::{
    Engine, EngineEvent, InputEvent, Modifiers, PointerButton, SessionKind, ToolKind,
};

const RATIO: f64 = 64.0;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn engine(tool: ToolKind) -> Engine {
    init_logging();
    let mut engine = Engine::default();
    engine.set_scale_ratio(RATIO);
    engine.set_active_class("drywall");
    engine.set_tool(tool);
    engine
}

fn click(engine: &mut Engine, x: f64, y: f64) -> Vec<EngineEvent> {
    let mut events = engine.apply(InputEvent::pointer_down(x, y));
    events.extend(engine.apply(InputEvent::pointer_up(x, y)));
    events
}

fn drag(engine: &mut Engine, from: (f64, f64), to: (f64, f64)) -> Vec<EngineEvent> {
    let mut events = engine.apply(InputEvent::pointer_down(from.0, from.1));
    for step in 1..=4 {
        let t = f64::from(step) / 4.0;
        events.extend(engine.apply(InputEvent::pointer_move(
            from.0 + (to.0 - from.0) * t,
            from.1 + (to.1 - from.1) * t,
        )));
    }
    events.extend(engine.apply(InputEvent::pointer_up(to.0, to.1)));
    events
}

fn key(engine: &mut Engine, key: &str, modifiers: Modifiers) -> Vec<EngineEvent> {
    engine.apply(InputEvent::KeyDown {
        key: key.to_string(),
        modifiers,
    })
}

const CMD: Modifiers = Modifiers {
    meta: true,
    ..Modifiers::NONE
};

fn created(events: &[EngineEvent]) -> (Vec<Point>, MarkupType, Measurements) {
    let creates: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            EngineEvent::DetectionCreateRequested {
                geometry,
                markup_type,
                measurements,
                ..
            } => Some((geometry.vertices().to_vec(), *markup_type, *measurements)),
            _ => None,
        })
        .collect();
    assert_eq!(creates.len(), 1, "expected exactly one create in {events:?}");
    creates.into_iter().next().unwrap()
}

fn near(a: Point, b: Point) -> bool {
    a.distance(b) < 1e-9
}

// ─── Rectangles & polygons ──────────────────────────────────────────────

#[test]
fn rectangle_drag_on_loaded_image() {
    let mut engine = engine(ToolKind::Create);
    engine.load_image(400.0, 300.0);
    // 400x300 fits 800x600 at 1:1, centered at offset (200, 150).
    assert_eq!(engine.viewport().offset, Vec2::new(200.0, 150.0));

    let events = drag(&mut engine, (300.0, 250.0), (500.0, 400.0));
    let (points, markup, m) = created(&events);
    assert_eq!(markup, MarkupType::Polygon);
    assert_eq!(
        points,
        vec![
            Point::new(100.0, 100.0),
            Point::new(300.0, 100.0),
            Point::new(300.0, 250.0),
            Point::new(100.0, 250.0),
        ]
    );
    assert!((m.area_sf - 7.32).abs() < 0.01, "got {}", m.area_sf);
    assert!(engine.session().is_none());
}

#[test]
fn flat_drag_creates_nothing() {
    let mut engine = engine(ToolKind::Create);
    let events = drag(&mut engine, (100.0, 100.0), (300.0, 100.0));
    assert!(events.is_empty());
    assert!(engine.session().is_none());
}

#[test]
fn small_jitter_is_a_click_not_a_drag() {
    let mut engine = engine(ToolKind::Create);
    let events = drag(&mut engine, (100.0, 100.0), (103.0, 102.0));
    assert!(events.is_empty());
    let session = engine.session().unwrap();
    assert_eq!(session.kind, SessionKind::Polygon);
    assert_eq!(session.vertices, vec![Point::new(100.0, 100.0)]);
}

#[test]
fn close_the_loop_uses_screen_radius_at_any_zoom() {
    let mut engine = engine(ToolKind::Create);
    for _ in 0..7 {
        engine.apply(InputEvent::Wheel {
            x: 0.0,
            y: 0.0,
            delta_y: -120.0,
            modifiers: Modifiers::NONE,
        });
    }
    let scale = engine.viewport().scale;
    assert!((scale - 1.1_f64.powi(7)).abs() < 1e-9);

    for (x, y) in [(100.0, 100.0), (300.0, 100.0), (300.0, 300.0)] {
        assert!(click(&mut engine, x, y).is_empty());
    }
    // 12.8 screen px from the first vertex: inside the 15 px close radius.
    let (points, _, _) = created(&click(&mut engine, 110.0, 108.0));
    assert_eq!(points.len(), 3);
    assert!(near(points[1], Point::new(300.0 / scale, 100.0 / scale)));
}

#[test]
fn double_click_finishes_polygon() {
    let mut engine = engine(ToolKind::Create);
    for (x, y) in [(100.0, 100.0), (300.0, 100.0), (300.0, 300.0)] {
        click(&mut engine, x, y);
    }
    click(&mut engine, 200.0, 400.0);
    click(&mut engine, 200.0, 400.0);
    let events = engine.apply(InputEvent::DoubleClick {
        x: 200.0,
        y: 400.0,
        modifiers: Modifiers::NONE,
    });
    let (points, _, _) = created(&events);
    assert_eq!(points.len(), 4);
    assert_eq!(points[3], Point::new(200.0, 400.0));
}

#[test]
fn enter_and_right_click_complete() {
    let mut engine = engine(ToolKind::Create);
    for (x, y) in [(100.0, 100.0), (300.0, 100.0), (300.0, 300.0)] {
        click(&mut engine, x, y);
    }
    assert_eq!(created(&key(&mut engine, "Enter", Modifiers::NONE)).0.len(), 3);

    for (x, y) in [(100.0, 100.0), (300.0, 100.0)] {
        click(&mut engine, x, y);
    }
    let right = InputEvent::PointerDown {
        x: 300.0,
        y: 300.0,
        button: PointerButton::Secondary,
        modifiers: Modifiers::NONE,
    };
    assert!(engine.apply(right).is_empty(), "two vertices: cancel");
    assert!(engine.session().is_none());
}

#[test]
fn shift_snaps_committed_vertex() {
    let mut engine = engine(ToolKind::Create);
    click(&mut engine, 100.0, 100.0);
    engine.apply(InputEvent::PointerDown {
        x: 200.0,
        y: 140.0,
        button: PointerButton::Primary,
        modifiers: Modifiers::SHIFT,
    });
    let last = engine.session().unwrap().last_vertex().unwrap();
    assert!(near(last, Point::new(100.0 + 100.0_f64.hypot(40.0), 100.0)));
}

// ─── Undo ───────────────────────────────────────────────────────────────

#[test]
fn undo_scenario() {
    let mut engine = engine(ToolKind::Create);
    for (x, y) in [(100.0, 100.0), (300.0, 100.0), (300.0, 300.0)] {
        click(&mut engine, x, y);
    }
    key(&mut engine, "z", CMD);
    assert_eq!(
        engine.session().unwrap().vertices,
        vec![Point::new(100.0, 100.0), Point::new(300.0, 100.0)]
    );
    key(&mut engine, "Backspace", Modifiers::NONE);
    assert!(engine.session().is_none(), "one vertex left: session cancelled");
    assert!(key(&mut engine, "Backspace", Modifiers::NONE).is_empty());
}

// ─── Lines, points, calibration ─────────────────────────────────────────

#[test]
fn line_and_point_markups() {
    let mut engine = engine(ToolKind::Line);
    assert!(click(&mut engine, 0.0, 0.0).is_empty());
    engine.apply(InputEvent::pointer_move(0.0, 100.0));
    assert_eq!(
        engine.session().unwrap().preview_cursor,
        Some(Point::new(0.0, 100.0))
    );
    let (points, markup, m) = created(&click(&mut engine, 0.0, 192.0));
    assert_eq!(markup, MarkupType::Line);
    assert_eq!(points, vec![Point::new(0.0, 0.0), Point::new(0.0, 192.0)]);
    assert_eq!(m.perimeter_lf, 3.0);
    assert_eq!(m.area_sf, 0.0);

    engine.set_tool(ToolKind::Point);
    let (points, markup, m) = created(&click(&mut engine, 40.0, 50.0));
    assert_eq!(markup, MarkupType::Point);
    assert_eq!(points, vec![Point::new(40.0, 50.0)]);
    assert_eq!(m, Measurements::default());
}

#[test]
fn calibration_scenario() {
    let mut engine = engine(ToolKind::Calibrate);
    engine.load_image(400.0, 300.0);

    assert!(click(&mut engine, 200.0, 150.0).is_empty());
    engine.apply(InputEvent::pointer_move(350.0, 350.0));
    assert!(engine.calibration().pixel_distance().is_some());

    let events = click(&mut engine, 500.0, 550.0);
    assert_eq!(
        events,
        vec![EngineEvent::CalibrationComplete {
            point_a: Point::new(0.0, 0.0),
            point_b: Point::new(300.0, 400.0),
            pixel_distance: 500.0,
        }]
    );
    assert!(engine.calibration().point_a.is_none());

    // The host asks the user for the real length: 10 ft.
    assert_eq!(engine.apply_calibration(500.0, 10.0), Some(50.0));
    engine.set_tool(ToolKind::Line);
    click(&mut engine, 200.0, 150.0);
    let (_, _, m) = created(&click(&mut engine, 300.0, 150.0));
    assert_eq!(m.perimeter_lf, 2.0);
}

#[test]
fn zero_ratio_measures_zero() {
    let mut engine = engine(ToolKind::Create);
    engine.set_scale_ratio(0.0);
    let (_, _, m) = created(&drag(&mut engine, (10.0, 10.0), (110.0, 60.0)));
    assert_eq!(m, Measurements::default());
}

// ─── Auto-pan ───────────────────────────────────────────────────────────

#[test]
fn auto_pan_runs_only_during_a_session() {
    let mut engine = engine(ToolKind::Create);

    // No session: the edge does nothing.
    engine.apply(InputEvent::pointer_move(795.0, 300.0));
    assert!(!engine.needs_frame());
    assert!(engine.apply(InputEvent::Frame).is_empty());

    click(&mut engine, 400.0, 300.0);
    engine.apply(InputEvent::pointer_move(790.0, 300.0));
    assert!(engine.needs_frame());

    // 10 px from the right edge: factor 0.8, speed 2 + 18 * 0.64.
    let speed = 13.52;
    let events = engine.apply(InputEvent::Frame);
    let [EngineEvent::ViewportChanged { offset, .. }] = events.as_slice() else {
        panic!("expected a viewport change, got {events:?}");
    };
    assert!((offset.x + speed).abs() < 1e-9 && offset.y == 0.0);
    engine.apply(InputEvent::Frame);
    assert!((engine.viewport().offset.x + 2.0 * speed).abs() < 1e-9);

    // The preview keeps tracking the still pointer.
    let preview = engine.session().unwrap().preview_cursor.unwrap();
    assert!(near(preview, Point::new(790.0 + 2.0 * speed, 300.0)));

    // Back in the safe zone: frames stop.
    engine.apply(InputEvent::pointer_move(400.0, 300.0));
    assert!(!engine.needs_frame());
    assert!(engine.apply(InputEvent::Frame).is_empty());

    // Ending the session stops a running pan.
    engine.apply(InputEvent::pointer_move(5.0, 300.0));
    assert!(engine.needs_frame());
    key(&mut engine, "Escape", Modifiers::NONE);
    assert!(!engine.needs_frame());
    assert!(engine.apply(InputEvent::Frame).is_empty());
}

#[test]
fn rectangle_drag_pans_near_edge() {
    let mut engine = engine(ToolKind::Create);
    engine.apply(InputEvent::pointer_down(400.0, 300.0));
    engine.apply(InputEvent::pointer_move(400.0, 595.0));
    assert_eq!(engine.session().unwrap().kind, SessionKind::RectangleFromDrag);
    assert!(engine.needs_frame());
    engine.apply(InputEvent::Frame);
    assert!(engine.viewport().offset.y < 0.0);

    let events = engine.apply(InputEvent::pointer_up(400.0, 595.0));
    assert!(events.is_empty(), "zero-width rectangle");
    assert!(!engine.needs_frame());
}
