//! Hover enter/leave pairs across a sequence of pointer frames

use crate::catalogue::CatalogueHandle;
use crate::config::RootConfig;
use crate::element::Element;
use crate::events::{EventKind, Phase, PlatformEvent, PointerPhase};
use crate::foundation::math::Point3;
use crate::root::Root;
use std::cell::RefCell;
use std::rc::Rc;

type Log = Rc<RefCell<Vec<(String, EventKind)>>>;

fn record(log: &Log, name: &'static str, element: Element) -> Element {
    [
        EventKind::PointerEnter,
        EventKind::PointerLeave,
        EventKind::PointerOver,
        EventKind::PointerOut,
    ]
    .into_iter()
    .fold(element, |element, kind| {
        let log = Rc::clone(log);
        element.on(kind, move |event| {
            assert_eq!(event.phase, Phase::Direct);
            log.borrow_mut().push((name.to_string(), event.kind));
        })
    })
}

fn hovered_scene(log: &Log) -> Vec<Element> {
    vec![record(
        log,
        "group",
        Element::new("group").child(record(
            log,
            "mesh",
            Element::new("mesh").child(Element::new("boxGeometry")),
        )),
    )]
}

fn move_to(root: &mut Root, x: f32, y: f32) {
    root.handle_event(&PlatformEvent::pointer(EventKind::PointerMove, x, y));
}

fn count(log: &Log, name: &str, kind: EventKind) -> usize {
    log.borrow()
        .iter()
        .filter(|(n, k)| n == name && *k == kind)
        .count()
}

#[test]
fn test_enter_and_leave_fire_once_per_transition() {
    let log: Log = Rc::default();
    let mut root = Root::with_catalogue(&RootConfig::default(), CatalogueHandle::local());
    root.render(&hovered_scene(&log));

    move_to(&mut root, 10.0, 10.0);
    assert!(log.borrow().is_empty());

    for _ in 0..3 {
        move_to(&mut root, 640.0, 360.0);
    }
    move_to(&mut root, 10.0, 10.0);

    for name in ["mesh", "group"] {
        assert_eq!(count(&log, name, EventKind::PointerEnter), 1, "{name}");
        assert_eq!(count(&log, name, EventKind::PointerOver), 1, "{name}");
        assert_eq!(count(&log, name, EventKind::PointerLeave), 1, "{name}");
        assert_eq!(count(&log, name, EventKind::PointerOut), 1, "{name}");
    }
}

#[test]
fn test_leave_delivered_before_enter() {
    let log: Log = Rc::default();
    let mut root = Root::with_catalogue(&RootConfig::default(), CatalogueHandle::local());
    root.render(&[
        record(
            &log,
            "left",
            Element::new("mesh")
                .prop("position-x", -1.5)
                .child(Element::new("boxGeometry")),
        ),
        record(
            &log,
            "right",
            Element::new("mesh")
                .prop("position-x", 1.5)
                .child(Element::new("boxGeometry")),
        ),
    ]);

    #[allow(clippy::cast_precision_loss)]
    let pixel_x = |world_x: f32| {
        let state = root.state();
        let ndc = state
            .camera()
            .view_projection_matrix()
            .transform_point(&Point3::new(world_x, 0.0, 0.0));
        (ndc.x + 1.0) * 0.5 * state.viewport().width as f32
    };
    let (left_px, right_px) = (pixel_x(-1.5), pixel_x(1.5));

    move_to(&mut root, left_px, 360.0);
    log.borrow_mut().clear();
    move_to(&mut root, right_px, 360.0);

    let names: Vec<_> = log
        .borrow()
        .iter()
        .map(|(name, kind)| format!("{name}:{kind:?}"))
        .collect();
    assert_eq!(
        names,
        [
            "left:PointerOut",
            "left:PointerLeave",
            "right:PointerOver",
            "right:PointerEnter"
        ]
    );
}

#[test]
fn test_hover_phases_settle() {
    let log: Log = Rc::default();
    let mut root = Root::with_catalogue(&RootConfig::default(), CatalogueHandle::local());
    root.render(&hovered_scene(&log));
    let group = root.reconciler().tree().roots()[0];

    move_to(&mut root, 640.0, 360.0);
    assert_eq!(root.events().hover().phase(group), PointerPhase::Entering);
    move_to(&mut root, 640.0, 360.0);
    assert_eq!(root.events().hover().phase(group), PointerPhase::Over);
    move_to(&mut root, 10.0, 10.0);
    assert_eq!(root.events().hover().phase(group), PointerPhase::Leaving);
    move_to(&mut root, 10.0, 10.0);
    assert_eq!(root.events().hover().phase(group), PointerPhase::Outside);
}

#[test]
fn test_unmounting_hovered_instance_sends_no_leave() {
    let log: Log = Rc::default();
    let mut root = Root::with_catalogue(&RootConfig::default(), CatalogueHandle::local());
    root.render(&hovered_scene(&log));
    move_to(&mut root, 640.0, 360.0);
    log.borrow_mut().clear();

    root.render(&[]);
    move_to(&mut root, 10.0, 10.0);
    assert!(log.borrow().is_empty());
    assert!(root.events().hover().nearest().is_none());
}

#[test]
fn test_leave_runs_nearest_first_like_enter() {
    for _ in 0..16 {
        let log: Log = Rc::default();
        let mut root = Root::with_catalogue(&RootConfig::default(), CatalogueHandle::local());
        root.render(&hovered_scene(&log));

        move_to(&mut root, 640.0, 360.0);
        move_to(&mut root, 10.0, 10.0);

        let order: Vec<_> = log
            .borrow()
            .iter()
            .map(|(name, kind)| format!("{name}:{kind:?}"))
            .collect();
        assert_eq!(
            order,
            [
                "mesh:PointerOver",
                "mesh:PointerEnter",
                "group:PointerOver",
                "group:PointerEnter",
                "mesh:PointerOut",
                "mesh:PointerLeave",
                "group:PointerOut",
                "group:PointerLeave",
            ]
        );
    }
}
