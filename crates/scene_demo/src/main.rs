//! Headless scene demo
//!
//! Mounts a small fleet scene, re-renders it every frame from application
//! state and feeds it a scripted pointer path, logging what the reconciler and
//! the event manager did. Pass a `.toml` or `.ron` root config as the first
//! argument to override the defaults.

use scene_reconciler::foundation::logging;
use scene_reconciler::prelude::*;
use scene_reconciler::root::Viewport;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use thiserror::Error;

const FRAMES: usize = 8;
const SHIP_COLORS: [&str; 3] = ["#d94f4f", "#4fd97a", "#4f7ad9"];

#[derive(Debug, Error)]
enum DemoError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("{0} reconcile diagnostics on frame {1}")]
    Reconcile(usize, usize),
}

/// State the declarative tree is derived from
#[derive(Debug, Default)]
struct DemoState {
    hovered: Cell<Option<usize>>,
    selected: Cell<Option<usize>>,
    missed: Cell<u32>,
    log: RefCell<Vec<String>>,
}

struct DemoApp {
    root: Root,
    state: Rc<DemoState>,
    ships: usize,
}

impl DemoApp {
    fn new(root: Root) -> Self {
        Self {
            root,
            state: Rc::new(DemoState::default()),
            ships: SHIP_COLORS.len(),
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn scene(&self, frame: usize) -> Vec<Element> {
        let spin = frame as f32 * 0.1;
        let ships = (0..self.ships).map(|i| {
            let state = Rc::clone(&self.state);
            let x = (i as f32 - 1.0) * 2.0;
            let selected = self.state.selected.get() == Some(i);
            let hovered = self.state.hovered.get() == Some(i);
            let color = if selected { "#ffffff" } else { SHIP_COLORS[i] };

            let enter = Rc::clone(&state);
            let leave = Rc::clone(&state);
            Element::new("mesh")
                .key(format!("ship-{i}"))
                .prop("position-x", x)
                .prop("rotation-y", spin)
                .prop("scale", if hovered { 1.2 } else { 1.0 })
                .on(EventKind::PointerEnter, move |_| enter.hovered.set(Some(i)))
                .on(EventKind::PointerLeave, move |_| {
                    if leave.hovered.get() == Some(i) {
                        leave.hovered.set(None);
                    }
                })
                .on(EventKind::Click, move |event| {
                    state.selected.set(Some(i));
                    let distance = event.intersection.as_ref().map_or(0.0, |hit| hit.distance);
                    state
                        .log
                        .borrow_mut()
                        .push(format!("ship {i} clicked at distance {distance:.2}"));
                    event.stop_propagation();
                })
                .child(Element::new("boxGeometry").args([1.0, 0.5, 1.5]))
                .child(Element::new("meshStandardMaterial").prop("color", color))
        });

        let missed = Rc::clone(&self.state);
        vec![
            Element::new("ambientLight").prop("intensity", 0.3),
            Element::new("directionalLight")
                .key("sun")
                .prop("position", [5.0, 5.0, 5.0])
                .child(Element::new("group").key("sun-target").attach("target")),
            Element::new("group")
                .key("fleet")
                .on(EventKind::PointerMissed, move |_| {
                    missed.missed.set(missed.missed.get() + 1);
                    missed.selected.set(None);
                })
                .children_from(ships),
        ]
    }

    fn pointer_script(&self, frame: usize) -> Vec<PlatformEvent> {
        let Viewport { width, height } = self.root.state().viewport();
        #[allow(clippy::cast_precision_loss)]
        let (w, h) = (width as f32, height as f32);
        match frame {
            1 => vec![PlatformEvent::pointer(EventKind::PointerMove, w * 0.5, h * 0.5)],
            2 => vec![PlatformEvent::pointer(EventKind::Click, w * 0.5, h * 0.5)],
            4 => vec![PlatformEvent::pointer(EventKind::PointerMove, w * 0.02, h * 0.02)],
            5 => vec![PlatformEvent::pointer(EventKind::Click, w * 0.02, h * 0.02)],
            _ => Vec::new(),
        }
    }

    fn run(&mut self) -> Result<(), DemoError> {
        for frame in 0..FRAMES {
            let elements = self.scene(frame);
            let report = self.root.render(&elements);
            if !report.errors.is_empty() {
                for error in &report.errors {
                    log::error!("{error}");
                }
                return Err(DemoError::Reconcile(report.errors.len(), frame));
            }
            log::info!(
                "Frame {frame}: {} mutations ({} constructed, {} disposed)",
                report.mutations.len(),
                report.constructed().len(),
                report.disposed().len()
            );

            for event in self.pointer_script(frame) {
                let dispatch = self.root.handle_event(&event);
                log::info!(
                    "{:?}: {} hits, {} deliveries, +{} hovered, -{} left",
                    event.kind(),
                    dispatch.hits,
                    dispatch.delivered.len(),
                    dispatch.hover.entered.len(),
                    dispatch.hover.left.len()
                );
            }
            let hover = self.root.frame().hover;
            if !hover.is_empty() {
                log::debug!(
                    "Frame {frame} hover: +{} entered, -{} left",
                    hover.entered.len(),
                    hover.left.len()
                );
            }
        }

        for line in self.state.log.borrow().iter() {
            log::info!("{line}");
        }
        log::info!(
            "Selected {:?}, hovered {:?}, {} missed clicks",
            self.state.selected.get(),
            self.state.hovered.get(),
            self.state.missed.get()
        );
        Ok(())
    }

    fn shutdown(self) {
        let report = self.root.unmount();
        log::info!("Disposed {} instances", report.disposed().len());
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();
    log::info!("Starting scene demo");

    let root = match std::env::args().nth(1) {
        Some(path) => Root::from_config_file(&path).map_err(DemoError::from)?,
        None => Root::new(&RootConfig::default()),
    };

    let mut app = DemoApp::new(root);
    let result = app.run();
    app.shutdown();

    match result {
        Ok(()) => {
            log::info!("Scene demo completed successfully");
            Ok(())
        }
        Err(e) => {
            log::error!("Scene demo failed: {e}");
            Err(e.into())
        }
    }
}
