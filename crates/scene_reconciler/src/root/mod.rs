//! # Mounted root
//!
//! Ties one reconciler, one event manager and one [`RootState`] together. The
//! host render loop drives it:
//!
//! ```
//! use scene_reconciler::config::RootConfig;
//! use scene_reconciler::element::Element;
//! use scene_reconciler::events::{EventKind, PlatformEvent};
//! use scene_reconciler::root::Root;
//!
//! let mut root = Root::new(&RootConfig::default());
//! root.render(&[Element::new("mesh").child(Element::new("boxGeometry"))]);
//! root.handle_event(&PlatformEvent::pointer(EventKind::PointerMove, 640.0, 360.0));
//! root.frame();
//! let report = root.unmount();
//! assert_eq!(report.disposed().len(), 2);
//! ```

mod camera;
mod state;

pub use camera::Camera;
pub use state::{Performance, PointerState, RootState, Viewport};

use crate::catalogue::CatalogueHandle;
use crate::config::{Config, ConfigError, RootConfig};
use crate::element::Element;
use crate::events::{DispatchReport, EventManager, PlatformEvent, TeardownHandle};
use crate::reconciler::{ReconcileReport, Reconciler};
use crate::scene::Ray;

/// One mounted scene
#[derive(Debug)]
pub struct Root {
    state: RootState,
    reconciler: Reconciler,
    events: EventManager,
    pointer_seen: bool,
}

impl Root {
    /// Root resolving tags through the global catalogue
    pub fn new(config: &RootConfig) -> Self {
        Self::with_catalogue(config, CatalogueHandle::global())
    }

    /// Root resolving tags through `catalogue`
    pub fn with_catalogue(config: &RootConfig, catalogue: CatalogueHandle) -> Self {
        log::info!(
            "Mounting root {}x{} @{}",
            config.viewport.width,
            config.viewport.height,
            config.dpr
        );
        Self {
            state: RootState::from_config(config),
            reconciler: Reconciler::new(catalogue),
            events: EventManager::new(config.event_kinds()),
            pointer_seen: false,
        }
    }

    /// Root configured from a `.toml` or `.ron` file
    pub fn from_config_file(path: &str) -> Result<Self, ConfigError> {
        let config = RootConfig::load_from_file(path)?;
        config.validate()?;
        Ok(Self::new(&config))
    }

    /// Root state
    pub fn state(&self) -> &RootState {
        &self.state
    }

    /// Mutable root state
    pub fn state_mut(&mut self) -> &mut RootState {
        &mut self.state
    }

    /// Reconciler (instance tree and scene graph)
    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    /// Event manager
    pub fn events(&self) -> &EventManager {
        &self.events
    }

    /// Handle that lets a handler tear the root's event routing down
    pub fn teardown_handle(&self) -> TeardownHandle {
        self.events.teardown_handle()
    }

    /// Reconcile the scene against a new declarative tree
    pub fn render(&mut self, elements: &[Element]) -> ReconcileReport {
        let report = self.reconciler.reconcile(elements);
        self.events.forget(&report.disposed());
        report
    }

    /// Route one platform event through the scene
    pub fn handle_event(&mut self, event: &PlatformEvent) -> DispatchReport {
        if let Some(position) = event.position() {
            self.state.set_pointer(position);
            self.pointer_seen = true;
        }
        let pointer = self.state.pointer().ndc;
        let ray = event.kind().is_pointer().then(|| self.pointer_ray()).flatten();
        self.events.handle(
            event,
            ray,
            pointer,
            self.reconciler.tree(),
            self.reconciler.graph(),
        )
    }

    /// Advance one frame.
    ///
    /// Ticks the performance debounce and re-runs hover hit-testing from the
    /// last pointer position, so enter/leave follow objects that move under a
    /// stationary pointer.
    pub fn frame(&mut self) -> DispatchReport {
        self.state.advance_frame();
        let Some(ray) = self.pointer_ray() else {
            return DispatchReport::default();
        };
        let pointer = self.state.pointer();
        self.events.refresh_hover(
            ray,
            pointer.pixels,
            pointer.ndc,
            self.reconciler.tree(),
            self.reconciler.graph(),
        )
    }

    fn pointer_ray(&self) -> Option<Ray> {
        if !self.pointer_seen {
            return None;
        }
        let ndc = self.state.pointer().ndc;
        self.state.camera().screen_to_world_ray(ndc.x, ndc.y)
    }

    /// Tear down event routing and dispose the whole scene
    pub fn unmount(mut self) -> ReconcileReport {
        self.events.teardown();
        let report = self.reconciler.unmount_all();
        log::info!("Unmounted root after {} frames", self.state.frame());
        report
    }
}
