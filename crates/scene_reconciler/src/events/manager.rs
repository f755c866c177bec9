//! Hit-test driven event routing

use super::{
    EventKind, EventKinds, HoverDiff, HoverTracker, Intersection, Phase, PlatformEvent,
    SyntheticEvent,
};
use crate::foundation::math::Vec2;
use crate::instance::{InstanceId, InstanceTree};
use crate::scene::{Ray, SceneGraph};
use std::cell::Cell;
use std::rc::Rc;

/// Lets handlers (or anyone holding a clone) tear the manager down.
///
/// Once torn down, the dispatch in progress stops before the next handler and
/// later events are ignored.
#[derive(Debug, Clone, Default)]
pub struct TeardownHandle(Rc<Cell<bool>>);

impl TeardownHandle {
    /// Request teardown
    pub fn teardown(&self) {
        self.0.set(true);
    }

    /// Whether teardown was requested
    pub fn is_torn_down(&self) -> bool {
        self.0.get()
    }
}

/// One handler invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    /// Instance whose handler ran
    pub instance: InstanceId,
    /// Delivered kind
    pub kind: EventKind,
    /// Phase it ran in
    pub phase: Phase,
}

/// What one platform event turned into
#[derive(Debug, Clone, Default)]
pub struct DispatchReport {
    /// Handler invocations in order
    pub delivered: Vec<Delivery>,
    /// Number of instances hit by the ray
    pub hits: usize,
    /// Hover transitions computed for this event
    pub hover: HoverDiff,
    /// Dispatch stopped by teardown
    pub abandoned: bool,
}

impl DispatchReport {
    /// Deliveries of one kind
    pub fn of_kind(&self, kind: EventKind) -> Vec<InstanceId> {
        self.delivered
            .iter()
            .filter(|d| d.kind == kind)
            .map(|d| d.instance)
            .collect()
    }
}

enum Flow {
    Continue,
    Stop,
    Abandon,
}

/// Routes platform input through the mounted scene
#[derive(Debug)]
pub struct EventManager {
    subscribed: EventKinds,
    hover: HoverTracker,
    teardown: TeardownHandle,
}

impl EventManager {
    /// Manager listening to `subscribed` platform kinds
    pub fn new(subscribed: EventKinds) -> Self {
        Self {
            subscribed,
            hover: HoverTracker::new(),
            teardown: TeardownHandle::default(),
        }
    }

    /// Subscribed platform kinds
    pub fn subscribed(&self) -> EventKinds {
        self.subscribed
    }

    /// Replace the subscription set
    pub fn set_subscribed(&mut self, kinds: EventKinds) {
        self.subscribed = kinds;
    }

    /// Hover state
    pub fn hover(&self) -> &HoverTracker {
        &self.hover
    }

    /// Handle that can tear this manager down from inside a handler
    pub fn teardown_handle(&self) -> TeardownHandle {
        self.teardown.clone()
    }

    /// Stop routing events
    pub fn teardown(&mut self) {
        self.teardown.teardown();
        self.hover.clear();
        log::info!("Event manager torn down");
    }

    /// Whether the manager was torn down
    pub fn is_torn_down(&self) -> bool {
        self.teardown.is_torn_down()
    }

    /// Drop hover state of unmounted instances
    pub fn forget(&mut self, ids: &[InstanceId]) {
        for id in ids {
            self.hover.forget(*id);
        }
    }

    /// Ray cast resolved to instances, nearest first
    pub fn intersect(ray: &Ray, tree: &InstanceTree, graph: &SceneGraph) -> Vec<Intersection> {
        graph
            .raycast(ray)
            .into_iter()
            .filter_map(|hit| {
                let instance = tree.by_node(hit.node)?;
                Some(Intersection {
                    instance,
                    node: hit.node,
                    distance: hit.distance,
                    point: hit.point,
                    normal: hit.normal,
                    ancestors: tree.ancestors(instance),
                })
            })
            .collect()
    }

    /// Route one platform event.
    ///
    /// Pointer kinds are hit-tested with `ray` and dispatched along the
    /// ancestor chain of the nearest hit. Pointer moves also advance hover
    /// state, which produces out/leave then over/enter deliveries. Clicks
    /// that hit nothing become `PointerMissed` for every instance listening
    /// to it. Keyboard kinds go to the nearest hovered instance and bubble.
    pub fn handle(
        &mut self,
        event: &PlatformEvent,
        ray: Option<Ray>,
        pointer: Vec2,
        tree: &InstanceTree,
        graph: &SceneGraph,
    ) -> DispatchReport {
        let mut report = DispatchReport::default();
        let kind = event.kind();
        if self.is_torn_down() {
            return report;
        }
        if !self.subscribed.contains(kind.flag()) {
            log::trace!("Ignoring unsubscribed {kind:?}");
            return report;
        }

        if !kind.is_pointer() {
            let Some(target) = self.hover.nearest().filter(|id| tree.contains(*id)) else {
                log::trace!("{kind:?} dropped: nothing hovered");
                return report;
            };
            let chain = tree.ancestors(target);
            let mut synthetic =
                SyntheticEvent::new(kind, event.clone(), Vec::new(), None, pointer, target);
            report.abandoned = self.propagate(&chain, &mut synthetic, tree, &mut report.delivered);
            return report;
        }

        let hits = ray.map_or_else(Vec::new, |ray| Self::intersect(&ray, tree, graph));
        report.hits = hits.len();
        let chain = hits.first().map(|hit| hit.ancestors.clone()).unwrap_or_default();

        if kind == EventKind::PointerMove
            && self.advance_hover(event, &hits, ray, pointer, tree, &mut report)
        {
            return report;
        }

        let Some(target) = chain.first().copied() else {
            if kind.is_click() {
                report.abandoned =
                    self.deliver_missed(event, pointer, ray, tree, &mut report.delivered);
            }
            return report;
        };

        let mut synthetic = SyntheticEvent::new(kind, event.clone(), hits, ray, pointer, target);
        report.abandoned = self.propagate(&chain, &mut synthetic, tree, &mut report.delivered);
        report
    }

    /// Re-run hover hit-testing without a platform event.
    ///
    /// Called once per frame with the last known pointer ray so hover follows
    /// objects that move under a stationary pointer. Only out/leave and
    /// over/enter are delivered.
    pub fn refresh_hover(
        &mut self,
        ray: Ray,
        pixels: Vec2,
        pointer: Vec2,
        tree: &InstanceTree,
        graph: &SceneGraph,
    ) -> DispatchReport {
        let mut report = DispatchReport::default();
        if self.is_torn_down() || !self.subscribed.contains(EventKinds::POINTER_MOVE) {
            return report;
        }
        let hits = Self::intersect(&ray, tree, graph);
        report.hits = hits.len();
        let event = PlatformEvent::pointer(EventKind::PointerMove, pixels.x, pixels.y);
        self.advance_hover(&event, &hits, Some(ray), pointer, tree, &mut report);
        report
    }

    /// Diff hover state against `hits` and deliver the derived events.
    /// Returns `true` if abandoned.
    fn advance_hover(
        &mut self,
        event: &PlatformEvent,
        hits: &[Intersection],
        ray: Option<Ray>,
        pointer: Vec2,
        tree: &InstanceTree,
        report: &mut DispatchReport,
    ) -> bool {
        let chain = hits
            .first()
            .map(|hit| hit.ancestors.clone())
            .unwrap_or_default();
        let diff = self.hover.update(&chain);
        let derived: Vec<_> = diff
            .left
            .iter()
            .flat_map(|id| [(*id, EventKind::PointerOut), (*id, EventKind::PointerLeave)])
            .chain(
                diff.entered
                    .iter()
                    .flat_map(|id| [(*id, EventKind::PointerOver), (*id, EventKind::PointerEnter)]),
            )
            .collect();

        let mut abandoned = false;
        for (id, derived_kind) in derived {
            let mut synthetic = SyntheticEvent::new(
                derived_kind,
                event.clone(),
                hits.to_vec(),
                ray,
                pointer,
                id,
            );
            let flow = self.invoke(tree, id, Phase::Direct, &mut synthetic, &mut report.delivered);
            if matches!(flow, Flow::Abandon) {
                abandoned = true;
                break;
            }
        }
        report.hover = diff;
        report.abandoned = abandoned;
        abandoned
    }

    /// Capture root → hit, then bubble hit → root. Returns `true` if abandoned.
    fn propagate(
        &self,
        chain: &[InstanceId],
        event: &mut SyntheticEvent,
        tree: &InstanceTree,
        delivered: &mut Vec<Delivery>,
    ) -> bool {
        for id in chain.iter().rev() {
            match self.invoke(tree, *id, Phase::Capture, event, delivered) {
                Flow::Continue => {}
                Flow::Stop => return false,
                Flow::Abandon => return true,
            }
        }
        let (bubble, phase) = if event.kind.bubbles() {
            (chain, Phase::Bubble)
        } else {
            (&chain[..chain.len().min(1)], Phase::Direct)
        };
        for id in bubble {
            match self.invoke(tree, *id, phase, event, delivered) {
                Flow::Continue => {}
                Flow::Stop => return false,
                Flow::Abandon => return true,
            }
        }
        false
    }

    fn deliver_missed(
        &self,
        event: &PlatformEvent,
        pointer: Vec2,
        ray: Option<Ray>,
        tree: &InstanceTree,
        delivered: &mut Vec<Delivery>,
    ) -> bool {
        let listeners: Vec<InstanceId> = tree
            .document_order()
            .into_iter()
            .filter(|id| {
                tree.get(*id)
                    .is_some_and(|i| i.handlers().has(EventKind::PointerMissed))
            })
            .collect();
        for id in listeners {
            let mut synthetic = SyntheticEvent::new(
                EventKind::PointerMissed,
                event.clone(),
                Vec::new(),
                ray,
                pointer,
                id,
            );
            if matches!(
                self.invoke(tree, id, Phase::Direct, &mut synthetic, delivered),
                Flow::Abandon
            ) {
                return true;
            }
        }
        false
    }

    fn invoke(
        &self,
        tree: &InstanceTree,
        id: InstanceId,
        phase: Phase,
        event: &mut SyntheticEvent,
        delivered: &mut Vec<Delivery>,
    ) -> Flow {
        let capture = phase == Phase::Capture;
        let Some(handler) = tree
            .get(id)
            .and_then(|instance| instance.handlers().get(event.kind, capture))
        else {
            return Flow::Continue;
        };
        event.current = id;
        event.phase = phase;
        handler(event);
        delivered.push(Delivery {
            instance: id,
            kind: event.kind,
            phase: event.phase,
        });

        if self.is_torn_down() {
            log::debug!("Dispatch of {:?} abandoned after teardown", event.kind);
            Flow::Abandon
        } else if event.is_stopped() {
            Flow::Stop
        } else {
            Flow::Continue
        }
    }
}

impl Default for EventManager {
    fn default() -> Self {
        Self::new(EventKinds::default())
    }
}
