//! Event system for hit-tested scene input
//!
//! Platform input is turned into [`SyntheticEvent`]s that travel along the
//! instance ancestor chain of the nearest hit:
//! - Capture handlers run root → hit
//! - Ordinary handlers run hit → root (bubbling)
//! - A handler may stop propagation for the rest of the dispatch
//!
//! Hover is tracked as a per-instance state machine in [`hover`] and drives the
//! derived over/out/enter/leave events.

pub mod hover;
pub mod manager;

pub use hover::{HoverDiff, HoverTracker, PointerPhase};
pub use manager::{Delivery, DispatchReport, EventManager, TeardownHandle};

use crate::foundation::math::{Vec2, Vec3};
use crate::instance::InstanceId;
use crate::scene::{NodeKey, Ray};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Event type identification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    /// Primary button click
    Click,
    /// Double click
    DoubleClick,
    /// Secondary button click
    ContextMenu,
    /// Button pressed
    PointerDown,
    /// Button released
    PointerUp,
    /// Pointer moved
    PointerMove,
    /// Wheel scrolled
    Wheel,
    /// Pointer started hovering the instance (derived, never bubbles)
    PointerOver,
    /// Pointer stopped hovering the instance (derived, never bubbles)
    PointerOut,
    /// Pointer entered the instance (derived, never bubbles)
    PointerEnter,
    /// Pointer left the instance (derived, never bubbles)
    PointerLeave,
    /// A click hit nothing (derived)
    PointerMissed,
    /// Key pressed
    KeyDown,
    /// Key released
    KeyUp,
}

bitflags! {
    /// Set of event kinds the manager listens to
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EventKinds: u16 {
        /// Click
        const CLICK = 1 << 0;
        /// Double click
        const DOUBLE_CLICK = 1 << 1;
        /// Context menu
        const CONTEXT_MENU = 1 << 2;
        /// Pointer down
        const POINTER_DOWN = 1 << 3;
        /// Pointer up
        const POINTER_UP = 1 << 4;
        /// Pointer move
        const POINTER_MOVE = 1 << 5;
        /// Wheel
        const WHEEL = 1 << 6;
        /// Pointer over
        const POINTER_OVER = 1 << 7;
        /// Pointer out
        const POINTER_OUT = 1 << 8;
        /// Pointer enter
        const POINTER_ENTER = 1 << 9;
        /// Pointer leave
        const POINTER_LEAVE = 1 << 10;
        /// Pointer missed
        const POINTER_MISSED = 1 << 11;
        /// Key down
        const KEY_DOWN = 1 << 12;
        /// Key up
        const KEY_UP = 1 << 13;

        /// Everything a pointer device produces
        const POINTER = Self::CLICK.bits()
            | Self::DOUBLE_CLICK.bits()
            | Self::CONTEXT_MENU.bits()
            | Self::POINTER_DOWN.bits()
            | Self::POINTER_UP.bits()
            | Self::POINTER_MOVE.bits()
            | Self::WHEEL.bits();
        /// Keyboard kinds
        const KEYBOARD = Self::KEY_DOWN.bits() | Self::KEY_UP.bits();
    }
}

impl Default for EventKinds {
    fn default() -> Self {
        Self::POINTER | Self::KEYBOARD
    }
}

impl EventKind {
    /// Every kind, in declaration order
    pub const ALL: [Self; 14] = [
        Self::Click,
        Self::DoubleClick,
        Self::ContextMenu,
        Self::PointerDown,
        Self::PointerUp,
        Self::PointerMove,
        Self::Wheel,
        Self::PointerOver,
        Self::PointerOut,
        Self::PointerEnter,
        Self::PointerLeave,
        Self::PointerMissed,
        Self::KeyDown,
        Self::KeyUp,
    ];

    /// Bit of this kind in an [`EventKinds`] set
    pub fn flag(self) -> EventKinds {
        match self {
            Self::Click => EventKinds::CLICK,
            Self::DoubleClick => EventKinds::DOUBLE_CLICK,
            Self::ContextMenu => EventKinds::CONTEXT_MENU,
            Self::PointerDown => EventKinds::POINTER_DOWN,
            Self::PointerUp => EventKinds::POINTER_UP,
            Self::PointerMove => EventKinds::POINTER_MOVE,
            Self::Wheel => EventKinds::WHEEL,
            Self::PointerOver => EventKinds::POINTER_OVER,
            Self::PointerOut => EventKinds::POINTER_OUT,
            Self::PointerEnter => EventKinds::POINTER_ENTER,
            Self::PointerLeave => EventKinds::POINTER_LEAVE,
            Self::PointerMissed => EventKinds::POINTER_MISSED,
            Self::KeyDown => EventKinds::KEY_DOWN,
            Self::KeyUp => EventKinds::KEY_UP,
        }
    }

    /// Whether the kind is delivered along the ancestor chain.
    ///
    /// Hover kinds are derived per instance, and every hovered ancestor gets
    /// its own transition, so none of them bubble.
    pub fn bubbles(self) -> bool {
        !matches!(
            self,
            Self::PointerOver
                | Self::PointerOut
                | Self::PointerEnter
                | Self::PointerLeave
                | Self::PointerMissed
        )
    }

    /// Whether a hit-test is required to route it
    pub fn is_pointer(self) -> bool {
        EventKinds::POINTER.contains(self.flag())
    }

    /// Whether the click family triggers pointer-missed when nothing is hit
    pub fn is_click(self) -> bool {
        matches!(self, Self::Click | Self::DoubleClick | Self::ContextMenu)
    }
}

impl From<EventKind> for EventKinds {
    fn from(kind: EventKind) -> Self {
        kind.flag()
    }
}

impl FromIterator<EventKind> for EventKinds {
    fn from_iter<I: IntoIterator<Item = EventKind>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::empty(), |set, kind| set | kind.flag())
    }
}

/// Raw input handed over by the windowing collaborator
#[derive(Debug, Clone, PartialEq)]
pub enum PlatformEvent {
    /// Pointer event at pixel coordinates
    Pointer {
        /// One of the pointer kinds
        kind: EventKind,
        /// Pixel position from the top-left corner
        position: Vec2,
        /// Button index (0 primary)
        button: u8,
    },
    /// Wheel scroll at pixel coordinates
    Wheel {
        /// Pixel position
        position: Vec2,
        /// Scroll amount
        delta: Vec2,
    },
    /// Keyboard event
    Key {
        /// Key down or key up
        kind: EventKind,
        /// Key name
        key: String,
    },
}

impl PlatformEvent {
    /// Pointer event helper
    pub fn pointer(kind: EventKind, x: f32, y: f32) -> Self {
        Self::Pointer {
            kind,
            position: Vec2::new(x, y),
            button: 0,
        }
    }

    /// Key event helper
    pub fn key(kind: EventKind, key: impl Into<String>) -> Self {
        Self::Key {
            kind,
            key: key.into(),
        }
    }

    /// Event kind
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Pointer { kind, .. } | Self::Key { kind, .. } => *kind,
            Self::Wheel { .. } => EventKind::Wheel,
        }
    }

    /// Pixel position for pointer events
    pub fn position(&self) -> Option<Vec2> {
        match self {
            Self::Pointer { position, .. } | Self::Wheel { position, .. } => Some(*position),
            Self::Key { .. } => None,
        }
    }
}

/// One ray hit resolved to an instance
#[derive(Debug, Clone, PartialEq)]
pub struct Intersection {
    /// Hit instance
    pub instance: InstanceId,
    /// Hit native node
    pub node: NodeKey,
    /// Distance from the ray origin
    pub distance: f32,
    /// World-space hit point
    pub point: Vec3,
    /// World-space surface normal
    pub normal: Vec3,
    /// Hit instance followed by its ancestors up to the root
    pub ancestors: Vec<InstanceId>,
}

/// Dispatch phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Root → hit
    Capture,
    /// Hit → root
    Bubble,
    /// Delivered to one instance only
    Direct,
}

/// Event object handed to handlers
#[derive(Debug, Clone)]
pub struct SyntheticEvent {
    /// Kind being delivered
    pub kind: EventKind,
    /// Original platform input
    pub source: PlatformEvent,
    /// Nearest hit, when the event was hit-tested
    pub intersection: Option<Intersection>,
    /// All hits of this event, nearest first
    pub intersections: Vec<Intersection>,
    /// Picking ray, when the event was hit-tested
    pub ray: Option<Ray>,
    /// Pointer position in normalized device coordinates
    pub pointer: Vec2,
    /// Instance whose handler is running
    pub current: InstanceId,
    /// Current phase
    pub phase: Phase,
    stopped: bool,
}

impl SyntheticEvent {
    pub(crate) fn new(
        kind: EventKind,
        source: PlatformEvent,
        intersections: Vec<Intersection>,
        ray: Option<Ray>,
        pointer: Vec2,
        current: InstanceId,
    ) -> Self {
        Self {
            kind,
            source,
            intersection: intersections.first().cloned(),
            intersections,
            ray,
            pointer,
            current,
            phase: Phase::Direct,
            stopped: false,
        }
    }

    /// Stop delivery to further instances
    pub fn stop_propagation(&mut self) {
        self.stopped = true;
    }

    /// Whether propagation was stopped
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }
}

/// Event handler callback
pub type Handler = Rc<dyn Fn(&mut SyntheticEvent)>;

/// Handlers declared on one node, keyed by kind and phase
#[derive(Clone, Default)]
pub struct Handlers {
    bubble: HashMap<EventKind, Handler>,
    capture: HashMap<EventKind, Handler>,
}

impl Handlers {
    /// Register a handler, replacing any previous one for the same kind and phase
    pub fn insert(&mut self, kind: EventKind, capture: bool, handler: Handler) {
        let map = if capture {
            &mut self.capture
        } else {
            &mut self.bubble
        };
        map.insert(kind, handler);
    }

    /// Handler for a kind and phase
    pub fn get(&self, kind: EventKind, capture: bool) -> Option<Handler> {
        let map = if capture { &self.capture } else { &self.bubble };
        map.get(&kind).cloned()
    }

    /// Whether any handler for the kind exists
    pub fn has(&self, kind: EventKind) -> bool {
        self.bubble.contains_key(&kind) || self.capture.contains_key(&kind)
    }

    /// Kinds with at least one handler
    pub fn kinds(&self) -> EventKinds {
        self.bubble
            .keys()
            .chain(self.capture.keys())
            .copied()
            .collect()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.bubble.is_empty() && self.capture.is_empty()
    }
}

impl fmt::Debug for Handlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handlers")
            .field("kinds", &self.kinds())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_flags_are_distinct() {
        let all: EventKinds = EventKind::ALL.into_iter().collect();
        assert_eq!(all.bits().count_ones() as usize, EventKind::ALL.len());
    }

    #[test]
    fn test_default_subscription() {
        let set = EventKinds::default();
        assert!(set.contains(EventKinds::CLICK));
        assert!(set.contains(EventKinds::KEY_DOWN));
        assert!(!set.contains(EventKinds::POINTER_OVER));
    }

    #[test]
    fn test_handlers_by_phase() {
        let mut handlers = Handlers::default();
        handlers.insert(EventKind::Click, true, Rc::new(|_| {}));

        assert!(handlers.has(EventKind::Click));
        assert!(handlers.get(EventKind::Click, true).is_some());
        assert!(handlers.get(EventKind::Click, false).is_none());
        assert_eq!(handlers.kinds(), EventKinds::CLICK);
    }

    #[test]
    fn test_hover_kinds_do_not_bubble() {
        for kind in [
            EventKind::PointerOver,
            EventKind::PointerOut,
            EventKind::PointerEnter,
            EventKind::PointerLeave,
            EventKind::PointerMissed,
        ] {
            assert!(!kind.bubbles(), "{kind:?}");
        }
        assert!(EventKind::Click.bubbles());
        assert!(EventKind::KeyDown.bubbles());
        assert!(EventKind::Wheel.is_pointer());
        assert!(!EventKind::KeyUp.is_pointer());
    }
}
