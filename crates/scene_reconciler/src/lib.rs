//! # Scene Reconciler
//!
//! Keeps a retained 3D scene graph in sync with a declarative tree of tagged
//! nodes, and routes pointer and keyboard input back through it.
//!
//! ## Features
//!
//! - **Catalogue**: tag → native type registry, global or locally scoped
//! - **Reconciliation**: keyed/positional child matching, prop diffing,
//!   identity-preserving moves, tag changes forcing a rebuild
//! - **Attach relations**: children composed into named parent slots
//! - **Events**: ray-cast hit-testing, capture/bubble dispatch, hover state
//!
//! ## Quick Start
//!
//! ```rust
//! use scene_reconciler::prelude::*;
//!
//! let mut root = Root::new(&RootConfig::default());
//! let report = root.render(&[Element::new("group").child(
//!     Element::new("mesh")
//!         .prop("position", [0.0, 1.0, 0.0])
//!         .child(Element::new("sphereGeometry").args([0.5]))
//!         .child(Element::new("meshStandardMaterial").prop("color", "#3366ff")),
//! )]);
//! assert!(report.errors.is_empty());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod attach;
pub mod catalogue;
pub mod config;
pub mod element;
pub mod error;
pub mod events;
pub mod foundation;
pub mod instance;
pub mod native;
pub mod reconciler;
pub mod root;
pub mod scene;

#[cfg(test)]
mod tests;

/// Common imports
pub mod prelude {
    pub use crate::{
        attach::AttachSpec,
        catalogue::{CatalogueHandle, TagBinding, TypeDescriptor},
        config::{Config, ConfigError, RootConfig},
        element::Element,
        error::{ReconcileError, TreePath},
        events::{EventKind, EventKinds, PlatformEvent, SyntheticEvent},
        foundation::math::{Transform, Vec2, Vec3},
        instance::{InstanceId, Lifecycle},
        native::{NativeObject, PassThrough, PropError, PropValue, Resource},
        reconciler::{Mutation, ReconcileReport, Reconciler, TreeAdapter},
        root::{Root, RootState},
    };
}
