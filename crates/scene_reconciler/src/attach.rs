//! # Attachment Resolver
//!
//! Decides how a child's native object composes into its parent when the
//! child declares an attach relation instead of plain child-list membership.
//!
//! - A slot holds at most one child. Attaching a second child to an occupied
//!   slot supersedes the first (last write wins); the caller is told which
//!   node lost the slot.
//! - A sub-resource previously assigned to the slot through a prop is
//!   disposed when a child takes the slot.
//! - Detaching clears the slot only if the detaching child still occupies it.

use crate::native::{PropValue, SlotKind};
use crate::scene::{NodeKey, SceneGraph};
use std::fmt;
use thiserror::Error;

/// Declared composition rule of a child into its parent
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AttachSpec {
    /// `parent.<name>[index]`
    IndexedSlot {
        /// Slot name
        name: String,
        /// Position within the slot
        index: usize,
    },
    /// `parent.<name>`
    NamedRelation(String),
}

impl AttachSpec {
    /// Named relation
    pub fn named(name: impl Into<String>) -> Self {
        Self::NamedRelation(name.into())
    }

    /// Indexed slot
    pub fn indexed(name: impl Into<String>, index: usize) -> Self {
        Self::IndexedSlot {
            name: name.into(),
            index,
        }
    }

    /// Parse the dashed path form: `"material-1"` is indexed, `"geometry"` is named
    pub fn parse(path: &str) -> Self {
        if let Some((name, index)) = path.rsplit_once('-') {
            if let Ok(index) = index.parse() {
                return Self::indexed(name, index);
            }
        }
        Self::named(path)
    }

    /// Slot name
    pub fn slot_name(&self) -> &str {
        match self {
            Self::IndexedSlot { name, .. } | Self::NamedRelation(name) => name,
        }
    }
}

impl fmt::Display for AttachSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IndexedSlot { name, index } => write!(f, "{name}[{index}]"),
            Self::NamedRelation(name) => f.write_str(name),
        }
    }
}

/// Concrete slot location on a parent node
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotAddress {
    /// Slot name
    pub name: String,
    /// Position (always 0 for single slots)
    pub index: usize,
}

impl SlotAddress {
    /// Address of a single-valued slot
    pub fn single(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            index: 0,
        }
    }
}

/// Why an attach could not be resolved
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttachError {
    /// Parent has no slot with this name
    #[error("parent `{parent}` has no slot `{slot}`")]
    MissingSlot {
        /// Parent type name
        parent: String,
        /// Requested slot
        slot: String,
    },
    /// Index given for a single-valued slot
    #[error("slot `{slot}` on `{parent}` is not indexed")]
    NotIndexed {
        /// Parent type name
        parent: String,
        /// Requested slot
        slot: String,
    },
}

/// Map an attach spec onto a concrete slot of the parent node
pub fn resolve_address(
    graph: &SceneGraph,
    parent: NodeKey,
    spec: &AttachSpec,
) -> Result<SlotAddress, AttachError> {
    let object = graph.object(parent).ok_or_else(|| AttachError::MissingSlot {
        parent: "<removed>".to_string(),
        slot: spec.slot_name().to_string(),
    })?;
    let kind = object
        .slot(spec.slot_name())
        .ok_or_else(|| AttachError::MissingSlot {
            parent: object.type_name().to_string(),
            slot: spec.slot_name().to_string(),
        })?;

    match (spec, kind) {
        (AttachSpec::NamedRelation(name), _) => Ok(SlotAddress::single(name.clone())),
        (AttachSpec::IndexedSlot { name, index }, SlotKind::Indexed) => Ok(SlotAddress {
            name: name.clone(),
            index: *index,
        }),
        (AttachSpec::IndexedSlot { name, index: 0 }, SlotKind::Single) => {
            Ok(SlotAddress::single(name.clone()))
        }
        (AttachSpec::IndexedSlot { name, .. }, SlotKind::Single) => Err(AttachError::NotIndexed {
            parent: object.type_name().to_string(),
            slot: name.clone(),
        }),
    }
}

/// Result of a successful attach
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attached {
    /// Where the child now lives
    pub address: SlotAddress,
    /// Previous node occupant that lost the slot
    pub superseded: Option<NodeKey>,
}

/// Assign `child` into the parent slot named by `spec`
pub fn attach(
    graph: &mut SceneGraph,
    parent: NodeKey,
    child: NodeKey,
    spec: &AttachSpec,
) -> Result<Attached, AttachError> {
    let address = resolve_address(graph, parent, spec)?;

    if address.index == 0 {
        release_prop_resource(graph, parent, &address.name);
    }

    let superseded = graph.set_slot(parent, address.clone(), child);
    if let Some(previous) = superseded {
        log::warn!(
            "Slot `{}` already held {:?}; last attached child wins",
            spec,
            previous
        );
    }
    Ok(Attached {
        address,
        superseded,
    })
}

/// Clear the slot `child` occupies on `parent`.
///
/// Returns `false` when the child no longer held the slot (it was superseded).
pub fn detach(graph: &mut SceneGraph, parent: NodeKey, child: NodeKey, spec: &AttachSpec) -> bool {
    let Ok(address) = resolve_address(graph, parent, spec) else {
        return false;
    };
    if graph.slot_occupant(parent, &address) != Some(child) {
        return false;
    }
    graph.unlink(child);
    true
}

fn release_prop_resource(graph: &mut SceneGraph, parent: NodeKey, name: &str) {
    let Some(object) = graph.object_mut(parent) else {
        return;
    };
    if let Some(PropValue::Resource(resource)) = object.get_prop(name) {
        if object.set_prop(name, &PropValue::Null).is_ok() {
            if let Err(err) = resource.dispose() {
                log::warn!("Disposing replaced `{name}` resource failed: {err}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::builtin::{Geometry, GeometryShape, Group, Material, Mesh};
    use crate::native::{NativeObject, Resource};

    fn sphere() -> Box<dyn NativeObject> {
        Box::new(Geometry::new(GeometryShape::Sphere { radius: 1.0 }))
    }

    #[test]
    fn test_parse_paths() {
        assert_eq!(AttachSpec::parse("geometry"), AttachSpec::named("geometry"));
        assert_eq!(AttachSpec::parse("material-2"), AttachSpec::indexed("material", 2));
        assert_eq!(AttachSpec::parse("shadow-map"), AttachSpec::named("shadow-map"));
    }

    #[test]
    fn test_last_attach_wins() {
        let mut graph = SceneGraph::new(Box::new(Group::scene()));
        let mesh = graph.insert(Box::new(Mesh::new()));
        let first = graph.insert(sphere());
        let second = graph.insert(sphere());
        let spec = AttachSpec::named("geometry");

        assert_eq!(attach(&mut graph, mesh, first, &spec).unwrap().superseded, None);
        let result = attach(&mut graph, mesh, second, &spec).unwrap();
        assert_eq!(result.superseded, Some(first));
        assert_eq!(graph.slot_occupant(mesh, &result.address), Some(second));

        // The superseded child detaching must not clear the winner.
        assert!(!detach(&mut graph, mesh, first, &spec));
        assert!(detach(&mut graph, mesh, second, &spec));
        assert_eq!(graph.slot_occupant(mesh, &result.address), None);
    }

    #[test]
    fn test_missing_slot() {
        let mut graph = SceneGraph::new(Box::new(Group::scene()));
        let group = graph.insert(Box::new(Group::new()));
        let child = graph.insert(sphere());

        let err = attach(&mut graph, group, child, &AttachSpec::named("geometry")).unwrap_err();
        assert!(matches!(err, AttachError::MissingSlot { .. }));
    }

    #[test]
    fn test_indexed_on_single_slot() {
        let mut graph = SceneGraph::new(Box::new(Group::scene()));
        let mesh = graph.insert(Box::new(Mesh::new()));
        let child = graph.insert(sphere());

        let err = attach(&mut graph, mesh, child, &AttachSpec::indexed("geometry", 1)).unwrap_err();
        assert!(matches!(err, AttachError::NotIndexed { .. }));
        assert!(attach(&mut graph, mesh, child, &AttachSpec::indexed("geometry", 0)).is_ok());
    }

    #[test]
    fn test_attach_disposes_prop_resource() {
        let mut graph = SceneGraph::new(Box::new(Group::scene()));
        let material = Resource::new(Material::basic());
        let mut mesh = Mesh::new();
        mesh.set_prop("material", &PropValue::Resource(material.clone()))
            .unwrap();
        let mesh = graph.insert(Box::new(mesh));
        let child = graph.insert(Box::new(Material::standard()));

        attach(&mut graph, mesh, child, &AttachSpec::named("material")).unwrap();

        assert!(material.with(|m| m
            .as_any()
            .downcast_ref::<Material>()
            .is_some_and(Material::is_disposed)));
        assert_eq!(
            graph.object(mesh).unwrap().get_prop("material"),
            Some(PropValue::Null)
        );
    }
}
