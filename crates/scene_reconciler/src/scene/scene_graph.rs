//! Retained native scene graph
//!
//! Arena of native objects linked into a hierarchy. Every node has at most one
//! parent relation: either membership in the parent's ordered child list or
//! occupancy of one of the parent's named slots. Only the reconciler mutates
//! this structure.

use super::shape::Ray;
use crate::attach::SlotAddress;
use crate::foundation::math::{Mat4, Point3, Vec3};
use crate::native::NativeObject;
use slotmap::{new_key_type, SlotMap};
use std::collections::BTreeMap;

new_key_type! {
    /// Handle to a node in the native scene graph
    pub struct NodeKey;
}

/// How a node hangs off its parent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeLink {
    /// Ordinary member of the parent's child list
    Child(NodeKey),
    /// Occupant of a parent slot
    Slot(NodeKey, SlotAddress),
}

/// One native object plus its links
#[derive(Debug)]
pub struct SceneNode {
    object: Box<dyn NativeObject>,
    link: Option<NodeLink>,
    children: Vec<NodeKey>,
    slots: BTreeMap<SlotAddress, NodeKey>,
}

impl SceneNode {
    /// The native object
    pub fn object(&self) -> &dyn NativeObject {
        self.object.as_ref()
    }

    /// Parent link, if attached anywhere
    pub fn link(&self) -> Option<&NodeLink> {
        self.link.as_ref()
    }

    /// Ordered ordinary children
    pub fn children(&self) -> &[NodeKey] {
        &self.children
    }

    /// Slot occupants
    pub fn slots(&self) -> &BTreeMap<SlotAddress, NodeKey> {
        &self.slots
    }
}

/// A ray hit against a native node
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeHit {
    /// Node whose volume was hit
    pub node: NodeKey,
    /// World-space distance from the ray origin
    pub distance: f32,
    /// World-space intersection point
    pub point: Vec3,
    /// World-space surface normal
    pub normal: Vec3,
    /// Render order of the hit node
    pub render_order: i32,
}

/// The native scene graph
#[derive(Debug)]
pub struct SceneGraph {
    nodes: SlotMap<NodeKey, SceneNode>,
    root: NodeKey,
}

impl SceneGraph {
    /// Create a graph whose root holds `root_object`
    pub fn new(root_object: Box<dyn NativeObject>) -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(SceneNode {
            object: root_object,
            link: None,
            children: Vec::new(),
            slots: BTreeMap::new(),
        });
        Self { nodes, root }
    }

    /// Root node
    pub fn root(&self) -> NodeKey {
        self.root
    }

    /// Number of live nodes, root included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether only the root remains
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Whether the key refers to a live node
    pub fn contains(&self, key: NodeKey) -> bool {
        self.nodes.contains_key(key)
    }

    /// Node accessor
    pub fn node(&self, key: NodeKey) -> Option<&SceneNode> {
        self.nodes.get(key)
    }

    /// Native object accessor
    pub fn object(&self, key: NodeKey) -> Option<&dyn NativeObject> {
        self.nodes.get(key).map(|n| n.object.as_ref())
    }

    /// Mutable native object accessor
    pub fn object_mut(&mut self, key: NodeKey) -> Option<&mut (dyn NativeObject + 'static)> {
        self.nodes.get_mut(key).map(|n| n.object.as_mut())
    }

    /// Add a detached node
    pub fn insert(&mut self, object: Box<dyn NativeObject>) -> NodeKey {
        self.nodes.insert(SceneNode {
            object,
            link: None,
            children: Vec::new(),
            slots: BTreeMap::new(),
        })
    }

    /// Remove a node from the arena, returning its object.
    ///
    /// The node is unlinked from its parent first; its own children and slot
    /// occupants become detached.
    pub fn remove(&mut self, key: NodeKey) -> Option<Box<dyn NativeObject>> {
        if key == self.root {
            return None;
        }
        self.unlink(key);
        let node = self.nodes.remove(key)?;
        for child in node.children.iter().chain(node.slots.values()) {
            if let Some(child) = self.nodes.get_mut(*child) {
                child.link = None;
            }
        }
        Some(node.object)
    }

    /// Insert `child` into `parent`'s child list before `before` (or at the end)
    pub fn insert_child(&mut self, parent: NodeKey, child: NodeKey, before: Option<NodeKey>) {
        if !self.nodes.contains_key(parent) || !self.nodes.contains_key(child) {
            return;
        }
        self.unlink(child);
        let siblings = &mut self.nodes[parent].children;
        let index = before
            .and_then(|b| siblings.iter().position(|k| *k == b))
            .unwrap_or(siblings.len());
        siblings.insert(index, child);
        self.nodes[child].link = Some(NodeLink::Child(parent));
    }

    /// Put `child` into a parent slot, returning the previous occupant
    pub fn set_slot(
        &mut self,
        parent: NodeKey,
        address: SlotAddress,
        child: NodeKey,
    ) -> Option<NodeKey> {
        if !self.nodes.contains_key(parent) || !self.nodes.contains_key(child) {
            return None;
        }
        self.unlink(child);
        let previous = self.nodes[parent].slots.insert(address.clone(), child);
        if let Some(prev) = previous.filter(|p| *p != child) {
            if let Some(node) = self.nodes.get_mut(prev) {
                node.link = None;
            }
        }
        self.nodes[child].link = Some(NodeLink::Slot(parent, address));
        previous.filter(|p| *p != child)
    }

    /// Current occupant of a parent slot
    pub fn slot_occupant(&self, parent: NodeKey, address: &SlotAddress) -> Option<NodeKey> {
        self.nodes.get(parent)?.slots.get(address).copied()
    }

    /// Detach a node from whatever parent relation it has
    pub fn unlink(&mut self, key: NodeKey) {
        let Some(link) = self.nodes.get_mut(key).and_then(|n| n.link.take()) else {
            return;
        };
        match link {
            NodeLink::Child(parent) => {
                if let Some(parent) = self.nodes.get_mut(parent) {
                    parent.children.retain(|k| *k != key);
                }
            }
            NodeLink::Slot(parent, address) => {
                if let Some(parent) = self.nodes.get_mut(parent) {
                    if parent.slots.get(&address) == Some(&key) {
                        parent.slots.remove(&address);
                    }
                }
            }
        }
    }

    /// Whether the node is reachable from the root
    pub fn is_connected(&self, key: NodeKey) -> bool {
        let mut current = key;
        loop {
            if current == self.root {
                return true;
            }
            match self.nodes.get(current).and_then(|n| n.link.as_ref()) {
                Some(NodeLink::Child(parent) | NodeLink::Slot(parent, _)) => current = *parent,
                None => return false,
            }
        }
    }

    /// World matrix of a node (product of ancestor transforms)
    pub fn world_matrix(&self, key: NodeKey) -> Mat4 {
        let mut matrix = Mat4::identity();
        let mut current = Some(key);
        while let Some(k) = current {
            let Some(node) = self.nodes.get(k) else {
                break;
            };
            matrix = node.object.transform().to_matrix() * matrix;
            current = match &node.link {
                Some(NodeLink::Child(parent) | NodeLink::Slot(parent, _)) => Some(*parent),
                None => None,
            };
        }
        matrix
    }

    /// Intersect a world-space ray with every visible, raycastable node
    /// reachable through child lists, nearest first.
    ///
    /// A node without its own pick volume borrows the first slot occupant
    /// that has one (a mesh picks through its attached geometry).
    pub fn raycast(&self, ray: &Ray) -> Vec<NodeHit> {
        let mut hits = Vec::new();
        self.raycast_node(self.root, Mat4::identity(), ray, &mut hits);
        hits.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then_with(|| b.render_order.cmp(&a.render_order))
        });
        hits
    }

    fn raycast_node(&self, key: NodeKey, parent_world: Mat4, ray: &Ray, hits: &mut Vec<NodeHit>) {
        let Some(node) = self.nodes.get(key) else {
            return;
        };
        if !node.object.visible() {
            return;
        }
        let world = parent_world * node.object.transform().to_matrix();

        if node.object.raycastable() {
            let shape = node.object.hit_shape().or_else(|| {
                node.slots
                    .values()
                    .find_map(|slot| self.nodes.get(*slot).and_then(|n| n.object.hit_shape()))
            });
            if let Some(shape) = shape {
                if let Some(inverse) = world.try_inverse() {
                    let origin = inverse.transform_point(&Point3::from(ray.origin));
                    let direction = inverse.transform_vector(&ray.direction);
                    let local_ray = Ray::new(origin.coords, direction);
                    if let Some((t, local_normal)) = shape.intersect_ray(&local_ray) {
                        let local_point = Point3::from(local_ray.point_at(t));
                        let point = world.transform_point(&local_point).coords;
                        let normal = inverse
                            .transpose()
                            .transform_vector(&local_normal)
                            .try_normalize(f32::EPSILON)
                            .unwrap_or(local_normal);
                        log::trace!("Ray hit {} at {point:?}", node.object.type_name());
                        hits.push(NodeHit {
                            node: key,
                            distance: (point - ray.origin).norm(),
                            point,
                            normal,
                            render_order: node.object.render_order(),
                        });
                    }
                }
            }
        }

        for child in &node.children {
            self.raycast_node(*child, world, ray, hits);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::builtin::{Geometry, GeometryShape, Group, Mesh};
    use crate::native::PropValue;
    use approx::assert_relative_eq;

    fn unit_box() -> Box<dyn NativeObject> {
        Box::new(Geometry::new(GeometryShape::Box {
            width: 1.0,
            height: 1.0,
            depth: 1.0,
        }))
    }

    fn mesh_at(graph: &mut SceneGraph, z: f32) -> NodeKey {
        let mut mesh = Mesh::new();
        mesh.set_prop("position-z", &PropValue::Float(z)).unwrap();
        let mesh = graph.insert(Box::new(mesh));
        let geometry = graph.insert(unit_box());
        graph.set_slot(mesh, SlotAddress::single("geometry"), geometry);
        graph.insert_child(graph.root(), mesh, None);
        mesh
    }

    #[test]
    fn test_child_order_and_unlink() {
        let mut graph = SceneGraph::new(Box::new(Group::scene()));
        let root = graph.root();
        let a = graph.insert(Box::new(Group::new()));
        let b = graph.insert(Box::new(Group::new()));
        graph.insert_child(root, a, None);
        graph.insert_child(root, b, Some(a));

        assert_eq!(graph.node(root).unwrap().children(), &[b, a]);
        assert!(graph.is_connected(a));

        graph.unlink(a);
        assert_eq!(graph.node(root).unwrap().children(), &[b]);
        assert!(!graph.is_connected(a));
    }

    #[test]
    fn test_slot_replacement_returns_previous() {
        let mut graph = SceneGraph::new(Box::new(Group::scene()));
        let mesh = graph.insert(Box::new(Mesh::new()));
        let first = graph.insert(unit_box());
        let second = graph.insert(unit_box());
        let address = SlotAddress::single("geometry");

        assert_eq!(graph.set_slot(mesh, address.clone(), first), None);
        assert_eq!(graph.set_slot(mesh, address.clone(), second), Some(first));
        assert_eq!(graph.slot_occupant(mesh, &address), Some(second));
        assert!(graph.node(first).unwrap().link().is_none());
    }

    #[test]
    fn test_raycast_orders_nearest_first() {
        let mut graph = SceneGraph::new(Box::new(Group::scene()));
        let far = mesh_at(&mut graph, -5.0);
        let near = mesh_at(&mut graph, 0.0);

        let ray = Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::new(0.0, 0.0, -1.0));
        let hits = graph.raycast(&ray);

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].node, near);
        assert_eq!(hits[1].node, far);
        assert_relative_eq!(hits[0].distance, 9.5, epsilon = 1e-4);
        assert_relative_eq!(hits[0].normal.z, 1.0, epsilon = 1e-4);
    }

    #[test]
    fn test_raycast_skips_ignoring_and_hidden() {
        let mut graph = SceneGraph::new(Box::new(Group::scene()));
        let near = mesh_at(&mut graph, 0.0);
        let far = mesh_at(&mut graph, -5.0);
        graph
            .object_mut(near)
            .unwrap()
            .set_prop("raycast", &PropValue::Bool(false))
            .unwrap();

        let ray = Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::new(0.0, 0.0, -1.0));
        let hits = graph.raycast(&ray);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].node, far);

        graph
            .object_mut(far)
            .unwrap()
            .set_prop("visible", &PropValue::Bool(false))
            .unwrap();
        assert!(graph.raycast(&ray).is_empty());
    }

    #[test]
    fn test_raycast_respects_parent_transform() {
        let mut graph = SceneGraph::new(Box::new(Group::scene()));
        let mut group = Group::new();
        group
            .set_prop("position", &PropValue::from([3.0, 0.0, 0.0]))
            .unwrap();
        let group = graph.insert(Box::new(group));
        graph.insert_child(graph.root(), group, None);

        let mesh = graph.insert(Box::new(Mesh::new()));
        let geometry = graph.insert(unit_box());
        graph.set_slot(mesh, SlotAddress::single("geometry"), geometry);
        graph.insert_child(group, mesh, None);

        let straight = Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::new(0.0, 0.0, -1.0));
        assert!(graph.raycast(&straight).is_empty());

        let offset = Ray::new(Vec3::new(3.0, 0.0, 10.0), Vec3::new(0.0, 0.0, -1.0));
        let hits = graph.raycast(&offset);
        assert_eq!(hits.len(), 1);
        assert_relative_eq!(hits[0].point.x, 3.0, epsilon = 1e-4);
    }

    #[test]
    fn test_remove_detaches_children() {
        let mut graph = SceneGraph::new(Box::new(Group::scene()));
        let parent = graph.insert(Box::new(Group::new()));
        let child = graph.insert(Box::new(Group::new()));
        graph.insert_child(graph.root(), parent, None);
        graph.insert_child(parent, child, None);

        assert!(graph.remove(parent).is_some());
        assert!(graph.contains(child));
        assert!(graph.node(child).unwrap().link().is_none());
        assert!(graph.remove(graph.root()).is_none());
    }
}
