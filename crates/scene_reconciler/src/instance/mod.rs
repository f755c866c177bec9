//! # Instance Model
//!
//! Bookkeeping record pairing one declarative node with the native object it
//! materialized into. Instances live in an arena ([`InstanceTree`]) addressed
//! by [`InstanceId`]; the parent link is an id, never an owning reference.
//!
//! ## Lifecycle
//!
//! ```text
//! Unmounted → Constructing → Mounted ⇄ Updating
//!                  ↓            ↓
//!                  └──→ Unmounting → Disposed
//! ```
//!
//! Transitions never skip a state; [`Instance::advance`] rejects anything else.

use crate::attach::{AttachSpec, SlotAddress};
use crate::catalogue::TypeDescriptor;
use crate::element::{LifecycleHooks, Props};
use crate::error::TreePath;
use crate::events::Handlers;
use crate::native::PropValue;
use crate::scene::NodeKey;
use slotmap::{new_key_type, SecondaryMap, SlotMap};

new_key_type! {
    /// Stable identity of a materialized node
    pub struct InstanceId;
}

/// Instance lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Not yet built
    Unmounted,
    /// Native object allocated, props being applied
    Constructing,
    /// Live in the scene graph
    Mounted,
    /// Applying a prop diff
    Updating,
    /// Being detached and disposed
    Unmounting,
    /// Released; the record is about to be dropped
    Disposed,
}

impl Lifecycle {
    /// Whether `next` directly follows `self`.
    ///
    /// `Constructing → Unmounting` is the aborted-construction path taken when
    /// a freshly built subtree cannot be placed under its parent.
    pub fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Unmounted, Self::Constructing)
                | (Self::Constructing | Self::Updating, Self::Mounted)
                | (Self::Mounted | Self::Constructing, Self::Unmounting)
                | (Self::Mounted, Self::Updating)
                | (Self::Unmounting, Self::Disposed)
        )
    }
}

/// How the native object currently hangs off its parent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// Built but not inserted yet
    Detached,
    /// Ordinary child-list member
    Child,
    /// Occupies a parent slot
    Slot(SlotAddress),
    /// Declares a slot another sibling won; mounted but not in the graph
    Superseded,
}

/// One materialized node
#[derive(Debug)]
pub struct Instance {
    pub(crate) id: InstanceId,
    pub(crate) tag: String,
    pub(crate) type_key: String,
    pub(crate) key: Option<String>,
    pub(crate) node: NodeKey,
    pub(crate) descriptor: TypeDescriptor,
    pub(crate) parent: Option<InstanceId>,
    pub(crate) children: Vec<InstanceId>,
    pub(crate) props: Props,
    pub(crate) args: Vec<PropValue>,
    pub(crate) attach: Option<AttachSpec>,
    pub(crate) attach_declared: bool,
    pub(crate) placement: Placement,
    pub(crate) handlers: Handlers,
    pub(crate) hooks: LifecycleHooks,
    pub(crate) lifecycle: Lifecycle,
    pub(crate) path: TreePath,
}

impl Instance {
    /// Identity
    pub fn id(&self) -> InstanceId {
        self.id
    }

    /// Tag (or primitive/bound type key) the node was declared with
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Explicit reconciliation key
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Native scene graph node owned by this instance
    pub fn node(&self) -> NodeKey {
        self.node
    }

    /// Descriptor the native object was built from
    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    /// Parent instance (`None` for children of the root container)
    pub fn parent(&self) -> Option<InstanceId> {
        self.parent
    }

    /// Ordered children, attached ones included
    pub fn children(&self) -> &[InstanceId] {
        &self.children
    }

    /// Props applied by the last pass
    pub fn props(&self) -> &Props {
        &self.props
    }

    /// Constructor arguments
    pub fn args(&self) -> &[PropValue] {
        &self.args
    }

    /// Effective attach relation (declared or the type's default)
    pub fn attach(&self) -> Option<&AttachSpec> {
        self.attach.as_ref()
    }

    /// Current placement
    pub fn placement(&self) -> &Placement {
        &self.placement
    }

    /// Event handlers
    pub fn handlers(&self) -> &Handlers {
        &self.handlers
    }

    /// Lifecycle state
    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// Declarative location
    pub fn path(&self) -> &TreePath {
        &self.path
    }

    /// Move to the next lifecycle state, returning `false` on an illegal jump
    pub fn advance(&mut self, next: Lifecycle) -> bool {
        if self.lifecycle.can_advance_to(next) {
            log::trace!("{} {:?} -> {:?}", self.path, self.lifecycle, next);
            self.lifecycle = next;
            true
        } else {
            log::error!(
                "{}: illegal lifecycle transition {:?} -> {:?}",
                self.path,
                self.lifecycle,
                next
            );
            false
        }
    }
}

/// Arena of live instances
#[derive(Debug, Default)]
pub struct InstanceTree {
    instances: SlotMap<InstanceId, Instance>,
    by_node: SecondaryMap<NodeKey, InstanceId>,
    roots: Vec<InstanceId>,
}

impl InstanceTree {
    /// Empty tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live instances
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Whether no instance is live
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Instance accessor
    pub fn get(&self, id: InstanceId) -> Option<&Instance> {
        self.instances.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: InstanceId) -> Option<&mut Instance> {
        self.instances.get_mut(id)
    }

    /// Whether the id is live
    pub fn contains(&self, id: InstanceId) -> bool {
        self.instances.contains_key(id)
    }

    /// Instance owning a native node
    pub fn by_node(&self, node: NodeKey) -> Option<InstanceId> {
        self.by_node.get(node).copied()
    }

    /// Children of the root container
    pub fn roots(&self) -> &[InstanceId] {
        &self.roots
    }

    /// Children of a parent (`None` is the root container)
    pub fn children_of(&self, parent: Option<InstanceId>) -> &[InstanceId] {
        match parent {
            None => &self.roots,
            Some(id) => self
                .instances
                .get(id)
                .map_or(&[][..], |instance| instance.children.as_slice()),
        }
    }

    pub(crate) fn children_of_mut(
        &mut self,
        parent: Option<InstanceId>,
    ) -> Option<&mut Vec<InstanceId>> {
        match parent {
            None => Some(&mut self.roots),
            Some(id) => self.instances.get_mut(id).map(|i| &mut i.children),
        }
    }

    /// The instance followed by its ancestors up to the root container
    pub fn ancestors(&self, id: InstanceId) -> Vec<InstanceId> {
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(next) = current {
            let Some(instance) = self.instances.get(next) else {
                break;
            };
            chain.push(next);
            current = instance.parent;
        }
        chain
    }

    /// Iterate over every live instance
    pub fn iter(&self) -> impl Iterator<Item = &Instance> {
        self.instances.values()
    }

    /// Instances in document order (depth first)
    pub fn document_order(&self) -> Vec<InstanceId> {
        let mut order = Vec::with_capacity(self.instances.len());
        let mut stack: Vec<InstanceId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            order.push(id);
            if let Some(instance) = self.instances.get(id) {
                stack.extend(instance.children.iter().rev());
            }
        }
        order
    }

    pub(crate) fn insert_with(&mut self, build: impl FnOnce(InstanceId) -> Instance) -> InstanceId {
        let id = self.instances.insert_with_key(build);
        let node = self.instances[id].node;
        self.by_node.insert(node, id);
        id
    }

    pub(crate) fn remove(&mut self, id: InstanceId) -> Option<Instance> {
        let instance = self.instances.remove(id)?;
        self.by_node.remove(instance.node);
        Some(instance)
    }

    /// Remove `child` from its parent's list without touching the graph
    pub(crate) fn unlink(&mut self, child: InstanceId) {
        let parent = self.instances.get(child).and_then(|i| i.parent);
        if let Some(siblings) = self.children_of_mut(parent) {
            siblings.retain(|c| *c != child);
        }
    }

    /// Place `child` under `parent` before `before` (or last)
    pub(crate) fn link(
        &mut self,
        parent: Option<InstanceId>,
        child: InstanceId,
        before: Option<InstanceId>,
    ) {
        self.unlink(child);
        if let Some(instance) = self.instances.get_mut(child) {
            instance.parent = parent;
        }
        if let Some(siblings) = self.children_of_mut(parent) {
            let index = before
                .and_then(|b| siblings.iter().position(|c| *c == b))
                .unwrap_or(siblings.len());
            siblings.insert(index, child);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::PassThrough;
    use crate::scene::SceneGraph;

    fn record(tree: &mut InstanceTree, graph: &mut SceneGraph, tag: &str) -> InstanceId {
        let node = graph.insert(Box::new(PassThrough::new(tag)));
        let descriptor = TypeDescriptor::new(tag, |_| Ok(PassThrough::new("x")));
        tree.insert_with(|id| Instance {
            id,
            tag: tag.to_string(),
            type_key: tag.to_string(),
            key: None,
            node,
            descriptor,
            parent: None,
            children: Vec::new(),
            props: Props::new(),
            args: Vec::new(),
            attach: None,
            attach_declared: false,
            placement: Placement::Detached,
            handlers: Handlers::default(),
            hooks: LifecycleHooks::default(),
            lifecycle: Lifecycle::Unmounted,
            path: TreePath::root().child(tag, 0),
        })
    }

    #[test]
    fn test_lifecycle_never_skips() {
        assert!(Lifecycle::Unmounted.can_advance_to(Lifecycle::Constructing));
        assert!(Lifecycle::Mounted.can_advance_to(Lifecycle::Updating));
        assert!(Lifecycle::Updating.can_advance_to(Lifecycle::Mounted));
        assert!(!Lifecycle::Unmounted.can_advance_to(Lifecycle::Mounted));
        assert!(!Lifecycle::Mounted.can_advance_to(Lifecycle::Disposed));
        assert!(!Lifecycle::Updating.can_advance_to(Lifecycle::Unmounting));
    }

    #[test]
    fn test_advance_rejects_illegal_jump() {
        let mut graph = SceneGraph::new(Box::new(PassThrough::new("Scene")));
        let mut tree = InstanceTree::new();
        let id = record(&mut tree, &mut graph, "a");
        let instance = tree.get_mut(id).unwrap();

        assert!(!instance.advance(Lifecycle::Mounted));
        assert!(instance.advance(Lifecycle::Constructing));
        assert!(instance.advance(Lifecycle::Mounted));
        assert_eq!(instance.lifecycle(), Lifecycle::Mounted);
    }

    #[test]
    fn test_link_order_and_ancestors() {
        let mut graph = SceneGraph::new(Box::new(PassThrough::new("Scene")));
        let mut tree = InstanceTree::new();
        let parent = record(&mut tree, &mut graph, "parent");
        let a = record(&mut tree, &mut graph, "a");
        let b = record(&mut tree, &mut graph, "b");

        tree.link(None, parent, None);
        tree.link(Some(parent), a, None);
        tree.link(Some(parent), b, Some(a));

        assert_eq!(tree.children_of(Some(parent)), &[b, a]);
        assert_eq!(tree.ancestors(a), vec![a, parent]);
        assert_eq!(tree.document_order(), vec![parent, b, a]);

        let node = tree.get(a).unwrap().node();
        assert_eq!(tree.by_node(node), Some(a));
        tree.unlink(a);
        tree.remove(a);
        assert_eq!(tree.children_of(Some(parent)), &[b]);
        assert_eq!(tree.by_node(node), None);
    }
}
