//! # Reconciliation Engine
//!
//! Turns a declarative [`Element`] tree into native scene graph mutations and
//! keeps the two in sync across passes.
//!
//! ## Matching
//!
//! Children are matched against the previous pass by explicit key when one is
//! given, otherwise by position among the unkeyed siblings. A match is reused
//! only if the type, constructor args and effective attach relation are the
//! same; anything else is unmounted and rebuilt from scratch.
//!
//! ## Ordering within a pass
//!
//! 1. Previous children without a reusable counterpart are unmounted.
//! 2. Reused children get their prop diff committed; new subtrees are built
//!    completely detached (children before parents).
//! 3. A single forward pass inserts new instances and moves reused ones into
//!    document order. Unchanged lists issue no operation.
//! 4. Slot occupancy is settled so that the last sibling declaring a slot
//!    holds it.
//!
//! All verbs that touch the scene graph go through [`TreeAdapter`].

mod adapter;
mod diff;

pub use adapter::TreeAdapter;
pub use diff::{PropChange, PropDiff};

use crate::attach::{self, SlotAddress};
use crate::catalogue::{CatalogueHandle, ResolveCache, TypeDescriptor};
use crate::element::Element;
use crate::error::{ReconcileError, TreePath};
use crate::instance::{Instance, InstanceId, InstanceTree, Lifecycle, Placement};
use crate::native::builtin::Group;
use crate::native::{NativeObject, PropValue};
use crate::scene::{NodeKey, SceneGraph};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

/// One imperative operation issued against the native scene graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// Native object constructed
    Construct {
        /// New instance
        id: InstanceId,
        /// Declared tag
        tag: String,
    },
    /// Prop written
    ApplyProp {
        /// Target
        id: InstanceId,
        /// Prop name
        prop: String,
    },
    /// Removed prop restored to its constructed default
    ResetProp {
        /// Target
        id: InstanceId,
        /// Prop name
        prop: String,
    },
    /// Previously held sub-resource disposed after a swap
    ReplaceResource {
        /// Target
        id: InstanceId,
        /// Prop name
        prop: String,
    },
    /// New instance inserted into its parent's child list
    Insert {
        /// Inserted instance
        id: InstanceId,
    },
    /// Existing instance moved to a new position
    Move {
        /// Moved instance
        id: InstanceId,
    },
    /// Instance assigned into a parent slot
    Attach {
        /// Attached instance
        id: InstanceId,
        /// Slot it now occupies
        slot: SlotAddress,
    },
    /// Instance lost its slot to a later sibling
    Supersede {
        /// Instance left unattached
        id: InstanceId,
        /// Sibling now holding the slot
        by: InstanceId,
    },
    /// Instance detached from its parent
    Detach {
        /// Detached instance
        id: InstanceId,
    },
    /// Native object disposed and instance released
    Dispose {
        /// Released instance
        id: InstanceId,
        /// Declared tag
        tag: String,
    },
}

/// Outcome of a reconciliation pass
#[derive(Debug, Clone, Default)]
pub struct ReconcileReport {
    /// Operations in the order they were issued
    pub mutations: Vec<Mutation>,
    /// Diagnostics; none of them aborted the pass
    pub errors: Vec<ReconcileError>,
}

impl ReconcileReport {
    /// Whether the pass touched nothing
    pub fn is_noop(&self) -> bool {
        self.mutations.is_empty() && self.errors.is_empty()
    }

    /// Number of mutations matching a predicate
    pub fn count(&self, predicate: impl Fn(&Mutation) -> bool) -> usize {
        self.mutations.iter().filter(|m| predicate(m)).count()
    }

    /// Instances constructed by the pass
    pub fn constructed(&self) -> Vec<InstanceId> {
        self.mutations
            .iter()
            .filter_map(|m| match m {
                Mutation::Construct { id, .. } => Some(*id),
                _ => None,
            })
            .collect()
    }

    /// Instances disposed by the pass
    pub fn disposed(&self) -> Vec<InstanceId> {
        self.mutations
            .iter()
            .filter_map(|m| match m {
                Mutation::Dispose { id, .. } => Some(*id),
                _ => None,
            })
            .collect()
    }

    fn push(&mut self, mutation: Mutation) {
        log::debug!("{mutation:?}");
        self.mutations.push(mutation);
    }

    fn error(&mut self, error: ReconcileError) {
        log::warn!("{error}");
        self.errors.push(error);
    }
}

/// Owns the instance tree and the native scene graph it mirrors
#[derive(Debug)]
pub struct Reconciler {
    catalogue: CatalogueHandle,
    cache: ResolveCache,
    tree: InstanceTree,
    graph: SceneGraph,
    report: ReconcileReport,
}

impl Reconciler {
    /// Reconciler rendering into a fresh `Scene` container
    pub fn new(catalogue: CatalogueHandle) -> Self {
        Self::with_container(catalogue, Box::new(Group::scene()))
    }

    /// Reconciler rendering into a caller-supplied container object
    pub fn with_container(catalogue: CatalogueHandle, container: Box<dyn NativeObject>) -> Self {
        Self {
            catalogue,
            cache: ResolveCache::default(),
            tree: InstanceTree::new(),
            graph: SceneGraph::new(container),
            report: ReconcileReport::default(),
        }
    }

    /// Catalogue used for tag resolution
    pub fn catalogue(&self) -> &CatalogueHandle {
        &self.catalogue
    }

    /// Live instances
    pub fn tree(&self) -> &InstanceTree {
        &self.tree
    }

    /// Native scene graph
    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    /// Instance accessor
    pub fn instance(&self, id: InstanceId) -> Option<&Instance> {
        self.tree.get(id)
    }

    /// Native object of an instance
    pub fn object(&self, id: InstanceId) -> Option<&dyn NativeObject> {
        self.graph.object(self.tree.get(id)?.node)
    }

    /// Run one pass: bring the mounted tree in line with `elements`
    pub fn reconcile(&mut self, elements: &[Element]) -> ReconcileReport {
        self.reconcile_children(None, elements, &TreePath::root());
        let report = std::mem::take(&mut self.report);
        log::debug!(
            "Reconcile pass: {} mutations, {} diagnostics, {} live instances",
            report.mutations.len(),
            report.errors.len(),
            self.tree.len()
        );
        report
    }

    /// Unmount everything
    pub fn unmount_all(&mut self) -> ReconcileReport {
        self.reconcile(&[])
    }

    fn reconcile_children(
        &mut self,
        parent: Option<InstanceId>,
        elements: &[Element],
        parent_path: &TreePath,
    ) {
        let current = self.tree.children_of(parent).to_vec();

        let mut keyed: HashMap<String, VecDeque<InstanceId>> = HashMap::new();
        let mut unkeyed = Vec::new();
        for id in &current {
            match self.tree.get(*id).and_then(Instance::key) {
                Some(key) => keyed.entry(key.to_string()).or_default().push_back(*id),
                None => unkeyed.push(*id),
            }
        }

        let mut next_unkeyed = 0;
        let mut seen_keys = HashSet::new();
        let mut plan = Vec::with_capacity(elements.len());
        let mut kept = HashSet::new();
        for element in elements {
            let candidate = match element.key_ref() {
                Some(key) => {
                    if !seen_keys.insert(key) {
                        log::warn!(
                            "{parent_path}: duplicate key `{key}`; matched in document order"
                        );
                    }
                    keyed.get_mut(key).and_then(VecDeque::pop_front)
                }
                None => {
                    let candidate = unkeyed.get(next_unkeyed).copied();
                    next_unkeyed += 1;
                    candidate
                }
            };
            let reuse = candidate.filter(|id| self.is_compatible(*id, element));
            if let Some(id) = reuse {
                kept.insert(id);
            }
            plan.push(reuse);
        }

        for id in current.iter().filter(|id| !kept.contains(*id)) {
            self.remove_child(parent, *id);
        }

        let mut next = Vec::with_capacity(elements.len());
        for (index, (element, reuse)) in elements.iter().zip(plan).enumerate() {
            let path = parent_path.child(&element.element_type().type_key(), index);
            let id = match reuse {
                Some(id) => {
                    self.update(id, element, path);
                    Some(id)
                }
                None => self.build(element, path),
            };
            next.extend(id);
        }

        self.order_children(parent, &next);
        self.settle_slots(parent);
    }

    fn is_compatible(&self, id: InstanceId, element: &Element) -> bool {
        let Some(instance) = self.tree.get(id) else {
            return false;
        };
        let element_type = element.element_type();
        let attach = element
            .attach_ref()
            .or_else(|| instance.descriptor.default_attach());
        instance.type_key == element_type.type_key()
            && instance.args == element.args_ref()
            && instance.attach.as_ref() == attach
            && element_type
                .explicit_descriptor()
                .map_or(true, |d| d.ptr_eq(&instance.descriptor))
    }

    fn descriptor_for(
        &mut self,
        element: &Element,
        path: &TreePath,
    ) -> Result<TypeDescriptor, ReconcileError> {
        if let Some(descriptor) = element.element_type().explicit_descriptor() {
            return Ok(descriptor.clone());
        }
        let tag = element.element_type().type_key();
        self.cache
            .resolve(&self.catalogue, &tag)
            .map(|entry| entry.descriptor.clone())
            .ok_or_else(|| ReconcileError::UnknownTag {
                tag,
                path: path.clone(),
            })
    }

    /// Construct a subtree, fully detached from the parent
    fn build(&mut self, element: &Element, path: TreePath) -> Option<InstanceId> {
        let id = self.create_instance(element, &path)?;
        self.reconcile_children(Some(id), element.children(), &path);
        Some(id)
    }

    fn update(&mut self, id: InstanceId, element: &Element, path: TreePath) {
        let Some(instance) = self.tree.get_mut(id) else {
            return;
        };
        instance.path = path.clone();
        instance.handlers = element.handlers().clone();
        instance.hooks = element.hooks().clone();

        let diff = PropDiff::between(&instance.props, element.props());
        if !diff.is_empty() {
            self.commit_update(id, &diff);
        }
        self.reconcile_children(Some(id), element.children(), &path);
    }

    /// Insert and move children so their order matches `next`
    fn order_children(&mut self, parent: Option<InstanceId>, next: &[InstanceId]) {
        let mut position = 0;
        for id in next {
            let current = self.tree.children_of(parent);
            if current.get(position) == Some(id) {
                position += 1;
                continue;
            }
            match current.get(position).copied() {
                Some(before) => self.insert_before(parent, *id, before),
                None => self.append_child(parent, *id),
            }
            if self.tree.children_of(parent).get(position) == Some(id) {
                position += 1;
            }
        }
    }

    /// Give every contested slot to the last sibling declaring it
    fn settle_slots(&mut self, parent: Option<InstanceId>) {
        let Some(parent_node) = self.parent_node(parent) else {
            return;
        };
        let mut winners: BTreeMap<SlotAddress, InstanceId> = BTreeMap::new();
        for id in self.tree.children_of(parent) {
            let Some(instance) = self.tree.get(*id) else {
                continue;
            };
            if !matches!(instance.placement, Placement::Slot(_) | Placement::Superseded) {
                continue;
            }
            let Some(spec) = &instance.attach else {
                continue;
            };
            if let Ok(address) = attach::resolve_address(&self.graph, parent_node, spec) {
                winners.insert(address, *id);
            }
        }
        for (address, id) in winners {
            let Some(node) = self.tree.get(id).map(|i| i.node) else {
                continue;
            };
            if self.graph.slot_occupant(parent_node, &address) == Some(node) {
                continue;
            }
            if let Err(reason) = self.attach_to_slot(parent_node, id) {
                log::warn!(
                    "Re-settling slot `{}[{}]` failed: {reason}",
                    address.name,
                    address.index
                );
            }
        }
    }

    fn parent_node(&self, parent: Option<InstanceId>) -> Option<NodeKey> {
        match parent {
            None => Some(self.graph.root()),
            Some(id) => self.tree.get(id).map(|i| i.node),
        }
    }

    /// Attach an instance into the slot named by its attach spec
    fn attach_to_slot(&mut self, parent_node: NodeKey, id: InstanceId) -> Result<(), String> {
        let Some(instance) = self.tree.get(id) else {
            return Ok(());
        };
        let Some(spec) = instance.attach.clone() else {
            return Err("no attach relation".to_string());
        };
        let node = instance.node;
        let attached =
            attach::attach(&mut self.graph, parent_node, node, &spec).map_err(|e| e.to_string())?;

        if let Some(instance) = self.tree.get_mut(id) {
            instance.placement = Placement::Slot(attached.address.clone());
        }
        self.report.push(Mutation::Attach {
            id,
            slot: attached.address,
        });
        if let Some(loser) = attached.superseded.and_then(|n| self.tree.by_node(n)) {
            if let Some(instance) = self.tree.get_mut(loser) {
                instance.placement = Placement::Superseded;
            }
            self.report.push(Mutation::Supersede { id: loser, by: id });
        }
        Ok(())
    }

    /// Write one prop, reporting rejection without aborting
    fn apply_prop(&mut self, id: InstanceId, name: &str, value: &PropValue) -> bool {
        let Some(instance) = self.tree.get(id) else {
            return false;
        };
        let Some(object) = self.graph.object_mut(instance.node) else {
            return false;
        };
        match object.set_prop(name, value) {
            Ok(()) => {
                self.report.push(Mutation::ApplyProp {
                    id,
                    prop: name.to_string(),
                });
                true
            }
            Err(source) => {
                let error = ReconcileError::InvalidProp {
                    tag: instance.tag.clone(),
                    path: instance.path.clone(),
                    prop: name.to_string(),
                    source,
                };
                self.report.error(error);
                false
            }
        }
    }

    /// Restore a removed prop to the value a fresh object reports
    fn reset_prop(
        &mut self,
        id: InstanceId,
        name: &str,
        defaults: &mut Option<Box<dyn NativeObject>>,
    ) {
        let Some(instance) = self.tree.get(id) else {
            return;
        };
        if defaults.is_none() {
            *defaults = instance.descriptor.construct(&instance.args).ok();
        }
        let Some(default) = defaults.as_ref().and_then(|d| d.get_prop(name)) else {
            log::debug!("{}: no default for `{name}`, left as is", instance.path);
            return;
        };
        let Some(object) = self.graph.object_mut(instance.node) else {
            return;
        };
        match object.set_prop(name, &default) {
            Ok(()) => self.report.push(Mutation::ResetProp {
                id,
                prop: name.to_string(),
            }),
            Err(err) => log::debug!("{}: resetting `{name}` failed: {err}", instance.path),
        }
    }

    /// Detach, dispose and release a subtree, children first
    fn unmount(&mut self, id: InstanceId, top: bool) {
        let Some(instance) = self.tree.get_mut(id) else {
            return;
        };
        instance.advance(Lifecycle::Unmounting);
        let children = instance.children.clone();
        for child in children {
            self.unmount(child, false);
        }

        let Some(instance) = self.tree.get(id) else {
            return;
        };
        let node = instance.node;
        if top {
            let detached = match (&instance.placement, instance.parent) {
                (Placement::Child, _) => {
                    self.graph.unlink(node);
                    true
                }
                (Placement::Slot(_), parent) => match (self.parent_node(parent), &instance.attach) {
                    (Some(parent_node), Some(spec)) => {
                        attach::detach(&mut self.graph, parent_node, node, spec)
                    }
                    _ => false,
                },
                _ => false,
            };
            if detached {
                self.report.push(Mutation::Detach { id });
            }
        }

        let disposal = self
            .graph
            .object_mut(node)
            .map_or(Ok(()), |object| object.dispose());

        let Some(mut instance) = self.tree.remove(id) else {
            return;
        };
        if let Err(reason) = disposal {
            self.report.error(ReconcileError::Disposal {
                tag: instance.tag.clone(),
                path: instance.path.clone(),
                reason,
            });
        }
        instance.advance(Lifecycle::Disposed);
        self.graph.remove(node);
        self.report.push(Mutation::Dispose {
            id,
            tag: instance.tag.clone(),
        });
        if let Some(hook) = instance.hooks.on_dispose.clone() {
            hook(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::builtin::Mesh;
    use crate::native::Resource;
    use crate::native::builtin::Material;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn reconciler() -> Reconciler {
        Reconciler::new(CatalogueHandle::local())
    }

    fn mesh(key: &str) -> Element {
        Element::new("mesh")
            .key(key)
            .child(Element::new("boxGeometry"))
            .child(Element::new("meshBasicMaterial"))
    }

    #[test]
    fn test_mount_builds_graph() {
        let mut r = reconciler();
        let report = r.reconcile(&[mesh("a")]);

        assert!(report.errors.is_empty());
        assert_eq!(report.constructed().len(), 3);
        assert_eq!(r.tree().len(), 3);

        let root = r.tree().roots()[0];
        let node = r.instance(root).unwrap().node();
        let graph_node = r.graph().node(node).unwrap();
        assert_eq!(graph_node.slots().len(), 2);
        assert!(graph_node.children().is_empty());
        assert!(r.graph().is_connected(node));
        assert_eq!(r.instance(root).unwrap().lifecycle(), Lifecycle::Mounted);
    }

    #[test]
    fn test_unchanged_pass_is_noop() {
        let mut r = reconciler();
        let tree = [mesh("a").prop("position-x", 2.0), Element::new("group")];
        r.reconcile(&tree);
        assert!(r.reconcile(&tree).is_noop());
    }

    #[test]
    fn test_prop_diff_applies_only_changes() {
        let mut r = reconciler();
        r.reconcile(&[Element::new("group").prop("visible", true).prop("position-x", 1.0)]);
        let report = r.reconcile(&[Element::new("group")
            .prop("visible", true)
            .prop("position-x", 3.0)]);

        assert_eq!(
            report.mutations,
            vec![Mutation::ApplyProp {
                id: r.tree().roots()[0],
                prop: "position-x".into()
            }]
        );
    }

    #[test]
    fn test_removed_prop_resets_to_default() {
        let mut r = reconciler();
        r.reconcile(&[Element::new("group").prop("visible", false)]);
        let id = r.tree().roots()[0];
        assert!(!r.object(id).unwrap().visible());

        let report = r.reconcile(&[Element::new("group")]);
        assert_eq!(report.count(|m| matches!(m, Mutation::ResetProp { .. })), 1);
        assert!(r.object(id).unwrap().visible());
    }

    #[test]
    fn test_invalid_prop_does_not_block_siblings() {
        let mut r = reconciler();
        let report = r.reconcile(&[Element::new("group")
            .prop("bogus", 1.0)
            .prop("visible", false)]);

        assert_eq!(report.errors.len(), 1);
        assert!(matches!(
            &report.errors[0],
            ReconcileError::InvalidProp { prop, .. } if prop == "bogus"
        ));
        let id = r.tree().roots()[0];
        assert!(!r.object(id).unwrap().visible());
    }

    #[test]
    fn test_args_change_rebuilds() {
        let mut r = reconciler();
        r.reconcile(&[Element::new("boxGeometry").args([1.0, 1.0, 1.0])]);
        let report = r.reconcile(&[Element::new("boxGeometry").args([2.0, 1.0, 1.0])]);

        assert_eq!(report.disposed().len(), 1);
        assert_eq!(report.constructed().len(), 1);
    }

    #[test]
    fn test_resource_swap_disposes_old_resource() {
        let first = Resource::new(Material::basic());
        let second = Resource::new(Material::basic());
        let mut r = reconciler();
        r.reconcile(&[Element::new("mesh").prop("material", first.clone())]);
        let report = r.reconcile(&[Element::new("mesh").prop("material", second.clone())]);

        assert_eq!(report.count(|m| matches!(m, Mutation::ReplaceResource { .. })), 1);
        assert_eq!(report.disposed().len(), 0);
        let disposed = |res: &Resource| {
            res.with(|m| m.as_any().downcast_ref::<Material>().is_some_and(Material::is_disposed))
        };
        assert!(disposed(&first));
        assert!(!disposed(&second));
    }

    #[test]
    fn test_construction_failure_isolated() {
        let mut r = reconciler();
        let report = r.reconcile(&[
            Element::new("sphereGeometry").args(["wide"]),
            Element::new("group"),
        ]);

        assert_eq!(report.errors.len(), 1);
        assert!(matches!(report.errors[0], ReconcileError::Construction { .. }));
        assert_eq!(r.tree().roots().len(), 1);
    }

    #[test]
    fn test_lifecycle_hooks_fire() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let (mounted, disposed) = (Rc::clone(&log), Rc::clone(&log));
        let element = Element::new("group")
            .on_mount(move |_| mounted.borrow_mut().push("mount"))
            .on_dispose(move |_| disposed.borrow_mut().push("dispose"));

        let mut r = reconciler();
        r.reconcile(&[element.clone()]);
        r.reconcile(&[element]);
        r.unmount_all();

        assert_eq!(*log.borrow(), vec!["mount", "dispose"]);
    }

    #[test]
    fn test_child_rejected_by_leaf_parent() {
        let mut r = reconciler();
        let report = r.reconcile(&[Element::new("boxGeometry")
            .attach("nothing")
            .child(Element::new("group"))]);

        assert!(report
            .errors
            .iter()
            .any(|e| matches!(e, ReconcileError::ChildRejected { .. })));
    }

    #[test]
    fn test_missing_slot_falls_back_to_child() {
        let mut r = reconciler();
        let report = r.reconcile(&[
            Element::new("group").child(Element::new("group").attach("geometry"))
        ]);

        assert_eq!(report.errors.len(), 1);
        assert!(matches!(
            report.errors[0],
            ReconcileError::AttachTargetMissing { .. }
        ));
        let parent = r.tree().roots()[0];
        let child = r.tree().children_of(Some(parent))[0];
        assert_eq!(r.instance(child).unwrap().placement(), &Placement::Child);
    }

    #[test]
    fn test_unmount_detaches_slot() {
        let mut r = reconciler();
        r.reconcile(&[mesh("a")]);
        let root = r.tree().roots()[0];
        let node = r.instance(root).unwrap().node();

        r.reconcile(&[Element::new("mesh").key("a").child(Element::new("boxGeometry"))]);
        let slots = r.graph().node(node).unwrap().slots();
        assert_eq!(slots.len(), 1);
        assert!(r
            .graph()
            .object(node)
            .unwrap()
            .as_any()
            .downcast_ref::<Mesh>()
            .is_some());
    }
}
