//! The fixed verb set a host tree-diffing runtime drives the core with

use super::{Mutation, PropDiff, Reconciler};
use crate::element::Element;
use crate::error::{ReconcileError, TreePath};
use crate::instance::{Instance, InstanceId, Lifecycle, Placement};
use crate::native::NativeObject;
use crate::scene::NodeKey;

/// Host adapter contract.
///
/// `parent` is `None` for the root container. Instances handed to
/// `append_child`/`insert_before` for the first time are placed (attached to a
/// slot or inserted into the child list) and mounted; already placed
/// instances are moved.
pub trait TreeAdapter {
    /// Handle to a materialized node
    type Instance: Copy;
    /// Handle to the root container
    type Container;

    /// Resolve, construct and apply the initial props of one node
    fn create_instance(&mut self, element: &Element, path: &TreePath) -> Option<Self::Instance>;

    /// Place `child` last under `parent`
    fn append_child(&mut self, parent: Option<Self::Instance>, child: Self::Instance);

    /// Place `child` under `parent` right before `before`
    fn insert_before(
        &mut self,
        parent: Option<Self::Instance>,
        child: Self::Instance,
        before: Self::Instance,
    );

    /// Detach, dispose and release `child` and its subtree
    fn remove_child(&mut self, parent: Option<Self::Instance>, child: Self::Instance);

    /// Apply a prop diff in place
    fn commit_update(&mut self, instance: Self::Instance, changes: &PropDiff);

    /// Root container of the native scene graph
    fn get_root_container(&self) -> Self::Container;
}

impl TreeAdapter for Reconciler {
    type Instance = InstanceId;
    type Container = NodeKey;

    fn create_instance(&mut self, element: &Element, path: &TreePath) -> Option<InstanceId> {
        let descriptor = match self.descriptor_for(element, path) {
            Ok(descriptor) => descriptor,
            Err(error) => {
                self.report.error(error);
                return None;
            }
        };
        let tag = element.element_type().type_key();
        let object = match descriptor.construct(element.args_ref()) {
            Ok(object) => object,
            Err(reason) => {
                self.report.error(ReconcileError::Construction {
                    tag,
                    path: path.clone(),
                    reason,
                });
                return None;
            }
        };

        let node = self.graph.insert(object);
        let attach_declared = element.attach_ref().is_some();
        let attach = element
            .attach_ref()
            .or_else(|| descriptor.default_attach())
            .cloned();
        let id = self.tree.insert_with(|id| Instance {
            id,
            tag: tag.clone(),
            type_key: tag.clone(),
            key: element.key_ref().map(str::to_string),
            node,
            descriptor,
            parent: None,
            children: Vec::new(),
            props: element.props().clone(),
            args: element.args_ref().to_vec(),
            attach,
            attach_declared,
            placement: Placement::Detached,
            handlers: element.handlers().clone(),
            hooks: element.hooks().clone(),
            lifecycle: Lifecycle::Unmounted,
            path: path.clone(),
        });
        if let Some(instance) = self.tree.get_mut(id) {
            instance.advance(Lifecycle::Constructing);
        }
        self.report.push(Mutation::Construct { id, tag });

        for (name, value) in element.props() {
            self.apply_prop(id, name, value);
        }
        Some(id)
    }

    fn append_child(&mut self, parent: Option<InstanceId>, child: InstanceId) {
        self.place(parent, child, None);
    }

    fn insert_before(&mut self, parent: Option<InstanceId>, child: InstanceId, before: InstanceId) {
        self.place(parent, child, Some(before));
    }

    fn remove_child(&mut self, parent: Option<InstanceId>, child: InstanceId) {
        if self.tree.get(child).map(Instance::parent) != Some(parent) {
            log::warn!("remove_child: {child:?} is not a child of {parent:?}");
            return;
        }
        self.tree.unlink(child);
        self.unmount(child, true);
    }

    fn commit_update(&mut self, id: InstanceId, changes: &PropDiff) {
        let Some(instance) = self.tree.get_mut(id) else {
            return;
        };
        instance.advance(Lifecycle::Updating);

        let mut defaults: Option<Box<dyn NativeObject>> = None;
        for change in changes.changes() {
            match &change.new {
                Some(value) => {
                    let applied = self.apply_prop(id, &change.name, value);
                    if applied && change.replaces_resource() {
                        self.release_resource(id, &change.name, change.old.as_ref());
                    }
                }
                None => {
                    self.reset_prop(id, &change.name, &mut defaults);
                    if change.replaces_resource() {
                        self.release_resource(id, &change.name, change.old.as_ref());
                    }
                }
            }
        }

        if let Some(instance) = self.tree.get_mut(id) {
            for change in changes.changes() {
                match &change.new {
                    Some(value) => instance.props.insert(change.name.clone(), value.clone()),
                    None => instance.props.remove(&change.name),
                };
            }
            instance.advance(Lifecycle::Mounted);
        }
    }

    fn get_root_container(&self) -> NodeKey {
        self.graph.root()
    }
}

impl Reconciler {
    fn place(&mut self, parent: Option<InstanceId>, child: InstanceId, before: Option<InstanceId>) {
        let Some(instance) = self.tree.get(child) else {
            return;
        };
        let first_placement = instance.placement == Placement::Detached;
        let moved_in_graph = instance.placement == Placement::Child;
        self.tree.link(parent, child, before);

        if first_placement {
            self.mount(parent, child);
            return;
        }
        if moved_in_graph {
            if let (Some(parent_node), Some(node)) =
                (self.parent_node(parent), self.tree.get(child).map(|i| i.node))
            {
                let anchor = self.graph_anchor(parent, child);
                self.graph.insert_child(parent_node, node, anchor);
            }
        }
        self.report.push(Mutation::Move { id: child });
    }

    /// First placement of a constructed instance, then `Constructing → Mounted`
    fn mount(&mut self, parent: Option<InstanceId>, child: InstanceId) {
        let Some(parent_node) = self.parent_node(parent) else {
            return;
        };
        let Some(instance) = self.tree.get(child) else {
            return;
        };
        let (tag, path) = (instance.tag.clone(), instance.path.clone());
        let declared = instance.attach_declared;

        let mut placed = false;
        if let Some(spec) = instance.attach.clone() {
            match self.attach_to_slot(parent_node, child) {
                Ok(()) => placed = true,
                Err(reason) if declared => self.report.error(ReconcileError::AttachTargetMissing {
                    tag: tag.clone(),
                    path: path.clone(),
                    slot: spec.to_string(),
                    reason,
                }),
                Err(reason) => log::debug!("{path}: default attach `{spec}` skipped: {reason}"),
            }
        }

        if !placed {
            let accepts = self
                .graph
                .object(parent_node)
                .is_some_and(|object| object.accepts_children());
            if accepts {
                if let Some(node) = self.tree.get(child).map(|i| i.node) {
                    let anchor = self.graph_anchor(parent, child);
                    self.graph.insert_child(parent_node, node, anchor);
                }
                if let Some(instance) = self.tree.get_mut(child) {
                    instance.placement = Placement::Child;
                }
                self.report.push(Mutation::Insert { id: child });
            } else {
                self.report
                    .error(ReconcileError::ChildRejected { tag, path });
                self.tree.unlink(child);
                self.unmount(child, true);
                return;
            }
        }

        let Some(instance) = self.tree.get_mut(child) else {
            return;
        };
        instance.advance(Lifecycle::Mounted);
        log::trace!("Mounted {} at {}", instance.tag, instance.path);
        if let Some(hook) = instance.hooks.on_mount.clone() {
            hook(child);
        }
    }

    /// Graph node of the first later sibling living in the child list
    fn graph_anchor(&self, parent: Option<InstanceId>, child: InstanceId) -> Option<NodeKey> {
        let siblings = self.tree.children_of(parent);
        let position = siblings.iter().position(|c| *c == child)?;
        siblings[position + 1..]
            .iter()
            .filter_map(|id| self.tree.get(*id))
            .find(|i| i.placement == Placement::Child)
            .map(|i| i.node)
    }

    fn release_resource(
        &mut self,
        id: InstanceId,
        name: &str,
        old: Option<&crate::native::PropValue>,
    ) {
        let Some(resource) = old.and_then(|v| v.as_resource()) else {
            return;
        };
        match resource.dispose() {
            Ok(()) => self.report.push(Mutation::ReplaceResource {
                id,
                prop: name.to_string(),
            }),
            Err(reason) => {
                if let Some(instance) = self.tree.get(id) {
                    self.report.error(ReconcileError::Disposal {
                        tag: instance.tag.clone(),
                        path: instance.path.clone(),
                        reason,
                    });
                }
            }
        }
    }
}
