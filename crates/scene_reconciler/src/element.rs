//! Declarative scene description
//!
//! An [`Element`] tree is what callers hand to the reconciler every pass. It
//! is plain data plus handler closures; building one never touches the native
//! scene graph.
//!
//! ```
//! use scene_reconciler::element::Element;
//!
//! let scene = Element::new("mesh")
//!     .key("player")
//!     .prop("position", [0.0, 1.0, 0.0])
//!     .child(Element::new("boxGeometry").args([1.0, 2.0, 1.0]))
//!     .child(Element::new("meshStandardMaterial").prop("color", "#ff8800"));
//! assert_eq!(scene.children().len(), 2);
//! ```

use crate::attach::AttachSpec;
use crate::catalogue::{BindingScope, TagBinding, TypeDescriptor};
use crate::events::{EventKind, Handlers, SyntheticEvent};
use crate::instance::InstanceId;
use crate::native::PropValue;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// Prop name → value map (ordered for deterministic application)
pub type Props = BTreeMap<String, PropValue>;

/// Callback invoked on a lifecycle transition
pub type LifecycleHook = Rc<dyn Fn(InstanceId)>;

/// Optional mount/dispose callbacks
#[derive(Clone, Default)]
pub struct LifecycleHooks {
    /// Called on Constructing → Mounted
    pub on_mount: Option<LifecycleHook>,
    /// Called on Unmounting → Disposed
    pub on_dispose: Option<LifecycleHook>,
}

impl fmt::Debug for LifecycleHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleHooks")
            .field("on_mount", &self.on_mount.is_some())
            .field("on_dispose", &self.on_dispose.is_some())
            .finish()
    }
}

/// What kind of native object a node materializes into
#[derive(Debug, Clone)]
pub enum ElementType {
    /// Resolved through the catalogue
    Tag(String),
    /// Locally bound type; never consults a catalogue
    Bound(TagBinding),
    /// Generic pass-through primitive with a caller-supplied constructor
    Primitive(TypeDescriptor),
}

impl ElementType {
    /// Identity used to decide whether an instance can be reused
    pub fn type_key(&self) -> String {
        match self {
            Self::Tag(tag) => tag.clone(),
            Self::Bound(binding) => binding.tag().to_string(),
            Self::Primitive(descriptor) => format!("primitive:{}", descriptor.type_name()),
        }
    }

    /// Descriptor carried by the node itself, bypassing the catalogue
    pub fn explicit_descriptor(&self) -> Option<&TypeDescriptor> {
        match self {
            Self::Tag(_) => None,
            Self::Bound(binding) => Some(binding.descriptor()),
            Self::Primitive(descriptor) => Some(descriptor),
        }
    }
}

/// One declarative node
#[derive(Debug, Clone)]
pub struct Element {
    ty: ElementType,
    key: Option<String>,
    args: Vec<PropValue>,
    props: Props,
    attach: Option<AttachSpec>,
    handlers: Handlers,
    hooks: LifecycleHooks,
    children: Vec<Self>,
}

impl Element {
    /// Node resolved through the catalogue by tag
    pub fn new(tag: impl Into<String>) -> Self {
        Self::with_type(ElementType::Tag(tag.into()))
    }

    /// Node with an explicit constructor (the generic primitive path)
    pub fn primitive(descriptor: TypeDescriptor) -> Self {
        Self::with_type(ElementType::Primitive(descriptor))
    }

    /// Node built from a tag binding.
    ///
    /// Catalogue-scoped bindings resolve through normal lookup; local bindings
    /// carry their descriptor.
    pub fn bound(binding: &TagBinding) -> Self {
        match binding.scope() {
            BindingScope::Catalogue => Self::new(binding.tag()),
            BindingScope::Local => Self::with_type(ElementType::Bound(binding.clone())),
        }
    }

    fn with_type(ty: ElementType) -> Self {
        Self {
            ty,
            key: None,
            args: Vec::new(),
            props: Props::new(),
            attach: None,
            handlers: Handlers::default(),
            hooks: LifecycleHooks::default(),
            children: Vec::new(),
        }
    }

    /// Explicit reconciliation key
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Constructor arguments; changing them rebuilds the instance
    pub fn args<I, V>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<PropValue>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Set one prop
    pub fn prop(mut self, name: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.props.insert(name.into(), value.into());
        self
    }

    /// Declare an attach relation (`"geometry"`, `"material-1"`)
    pub fn attach(mut self, path: &str) -> Self {
        self.attach = Some(AttachSpec::parse(path));
        self
    }

    /// Declare an attach relation from a spec
    pub fn attach_spec(mut self, spec: AttachSpec) -> Self {
        self.attach = Some(spec);
        self
    }

    /// Bubble-phase handler
    pub fn on(mut self, kind: EventKind, handler: impl Fn(&mut SyntheticEvent) + 'static) -> Self {
        self.handlers.insert(kind, false, Rc::new(handler));
        self
    }

    /// Capture-phase handler
    pub fn on_capture(
        mut self,
        kind: EventKind,
        handler: impl Fn(&mut SyntheticEvent) + 'static,
    ) -> Self {
        self.handlers.insert(kind, true, Rc::new(handler));
        self
    }

    /// Mount hook
    pub fn on_mount(mut self, hook: impl Fn(InstanceId) + 'static) -> Self {
        self.hooks.on_mount = Some(Rc::new(hook));
        self
    }

    /// Dispose hook
    pub fn on_dispose(mut self, hook: impl Fn(InstanceId) + 'static) -> Self {
        self.hooks.on_dispose = Some(Rc::new(hook));
        self
    }

    /// Append a child
    pub fn child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }

    /// Append several children
    pub fn children_from(mut self, children: impl IntoIterator<Item = Self>) -> Self {
        self.children.extend(children);
        self
    }

    /// Node type
    pub fn element_type(&self) -> &ElementType {
        &self.ty
    }

    /// Reconciliation key
    pub fn key_ref(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Constructor arguments
    pub fn args_ref(&self) -> &[PropValue] {
        &self.args
    }

    /// Declared props
    pub fn props(&self) -> &Props {
        &self.props
    }

    /// Declared attach relation
    pub fn attach_ref(&self) -> Option<&AttachSpec> {
        self.attach.as_ref()
    }

    /// Event handlers
    pub fn handlers(&self) -> &Handlers {
        &self.handlers
    }

    /// Lifecycle hooks
    pub fn hooks(&self) -> &LifecycleHooks {
        &self.hooks
    }

    /// Child nodes
    pub fn children(&self) -> &[Self] {
        &self.children
    }
}
