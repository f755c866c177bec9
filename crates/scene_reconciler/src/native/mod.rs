//! # Native Object Model
//!
//! The reconciler never knows the concrete type of the objects it builds. It
//! talks to them through [`NativeObject`], a "settable by name" capability that
//! every renderer-side type implements. Built-in types live in [`builtin`];
//! [`PassThrough`] is the untyped escape hatch for families the adapter layer
//! does not enumerate.

pub mod builtin;
mod object3d;
mod passthrough;

pub use object3d::Object3D;
pub use passthrough::PassThrough;

use crate::foundation::math::{Transform, Vec3};
use crate::scene::HitShape;
use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

/// Errors raised by a native object while applying a prop
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PropError {
    /// The object has no property with this name
    #[error("unknown property `{0}`")]
    Unknown(String),

    /// The property exists but rejects the value
    #[error("property `{name}` expects {expected}")]
    InvalidValue {
        /// Property name
        name: String,
        /// Human readable description of the accepted values
        expected: &'static str,
    },

    /// The property can only be set through constructor arguments
    #[error("property `{0}` is read-only")]
    ReadOnly(String),
}

impl PropError {
    pub(crate) fn invalid(name: &str, expected: &'static str) -> Self {
        Self::InvalidValue {
            name: name.to_string(),
            expected,
        }
    }
}

/// Shape of a named slot on a native object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    /// Holds exactly one value (`mesh.geometry`)
    Single,
    /// Holds an ordered list of values (`mesh.material[0]`)
    Indexed,
}

/// Capability interface every renderer-side object exposes to the reconciler
pub trait NativeObject: fmt::Debug {
    /// Renderer type name, e.g. `"Mesh"`
    fn type_name(&self) -> &str;

    /// Set a property by name
    fn set_prop(&mut self, name: &str, value: &PropValue) -> Result<(), PropError>;

    /// Read a property by name
    fn get_prop(&self, name: &str) -> Option<PropValue>;

    /// Named slots children may attach into
    fn slot(&self, _name: &str) -> Option<SlotKind> {
        None
    }

    /// Whether ordinary (non-attached) children can be added
    fn accepts_children(&self) -> bool {
        true
    }

    /// Local transform relative to the parent node
    fn transform(&self) -> Transform {
        Transform::identity()
    }

    /// Local-space pick volume
    fn hit_shape(&self) -> Option<HitShape> {
        None
    }

    /// `false` when the object opts out of pointer events
    fn raycastable(&self) -> bool {
        true
    }

    /// Hidden objects (and their subtrees) are skipped by hit testing
    fn visible(&self) -> bool {
        true
    }

    /// Higher values are considered in front when distances tie
    fn render_order(&self) -> i32 {
        0
    }

    /// Release renderer resources
    fn dispose(&mut self) -> Result<(), String> {
        Ok(())
    }

    /// Downcast support for tests and custom integrations
    fn as_any(&self) -> &dyn Any;
}

/// A shared sub-resource held by a prop (a geometry or material passed by value).
///
/// Compared by pointer identity: swapping one resource for another is a
/// "whole-object replace" even when both are structurally equal.
#[derive(Clone)]
pub struct Resource(Rc<RefCell<dyn NativeObject>>);

impl Resource {
    /// Wrap a native object as a shareable resource
    pub fn new<T: NativeObject + 'static>(object: T) -> Self {
        Self(Rc::new(RefCell::new(object)))
    }

    /// Pointer identity comparison
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Run a closure against the wrapped object
    pub fn with<R>(&self, f: impl FnOnce(&dyn NativeObject) -> R) -> R {
        f(&*self.0.borrow())
    }

    /// Run a closure against the wrapped object mutably
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut dyn NativeObject) -> R) -> R {
        f(&mut *self.0.borrow_mut())
    }

    /// Dispose the wrapped object
    pub fn dispose(&self) -> Result<(), String> {
        self.with_mut(|object| object.dispose())
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(object) => write!(f, "Resource({})", object.type_name()),
            Err(_) => f.write_str("Resource(<borrowed>)"),
        }
    }
}

impl PartialEq for Resource {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

/// A prop value crossing the declarative/native boundary
#[derive(Debug, Clone, PartialEq)]
pub enum PropValue {
    /// Explicit empty value
    Null,
    /// Boolean flag
    Bool(bool),
    /// Integer (also accepted for hex colours)
    Int(i64),
    /// Scalar
    Float(f32),
    /// String
    Str(String),
    /// Three component vector
    Vec3(Vec3),
    /// Linear RGB colour
    Color(Vec3),
    /// Flat list of scalars
    Floats(Vec<f32>),
    /// Pointer-identity sub-resource
    Resource(Resource),
}

impl PropValue {
    /// Scalar view of numeric values
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f32),
            _ => None,
        }
    }

    /// Boolean view
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Vector view; a single scalar is splatted to all components
    pub fn as_vec3(&self) -> Option<Vec3> {
        match self {
            Self::Vec3(v) | Self::Color(v) => Some(*v),
            Self::Floats(values) if values.len() == 3 => {
                Some(Vec3::new(values[0], values[1], values[2]))
            }
            other => other.as_f32().map(|s| Vec3::new(s, s, s)),
        }
    }

    /// Colour view: accepts colours, vectors, `0xRRGGBB` integers and `#rrggbb` strings
    pub fn as_color(&self) -> Option<Vec3> {
        match self {
            Self::Color(v) | Self::Vec3(v) => Some(*v),
            Self::Int(hex) => u32::try_from(*hex).ok().map(color_from_hex),
            Self::Str(s) => s
                .strip_prefix('#')
                .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                .map(color_from_hex),
            _ => None,
        }
    }

    /// Resource view
    pub fn as_resource(&self) -> Option<&Resource> {
        match self {
            Self::Resource(r) => Some(r),
            _ => None,
        }
    }
}

impl From<f32> for PropValue {
    fn from(value: f32) -> Self {
        Self::Float(value)
    }
}

#[allow(clippy::cast_possible_truncation)]
impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        Self::Float(value as f32)
    }
}

impl From<i32> for PropValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

#[allow(clippy::cast_possible_truncation)]
impl From<[f64; 3]> for PropValue {
    fn from(value: [f64; 3]) -> Self {
        Self::Vec3(Vec3::new(value[0] as f32, value[1] as f32, value[2] as f32))
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for PropValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<Vec3> for PropValue {
    fn from(value: Vec3) -> Self {
        Self::Vec3(value)
    }
}

impl From<[f32; 3]> for PropValue {
    fn from(value: [f32; 3]) -> Self {
        Self::Vec3(Vec3::new(value[0], value[1], value[2]))
    }
}

impl From<Resource> for PropValue {
    fn from(value: Resource) -> Self {
        Self::Resource(value)
    }
}

/// Convert a `0xRRGGBB` integer to linear [0, 1] components
pub fn color_from_hex(hex: u32) -> Vec3 {
    let channel = |shift: u32| f32::from(u8::try_from((hex >> shift) & 0xff).unwrap_or(0)) / 255.0;
    Vec3::new(channel(16), channel(8), channel(0))
}

/// Read constructor argument `index` as a scalar, falling back to `default`
pub(crate) fn arg_f32(args: &[PropValue], index: usize, default: f32) -> Result<f32, String> {
    match args.get(index) {
        None | Some(PropValue::Null) => Ok(default),
        Some(value) => value
            .as_f32()
            .ok_or_else(|| format!("argument {index} must be a number, got {value:?}")),
    }
}
