//! Built-in native object family
//!
//! A small retained-mode object model: groups, meshes, geometries, materials,
//! lights, cameras and helpers. Each type is registered in the bootstrap
//! catalogue by [`catalogue_entries`].

use super::object3d::{bool_value, color_value, f32_value};
use super::{arg_f32, NativeObject, Object3D, PropError, PropValue, Resource, SlotKind};
use crate::attach::AttachSpec;
use crate::catalogue::TypeDescriptor;
use crate::foundation::math::{Transform, Vec3};
use crate::scene::{Aabb, BoundingSphere, HitShape};
use std::any::Any;

macro_rules! object3d_passthrough {
    () => {
        fn transform(&self) -> Transform {
            self.object.transform
        }

        fn raycastable(&self) -> bool {
            self.object.raycast
        }

        fn visible(&self) -> bool {
            self.object.visible
        }

        fn render_order(&self) -> i32 {
            self.object.render_order
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    };
}

/// Plain container node (`group` and `scene`)
#[derive(Debug, Clone, Default)]
pub struct Group {
    kind: &'static str,
    /// Shared object state
    pub object: Object3D,
}

impl Group {
    /// Create a `Group`
    pub fn new() -> Self {
        Self {
            kind: "Group",
            object: Object3D::default(),
        }
    }

    /// Create a `Scene` root container
    pub fn scene() -> Self {
        Self {
            kind: "Scene",
            object: Object3D::default(),
        }
    }
}

impl NativeObject for Group {
    fn type_name(&self) -> &str {
        self.kind
    }

    fn set_prop(&mut self, name: &str, value: &PropValue) -> Result<(), PropError> {
        self.object.set_prop(name, value)
    }

    fn get_prop(&self, name: &str) -> Option<PropValue> {
        self.object.get_prop(name)
    }

    object3d_passthrough!();
}

/// Drawable mesh with `geometry` and `material` slots
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    /// Shared object state
    pub object: Object3D,
    geometry: Option<Resource>,
    material: Option<Resource>,
}

impl Mesh {
    /// Create an empty mesh
    pub fn new() -> Self {
        Self::default()
    }

    /// Geometry resource assigned through the `geometry` prop
    pub fn geometry(&self) -> Option<&Resource> {
        self.geometry.as_ref()
    }

    /// Material resource assigned through the `material` prop
    pub fn material(&self) -> Option<&Resource> {
        self.material.as_ref()
    }
}

fn resource_value(name: &str, value: &PropValue) -> Result<Option<Resource>, PropError> {
    match value {
        PropValue::Null => Ok(None),
        PropValue::Resource(resource) => Ok(Some(resource.clone())),
        _ => Err(PropError::invalid(name, "a resource or null")),
    }
}

impl NativeObject for Mesh {
    fn type_name(&self) -> &str {
        "Mesh"
    }

    fn set_prop(&mut self, name: &str, value: &PropValue) -> Result<(), PropError> {
        match name {
            "geometry" => self.geometry = resource_value(name, value)?,
            "material" => self.material = resource_value(name, value)?,
            _ => {
                if let Some(inner) = name.strip_prefix("material-") {
                    let material = self
                        .material
                        .as_ref()
                        .ok_or_else(|| PropError::Unknown(name.to_string()))?;
                    return material.with_mut(|m| m.set_prop(inner, value));
                }
                return self.object.set_prop(name, value);
            }
        }
        Ok(())
    }

    fn get_prop(&self, name: &str) -> Option<PropValue> {
        match name {
            "geometry" => Some(
                self.geometry
                    .clone()
                    .map_or(PropValue::Null, PropValue::Resource),
            ),
            "material" => Some(
                self.material
                    .clone()
                    .map_or(PropValue::Null, PropValue::Resource),
            ),
            _ => self.object.get_prop(name),
        }
    }

    fn slot(&self, name: &str) -> Option<SlotKind> {
        match name {
            "geometry" => Some(SlotKind::Single),
            "material" => Some(SlotKind::Indexed),
            _ => None,
        }
    }

    fn hit_shape(&self) -> Option<HitShape> {
        self.geometry.as_ref().and_then(|g| g.with(|g| g.hit_shape()))
    }

    object3d_passthrough!();
}

/// Parametric geometry shapes
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeometryShape {
    /// Axis-aligned box of the given dimensions
    Box {
        /// Size along X
        width: f32,
        /// Size along Y
        height: f32,
        /// Size along Z
        depth: f32,
    },
    /// Sphere of the given radius
    Sphere {
        /// Radius
        radius: f32,
    },
    /// Flat XY plane
    Plane {
        /// Size along X
        width: f32,
        /// Size along Y
        height: f32,
    },
}

/// Geometry resource; parameters come from constructor arguments only
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    shape: GeometryShape,
    disposed: bool,
}

impl Geometry {
    /// Create a geometry of the given shape
    pub fn new(shape: GeometryShape) -> Self {
        Self {
            shape,
            disposed: false,
        }
    }

    /// `boxGeometry` args: `[width, height, depth]`
    pub fn box_from_args(args: &[PropValue]) -> Result<Self, String> {
        Ok(Self::new(GeometryShape::Box {
            width: arg_f32(args, 0, 1.0)?,
            height: arg_f32(args, 1, 1.0)?,
            depth: arg_f32(args, 2, 1.0)?,
        }))
    }

    /// `sphereGeometry` args: `[radius]`
    pub fn sphere_from_args(args: &[PropValue]) -> Result<Self, String> {
        Ok(Self::new(GeometryShape::Sphere {
            radius: arg_f32(args, 0, 1.0)?,
        }))
    }

    /// `planeGeometry` args: `[width, height]`
    pub fn plane_from_args(args: &[PropValue]) -> Result<Self, String> {
        Ok(Self::new(GeometryShape::Plane {
            width: arg_f32(args, 0, 1.0)?,
            height: arg_f32(args, 1, 1.0)?,
        }))
    }

    /// Shape parameters
    pub fn shape(&self) -> GeometryShape {
        self.shape
    }

    /// Whether [`NativeObject::dispose`] ran
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}

impl NativeObject for Geometry {
    fn type_name(&self) -> &str {
        match self.shape {
            GeometryShape::Box { .. } => "BoxGeometry",
            GeometryShape::Sphere { .. } => "SphereGeometry",
            GeometryShape::Plane { .. } => "PlaneGeometry",
        }
    }

    fn set_prop(&mut self, name: &str, _value: &PropValue) -> Result<(), PropError> {
        match name {
            "width" | "height" | "depth" | "radius" => Err(PropError::ReadOnly(name.to_string())),
            _ => Err(PropError::Unknown(name.to_string())),
        }
    }

    fn get_prop(&self, name: &str) -> Option<PropValue> {
        let value = match (self.shape, name) {
            (GeometryShape::Box { width, .. } | GeometryShape::Plane { width, .. }, "width") => {
                width
            }
            (GeometryShape::Box { height, .. } | GeometryShape::Plane { height, .. }, "height") => {
                height
            }
            (GeometryShape::Box { depth, .. }, "depth") => depth,
            (GeometryShape::Sphere { radius }, "radius") => radius,
            _ => return None,
        };
        Some(PropValue::Float(value))
    }

    fn accepts_children(&self) -> bool {
        false
    }

    fn hit_shape(&self) -> Option<HitShape> {
        Some(match self.shape {
            GeometryShape::Box {
                width,
                height,
                depth,
            } => HitShape::Box(Aabb::from_center_extents(
                Vec3::zeros(),
                Vec3::new(width, height, depth) * 0.5,
            )),
            GeometryShape::Sphere { radius } => {
                HitShape::Sphere(BoundingSphere::new(Vec3::zeros(), radius))
            }
            GeometryShape::Plane { width, height } => HitShape::Box(Aabb::from_center_extents(
                Vec3::zeros(),
                Vec3::new(width * 0.5, height * 0.5, 0.0),
            )),
        })
    }

    fn dispose(&mut self) -> Result<(), String> {
        if self.disposed {
            return Err(format!("{} already disposed", self.type_name()));
        }
        self.disposed = true;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Surface material (`meshBasicMaterial`, `meshStandardMaterial`)
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    standard: bool,
    /// Base colour
    pub color: Vec3,
    /// Opacity in [0, 1]
    pub opacity: f32,
    /// Alpha blending flag
    pub transparent: bool,
    /// Wireframe rendering flag
    pub wireframe: bool,
    /// PBR roughness (standard only)
    pub roughness: f32,
    /// PBR metalness (standard only)
    pub metalness: f32,
    /// Emissive colour (standard only)
    pub emissive: Vec3,
    disposed: bool,
}

impl Material {
    /// Unlit material
    pub fn basic() -> Self {
        Self {
            standard: false,
            color: Vec3::new(1.0, 1.0, 1.0),
            opacity: 1.0,
            transparent: false,
            wireframe: false,
            roughness: 1.0,
            metalness: 0.0,
            emissive: Vec3::zeros(),
            disposed: false,
        }
    }

    /// Lit PBR material
    pub fn standard() -> Self {
        Self {
            standard: true,
            ..Self::basic()
        }
    }

    /// Whether [`NativeObject::dispose`] ran
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}

impl NativeObject for Material {
    fn type_name(&self) -> &str {
        if self.standard {
            "MeshStandardMaterial"
        } else {
            "MeshBasicMaterial"
        }
    }

    fn set_prop(&mut self, name: &str, value: &PropValue) -> Result<(), PropError> {
        match name {
            "color" => self.color = color_value(name, value)?,
            "opacity" => self.opacity = f32_value(name, value)?,
            "transparent" => self.transparent = bool_value(name, value)?,
            "wireframe" => self.wireframe = bool_value(name, value)?,
            "roughness" if self.standard => self.roughness = f32_value(name, value)?,
            "metalness" if self.standard => self.metalness = f32_value(name, value)?,
            "emissive" if self.standard => self.emissive = color_value(name, value)?,
            _ => return Err(PropError::Unknown(name.to_string())),
        }
        Ok(())
    }

    fn get_prop(&self, name: &str) -> Option<PropValue> {
        match name {
            "color" => Some(PropValue::Color(self.color)),
            "opacity" => Some(PropValue::Float(self.opacity)),
            "transparent" => Some(PropValue::Bool(self.transparent)),
            "wireframe" => Some(PropValue::Bool(self.wireframe)),
            "roughness" if self.standard => Some(PropValue::Float(self.roughness)),
            "metalness" if self.standard => Some(PropValue::Float(self.metalness)),
            "emissive" if self.standard => Some(PropValue::Color(self.emissive)),
            _ => None,
        }
    }

    fn accepts_children(&self) -> bool {
        false
    }

    fn dispose(&mut self) -> Result<(), String> {
        if self.disposed {
            return Err(format!("{} already disposed", self.type_name()));
        }
        self.disposed = true;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Light source kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightKind {
    /// Uniform ambient term
    Ambient,
    /// Omnidirectional point light
    Point,
    /// Directional light aimed at a `target` slot
    Directional,
}

/// Light source
#[derive(Debug, Clone)]
pub struct Light {
    kind: LightKind,
    /// Shared object state
    pub object: Object3D,
    /// Light colour
    pub color: Vec3,
    /// Intensity multiplier
    pub intensity: f32,
    /// Cut-off distance (point lights, 0 = infinite)
    pub distance: f32,
    /// Distance falloff exponent (point lights)
    pub decay: f32,
}

impl Light {
    /// Create a light; args are `[color, intensity]`
    pub fn from_args(kind: LightKind, args: &[PropValue]) -> Result<Self, String> {
        let color = match args.first() {
            None | Some(PropValue::Null) => Vec3::new(1.0, 1.0, 1.0),
            Some(value) => value
                .as_color()
                .ok_or_else(|| format!("argument 0 must be a colour, got {value:?}"))?,
        };
        Ok(Self {
            kind,
            object: Object3D::default(),
            color,
            intensity: arg_f32(args, 1, 1.0)?,
            distance: 0.0,
            decay: 2.0,
        })
    }

    /// Light kind
    pub fn kind(&self) -> LightKind {
        self.kind
    }
}

impl NativeObject for Light {
    fn type_name(&self) -> &str {
        match self.kind {
            LightKind::Ambient => "AmbientLight",
            LightKind::Point => "PointLight",
            LightKind::Directional => "DirectionalLight",
        }
    }

    fn set_prop(&mut self, name: &str, value: &PropValue) -> Result<(), PropError> {
        match name {
            "color" => self.color = color_value(name, value)?,
            "intensity" => self.intensity = f32_value(name, value)?,
            "distance" if self.kind == LightKind::Point => {
                self.distance = f32_value(name, value)?;
            }
            "decay" if self.kind == LightKind::Point => self.decay = f32_value(name, value)?,
            _ => return self.object.set_prop(name, value),
        }
        Ok(())
    }

    fn get_prop(&self, name: &str) -> Option<PropValue> {
        match name {
            "color" => Some(PropValue::Color(self.color)),
            "intensity" => Some(PropValue::Float(self.intensity)),
            "distance" if self.kind == LightKind::Point => Some(PropValue::Float(self.distance)),
            "decay" if self.kind == LightKind::Point => Some(PropValue::Float(self.decay)),
            _ => self.object.get_prop(name),
        }
    }

    fn slot(&self, name: &str) -> Option<SlotKind> {
        (self.kind == LightKind::Directional && name == "target").then_some(SlotKind::Single)
    }

    object3d_passthrough!();
}

/// Perspective camera node
#[derive(Debug, Clone)]
pub struct PerspectiveCamera {
    /// Shared object state
    pub object: Object3D,
    /// Vertical field of view in degrees
    pub fov: f32,
    /// Aspect ratio
    pub aspect: f32,
    /// Near plane
    pub near: f32,
    /// Far plane
    pub far: f32,
}

impl PerspectiveCamera {
    /// Args: `[fov, aspect, near, far]`
    pub fn from_args(args: &[PropValue]) -> Result<Self, String> {
        Ok(Self {
            object: Object3D::default(),
            fov: arg_f32(args, 0, 50.0)?,
            aspect: arg_f32(args, 1, 1.0)?,
            near: arg_f32(args, 2, 0.1)?,
            far: arg_f32(args, 3, 2000.0)?,
        })
    }
}

impl NativeObject for PerspectiveCamera {
    fn type_name(&self) -> &str {
        "PerspectiveCamera"
    }

    fn set_prop(&mut self, name: &str, value: &PropValue) -> Result<(), PropError> {
        match name {
            "fov" => self.fov = f32_value(name, value)?,
            "aspect" => self.aspect = f32_value(name, value)?,
            "near" => self.near = f32_value(name, value)?,
            "far" => self.far = f32_value(name, value)?,
            _ => return self.object.set_prop(name, value),
        }
        Ok(())
    }

    fn get_prop(&self, name: &str) -> Option<PropValue> {
        match name {
            "fov" => Some(PropValue::Float(self.fov)),
            "aspect" => Some(PropValue::Float(self.aspect)),
            "near" => Some(PropValue::Float(self.near)),
            "far" => Some(PropValue::Float(self.far)),
            _ => self.object.get_prop(name),
        }
    }

    object3d_passthrough!();
}

/// Line helpers (`axesHelper`, `gridHelper`); never picked
#[derive(Debug, Clone)]
pub struct Helper {
    type_name: &'static str,
    /// Shared object state
    pub object: Object3D,
    /// Overall size
    pub size: f32,
    /// Grid divisions (grid helpers only)
    pub divisions: f32,
}

impl Helper {
    /// `axesHelper` args: `[size]`
    pub fn axes(args: &[PropValue]) -> Result<Self, String> {
        Ok(Self {
            type_name: "AxesHelper",
            object: Object3D::default(),
            size: arg_f32(args, 0, 1.0)?,
            divisions: 0.0,
        })
    }

    /// `gridHelper` args: `[size, divisions]`
    pub fn grid(args: &[PropValue]) -> Result<Self, String> {
        Ok(Self {
            type_name: "GridHelper",
            object: Object3D::default(),
            size: arg_f32(args, 0, 10.0)?,
            divisions: arg_f32(args, 1, 10.0)?,
        })
    }
}

impl NativeObject for Helper {
    fn type_name(&self) -> &str {
        self.type_name
    }

    fn set_prop(&mut self, name: &str, value: &PropValue) -> Result<(), PropError> {
        self.object.set_prop(name, value)
    }

    fn get_prop(&self, name: &str) -> Option<PropValue> {
        self.object.get_prop(name)
    }

    object3d_passthrough!();
}

/// Bootstrap catalogue entries for the built-in family
pub fn catalogue_entries() -> Vec<(&'static str, TypeDescriptor)> {
    vec![
        ("group", TypeDescriptor::new("Group", |_| Ok(Group::new()))),
        ("scene", TypeDescriptor::new("Scene", |_| Ok(Group::scene()))),
        ("mesh", TypeDescriptor::new("Mesh", |_| Ok(Mesh::new()))),
        (
            "boxGeometry",
            TypeDescriptor::new("BoxGeometry", Geometry::box_from_args)
                .with_default_attach(AttachSpec::named("geometry")),
        ),
        (
            "sphereGeometry",
            TypeDescriptor::new("SphereGeometry", Geometry::sphere_from_args)
                .with_default_attach(AttachSpec::named("geometry")),
        ),
        (
            "planeGeometry",
            TypeDescriptor::new("PlaneGeometry", Geometry::plane_from_args)
                .with_default_attach(AttachSpec::named("geometry")),
        ),
        (
            "meshBasicMaterial",
            TypeDescriptor::new("MeshBasicMaterial", |_| Ok(Material::basic()))
                .with_default_attach(AttachSpec::named("material")),
        ),
        (
            "meshStandardMaterial",
            TypeDescriptor::new("MeshStandardMaterial", |_| Ok(Material::standard()))
                .with_default_attach(AttachSpec::named("material")),
        ),
        (
            "ambientLight",
            TypeDescriptor::new("AmbientLight", |args| {
                Light::from_args(LightKind::Ambient, args)
            }),
        ),
        (
            "pointLight",
            TypeDescriptor::new("PointLight", |args| Light::from_args(LightKind::Point, args)),
        ),
        (
            "directionalLight",
            TypeDescriptor::new("DirectionalLight", |args| {
                Light::from_args(LightKind::Directional, args)
            }),
        ),
        (
            "perspectiveCamera",
            TypeDescriptor::new("PerspectiveCamera", PerspectiveCamera::from_args),
        ),
        ("axesHelper", TypeDescriptor::new("AxesHelper", Helper::axes)),
        ("gridHelper", TypeDescriptor::new("GridHelper", Helper::grid)),
    ]
}
