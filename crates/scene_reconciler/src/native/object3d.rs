//! Shared state of every positionable native object

use super::{PropError, PropValue};
use crate::foundation::math::{Transform, Vec3};

/// Transform, visibility and picking flags common to scene objects.
///
/// Concrete types embed an `Object3D` and forward unknown props to
/// [`Object3D::set_prop`] before reporting [`PropError::Unknown`].
#[derive(Debug, Clone, PartialEq)]
pub struct Object3D {
    /// Local transform
    pub transform: Transform,
    /// Debug name
    pub name: String,
    /// Hidden objects are not drawn and not picked
    pub visible: bool,
    /// `false` makes the object ignore pointer events
    pub raycast: bool,
    /// Draw order hint; ties in hit distance prefer the higher value
    pub render_order: i32,
    /// Shadow casting flag
    pub cast_shadow: bool,
    /// Shadow receiving flag
    pub receive_shadow: bool,
}

impl Default for Object3D {
    fn default() -> Self {
        Self {
            transform: Transform::identity(),
            name: String::new(),
            visible: true,
            raycast: true,
            render_order: 0,
            cast_shadow: false,
            receive_shadow: false,
        }
    }
}

impl Object3D {
    /// Apply one of the shared props.
    ///
    /// Pierced names such as `position-x` set a single vector component.
    pub fn set_prop(&mut self, name: &str, value: &PropValue) -> Result<(), PropError> {
        if let Some((base, component)) = name.split_once('-') {
            let axis = match component {
                "x" => 0,
                "y" => 1,
                "z" => 2,
                _ => return Err(PropError::Unknown(name.to_string())),
            };
            let target = self
                .vector_mut(base)
                .ok_or_else(|| PropError::Unknown(name.to_string()))?;
            target[axis] = value.as_f32().ok_or_else(|| PropError::invalid(name, "a number"))?;
            return Ok(());
        }

        if let Some(target) = self.vector_mut(name) {
            *target = value
                .as_vec3()
                .ok_or_else(|| PropError::invalid(name, "a vector or scalar"))?;
            return Ok(());
        }

        match name {
            "name" => match value {
                PropValue::Str(s) => self.name.clone_from(s),
                _ => return Err(PropError::invalid(name, "a string")),
            },
            "visible" => self.visible = bool_value(name, value)?,
            "raycast" => self.raycast = bool_value(name, value)?,
            "castShadow" => self.cast_shadow = bool_value(name, value)?,
            "receiveShadow" => self.receive_shadow = bool_value(name, value)?,
            "renderOrder" => {
                self.render_order = match value {
                    PropValue::Int(v) => i32::try_from(*v)
                        .map_err(|_| PropError::invalid(name, "a 32-bit integer"))?,
                    _ => return Err(PropError::invalid(name, "an integer")),
                }
            }
            _ => return Err(PropError::Unknown(name.to_string())),
        }
        Ok(())
    }

    /// Read one of the shared props
    pub fn get_prop(&self, name: &str) -> Option<PropValue> {
        if let Some((base, component)) = name.split_once('-') {
            let v = self.vector(base)?;
            return match component {
                "x" => Some(PropValue::Float(v.x)),
                "y" => Some(PropValue::Float(v.y)),
                "z" => Some(PropValue::Float(v.z)),
                _ => None,
            };
        }
        if let Some(v) = self.vector(name) {
            return Some(PropValue::Vec3(v));
        }
        match name {
            "name" => Some(PropValue::Str(self.name.clone())),
            "visible" => Some(PropValue::Bool(self.visible)),
            "raycast" => Some(PropValue::Bool(self.raycast)),
            "castShadow" => Some(PropValue::Bool(self.cast_shadow)),
            "receiveShadow" => Some(PropValue::Bool(self.receive_shadow)),
            "renderOrder" => Some(PropValue::Int(i64::from(self.render_order))),
            _ => None,
        }
    }

    fn vector(&self, name: &str) -> Option<Vec3> {
        match name {
            "position" => Some(self.transform.position),
            "rotation" => Some(self.transform.rotation),
            "scale" => Some(self.transform.scale),
            _ => None,
        }
    }

    fn vector_mut(&mut self, name: &str) -> Option<&mut Vec3> {
        match name {
            "position" => Some(&mut self.transform.position),
            "rotation" => Some(&mut self.transform.rotation),
            "scale" => Some(&mut self.transform.scale),
            _ => None,
        }
    }
}

pub(crate) fn bool_value(name: &str, value: &PropValue) -> Result<bool, PropError> {
    value.as_bool().ok_or_else(|| PropError::invalid(name, "a boolean"))
}

pub(crate) fn f32_value(name: &str, value: &PropValue) -> Result<f32, PropError> {
    value.as_f32().ok_or_else(|| PropError::invalid(name, "a number"))
}

pub(crate) fn color_value(name: &str, value: &PropValue) -> Result<Vec3, PropError> {
    value
        .as_color()
        .ok_or_else(|| PropError::invalid(name, "a colour (vector, 0xRRGGBB or \"#rrggbb\")"))
}
