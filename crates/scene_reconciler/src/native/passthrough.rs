//! Untyped pass-through native object

use super::{NativeObject, Object3D, PropError, PropValue, SlotKind};
use crate::foundation::math::Transform;
use std::any::Any;
use std::collections::BTreeMap;

/// Accepts any prop name and stores it verbatim.
///
/// Transform props are still interpreted so pass-through objects take part in
/// hit testing and hierarchy transforms like any other scene object.
#[derive(Debug, Clone, Default)]
pub struct PassThrough {
    type_name: String,
    object: Object3D,
    values: BTreeMap<String, PropValue>,
    slots: Vec<String>,
    disposed: bool,
}

impl PassThrough {
    /// Create a pass-through object reporting `type_name`
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            ..Default::default()
        }
    }

    /// Declare a named slot children may attach into
    pub fn with_slot(mut self, name: impl Into<String>) -> Self {
        self.slots.push(name.into());
        self
    }

    /// Whether [`NativeObject::dispose`] ran
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}

impl NativeObject for PassThrough {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn set_prop(&mut self, name: &str, value: &PropValue) -> Result<(), PropError> {
        match self.object.set_prop(name, value) {
            Err(PropError::Unknown(_)) => {
                self.values.insert(name.to_string(), value.clone());
                Ok(())
            }
            other => other,
        }
    }

    fn get_prop(&self, name: &str) -> Option<PropValue> {
        self.object
            .get_prop(name)
            .or_else(|| self.values.get(name).cloned())
    }

    fn slot(&self, name: &str) -> Option<SlotKind> {
        self.slots
            .iter()
            .any(|slot| slot == name)
            .then_some(SlotKind::Single)
    }

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

    fn dispose(&mut self) -> Result<(), String> {
        self.disposed = true;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
