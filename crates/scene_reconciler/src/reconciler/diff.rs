//! Prop diffing between two passes

use crate::element::Props;
use crate::native::PropValue;

/// One changed prop
#[derive(Debug, Clone, PartialEq)]
pub struct PropChange {
    /// Prop name
    pub name: String,
    /// Value applied by the previous pass
    pub old: Option<PropValue>,
    /// Value requested by this pass; `None` means the prop was removed
    pub new: Option<PropValue>,
}

impl PropChange {
    /// Whether a held sub-resource is swapped for a different one
    pub fn replaces_resource(&self) -> bool {
        match (&self.old, &self.new) {
            (Some(PropValue::Resource(old)), Some(PropValue::Resource(new))) => !old.ptr_eq(new),
            (Some(PropValue::Resource(_)), _) => true,
            _ => false,
        }
    }
}

/// Ordered set of prop changes for one instance
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropDiff {
    changes: Vec<PropChange>,
}

impl PropDiff {
    /// Compute the `(name, old, new)` triples of keys whose value differs
    pub fn between(old: &Props, new: &Props) -> Self {
        let mut changes = Vec::new();
        for (name, value) in new {
            if old.get(name) != Some(value) {
                changes.push(PropChange {
                    name: name.clone(),
                    old: old.get(name).cloned(),
                    new: Some(value.clone()),
                });
            }
        }
        for (name, value) in old {
            if !new.contains_key(name) {
                changes.push(PropChange {
                    name: name.clone(),
                    old: Some(value.clone()),
                    new: None,
                });
            }
        }
        Self { changes }
    }

    /// Changes, set props first then removals
    pub fn changes(&self) -> &[PropChange] {
        &self.changes
    }

    /// Whether nothing changed
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Number of changed keys
    pub fn len(&self) -> usize {
        self.changes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::builtin::Material;
    use crate::native::Resource;

    fn props(entries: &[(&str, PropValue)]) -> Props {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_unchanged_props_produce_empty_diff() {
        let a = props(&[("visible", PropValue::Bool(true)), ("position-x", 1.0.into())]);
        assert!(PropDiff::between(&a, &a.clone()).is_empty());
    }

    #[test]
    fn test_changed_added_removed() {
        let old = props(&[("a", 1.0.into()), ("b", 2.0.into())]);
        let new = props(&[("a", 5.0.into()), ("c", true.into())]);
        let diff = PropDiff::between(&old, &new);

        let names: Vec<_> = diff.changes().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["a", "c", "b"]);
        assert_eq!(diff.changes()[2].new, None);
    }

    #[test]
    fn test_resource_identity_drives_replacement() {
        let shared = Resource::new(Material::basic());
        let same = props(&[("material", shared.clone().into())]);
        assert!(PropDiff::between(&same, &same.clone()).is_empty());

        let other = props(&[("material", Resource::new(Material::basic()).into())]);
        let diff = PropDiff::between(&same, &other);
        assert_eq!(diff.len(), 1);
        assert!(diff.changes()[0].replaces_resource());
    }
}
