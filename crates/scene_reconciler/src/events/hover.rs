//! Per-instance pointer hover state
//!
//! Hit-testing runs every frame; hover transitions must not. The tracker keeps
//! one [`PointerPhase`] per instance and advances it by diffing the previous
//! hit-set against the current one, so enter and leave are reported exactly
//! once per transition no matter how long the pointer dwells.

use crate::instance::InstanceId;
use std::collections::HashMap;

/// Hover state of one instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointerPhase {
    /// Not under the pointer
    #[default]
    Outside,
    /// Became hovered this frame
    Entering,
    /// Hovered for more than one frame
    Over,
    /// Stopped being hovered this frame
    Leaving,
}

/// Transitions produced by one frame
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HoverDiff {
    /// Instances that moved to [`PointerPhase::Entering`], in hit-set order
    pub entered: Vec<InstanceId>,
    /// Instances that moved to [`PointerPhase::Leaving`], in previous hit-set order
    pub left: Vec<InstanceId>,
}

impl HoverDiff {
    /// Whether nothing changed
    pub fn is_empty(&self) -> bool {
        self.entered.is_empty() && self.left.is_empty()
    }
}

/// Hover state machine over the set of hit instances
#[derive(Debug, Default)]
pub struct HoverTracker {
    phases: HashMap<InstanceId, PointerPhase>,
    hovered: Vec<InstanceId>,
}

impl HoverTracker {
    /// Empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase of an instance
    pub fn phase(&self, id: InstanceId) -> PointerPhase {
        self.phases.get(&id).copied().unwrap_or_default()
    }

    /// Nearest instance hit by the last update
    pub fn nearest(&self) -> Option<InstanceId> {
        self.hovered.first().copied()
    }

    /// Whether the instance is hovered (entering or over)
    pub fn is_hovered(&self, id: InstanceId) -> bool {
        matches!(self.phase(id), PointerPhase::Entering | PointerPhase::Over)
    }

    /// Advance every phase given this frame's hit-set.
    ///
    /// `hit_set` lists the nearest hit first followed by whatever else counts
    /// as hovered (its ancestors). Both `entered` and `left` come out in
    /// hit-set order, nearest first.
    pub fn update(&mut self, hit_set: &[InstanceId]) -> HoverDiff {
        let mut diff = HoverDiff::default();

        self.phases
            .retain(|id, phase| *phase != PointerPhase::Leaving || hit_set.contains(id));
        for id in &self.hovered {
            if !hit_set.contains(id) && self.phases.contains_key(id) {
                self.phases.insert(*id, PointerPhase::Leaving);
                diff.left.push(*id);
            }
        }

        for id in hit_set {
            let next = match self.phase(*id) {
                PointerPhase::Outside | PointerPhase::Leaving => {
                    diff.entered.push(*id);
                    PointerPhase::Entering
                }
                PointerPhase::Entering | PointerPhase::Over => PointerPhase::Over,
            };
            self.phases.insert(*id, next);
        }

        self.hovered = hit_set.to_vec();
        diff
    }

    /// Forget an instance (it was unmounted)
    pub fn forget(&mut self, id: InstanceId) {
        self.phases.remove(&id);
        self.hovered.retain(|hovered| *hovered != id);
    }

    /// Drop all state
    pub fn clear(&mut self) {
        self.phases.clear();
        self.hovered.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn ids(n: usize) -> Vec<InstanceId> {
        let mut map: SlotMap<InstanceId, ()> = SlotMap::with_key();
        (0..n).map(|_| map.insert(())).collect()
    }

    #[test]
    fn test_enter_dwell_leave() {
        let id = ids(1)[0];
        let mut tracker = HoverTracker::new();

        assert!(tracker.update(&[]).is_empty());

        let diff = tracker.update(&[id]);
        assert_eq!(diff.entered, vec![id]);
        assert_eq!(tracker.phase(id), PointerPhase::Entering);

        for _ in 0..5 {
            assert!(tracker.update(&[id]).is_empty());
            assert_eq!(tracker.phase(id), PointerPhase::Over);
        }

        let diff = tracker.update(&[]);
        assert_eq!(diff.left, vec![id]);
        assert_eq!(tracker.phase(id), PointerPhase::Leaving);

        assert!(tracker.update(&[]).is_empty());
        assert_eq!(tracker.phase(id), PointerPhase::Outside);
    }

    #[test]
    fn test_reenter_while_leaving() {
        let id = ids(1)[0];
        let mut tracker = HoverTracker::new();
        tracker.update(&[id]);
        tracker.update(&[]);

        let diff = tracker.update(&[id]);
        assert_eq!(diff.entered, vec![id]);
        assert!(diff.left.is_empty());
    }

    #[test]
    fn test_moving_between_siblings_keeps_parent_hovered() {
        let v = ids(3);
        let (parent, a, b) = (v[0], v[1], v[2]);
        let mut tracker = HoverTracker::new();

        tracker.update(&[a, parent]);
        let diff = tracker.update(&[b, parent]);

        assert_eq!(diff.entered, vec![b]);
        assert_eq!(diff.left, vec![a]);
        assert_eq!(tracker.phase(parent), PointerPhase::Over);
        assert_eq!(tracker.nearest(), Some(b));
    }

    #[test]
    fn test_leave_order_follows_hit_set() {
        let v = ids(3);
        let (root, group, mesh) = (v[0], v[1], v[2]);
        let mut tracker = HoverTracker::new();

        tracker.update(&[mesh, group, root]);
        let diff = tracker.update(&[]);
        assert_eq!(diff.left, vec![mesh, group, root]);

        tracker.update(&[]);
        tracker.update(&[mesh, group, root]);
        let diff = tracker.update(&[group, root]);
        assert_eq!(diff.left, vec![mesh]);
        assert_eq!(tracker.nearest(), Some(group));
    }

    #[test]
    fn test_forgotten_instance_never_leaves() {
        let v = ids(2);
        let (group, mesh) = (v[0], v[1]);
        let mut tracker = HoverTracker::new();

        tracker.update(&[mesh, group]);
        tracker.forget(mesh);
        assert_eq!(tracker.nearest(), Some(group));

        let diff = tracker.update(&[]);
        assert_eq!(diff.left, vec![group]);
    }
}
