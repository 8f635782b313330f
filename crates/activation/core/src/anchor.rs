//! Caller-owned transforms addressed through generational handles.
//!
//! The tracker never owns the objects it measures. It stores an [`AnchorId`]
//! per item and resolves it through an [`AnchorSource`] each time the item is
//! re-examined, so a destroyed transform shows up as a failed lookup instead
//! of a dangling reference.

use glam::Vec3;
use slotmap::SlotMap;

slotmap::new_key_type! {
    /// Generational handle into an [`AnchorArena`] (or any other [`AnchorSource`]).
    pub struct AnchorId;
}

/// World-space placement of one anchor.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Transform {
    pub position: Vec3,
}

impl Transform {
    pub fn at(position: Vec3) -> Self {
        Self { position }
    }
}

/// Resolves anchors to their current world position.
///
/// Returns `None` when the handle no longer refers to a live transform.
pub trait AnchorSource {
    fn world_position(&self, anchor: AnchorId) -> Option<Vec3>;
}

impl<F> AnchorSource for F
where
    F: Fn(AnchorId) -> Option<Vec3>,
{
    #[inline]
    fn world_position(&self, anchor: AnchorId) -> Option<Vec3> {
        self(anchor)
    }
}

/// Transforms addressed by generation-checked handles.
///
/// Freed slots are reused with a bumped generation, so stale handles fail
/// the liveness check rather than aliasing a newer transform.
#[derive(Clone, Debug, Default)]
pub struct AnchorArena {
    transforms: SlotMap<AnchorId, Transform>,
}

impl AnchorArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, transform: Transform) -> AnchorId {
        self.transforms.insert(transform)
    }

    /// Destroys the transform behind `anchor`. Returns `None` for stale handles.
    pub fn remove(&mut self, anchor: AnchorId) -> Option<Transform> {
        self.transforms.remove(anchor)
    }

    pub fn get(&self, anchor: AnchorId) -> Option<&Transform> {
        self.transforms.get(anchor)
    }

    pub fn get_mut(&mut self, anchor: AnchorId) -> Option<&mut Transform> {
        self.transforms.get_mut(anchor)
    }

    /// Moves a live anchor. Returns `false` for stale handles.
    pub fn set_position(&mut self, anchor: AnchorId, position: Vec3) -> bool {
        match self.get_mut(anchor) {
            Some(transform) => {
                transform.position = position;
                true
            }
            None => false,
        }
    }

    #[inline]
    pub fn is_alive(&self, anchor: AnchorId) -> bool {
        self.transforms.contains_key(anchor)
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }
}

impl AnchorSource for AnchorArena {
    #[inline]
    fn world_position(&self, anchor: AnchorId) -> Option<Vec3> {
        self.get(anchor).map(|transform| transform.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use slotmap::Key;

    #[test]
    fn stale_handle_fails_liveness_check() {
        let mut arena = AnchorArena::new();
        let first = arena.insert(Transform::at(Vec3::X));
        assert!(arena.is_alive(first));

        assert_eq!(arena.remove(first), Some(Transform::at(Vec3::X)));
        assert!(!arena.is_alive(first));
        assert_eq!(arena.world_position(first), None);
        assert_eq!(arena.remove(first), None);

        // The freed slot is reused under a different handle.
        let second = arena.insert(Transform::at(Vec3::Y));
        assert_ne!(second, first);
        assert_eq!(arena.world_position(first), None);
        assert_eq!(arena.world_position(second), Some(Vec3::Y));
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn set_position_moves_live_anchor_only() {
        let mut arena = AnchorArena::new();
        let id = arena.insert(Transform::at(Vec3::ZERO));

        assert!(arena.set_position(id, Vec3::new(4.0, 0.0, 0.0)));
        assert_eq!(arena.world_position(id), Some(Vec3::new(4.0, 0.0, 0.0)));

        arena.remove(id);
        assert!(!arena.set_position(id, Vec3::ONE));
        assert!(arena.is_empty());
    }

    #[test]
    fn closures_act_as_anchor_sources() {
        let source = |anchor: AnchorId| (!anchor.is_null()).then_some(Vec3::splat(2.0));
        let mut arena = AnchorArena::new();
        let live = arena.insert(Transform::at(Vec3::ZERO));

        assert_eq!(source.world_position(live), Some(Vec3::splat(2.0)));
        assert_eq!(source.world_position(AnchorId::null()), None);
    }
}
