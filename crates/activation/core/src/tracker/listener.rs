//! Boundary contracts between the tracker and its collaborators.

use glam::{Vec2, Vec3};

use crate::cache::FrameIndex;

/// Screen-space placement of an anchor produced by a [`PlaneProjection`].
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Projection {
    pub position: Vec2,
    /// Projected size of one world unit at the anchor's depth.
    pub scale: f32,
}

/// Projection helper supplied by the camera collaborator.
///
/// Must be a pure function of the current camera state and the world
/// position. Returns `None` when the position cannot be projected (e.g. it is
/// behind the camera).
pub trait PlaneProjection {
    fn project(&self, world: Vec3) -> Option<Projection>;
}

impl<F> PlaneProjection for F
where
    F: Fn(Vec3) -> Option<Projection>,
{
    #[inline]
    fn project(&self, world: Vec3) -> Option<Projection> {
        self(world)
    }
}

/// Data handed to an [`ActivationListener`] alongside each transition.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ActivationParams {
    pub frame: FrameIndex,
    /// Set by the projected update so the receiver can seed its transform
    /// cache without projecting again.
    pub projection: Option<Projection>,
}

impl ActivationParams {
    pub fn new(frame: FrameIndex) -> Self {
        Self {
            frame,
            projection: None,
        }
    }
}

/// Receives activate/deactivate transitions from a
/// [`ProximityTracker`](crate::ProximityTracker).
///
/// Invoked exactly once per state change. Implementations must be fast and
/// must not touch the tracker that invoked them.
pub trait ActivationListener<T> {
    fn on_activation(&mut self, item: &T, is_active: bool, params: &ActivationParams);
}

impl<T, F> ActivationListener<T> for F
where
    F: FnMut(&T, bool, &ActivationParams),
{
    #[inline]
    fn on_activation(&mut self, item: &T, is_active: bool, params: &ActivationParams) {
        self(item, is_active, params)
    }
}
