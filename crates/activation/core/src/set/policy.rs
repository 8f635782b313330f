//! Policy trait supplied by the owner of an [`EntityActivationSet`](super::EntityActivationSet).

use glam::Vec3;

use super::status::{AwakeVerdict, EntityStatus, UpdateMask};
use crate::cache::FrameIndex;
use crate::tracker::ActivationParams;

/// Caller-supplied behavior of an activation set.
///
/// The set supplies the mechanism (tiers, buffers, ordering); the policy
/// decides eligibility and performs the per-entity work. None of these
/// methods receive the set itself, so they cannot re-enter it.
pub trait ActivationPolicy<T> {
    /// Immutable per-frame snapshot passed to the Awake and Active passes.
    type Context;

    /// Bits this entity responds to. Compared against the global mask.
    fn update_mask(&self, entity: T) -> UpdateMask;

    /// Cheap check run on every Awake (and Active) entity each update.
    fn evaluate_awake(&mut self, entity: T, ctx: &Self::Context) -> AwakeVerdict;

    /// Expensive update run on every Active entity each update.
    fn update_active(&mut self, entity: T, ctx: &Self::Context);

    /// Applies `status` to the entity and fires any app-level side effects
    /// (enabling a collider, starting audio, ...).
    ///
    /// `force` asks for side effects even if the status did not change.
    /// Returns whether anything actually changed.
    fn set_status(&mut self, entity: T, status: EntityStatus, force: bool) -> bool;

    /// Called by a frame driver when the entity enters or leaves proximity
    /// range, before it is tracked or after it is untracked.
    ///
    /// Projected updates pass the projection in `params`, so a policy can seed
    /// its [`TransformCache`](crate::TransformCache) without projecting again.
    fn on_proximity(&mut self, _entity: T, _in_range: bool, _params: &ActivationParams) {}
}

/// Standard per-frame context: a sphere of interest around a center point.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FrameContext {
    pub center: Vec3,
    /// Squared radius, so membership tests avoid a square root.
    pub radius_sq: f32,
    pub frame: FrameIndex,
}

impl FrameContext {
    pub fn new(center: Vec3, radius: f32, frame: FrameIndex) -> Self {
        Self {
            center,
            radius_sq: radius * radius,
            frame,
        }
    }

    #[inline]
    pub fn contains(&self, point: Vec3) -> bool {
        self.center.distance_squared(point) <= self.radius_sq
    }
}
