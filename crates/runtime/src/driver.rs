//! Per-frame composition of the proximity pass and the activation pass.
use core::fmt;
use std::hash::Hash;

use activation_core::{
    ActivationParams, ActivationPolicy, ActivationStats, AnchorId, AnchorSource,
    EntityActivationSet, FrameIndex, PlaneProjection, ProximityStats, ProximityTracker,
    UpdateMask,
};
use glam::{Vec2, Vec3};
use tracing::{debug, trace};

use crate::config::RuntimeConfig;
use crate::error::{Result, RuntimeError};

/// Work done by one [`FrameDriver::step`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameReport {
    pub frame: FrameIndex,
    pub proximity: ProximityStats,
    pub activation: ActivationStats,
}

/// Drives a proximity tracker and an activation set in lockstep.
///
/// Items enter the activation set when they come within range of the
/// observer and leave it when they drop out of range, so the set only ever
/// classifies nearby entities.
pub struct FrameDriver<T, P> {
    tracker: ProximityTracker<T>,
    set: EntityActivationSet<T, P>,
    frame: FrameIndex,
    update_mask: UpdateMask,
}

impl<T, P> FrameDriver<T, P>
where
    T: Copy + Eq + Hash + fmt::Debug,
    P: ActivationPolicy<T>,
{
    pub fn new(config: &RuntimeConfig, policy: P) -> Self {
        Self {
            tracker: ProximityTracker::new(&config.proximity),
            set: EntityActivationSet::new(config.update_mask, policy),
            frame: FrameIndex::ZERO,
            update_mask: config.update_mask,
        }
    }

    /// Starts tracking `item`. It is measured on the next step.
    pub fn add(&mut self, item: T, anchor: AnchorId, radius: f32) -> Result<()> {
        if self.tracker.contains(&item) {
            return Err(RuntimeError::AlreadyTracked(format!("{:?}", item)));
        }
        self.tracker.add(item, anchor, radius);
        Ok(())
    }

    /// Stops tracking `item`, untracking it from the activation set if it was
    /// in range.
    pub fn remove(&mut self, item: T) -> Result<()> {
        let set = &mut self.set;
        let removed = self.tracker.remove(
            &item,
            &mut |item: &T, _: bool, params: &ActivationParams| {
                sync_membership(set, *item, false, params)
            },
        );
        if removed {
            Ok(())
        } else {
            Err(RuntimeError::NotTracked(format!("{:?}", item)))
        }
    }

    /// Runs one frame with a 3D observer.
    ///
    /// `make_context` builds the activation pass context once the proximity
    /// pass has finished, so it may read state the proximity callbacks saw.
    pub fn step<S, F>(&mut self, observer: Vec3, anchors: &S, make_context: F) -> FrameReport
    where
        S: AnchorSource + ?Sized,
        F: FnOnce(FrameIndex) -> P::Context,
    {
        let frame = self.frame;
        let set = &mut self.set;
        let proximity = self
            .tracker
            .update(frame, observer, anchors, &mut |item: &T, active: bool, params: &ActivationParams| {
                sync_membership(set, *item, active, params)
            });
        self.finish(frame, proximity, make_context)
    }

    /// Runs one frame with an observer in the configured plane.
    pub fn step_planar<S, F>(&mut self, observer: Vec2, anchors: &S, make_context: F) -> FrameReport
    where
        S: AnchorSource + ?Sized,
        F: FnOnce(FrameIndex) -> P::Context,
    {
        let frame = self.frame;
        let set = &mut self.set;
        let proximity = self.tracker.update_planar(
            frame,
            observer,
            anchors,
            &mut |item: &T, active: bool, params: &ActivationParams| {
                sync_membership(set, *item, active, params)
            },
        );
        self.finish(frame, proximity, make_context)
    }

    /// Runs one frame against screen-space positions.
    ///
    /// `distance_scale` converts world radii to screen units. Transitions hand
    /// the anchor's projection to [`ActivationPolicy::on_proximity`].
    pub fn step_projected<S, Pr, F>(
        &mut self,
        observer: Vec2,
        anchors: &S,
        projection: &Pr,
        distance_scale: f32,
        make_context: F,
    ) -> FrameReport
    where
        S: AnchorSource + ?Sized,
        Pr: PlaneProjection + ?Sized,
        F: FnOnce(FrameIndex) -> P::Context,
    {
        let frame = self.frame;
        let set = &mut self.set;
        let proximity = self.tracker.update_projected(
            frame,
            observer,
            anchors,
            projection,
            distance_scale,
            &mut |item: &T, active: bool, params: &ActivationParams| {
                sync_membership(set, *item, active, params)
            },
        );
        self.finish(frame, proximity, make_context)
    }

    fn finish<F>(&mut self, frame: FrameIndex, proximity: ProximityStats, make_context: F) -> FrameReport
    where
        F: FnOnce(FrameIndex) -> P::Context,
    {
        let ctx = make_context(frame);
        let activation = self.set.update(self.update_mask, &ctx);
        self.frame = frame.next();

        trace!(
            %frame,
            examined = proximity.examined,
            in_range = self.tracker.active_items().len(),
            updated = activation.updated,
            "frame stepped"
        );
        FrameReport {
            frame,
            proximity,
            activation,
        }
    }

    /// Mask applied from the next step on.
    pub fn set_update_mask(&mut self, update_mask: UpdateMask) {
        if update_mask != self.update_mask {
            debug!(from = self.update_mask.bits(), to = update_mask.bits(), "update mask changed");
        }
        self.update_mask = update_mask;
    }

    pub fn set_activation_radius(&mut self, activation_radius: f32) {
        self.tracker.set_radius(activation_radius);
    }

    /// Puts every in-range entity to sleep. Proximity tracking continues.
    pub fn sleep(&mut self) {
        self.set.sleep();
    }

    pub fn wake_up(&mut self) {
        self.set.wake_up();
    }

    /// Index the next step will run with.
    pub fn frame(&self) -> FrameIndex {
        self.frame
    }

    pub fn update_mask(&self) -> UpdateMask {
        self.update_mask
    }

    pub fn tracker(&self) -> &ProximityTracker<T> {
        &self.tracker
    }

    pub fn set(&self) -> &EntityActivationSet<T, P> {
        &self.set
    }

    pub fn policy(&self) -> &P {
        self.set.policy()
    }

    pub fn policy_mut(&mut self) -> &mut P {
        self.set.policy_mut()
    }

    /// Both structures are internally consistent and the set tracks exactly
    /// the items the tracker reports in range.
    pub fn is_consistent(&self) -> bool {
        let in_range = self.tracker.active_items();
        self.tracker.is_consistent()
            && self.set.is_consistent()
            && self.set.len() == in_range.len()
            && in_range.iter().all(|item| self.set.contains(*item))
    }

    /// [`is_consistent`](Self::is_consistent) as an error, for callers that
    /// audit the driver outside debug builds.
    pub fn check_consistency(&self) -> Result<()> {
        if self.is_consistent() {
            Ok(())
        } else {
            Err(RuntimeError::Inconsistent { frame: self.frame })
        }
    }
}

fn sync_membership<T, P>(
    set: &mut EntityActivationSet<T, P>,
    item: T,
    in_range: bool,
    params: &ActivationParams,
) where
    T: Copy + Eq + Hash + fmt::Debug,
    P: ActivationPolicy<T>,
{
    if in_range {
        set.policy_mut().on_proximity(item, true, params);
        set.track(item);
    } else {
        set.untrack(item);
        set.policy_mut().on_proximity(item, false, params);
    }
}

#[cfg(test)]
mod tests {
    use activation_core::{AnchorArena, AwakeVerdict, EntityStatus, Transform};

    use super::*;

    struct AlwaysActive;

    impl ActivationPolicy<u32> for AlwaysActive {
        type Context = ();

        fn update_mask(&self, _entity: u32) -> UpdateMask {
            UpdateMask::bits_of(0x1)
        }

        fn evaluate_awake(&mut self, _entity: u32, _ctx: &()) -> AwakeVerdict {
            AwakeVerdict::Active
        }

        fn update_active(&mut self, _entity: u32, _ctx: &()) {}

        fn set_status(&mut self, _entity: u32, _status: EntityStatus, _force: bool) -> bool {
            true
        }
    }

    #[test]
    fn add_twice_is_rejected() {
        let mut arena = AnchorArena::new();
        let anchor = arena.insert(Transform::at(Vec3::ZERO));
        let mut driver = FrameDriver::new(&RuntimeConfig::default(), AlwaysActive);

        assert_eq!(driver.add(1, anchor, 0.0), Ok(()));
        assert_eq!(
            driver.add(1, anchor, 0.0),
            Err(RuntimeError::AlreadyTracked("1".to_string()))
        );
        assert_eq!(
            driver.remove(2),
            Err(RuntimeError::NotTracked("2".to_string()))
        );
    }

    #[test]
    fn frame_advances_each_step() {
        let arena = AnchorArena::new();
        let mut driver: FrameDriver<u32, _> = FrameDriver::new(&RuntimeConfig::default(), AlwaysActive);

        let first = driver.step(Vec3::ZERO, &arena, |_| ());
        let second = driver.step(Vec3::ZERO, &arena, |_| ());
        assert_eq!(first.frame, FrameIndex(0));
        assert_eq!(second.frame, FrameIndex(1));
        assert_eq!(driver.frame(), FrameIndex(2));
    }

    #[test]
    fn consistent_driver_passes_audit() {
        let mut arena = AnchorArena::new();
        let anchor = arena.insert(Transform::at(Vec3::ZERO));
        let mut driver = FrameDriver::new(&RuntimeConfig::default(), AlwaysActive);
        driver.add(1, anchor, 0.0).unwrap();

        assert_eq!(driver.check_consistency(), Ok(()));
        driver.step(Vec3::ZERO, &arena, |_| ());
        assert!(driver.set().contains(1));
        assert_eq!(driver.check_consistency(), Ok(()));
    }
}
