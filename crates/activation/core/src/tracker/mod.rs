//! Lazy proximity tracking over a [`DistanceHeap`].
//!
//! Exact distances are not recomputed every frame. Each item is keyed by the
//! amount of observer travel after which it *could* have crossed its
//! activation boundary: `accumulator + |gap|` at the time it was measured.
//! Since the observer cannot close a gap faster than it moves, nothing whose
//! score is still ahead of the accumulator can have changed state, and each
//! update only pops items off the root while `root.score < accumulator`.
//!
//! Items far outside (or deep inside) their radius come due rarely; items
//! near the boundary come due often.
//!
//! # Rebasing
//!
//! The accumulator only grows. Once it reaches the rebase threshold, the
//! threshold is subtracted from it and from every score, which keeps all keys
//! in a range where `f32` still resolves small gaps.

mod listener;

use core::fmt;

use glam::{Vec2, Vec3};
use tracing::{debug, trace};

pub use listener::{ActivationListener, ActivationParams, PlaneProjection, Projection};

use crate::anchor::{AnchorId, AnchorSource};
use crate::cache::FrameIndex;
use crate::config::{Plane, ProximityConfig};
use crate::heap::{DistanceHeap, ScoredItem};

/// Score of a freshly added item: due on the very next update.
const DUE_NOW: f32 = f32::NEG_INFINITY;

/// Work done by one tracker update.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProximityStats {
    /// Items popped from the root and measured. Never exceeds the item count.
    pub examined: usize,
    pub activated: usize,
    pub deactivated: usize,
    /// Rebase threshold multiples subtracted this update.
    pub rebases: u32,
}

/// Outcome of measuring one due item.
enum Sample {
    Measured {
        distance: f32,
        /// Factor applied to the combined radius (projected scale).
        radius_scale: f32,
        projection: Option<Projection>,
    },
    /// Anchor dead or not projectable; the item is treated as out of range.
    Unavailable,
}

impl Sample {
    fn world(distance: f32) -> Self {
        Self::Measured {
            distance,
            radius_scale: 1.0,
            projection: None,
        }
    }
}

/// Tracks which items are within activation range of a moving observer.
///
/// # Invariants
///
/// - `0 <= accumulator < rebase_threshold` after every update
/// - [`active_items`](Self::active_items) holds exactly the items whose
///   [`ScoredItem::active`] flag is set, without duplicates
/// - every flip of an `active` flag is reported to the listener exactly once
#[derive(Clone, Debug)]
pub struct ProximityTracker<T> {
    heap: DistanceHeap<T>,
    active: Vec<T>,
    activation_radius: f32,
    rebase_threshold: f32,
    plane: Plane,
    accumulator: f32,
    last_observer_position: Option<Vec3>,
    last_frame: FrameIndex,
}

impl<T> ProximityTracker<T>
where
    T: Clone + PartialEq + fmt::Debug,
{
    pub fn new(config: &ProximityConfig) -> Self {
        debug_assert!(
            config.validate().is_ok(),
            "invalid proximity config: {:?}",
            config
        );

        Self {
            heap: DistanceHeap::new(),
            active: Vec::new(),
            activation_radius: config.activation_radius,
            rebase_threshold: config.rebase_threshold,
            plane: config.plane,
            accumulator: 0.0,
            last_observer_position: None,
            last_frame: FrameIndex::ZERO,
        }
    }

    /// Starts tracking `item`. It is measured on the next update.
    ///
    /// Adding an item that is already tracked is a caller bug.
    pub fn add(&mut self, item: T, anchor: AnchorId, radius: f32) {
        debug_assert!(!self.contains(&item), "item {:?} is already tracked", item);
        debug_assert!(
            radius.is_finite() && radius >= 0.0,
            "item radius must be finite and non-negative, got {}",
            radius
        );

        self.heap
            .insert(ScoredItem::new(item, anchor, radius, DUE_NOW));
    }

    /// Stops tracking `item`, reporting a deactivation first if it was active.
    ///
    /// Returns `false` if the item was not tracked.
    pub fn remove<L>(&mut self, item: &T, listener: &mut L) -> bool
    where
        L: ActivationListener<T> + ?Sized,
    {
        let Some(index) = self.heap.position(|entry| entry.item == *item) else {
            return false;
        };

        let entry = self.heap.delete_at(index);
        if entry.active {
            forget(&mut self.active, &entry.item);
            trace!(item = ?entry.item, "deactivated on removal");
            listener.on_activation(&entry.item, false, &ActivationParams::new(self.last_frame));
        }
        true
    }

    /// Deactivates every active item, then forgets all items.
    pub fn clear<L>(&mut self, listener: &mut L)
    where
        L: ActivationListener<T> + ?Sized,
    {
        let params = ActivationParams::new(self.last_frame);
        for entry in self.heap.iter().filter(|entry| entry.active) {
            listener.on_activation(&entry.item, false, &params);
        }

        debug!(
            items = self.heap.len(),
            active = self.active.len(),
            "cleared proximity tracker"
        );
        self.heap.clear();
        self.active.clear();
    }

    /// Changes the global activation radius without re-measuring anything.
    ///
    /// Every gap moves by at most the radius change, so all scores are pulled
    /// earlier by that amount.
    pub fn set_radius(&mut self, activation_radius: f32) {
        debug_assert!(
            activation_radius.is_finite() && activation_radius >= 0.0,
            "activation radius must be finite and non-negative, got {}",
            activation_radius
        );

        let change = (activation_radius - self.activation_radius).abs();
        self.activation_radius = activation_radius;
        if change > 0.0 {
            self.heap.shift_scores(-change);
        }
    }

    /// Advances the observer in 3D and re-examines due items.
    pub fn update<S, L>(
        &mut self,
        frame: FrameIndex,
        observer: Vec3,
        anchors: &S,
        listener: &mut L,
    ) -> ProximityStats
    where
        S: AnchorSource + ?Sized,
        L: ActivationListener<T> + ?Sized,
    {
        let rebases = self.advance(frame, observer);
        self.process_due(frame, rebases, 1.0, listener, |anchor| {
            let position = anchors.world_position(anchor);
            debug_assert!(position.is_some(), "anchor {:?} is no longer alive", anchor);
            position.map_or(Sample::Unavailable, |position| {
                Sample::world(position.distance(observer))
            })
        })
    }

    /// Advances the observer in the configured [`Plane`], ignoring the
    /// remaining axis of every anchor.
    pub fn update_planar<S, L>(
        &mut self,
        frame: FrameIndex,
        observer: Vec2,
        anchors: &S,
        listener: &mut L,
    ) -> ProximityStats
    where
        S: AnchorSource + ?Sized,
        L: ActivationListener<T> + ?Sized,
    {
        let plane = self.plane;
        let rebases = self.advance(frame, plane.lift(observer));
        self.process_due(frame, rebases, 1.0, listener, |anchor| {
            let position = anchors.world_position(anchor);
            debug_assert!(position.is_some(), "anchor {:?} is no longer alive", anchor);
            position.map_or(Sample::Unavailable, |position| {
                Sample::world(plane.flatten(position).distance(observer))
            })
        })
    }

    /// Advances a screen-space observer and measures anchors through
    /// `projection`.
    ///
    /// The combined radius is scaled by each anchor's projected scale, and
    /// re-key gaps are multiplied by `distance_scale` because screen-space
    /// movement does not map 1:1 onto world movement at every depth. The
    /// projection is forwarded to the listener.
    pub fn update_projected<S, P, L>(
        &mut self,
        frame: FrameIndex,
        observer: Vec2,
        anchors: &S,
        projection: &P,
        distance_scale: f32,
        listener: &mut L,
    ) -> ProximityStats
    where
        S: AnchorSource + ?Sized,
        P: PlaneProjection + ?Sized,
        L: ActivationListener<T> + ?Sized,
    {
        debug_assert!(
            distance_scale.is_finite() && distance_scale > 0.0,
            "distance scale must be finite and positive, got {}",
            distance_scale
        );

        let rebases = self.advance(frame, observer.extend(0.0));
        self.process_due(frame, rebases, distance_scale, listener, |anchor| {
            let position = anchors.world_position(anchor);
            debug_assert!(position.is_some(), "anchor {:?} is no longer alive", anchor);
            match position.and_then(|position| projection.project(position)) {
                Some(projected) => Sample::Measured {
                    distance: projected.position.distance(observer),
                    radius_scale: projected.scale,
                    projection: Some(projected),
                },
                None => Sample::Unavailable,
            }
        })
    }

    /// Accumulates observer travel and rebases if the threshold was reached.
    /// Returns the number of threshold multiples removed.
    fn advance(&mut self, frame: FrameIndex, observer: Vec3) -> u32 {
        self.last_frame = frame;

        if let Some(last) = self.last_observer_position {
            let step = last.distance(observer);
            debug_assert!(step.is_finite(), "observer moved to {:?}", observer);
            if step.is_finite() {
                self.accumulator += step;
            }
        }
        self.last_observer_position = Some(observer);

        if self.accumulator < self.rebase_threshold {
            return 0;
        }

        // A teleport may cover several thresholds at once.
        let before = self.accumulator;
        self.accumulator %= self.rebase_threshold;
        let shift = before - self.accumulator;
        self.heap.shift_scores(-shift);

        let rebases = (shift / self.rebase_threshold).round() as u32;
        debug!(
            rebases,
            shift,
            accumulator = self.accumulator,
            items = self.heap.len(),
            "rebased proximity scores"
        );
        rebases
    }

    /// Pops due items off the root, flips their state if they crossed the
    /// boundary, and re-keys them behind the accumulator.
    fn process_due<L, M>(
        &mut self,
        frame: FrameIndex,
        rebases: u32,
        rekey_scale: f32,
        listener: &mut L,
        mut measure: M,
    ) -> ProximityStats
    where
        L: ActivationListener<T> + ?Sized,
        M: FnMut(AnchorId) -> Sample,
    {
        let mut stats = ProximityStats {
            rebases,
            ..ProximityStats::default()
        };
        let accumulator = self.accumulator;
        let reach = self.activation_radius;
        let fallback_gap = self.rebase_threshold;

        // Every examined item is re-keyed at or beyond the accumulator, so
        // each item is examined at most once per update.
        while let Some(root) = self.heap.root_mut() {
            if root.score >= accumulator {
                break;
            }
            stats.examined += 1;

            let (should_be_active, gap, projection) = match measure(root.anchor) {
                Sample::Measured {
                    distance,
                    radius_scale,
                    projection,
                } => {
                    let gap = distance - (reach + root.radius) * radius_scale;
                    debug_assert!(gap.is_finite(), "non-finite gap for {:?}", root.item);
                    if gap.is_finite() {
                        (gap <= 0.0, gap.abs() * rekey_scale, projection)
                    } else {
                        (false, fallback_gap, None)
                    }
                }
                Sample::Unavailable => (false, fallback_gap, None),
            };

            if root.active != should_be_active {
                root.active = should_be_active;
                if should_be_active {
                    self.active.push(root.item.clone());
                    stats.activated += 1;
                } else {
                    forget(&mut self.active, &root.item);
                    stats.deactivated += 1;
                }

                trace!(item = ?root.item, active = should_be_active, %frame, "proximity transition");
                listener.on_activation(
                    &root.item,
                    should_be_active,
                    &ActivationParams { frame, projection },
                );
            }

            root.score = accumulator + gap;
            self.heap.sift_down(0);
        }

        stats
    }

    pub fn contains(&self, item: &T) -> bool {
        self.heap.position(|entry| entry.item == *item).is_some()
    }

    pub fn is_active(&self, item: &T) -> bool {
        self.active.contains(item)
    }

    /// Items currently inside their activation radius, in no particular order.
    pub fn active_items(&self) -> &[T] {
        &self.active
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScoredItem<T>> {
        self.heap.iter()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn accumulator(&self) -> f32 {
        self.accumulator
    }

    pub fn activation_radius(&self) -> f32 {
        self.activation_radius
    }

    pub fn rebase_threshold(&self) -> f32 {
        self.rebase_threshold
    }

    pub fn last_observer_position(&self) -> Option<Vec3> {
        self.last_observer_position
    }

    /// Heap invariant check, for assertions and tests.
    pub fn is_consistent(&self) -> bool {
        let flagged = self.heap.iter().filter(|entry| entry.active).count();
        self.heap.is_valid_heap()
            && flagged == self.active.len()
            && self
                .heap
                .iter()
                .filter(|entry| entry.active)
                .all(|entry| self.active.contains(&entry.item))
    }
}

impl<T> Default for ProximityTracker<T>
where
    T: Clone + PartialEq + fmt::Debug,
{
    fn default() -> Self {
        Self::new(&ProximityConfig::default())
    }
}

fn forget<T: PartialEq>(active: &mut Vec<T>, item: &T) {
    if let Some(index) = active.iter().position(|candidate| candidate == item) {
        active.swap_remove(index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchor::{AnchorArena, Transform};

    type Log = Vec<(u32, bool)>;

    fn recorder(log: &mut Log) -> impl FnMut(&u32, bool, &ActivationParams) + '_ {
        move |item, active, _| log.push((*item, active))
    }

    fn tracker(radius: f32) -> ProximityTracker<u32> {
        ProximityTracker::new(&ProximityConfig::new().with_activation_radius(radius))
    }

    #[test]
    fn far_item_is_not_reexamined_until_observer_covers_gap() {
        let mut arena = AnchorArena::new();
        let anchor = arena.insert(Transform::at(Vec3::new(100.0, 0.0, 0.0)));
        let mut tracker = tracker(5.0);
        tracker.add(1, anchor, 0.0);
        let mut log = Log::new();

        let first = tracker.update(FrameIndex(0), Vec3::ZERO, &arena, &mut recorder(&mut log));
        assert_eq!(first.examined, 1);

        // Gap is 95; small steps should not touch the item.
        let mut frame = FrameIndex(0);
        for step in 1..=90 {
            frame = frame.next();
            let stats = tracker.update(
                frame,
                Vec3::new(step as f32, 0.0, 0.0),
                &arena,
                &mut recorder(&mut log),
            );
            assert_eq!(stats.examined, 0, "examined early at step {}", step);
        }

        let stats = tracker.update(
            frame.next(),
            Vec3::new(96.0, 0.0, 0.0),
            &arena,
            &mut recorder(&mut log),
        );
        assert_eq!(stats.examined, 1);
        assert_eq!(stats.activated, 1);
        assert_eq!(log, vec![(1, true)]);
    }

    #[test]
    fn remove_active_item_reports_deactivation() {
        let mut arena = AnchorArena::new();
        let anchor = arena.insert(Transform::at(Vec3::ZERO));
        let mut tracker = tracker(5.0);
        tracker.add(1, anchor, 0.0);
        let mut log = Log::new();

        tracker.update(FrameIndex(0), Vec3::ZERO, &arena, &mut recorder(&mut log));
        assert!(tracker.is_active(&1));

        assert!(tracker.remove(&1, &mut recorder(&mut log)));
        assert!(!tracker.remove(&1, &mut recorder(&mut log)));
        assert_eq!(log, vec![(1, true), (1, false)]);
        assert!(tracker.is_empty());
        assert!(tracker.active_items().is_empty());
    }

    #[test]
    fn clear_deactivates_each_active_item_once() {
        let mut arena = AnchorArena::new();
        let mut tracker = tracker(5.0);
        for (id, x) in [(1, 0.0), (2, 1.0), (3, 50.0)] {
            let anchor = arena.insert(Transform::at(Vec3::new(x, 0.0, 0.0)));
            tracker.add(id, anchor, 0.0);
        }
        let mut log = Log::new();
        tracker.update(FrameIndex(0), Vec3::ZERO, &arena, &mut recorder(&mut log));
        log.clear();

        tracker.clear(&mut recorder(&mut log));
        log.sort();
        assert_eq!(log, vec![(1, false), (2, false)]);
        assert!(tracker.is_empty());
        assert!(tracker.active_items().is_empty());
    }

    #[test]
    fn growing_radius_pulls_items_due() {
        let mut arena = AnchorArena::new();
        let anchor = arena.insert(Transform::at(Vec3::new(20.0, 0.0, 0.0)));
        let mut tracker = tracker(5.0);
        tracker.add(1, anchor, 0.0);
        let mut log = Log::new();

        tracker.update(FrameIndex(0), Vec3::ZERO, &arena, &mut recorder(&mut log));
        assert!(!tracker.is_active(&1));

        tracker.set_radius(25.0);
        let stats = tracker.update(FrameIndex(1), Vec3::ZERO, &arena, &mut recorder(&mut log));
        assert_eq!(stats.examined, 1);
        assert_eq!(log, vec![(1, true)]);
        assert!(tracker.is_consistent());
    }

    #[test]
    fn shrinking_radius_deactivates_without_movement() {
        let mut arena = AnchorArena::new();
        let anchor = arena.insert(Transform::at(Vec3::new(3.0, 0.0, 0.0)));
        let mut tracker = tracker(5.0);
        tracker.add(1, anchor, 0.0);
        let mut log = Log::new();

        tracker.update(FrameIndex(0), Vec3::ZERO, &arena, &mut recorder(&mut log));
        assert!(tracker.is_active(&1));

        tracker.set_radius(1.0);
        let stats = tracker.update(FrameIndex(1), Vec3::ZERO, &arena, &mut recorder(&mut log));
        assert_eq!(stats.examined, 1);
        assert_eq!(stats.deactivated, 1);
        assert_eq!(log, vec![(1, true), (1, false)]);
        assert!(tracker.active_items().is_empty());

        // Nothing left to report on the next stationary frame.
        tracker.update(FrameIndex(2), Vec3::ZERO, &arena, &mut recorder(&mut log));
        assert_eq!(log.len(), 2);
        assert!(tracker.is_consistent());
    }

    #[test]
    fn per_item_radius_extends_reach() {
        let mut arena = AnchorArena::new();
        let anchor = arena.insert(Transform::at(Vec3::new(8.0, 0.0, 0.0)));
        let mut tracker = tracker(5.0);
        tracker.add(1, anchor, 3.0);
        let mut log = Log::new();

        tracker.update(FrameIndex(0), Vec3::ZERO, &arena, &mut recorder(&mut log));
        assert_eq!(log, vec![(1, true)]);
    }

    #[test]
    fn planar_update_ignores_dropped_axis() {
        let mut arena = AnchorArena::new();
        // Far above the observer, but on top of it in the ground plane.
        let anchor = arena.insert(Transform::at(Vec3::new(1.0, 500.0, 1.0)));
        let config = ProximityConfig::new()
            .with_activation_radius(5.0)
            .with_plane(Plane::Xz);
        let mut tracker = ProximityTracker::new(&config);
        tracker.add(1, anchor, 0.0);
        let mut log = Log::new();

        tracker.update_planar(FrameIndex(0), Vec2::ZERO, &arena, &mut recorder(&mut log));
        assert_eq!(log, vec![(1, true)]);
    }

    #[test]
    fn projected_update_forwards_projection_and_scales_radius() {
        let mut arena = AnchorArena::new();
        let near = arena.insert(Transform::at(Vec3::new(4.0, 0.0, 1.0)));
        let far = arena.insert(Transform::at(Vec3::new(4.0, 0.0, 10.0)));
        // Perspective divide by depth; scale shrinks with depth.
        let camera = |world: Vec3| {
            (world.z > 0.0).then(|| Projection {
                position: Vec2::new(world.x, world.y) / world.z,
                scale: 1.0 / world.z,
            })
        };

        let mut tracker = tracker(5.0);
        tracker.add(1, near, 0.0);
        tracker.add(2, far, 0.0);

        let mut seen = Vec::new();
        let stats = tracker.update_projected(
            FrameIndex(5),
            Vec2::ZERO,
            &arena,
            &camera,
            2.0,
            &mut |item: &u32, active: bool, params: &ActivationParams| {
                seen.push((*item, active, *params))
            },
        );

        // near: distance 4, reach 5 → active. far: distance 0.4, reach 0.5 → active.
        assert_eq!(stats.examined, 2);
        assert_eq!(seen.len(), 2);
        for (_, active, params) in &seen {
            assert!(*active);
            assert_eq!(params.frame, FrameIndex(5));
            assert!(params.projection.is_some());
        }
        // Re-key gaps are scaled by 2: near gap 1 → score 2, far gap 0.1 → 0.2.
        let mut scores: Vec<f32> = tracker.iter().map(|e| e.score).collect();
        scores.sort_by(f32::total_cmp);
        assert!((scores[0] - 0.2).abs() < 1e-5);
        assert!((scores[1] - 2.0).abs() < 1e-5);
    }

    #[test]
    fn unprojectable_anchor_stays_inactive() {
        let mut arena = AnchorArena::new();
        let behind = arena.insert(Transform::at(Vec3::new(0.0, 0.0, -3.0)));
        let camera = |world: Vec3| {
            (world.z > 0.0).then(|| Projection {
                position: Vec2::new(world.x, world.y) / world.z,
                scale: 1.0 / world.z,
            })
        };
        let mut tracker = tracker(5.0);
        tracker.add(1, behind, 0.0);
        let mut log = Log::new();

        let stats = tracker.update_projected(
            FrameIndex(0),
            Vec2::ZERO,
            &arena,
            &camera,
            1.0,
            &mut recorder(&mut log),
        );
        assert_eq!(stats.examined, 1);
        assert!(log.is_empty());
        assert_eq!(tracker.iter().next().map(|e| e.score), Some(128.0));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "no longer alive")]
    fn dead_anchor_is_a_contract_violation() {
        let mut arena = AnchorArena::new();
        let anchor = arena.insert(Transform::at(Vec3::ZERO));
        arena.remove(anchor);

        let mut tracker = tracker(5.0);
        tracker.add(1, anchor, 0.0);
        let mut log = Log::new();
        tracker.update(FrameIndex(0), Vec3::ZERO, &arena, &mut recorder(&mut log));
    }

    #[test]
    fn teleport_rebases_into_range() {
        let mut arena = AnchorArena::new();
        let anchor = arena.insert(Transform::at(Vec3::ZERO));
        let mut tracker = tracker(5.0);
        tracker.add(1, anchor, 0.0);
        let mut log = Log::new();

        tracker.update(FrameIndex(0), Vec3::ZERO, &arena, &mut recorder(&mut log));
        let stats = tracker.update(
            FrameIndex(1),
            Vec3::new(1000.0, 0.0, 0.0),
            &arena,
            &mut recorder(&mut log),
        );

        assert_eq!(stats.rebases, 7);
        assert!(tracker.accumulator() >= 0.0);
        assert!(tracker.accumulator() < tracker.rebase_threshold());
        assert_eq!(stats.examined, 1);
        assert_eq!(log, vec![(1, true), (1, false)]);
    }
}
