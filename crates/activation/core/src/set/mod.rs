//! Three-tier activation bookkeeping (Sleeping / Awake / Active).
//!
//! # Tiers
//!
//! | Tier | Buffer | Per-update work |
//! |------|--------|-----------------|
//! | `Sleeping` | `sleeping` | none |
//! | `Awake` | `awake` | [`ActivationPolicy::evaluate_awake`] |
//! | `Active` | `awake` + `active` | `evaluate_awake`, then [`ActivationPolicy::update_active`] |
//!
//! `sleeping` and `awake` partition the tracked entities. `active` is the
//! subset of `awake` entities receiving the expensive update; the Awake pass
//! still evaluates them so they can be demoted.
//!
//! Crossing between Sleeping and Awake is driven only by the global update
//! mask (and by [`track`](EntityActivationSet::track) /
//! [`untrack`](EntityActivationSet::untrack) / [`sleep`](EntityActivationSet::sleep)).
//! Crossing between Awake and Active is driven by the policy's verdicts.

mod buffer;
mod policy;
mod status;

use core::fmt;
use std::collections::HashMap;
use std::hash::Hash;

use tracing::{debug, trace};

pub use policy::{ActivationPolicy, FrameContext};
pub use status::{AwakeVerdict, EntityStatus, Tier, UpdateMask};

use buffer::SwapBuffer;

/// Work done by one [`EntityActivationSet::update`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ActivationStats {
    /// Awake entities that were evaluated (including skipped ones).
    pub evaluated: usize,
    pub skipped: usize,
    /// Awake → Active transitions.
    pub promoted: usize,
    /// Active → Awake transitions.
    pub demoted: usize,
    /// Entities that received the expensive update.
    pub updated: usize,
    /// Entities put to sleep by a mask change.
    pub slept: usize,
    /// Entities woken by a mask change.
    pub woken: usize,
    /// Status callbacks that reported an actual change.
    pub status_changes: usize,
}

/// Classifies tracked entities into tiers and drives their per-frame updates.
///
/// # Invariants
///
/// - every tracked entity is in exactly one of `sleeping` / `awake`
/// - `active ⊆ awake` between updates, and every entity in `active` has
///   status [`EntityStatus::RUNNING`]
/// - outside force-sleep, an entity is awake iff its mask intersects the
///   last applied update mask
pub struct EntityActivationSet<T, P> {
    sleeping: SwapBuffer<T>,
    awake: SwapBuffer<T>,
    active: SwapBuffer<T>,
    /// Every tracked entity and the status last applied to it.
    all: HashMap<T, EntityStatus>,
    last_update_mask: UpdateMask,
    force_sleep: bool,
    /// Set by `wake_up` so the next update reclassifies even if the mask is unchanged.
    reclassify: bool,
    policy: P,
}

impl<T, P> EntityActivationSet<T, P>
where
    T: Copy + Eq + Hash + fmt::Debug,
    P: ActivationPolicy<T>,
{
    pub fn new(update_mask: UpdateMask, policy: P) -> Self {
        Self {
            sleeping: SwapBuffer::new(),
            awake: SwapBuffer::new(),
            active: SwapBuffer::new(),
            all: HashMap::new(),
            last_update_mask: update_mask,
            force_sleep: false,
            reclassify: false,
            policy,
        }
    }

    /// Starts tracking `entity`, Awake if its mask matches, Sleeping otherwise.
    ///
    /// Returns `false` (and does nothing) if it is already tracked.
    pub fn track(&mut self, entity: T) -> bool {
        if self.all.contains_key(&entity) {
            return false;
        }

        let status = if !self.force_sleep && self.is_eligible(entity) {
            self.awake.push(entity);
            EntityStatus::AWAKE
        } else {
            self.sleeping.push(entity);
            EntityStatus::SLEEPING
        };
        self.all.insert(entity, status);
        self.policy.set_status(entity, status, true);

        trace!(?entity, tier = %status.tier(), "tracked");
        true
    }

    /// Stops tracking `entity` and forces its status to Sleeping.
    ///
    /// Returns `false` (and does nothing) if it was not tracked.
    pub fn untrack(&mut self, entity: T) -> bool {
        let Some(status) = self.all.remove(&entity) else {
            return false;
        };

        if !self.sleeping.remove(&entity) {
            self.awake.remove(&entity);
            self.active.remove(&entity);
        }
        self.policy
            .set_status(entity, EntityStatus::SLEEPING, true);

        trace!(?entity, from = %status.tier(), "untracked");
        true
    }

    /// Runs one frame: applies a changed mask, then the Awake pass, then the
    /// Active pass. Does nothing while force-sleeping.
    pub fn update(&mut self, update_mask: UpdateMask, ctx: &P::Context) -> ActivationStats {
        let mut stats = ActivationStats::default();
        if self.force_sleep {
            return stats;
        }

        if update_mask != self.last_update_mask || self.reclassify {
            self.last_update_mask = update_mask;
            self.reclassify = false;
            self.apply_mask(&mut stats);
        }

        self.awake_pass(ctx, &mut stats);
        self.active_pass(ctx, &mut stats);
        stats
    }

    /// Forces every tracked entity to Sleeping until [`wake_up`](Self::wake_up).
    pub fn sleep(&mut self) {
        if self.force_sleep {
            return;
        }
        self.force_sleep = true;

        self.active.clear();
        let woken = self.awake.take();
        for &entity in &woken {
            self.sleeping.push(entity);
            self.apply_status(entity, EntityStatus::SLEEPING);
        }

        debug!(slept = woken.len(), "activation set forced to sleep");
    }

    /// Lifts a [`sleep`](Self::sleep). Entities stay asleep until the next
    /// update re-evaluates mask membership.
    pub fn wake_up(&mut self) {
        if !self.force_sleep {
            return;
        }
        self.force_sleep = false;
        self.reclassify = true;
        debug!("activation set woken up");
    }

    /// Moves entities across the Sleeping/Awake boundary after a mask change.
    fn apply_mask(&mut self, stats: &mut ActivationStats) {
        let mut i = 0;
        while i < self.awake.len() {
            let entity = self.awake[i];
            if self.is_eligible(entity) {
                i += 1;
                continue;
            }
            self.awake.swap_remove_at(i);
            self.active.remove(&entity);
            self.sleeping.push(entity);
            if self.apply_status(entity, EntityStatus::SLEEPING) {
                stats.status_changes += 1;
            }
            stats.slept += 1;
        }

        // Entities just put to sleep fail the eligibility check, so they stay.
        let mut i = 0;
        while i < self.sleeping.len() {
            let entity = self.sleeping[i];
            if !self.is_eligible(entity) {
                i += 1;
                continue;
            }
            self.sleeping.swap_remove_at(i);
            self.awake.push(entity);
            if self.apply_status(entity, EntityStatus::AWAKE) {
                stats.status_changes += 1;
            }
            stats.woken += 1;
        }

        debug!(
            mask = self.last_update_mask.bits(),
            slept = stats.slept,
            woken = stats.woken,
            "applied update mask"
        );
    }

    /// Evaluates every Awake entity. Promotions join `active` immediately;
    /// demotions only change status and are swept out by the Active pass.
    fn awake_pass(&mut self, ctx: &P::Context, stats: &mut ActivationStats) {
        for i in 0..self.awake.len() {
            let entity = self.awake[i];
            let running = self.status(entity) == EntityStatus::RUNNING;
            stats.evaluated += 1;

            match self.policy.evaluate_awake(entity, ctx) {
                AwakeVerdict::Skip => stats.skipped += 1,
                AwakeVerdict::Active if !running => {
                    self.active.push(entity);
                    if self.apply_status(entity, EntityStatus::RUNNING) {
                        stats.status_changes += 1;
                    }
                    stats.promoted += 1;
                    trace!(?entity, "promoted to active");
                }
                AwakeVerdict::Inactive if running => {
                    if self.apply_status(entity, EntityStatus::AWAKE) {
                        stats.status_changes += 1;
                    }
                    stats.demoted += 1;
                    trace!(?entity, "demoted to awake");
                }
                AwakeVerdict::Active | AwakeVerdict::Inactive => {}
            }
        }
    }

    /// Sweeps demoted entities out of `active` and updates the rest.
    fn active_pass(&mut self, ctx: &P::Context, stats: &mut ActivationStats) {
        let mut i = 0;
        while i < self.active.len() {
            let entity = self.active[i];
            if self.status(entity) != EntityStatus::RUNNING {
                // The swapped-in entity now sits at `i`; revisit it.
                self.active.swap_remove_at(i);
                continue;
            }
            self.policy.update_active(entity, ctx);
            stats.updated += 1;
            i += 1;
        }
    }

    fn apply_status(&mut self, entity: T, status: EntityStatus) -> bool {
        if let Some(current) = self.all.get_mut(&entity) {
            *current = status;
        }
        self.policy.set_status(entity, status, false)
    }

    #[inline]
    fn is_eligible(&self, entity: T) -> bool {
        self.policy
            .update_mask(entity)
            .intersects(self.last_update_mask)
    }

    #[inline]
    fn status(&self, entity: T) -> EntityStatus {
        self.all.get(&entity).copied().unwrap_or_default()
    }

    /// Tier of `entity`, or `None` if it is not tracked.
    pub fn tier(&self, entity: T) -> Option<Tier> {
        self.all.get(&entity).map(|status| status.tier())
    }

    pub fn contains(&self, entity: T) -> bool {
        self.all.contains_key(&entity)
    }

    pub fn len(&self) -> usize {
        self.all.len()
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }

    pub fn sleeping(&self) -> &[T] {
        self.sleeping.as_slice()
    }

    /// Entities in the Awake buffer, including those also in [`active`](Self::active).
    pub fn awake(&self) -> &[T] {
        self.awake.as_slice()
    }

    pub fn active(&self) -> &[T] {
        self.active.as_slice()
    }

    pub fn is_asleep(&self) -> bool {
        self.force_sleep
    }

    pub fn last_update_mask(&self) -> UpdateMask {
        self.last_update_mask
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    pub fn policy_mut(&mut self) -> &mut P {
        &mut self.policy
    }

    /// Checks the tier invariants, for assertions and tests.
    pub fn is_consistent(&self) -> bool {
        let partitioned = self.sleeping.len() + self.awake.len() == self.all.len()
            && self
                .sleeping
                .as_slice()
                .iter()
                .all(|e| !self.awake.contains(e) && self.status(*e) == EntityStatus::SLEEPING);
        let active_subset = self
            .active
            .as_slice()
            .iter()
            .all(|e| self.awake.contains(e) && self.status(*e) == EntityStatus::RUNNING);
        let masked = self.force_sleep
            || self.awake.as_slice().iter().all(|&e| self.is_eligible(e));

        partitioned && active_subset && masked
    }
}
