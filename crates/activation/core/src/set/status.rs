//! Status flags, masks and verdicts shared by the activation set and its policy.

use bitflags::bitflags;

bitflags! {
    /// Externally visible activation status of one entity.
    ///
    /// Sleeping is the empty set. An entity receiving the expensive update
    /// carries both `AWAKE` and `ACTIVE`.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct EntityStatus: u8 {
        const AWAKE  = 1 << 0;
        const ACTIVE = 1 << 1;
    }
}

impl EntityStatus {
    pub const SLEEPING: Self = Self::empty();
    pub const RUNNING: Self = Self::AWAKE.union(Self::ACTIVE);

    /// Tier this status corresponds to.
    pub fn tier(self) -> Tier {
        if self.contains(Self::RUNNING) {
            Tier::Active
        } else if self.contains(Self::AWAKE) {
            Tier::Awake
        } else {
            Tier::Sleeping
        }
    }
}

bitflags! {
    /// Filter deciding which entities may leave the Sleeping tier.
    ///
    /// Bit meanings belong to the caller; any bit pattern is accepted.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct UpdateMask: u32 {
        const _ = !0;
    }
}

impl UpdateMask {
    #[inline]
    pub const fn bits_of(bits: u32) -> Self {
        Self::from_bits_retain(bits)
    }
}

/// Level of per-frame attention an entity receives.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, strum::Display, strum::EnumIter,
)]
#[strum(serialize_all = "lowercase")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Tier {
    /// Not updated at all.
    Sleeping,
    /// Cheap eligibility check runs each frame.
    Awake,
    /// Expensive per-entity update runs each frame.
    Active,
}

/// Result of the cheap per-frame eligibility check on an Awake entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum AwakeVerdict {
    /// Should not receive the expensive update.
    Inactive,

    /// Should receive the expensive update.
    Active,

    /// Leave the entity as it is this frame.
    ///
    /// Lets costly checks be throttled, e.g. an object far off-screen may
    /// skip several frames before being evaluated again.
    Skip,
}

impl AwakeVerdict {
    /// Returns `true` if this verdict is `Active`.
    #[inline]
    pub fn is_active(self) -> bool {
        matches!(self, AwakeVerdict::Active)
    }

    /// Returns `true` if this verdict is `Skip`.
    #[inline]
    pub fn is_skip(self) -> bool {
        matches!(self, AwakeVerdict::Skip)
    }

    /// Maps a boolean predicate onto `Active` / `Inactive`.
    #[inline]
    pub fn from_active(active: bool) -> Self {
        if active {
            AwakeVerdict::Active
        } else {
            AwakeVerdict::Inactive
        }
    }
}
