use glam::{Vec2, Vec3};

use crate::error::ConfigError;

/// Tuning parameters for a [`ProximityTracker`](crate::ProximityTracker).
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProximityConfig {
    /// Global radius added to every item's own radius.
    pub activation_radius: f32,

    /// Travel distance after which all scores and the accumulator are shifted
    /// back toward zero. Bounds score growth over long sessions.
    pub rebase_threshold: f32,

    /// Plane used by the planar update variant.
    pub plane: Plane,
}

impl ProximityConfig {
    pub const DEFAULT_ACTIVATION_RADIUS: f32 = 5.0;
    pub const DEFAULT_REBASE_THRESHOLD: f32 = 128.0;

    pub fn new() -> Self {
        Self {
            activation_radius: Self::DEFAULT_ACTIVATION_RADIUS,
            rebase_threshold: Self::DEFAULT_REBASE_THRESHOLD,
            plane: Plane::default(),
        }
    }

    pub fn with_activation_radius(mut self, activation_radius: f32) -> Self {
        self.activation_radius = activation_radius;
        self
    }

    pub fn with_rebase_threshold(mut self, rebase_threshold: f32) -> Self {
        self.rebase_threshold = rebase_threshold;
        self
    }

    pub fn with_plane(mut self, plane: Plane) -> Self {
        self.plane = plane;
        self
    }

    /// Rejects radii and thresholds the tracker cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.activation_radius.is_finite() || self.activation_radius < 0.0 {
            return Err(ConfigError::InvalidActivationRadius(self.activation_radius));
        }
        if !self.rebase_threshold.is_finite() || self.rebase_threshold <= 0.0 {
            return Err(ConfigError::InvalidRebaseThreshold(self.rebase_threshold));
        }
        Ok(())
    }
}

impl Default for ProximityConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Plane the planar update measures distances in. The remaining axis is ignored.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Plane {
    /// Drops `z`.
    #[default]
    Xy,
    /// Drops `y` (ground plane of a y-up world).
    Xz,
}

impl Plane {
    /// Projects a world position onto this plane.
    #[inline]
    pub fn flatten(self, position: Vec3) -> Vec2 {
        match self {
            Plane::Xy => Vec2::new(position.x, position.y),
            Plane::Xz => Vec2::new(position.x, position.z),
        }
    }

    /// Inverse of [`flatten`](Self::flatten) with the dropped axis at zero.
    #[inline]
    pub fn lift(self, position: Vec2) -> Vec3 {
        match self {
            Plane::Xy => Vec3::new(position.x, position.y, 0.0),
            Plane::Xz => Vec3::new(position.x, 0.0, position.y),
        }
    }
}
