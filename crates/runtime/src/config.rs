//! Runtime configuration and its environment loader.
use std::env;
use std::str::FromStr;

use activation_core::{ConfigError, Plane, ProximityConfig, UpdateMask};

/// Everything a [`FrameDriver`](crate::FrameDriver) needs to start.
#[derive(Clone, Debug, PartialEq)]
pub struct RuntimeConfig {
    pub proximity: ProximityConfig,
    /// Update mask applied from the first frame. Every bit set by default, so
    /// any entity with a non-empty mask starts Awake.
    pub update_mask: UpdateMask,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            proximity: ProximityConfig::default(),
            update_mask: UpdateMask::all(),
        }
    }
}

impl RuntimeConfig {
    pub const fn new(proximity: ProximityConfig, update_mask: UpdateMask) -> Self {
        Self {
            proximity,
            update_mask,
        }
    }

    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `ACTIVATION_RADIUS` - Global activation radius (default: 5.0)
    /// - `REBASE_THRESHOLD` - Travel distance between rebases (default: 128.0)
    /// - `ACTIVATION_PLANE` - `xy` or `xz` for planar updates (default: xy)
    /// - `UPDATE_MASK` - Initial update mask, decimal or `0x` hex (default: all bits)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a caller-supplied lookup.
    ///
    /// Unset keys keep their defaults; set but unparsable keys are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(radius) = read_var::<f32, _>(&lookup, "ACTIVATION_RADIUS")? {
            config.proximity.activation_radius = radius;
        }
        if let Some(threshold) = read_var::<f32, _>(&lookup, "REBASE_THRESHOLD")? {
            config.proximity.rebase_threshold = threshold;
        }
        if let Some(plane) = read_var::<Plane, _>(&lookup, "ACTIVATION_PLANE")? {
            config.proximity.plane = plane;
        }
        if let Some(raw) = lookup("UPDATE_MASK") {
            let bits = parse_mask(&raw).ok_or(ConfigError::InvalidEnv {
                key: "UPDATE_MASK",
                value: raw,
            })?;
            config.update_mask = UpdateMask::bits_of(bits);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.proximity.validate()
    }
}

fn read_var<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    raw.trim()
        .parse()
        .map(Some)
        .map_err(|_| ConfigError::InvalidEnv { key, value: raw })
}

fn parse_mask(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => raw.parse().ok(),
    }
}
