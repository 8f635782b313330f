//! Simulation parameters read from the environment.
use std::env;
use std::str::FromStr;

use anyhow::{Context, Result, bail};

/// Shape and length of one simulation run.
#[derive(Clone, Debug, PartialEq)]
pub struct SimConfig {
    pub entities: usize,
    pub frames: u32,
    pub seed: u64,
    /// Frames between progress lines.
    pub report_every: u32,
    /// Entities are scattered over a square of this half-extent.
    pub world_size: f32,
    /// Observer travel per frame.
    pub observer_speed: f32,
    /// Frames between update mask flips. Zero disables flipping.
    pub mask_period: u32,
    /// Frames between despawn/respawn of one entity. Zero disables churn.
    pub churn_every: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            entities: 2_000,
            frames: 3_600,
            seed: 42,
            report_every: 600,
            world_size: 500.0,
            observer_speed: 2.0,
            mask_period: 900,
            churn_every: 120,
        }
    }
}

impl SimConfig {
    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `SIM_ENTITIES` - Number of spawned entities (default: 2000)
    /// - `SIM_FRAMES` - Frames to simulate (default: 3600)
    /// - `SIM_SEED` - Scene RNG seed (default: 42)
    /// - `SIM_REPORT_EVERY` - Frames between progress lines (default: 600)
    /// - `SIM_WORLD_SIZE` - Half-extent of the scene (default: 500.0)
    /// - `SIM_OBSERVER_SPEED` - Observer travel per frame (default: 2.0)
    /// - `SIM_MASK_PERIOD` - Frames between update mask flips (default: 900)
    /// - `SIM_CHURN_EVERY` - Frames between entity respawns (default: 120)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(entities) = read_var(&lookup, "SIM_ENTITIES")? {
            config.entities = entities;
        }
        if let Some(frames) = read_var(&lookup, "SIM_FRAMES")? {
            config.frames = frames;
        }
        if let Some(seed) = read_var(&lookup, "SIM_SEED")? {
            config.seed = seed;
        }
        if let Some(report_every) = read_var::<u32, _>(&lookup, "SIM_REPORT_EVERY")? {
            config.report_every = report_every.max(1);
        }
        if let Some(world_size) = read_var(&lookup, "SIM_WORLD_SIZE")? {
            config.world_size = world_size;
        }
        if let Some(speed) = read_var(&lookup, "SIM_OBSERVER_SPEED")? {
            config.observer_speed = speed;
        }
        if let Some(period) = read_var(&lookup, "SIM_MASK_PERIOD")? {
            config.mask_period = period;
        }
        if let Some(churn) = read_var(&lookup, "SIM_CHURN_EVERY")? {
            config.churn_every = churn;
        }

        if !config.world_size.is_finite() || config.world_size <= 0.0 {
            bail!("SIM_WORLD_SIZE must be finite and positive, got {}", config.world_size);
        }
        if !config.observer_speed.is_finite() || config.observer_speed < 0.0 {
            bail!(
                "SIM_OBSERVER_SPEED must be finite and non-negative, got {}",
                config.observer_speed
            );
        }
        Ok(config)
    }
}

fn read_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse()
                .with_context(|| format!("invalid value {:?} for {}", raw, key))
        })
        .transpose()
}
