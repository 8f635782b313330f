//! Headless soak run of the activation engine.
//!
//! Scatters entities over a square scene, walks an observer around it and
//! logs what the proximity and activation passes did every few hundred
//! frames.
//!
//! # Examples
//!
//! ```bash
//! SIM_ENTITIES=10000 ACTIVATION_RADIUS=25 RUST_LOG=activation_core=debug \
//!     cargo run -p activation-sim --release
//! ```
mod config;
mod scene;

use activation_core::ActivationError;
use activation_runtime::RuntimeConfig;
use anyhow::{Result, bail};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{error, info};

use config::SimConfig;
use scene::{RunTotals, Scene, mask_for, observer_path};

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let runtime_config = RuntimeConfig::from_env().inspect_err(|err| {
        error!(
            code = err.error_code(),
            severity = err.severity().as_str(),
            "rejected runtime configuration: {}",
            err
        );
    })?;
    let sim_config = SimConfig::from_env()?;

    info!("Starting activation simulation");
    info!("Entities: {}", sim_config.entities);
    info!("Frames: {}", sim_config.frames);
    info!("Seed: {}", sim_config.seed);
    info!(
        "Activation radius: {} (rebase every {})",
        runtime_config.proximity.activation_radius, runtime_config.proximity.rebase_threshold
    );

    let mut rng = StdRng::seed_from_u64(sim_config.seed);
    let mut scene = Scene::generate(&sim_config, &runtime_config, &mut rng)?;
    let mut totals = RunTotals::default();

    for frame in 0..sim_config.frames {
        let mask = mask_for(frame, runtime_config.update_mask, sim_config.mask_period);
        scene.driver_mut().set_update_mask(mask);

        let observer = observer_path(frame, sim_config.world_size, sim_config.observer_speed);
        let report = scene.step(observer);
        totals.record(&report);

        if sim_config.churn_every > 0 && frame % sim_config.churn_every == 0 {
            scene.churn(&mut rng)?;
            totals.respawned += 1;
        }

        if (frame + 1) % sim_config.report_every == 0 {
            let driver = scene.driver();
            info!(
                frame = frame + 1,
                in_range = driver.tracker().active_items().len(),
                awake = driver.set().awake().len(),
                active = driver.set().active().len(),
                mask = mask.bits(),
                examined_per_frame = totals.examined_per_frame(),
                rebases = totals.rebases,
                "progress"
            );
        }
    }

    scene.driver().check_consistency().inspect_err(|err| {
        error!(
            code = err.error_code(),
            internal = err.severity().is_internal(),
            "audit failed after {} frames: {}",
            totals.frames,
            err
        );
    })?;
    if !scene.is_consistent() {
        bail!("anchors and tracked items diverged after {} frames", totals.frames);
    }

    let policy = scene.driver().policy().stats();
    info!(
        frames = totals.frames,
        entities = scene.len(),
        activated = totals.activated,
        deactivated = totals.deactivated,
        promoted = totals.promoted,
        demoted = totals.demoted,
        skipped = totals.skipped,
        updated = totals.updated,
        respawned = totals.respawned,
        evaluations = policy.evaluations,
        expensive_updates = policy.updates,
        cache_hits = policy.cache_hits,
        status_changes = policy.status_changes,
        "Simulation finished"
    );
    Ok(())
}
