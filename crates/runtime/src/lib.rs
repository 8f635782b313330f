//! Frame-stepped orchestration of the activation engine.
//!
//! [`FrameDriver`] owns a [`ProximityTracker`](activation_core::ProximityTracker)
//! and an [`EntityActivationSet`](activation_core::EntityActivationSet) and runs
//! them in a fixed order every frame:
//!
//! 1. the proximity pass re-examines due items; activations `track` the item in
//!    the set and deactivations `untrack` it
//! 2. the activation pass applies the update mask, evaluates Awake entities and
//!    runs the expensive update on Active ones
//!
//! [`RuntimeConfig`] gathers the tuning values both passes need and can be
//! loaded from the process environment.
pub mod config;
pub mod driver;
pub mod error;

pub use config::RuntimeConfig;
pub use driver::{FrameDriver, FrameReport};
pub use error::{Result, RuntimeError};
