//! Proximity-driven activation bookkeeping shared by runtimes and tools.
//!
//! `activation-core` decides which tracked objects deserve per-frame work and
//! keeps that decision consistent while the underlying structures reorder:
//!
//! - [`ProximityTracker`] wraps a lazy [`DistanceHeap`] keyed by an
//!   accumulated travel budget and only re-examines items that could have
//!   crossed their activation boundary since they were last measured.
//! - [`EntityActivationSet`] sorts entities into Sleeping / Awake / Active
//!   tiers from a global update mask and runs the expensive per-entity update
//!   on the Active tier only.
//!
//! Both structures are single-threaded and frame-stepped. Callers own entity
//! lifetimes and transforms; the engine only holds opaque handles.
pub mod anchor;
pub mod cache;
pub mod config;
pub mod error;
pub mod heap;
pub mod set;
pub mod tracker;

pub use anchor::{AnchorArena, AnchorId, AnchorSource, Transform};
pub use cache::{FrameIndex, TransformCache};
pub use config::{Plane, ProximityConfig};
pub use error::{ActivationError, ConfigError, ErrorSeverity};
pub use heap::{DistanceHeap, ScoredItem};
pub use set::{
    ActivationPolicy, ActivationStats, AwakeVerdict, EntityActivationSet, EntityStatus,
    FrameContext, Tier, UpdateMask,
};
pub use tracker::{
    ActivationListener, ActivationParams, PlaneProjection, Projection, ProximityStats,
    ProximityTracker,
};
