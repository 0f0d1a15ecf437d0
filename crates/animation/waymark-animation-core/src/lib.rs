//! Waymark animation core (surface-agnostic)
//!
//! Moves markers along sampled paths, one level at a time:
//! - `entity` / `aggregator`: what a layer tracks and how it is snapshotted.
//! - `budget`: per-level time budgets with the dominant-path correction.
//! - `manager`: the level cycle (`MarkerPathAnimationManager`).
//! - `marker`: the moving-marker run with cooperative cancellation.
//! - `layer`: binds mounted polylines to a `RenderSurface` and a spawner.
//! - `clock` / `ready` / `cancel`: frame pacing, map readiness, cancel tokens.
//!
//! Everything runs on one cooperative thread; futures are `!Send`.

pub mod aggregator;
pub mod budget;
pub mod cancel;
pub mod clock;
pub mod config;
pub mod entity;
pub mod error;
pub mod ids;
pub mod layer;
pub mod manager;
pub mod marker;
pub mod ready;
pub mod surface;

pub use aggregator::EntityAggregator;
pub use budget::LevelBudget;
pub use cancel::CancelToken;
pub use clock::{FrameClock, FrameScheduler};
pub use config::{AnimationConfig, LayerConfig};
pub use entity::{AnimationHandle, AnimationOutcome, EntityDescriptor, EntityKind, PathAnimation};
pub use error::{BootstrapAborted, ConfigError, LayerError, SurfaceError};
pub use ids::{EntityId, IdAllocator, LayerId, MarkerId};
pub use layer::{Layer, PolylineSpec};
pub use manager::MarkerPathAnimationManager;
pub use marker::MovingMarker;
pub use ready::{map_ready, MapReady, ReadySignal};
pub use surface::{
    LineOptions, MarkerOptions, MarkerState, MemorySurface, RenderSurface, SurfaceOp,
};
pub use waymark_geometry::{LatLng, SampledPath};
