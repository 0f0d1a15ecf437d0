//! Error types for surfaces, layers and configuration.

use waymark_geometry::PathError;

use crate::ids::{EntityId, MarkerId};

/// Failures reported by a rendering surface.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum SurfaceError {
    #[error("marker {marker:?} is not on layer {layer}")]
    UnknownMarker { layer: String, marker: MarkerId },

    #[error("polyline {entity:?} is not on layer {layer}")]
    UnknownPolyline { layer: String, entity: EntityId },

    #[error("{what} is already on layer {layer}")]
    Duplicate { layer: String, what: String },

    #[error("surface rejected the operation: {reason}")]
    Rejected { reason: String },
}

/// Failures of layer mount/unmount bookkeeping.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum LayerError {
    #[error(transparent)]
    Path(#[from] PathError),

    #[error(transparent)]
    Surface(#[from] SurfaceError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("entity {0:?} is not mounted on this layer")]
    UnknownEntity(EntityId),

    #[error("failed to spawn the animation loop: {0}")]
    Spawn(String),
}

/// Invalid configuration values.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("invalid config: {reason}")]
pub struct ConfigError {
    pub reason: String,
}

impl ConfigError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// The map bootstrap went away without signalling readiness.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("map bootstrap was dropped before it signalled readiness")]
pub struct BootstrapAborted;
