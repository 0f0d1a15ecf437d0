//! Error types for path generation

/// Errors raised while turning waypoints into a sampled path.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum PathError {
    /// Fewer than two waypoints were supplied
    #[error("a path needs at least 2 waypoints, got {count}")]
    TooFewWaypoints { count: usize },

    /// A waypoint carries NaN or an infinite coordinate
    #[error("waypoint {index} has a non-finite coordinate")]
    NonFiniteWaypoint { index: usize },

    /// The fitted curve is too long to measure in f64
    #[error("path length is not finite")]
    NonFiniteLength,

    /// Sampling configuration is unusable
    #[error("invalid sampling config: {reason}")]
    InvalidConfig { reason: String },
}
