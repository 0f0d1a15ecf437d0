//! Waymark geometry core
//!
//! Turns an ordered list of waypoints into a densely sampled path that a
//! rendering surface can draw and a moving marker can follow.
//!
//! - `latlng`: waypoint type and the planar point used for curve math.
//! - `catmull_rom`: alpha-parameterized Catmull-Rom fit as cubic Bezier segments.
//! - `arc_length`: flattened arc table with length and point-at-length queries.
//! - `path_points`: the public generator (`generate_path_points`).

pub mod arc_length;
pub mod catmull_rom;
pub mod config;
pub mod error;
pub mod latlng;
pub mod path_points;

pub use arc_length::ArcTable;
pub use catmull_rom::{catmull_rom_segments, CubicSegment};
pub use config::SamplingConfig;
pub use error::PathError;
pub use latlng::{LatLng, Point2};
pub use path_points::{
    generate_curve_points, generate_path_points, generate_path_points_with, SampledPath,
};

/// Geometry result type
pub type Result<T> = core::result::Result<T, PathError>;
