//! Waypoints -> sampled path.
//!
//! Straight paths run through the waypoints as a polyline. Curved paths are
//! fit with an alpha Catmull-Rom spline; a two-waypoint curved path first gets
//! two synthetic control points so it bows instead of degenerating to a line.
//! Samples are spaced at equal arc length along whichever curve was built.

use serde::{Deserialize, Serialize};

use crate::arc_length::ArcTable;
use crate::catmull_rom::catmull_rom_segments;
use crate::config::SamplingConfig;
use crate::error::PathError;
use crate::latlng::{LatLng, Point2};

/// Output of the generator: points to draw/follow plus the curve length.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SampledPath {
    pub path: Vec<LatLng>,
    /// Arc length in coordinate units (not meters).
    pub length: f64,
}

impl SampledPath {
    pub fn len(&self) -> usize {
        self.path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }
}

/// Sample a path through `waypoints` with the default [`SamplingConfig`].
///
/// `explicit_count` of `None` or `Some(0)` lets the generator pick the count:
/// `max(min_samples, ceil(length * density))` when curved, `straight_samples` otherwise.
pub fn generate_path_points(
    waypoints: &[LatLng],
    curved: bool,
    explicit_count: Option<usize>,
) -> Result<SampledPath, PathError> {
    generate_path_points_with(&SamplingConfig::default(), waypoints, curved, explicit_count)
}

/// Always-curved variant with a derived sample count; this is what polylines draw.
pub fn generate_curve_points(waypoints: &[LatLng]) -> Result<SampledPath, PathError> {
    generate_path_points(waypoints, true, None)
}

pub fn generate_path_points_with(
    cfg: &SamplingConfig,
    waypoints: &[LatLng],
    curved: bool,
    explicit_count: Option<usize>,
) -> Result<SampledPath, PathError> {
    cfg.validate()?;
    if waypoints.len() < 2 {
        return Err(PathError::TooFewWaypoints {
            count: waypoints.len(),
        });
    }
    if let Some(index) = waypoints.iter().position(|w| !w.is_finite()) {
        return Err(PathError::NonFiniteWaypoint { index });
    }

    let mut control: Vec<Point2> = waypoints.iter().copied().map(Point2::from).collect();
    let table = if curved {
        if control.len() == 2 {
            if let Some(mid) = bulge_points(cfg, control[0], control[1]) {
                control.splice(1..1, mid);
            }
        }
        ArcTable::from_segments(
            &catmull_rom_segments(&control, cfg.alpha),
            cfg.flatten_steps,
        )
    } else {
        ArcTable::from_polyline(&control)
    };

    let length = table.total_length();
    if !length.is_finite() {
        return Err(PathError::NonFiniteLength);
    }
    let count = sample_count(cfg, curved, length, explicit_count);
    let interval = if count > 1 {
        length / (count - 1) as f64
    } else {
        0.0
    };

    let start = control[0];
    let last = count - 1;
    let path = (0..count)
        .map(|d| {
            let p = if d > 0 && d == last {
                table.end()
            } else {
                table.point_at_length(d as f64 * interval)
            };
            LatLng::from(p.unwrap_or(start))
        })
        .collect::<Vec<_>>();

    log::trace!(
        "sampled {} points (curved: {}) over length {:.6}",
        path.len(),
        curved,
        length
    );

    Ok(SampledPath { path, length })
}

fn sample_count(
    cfg: &SamplingConfig,
    curved: bool,
    length: f64,
    explicit_count: Option<usize>,
) -> usize {
    match explicit_count.filter(|&n| n > 0) {
        Some(n) => n,
        None if curved => ((length * cfg.density).ceil() as usize)
            .clamp(cfg.min_samples, cfg.max_samples),
        None => cfg.straight_samples,
    }
}

/// Two control points at 1/3 and 2/3 of `a -> b`, both pushed sideways by the same offset.
///
/// With `dlat`/`dlon` the segment deltas and `c` its length, the offset is
/// `(dlon / (bulge_divisor * c)) * (-dlon * dlat, dlon^2)` in (longitude,
/// latitude) terms: the perpendicular of the segment scaled by the cosine of
/// its slope, always leaning toward increasing latitude. The cosine factor is
/// floored at `min_bulge_factor` so north-south segments still bow.
fn bulge_points(cfg: &SamplingConfig, a: Point2, b: Point2) -> Option<[Point2; 2]> {
    let dlat = b.x - a.x;
    let dlon = b.y - a.y;
    let c = (dlat * dlat + dlon * dlon).sqrt();
    if c <= f64::EPSILON {
        return None;
    }

    let side = if dlon < 0.0 { -1.0 } else { 1.0 };
    let factor = (dlon.abs() / c).max(cfg.min_bulge_factor);
    let magnitude = factor * c / cfg.bulge_divisor;
    let offset = Point2::new(side * dlon / c * magnitude, -side * dlat / c * magnitude);

    let delta = b - a;
    Some([
        a + delta * (1.0 / 3.0) + offset,
        a + delta * (2.0 / 3.0) + offset,
    ])
}
