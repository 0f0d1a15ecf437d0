//! Catmull-Rom fit with alpha parameterization, expressed as cubic Bezier segments.
//!
//! For a segment `p1 -> p2` with neighbours `p0` and `p3`, let `lij = |pi pj|^alpha`.
//! The Bezier handles are
//!
//! ```text
//! c1 = (p1 * (2 l01^2 + 3 l01 l12 + l12^2) - p0 * l12^2 + p2 * l01^2) / (3 l01 (l01 + l12))
//! c2 = (p2 * (2 l23^2 + 3 l23 l12 + l12^2) + p1 * l23^2 - p3 * l12^2) / (3 l23 (l23 + l12))
//! ```
//!
//! A missing neighbour (first and last segment) collapses the handle onto the
//! segment end, so the curve leaves and enters the path ends without overshoot.
//! Two points produce one straight segment.

use crate::latlng::Point2;

const EPSILON: f64 = 1e-12;

/// One cubic Bezier piece of the fitted curve.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CubicSegment {
    pub start: Point2,
    pub handle1: Point2,
    pub handle2: Point2,
    pub end: Point2,
}

impl CubicSegment {
    /// A straight segment; handles sit on the end points.
    pub fn line(start: Point2, end: Point2) -> Self {
        Self {
            start,
            handle1: start,
            handle2: end,
            end,
        }
    }

    /// B(t) = (1 - t)^3 P0 + 3 (1 - t)^2 t P1 + 3 (1 - t) t^2 P2 + t^3 P3
    pub fn point_at(&self, t: f64) -> Point2 {
        let one_minus_t = 1.0 - t;
        let b0 = one_minus_t.powi(3);
        let b1 = 3.0 * one_minus_t.powi(2) * t;
        let b2 = 3.0 * one_minus_t * t.powi(2);
        let b3 = t.powi(3);
        self.start * b0 + self.handle1 * b1 + self.handle2 * b2 + self.end * b3
    }
}

/// Fit `points` with an alpha Catmull-Rom spline.
pub fn catmull_rom_segments(points: &[Point2], alpha: f64) -> Vec<CubicSegment> {
    match points.len() {
        0 | 1 => Vec::new(),
        2 => vec![CubicSegment::line(points[0], points[1])],
        n => (0..n - 1)
            .map(|i| {
                let p0 = if i > 0 { Some(points[i - 1]) } else { None };
                let p3 = points.get(i + 2).copied();
                segment(p0, points[i], points[i + 1], p3, alpha)
            })
            .collect(),
    }
}

fn segment(
    p0: Option<Point2>,
    p1: Point2,
    p2: Point2,
    p3: Option<Point2>,
    alpha: f64,
) -> CubicSegment {
    let l12_2a = p1.distance_squared(p2).powf(alpha);
    let l12_a = l12_2a.sqrt();

    let handle1 = match p0 {
        Some(p0) => {
            let l01_2a = p0.distance_squared(p1).powf(alpha);
            let l01_a = l01_2a.sqrt();
            if l01_a > EPSILON {
                let a = 2.0 * l01_2a + 3.0 * l01_a * l12_a + l12_2a;
                let n = 3.0 * l01_a * (l01_a + l12_a);
                (p1 * a - p0 * l12_2a + p2 * l01_2a) * (1.0 / n)
            } else {
                p1
            }
        }
        None => p1,
    };

    let handle2 = match p3 {
        Some(p3) => {
            let l23_2a = p2.distance_squared(p3).powf(alpha);
            let l23_a = l23_2a.sqrt();
            if l23_a > EPSILON {
                let b = 2.0 * l23_2a + 3.0 * l23_a * l12_a + l12_2a;
                let m = 3.0 * l23_a * (l23_a + l12_a);
                (p2 * b + p1 * l23_2a - p3 * l12_2a) * (1.0 / m)
            } else {
                p2
            }
        }
        None => p2,
    };

    CubicSegment {
        start: p1,
        handle1,
        handle2,
        end: p2,
    }
}
