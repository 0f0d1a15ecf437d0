//! Arc-length table over a flattened curve.
//!
//! Curves are flattened into short chords; the table keeps the cumulative
//! length at each chord vertex so `point_at_length` is a binary search plus a
//! linear interpolation.

use crate::catmull_rom::CubicSegment;
use crate::latlng::Point2;

#[derive(Clone, Debug, PartialEq)]
pub struct ArcTable {
    vertices: Vec<Point2>,
    /// `cumulative[i]` is the arc length from `vertices[0]` to `vertices[i]`.
    cumulative: Vec<f64>,
}

impl ArcTable {
    /// Table over a polyline; lengths are exact.
    pub fn from_polyline(points: &[Point2]) -> Self {
        let mut table = Self {
            vertices: Vec::with_capacity(points.len()),
            cumulative: Vec::with_capacity(points.len()),
        };
        for &p in points {
            table.push(p);
        }
        table
    }

    /// Table over Bezier segments, each flattened into `steps` chords.
    pub fn from_segments(segments: &[CubicSegment], steps: usize) -> Self {
        let steps = steps.max(1);
        let mut table = Self {
            vertices: Vec::with_capacity(segments.len() * steps + 1),
            cumulative: Vec::with_capacity(segments.len() * steps + 1),
        };
        for (i, seg) in segments.iter().enumerate() {
            if i == 0 {
                table.push(seg.start);
            }
            for k in 1..steps {
                table.push(seg.point_at(k as f64 / steps as f64));
            }
            table.push(seg.end);
        }
        table
    }

    fn push(&mut self, p: Point2) {
        let acc = match (self.vertices.last(), self.cumulative.last()) {
            (Some(&prev), Some(&len)) => len + prev.distance(p),
            _ => 0.0,
        };
        self.vertices.push(p);
        self.cumulative.push(acc);
    }

    pub fn total_length(&self) -> f64 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }

    pub fn start(&self) -> Option<Point2> {
        self.vertices.first().copied()
    }

    pub fn end(&self) -> Option<Point2> {
        self.vertices.last().copied()
    }

    /// Point at arc length `s` from the start. `s` is clamped to `[0, total]`.
    pub fn point_at_length(&self, s: f64) -> Option<Point2> {
        let first = self.start()?;
        let total = self.total_length();
        if s.is_nan() || s <= 0.0 || total <= 0.0 {
            return Some(first);
        }
        if s >= total {
            return self.end();
        }

        // First vertex whose cumulative length reaches s; index >= 1 since cumulative[0] == 0 < s.
        let hi = self.cumulative.partition_point(|&c| c < s);
        let lo = hi - 1;
        let span = self.cumulative[hi] - self.cumulative[lo];
        if span <= 0.0 {
            return Some(self.vertices[hi]);
        }
        let t = (s - self.cumulative[lo]) / span;
        Some(self.vertices[lo].lerp(self.vertices[hi], t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn polyline_length_is_exact() {
        let table = ArcTable::from_polyline(&[
            Point2::new(0.0, 0.0),
            Point2::new(3.0, 4.0),
            Point2::new(3.0, 10.0),
        ]);
        assert_eq!(table.total_length(), 11.0);
        let p = table.point_at_length(8.0).unwrap();
        assert_relative_eq!(p.x, 3.0);
        assert_relative_eq!(p.y, 7.0);
    }

    #[test]
    fn clamps_outside_range() {
        let table = ArcTable::from_polyline(&[Point2::new(1.0, 1.0), Point2::new(2.0, 1.0)]);
        assert_eq!(table.point_at_length(-5.0), Some(Point2::new(1.0, 1.0)));
        assert_eq!(table.point_at_length(50.0), Some(Point2::new(2.0, 1.0)));
    }

    #[test]
    fn zero_length_returns_start() {
        let p = Point2::new(4.0, 4.0);
        let table = ArcTable::from_polyline(&[p, p]);
        assert_eq!(table.total_length(), 0.0);
        assert_eq!(table.point_at_length(0.0), Some(p));
    }

    #[test]
    fn flattened_line_segment_matches_chord() {
        let seg = CubicSegment::line(Point2::new(0.0, 0.0), Point2::new(6.0, 8.0));
        let table = ArcTable::from_segments(&[seg], 32);
        assert_relative_eq!(table.total_length(), 10.0, epsilon = 1e-9);
    }

    #[test]
    fn empty_table() {
        let table = ArcTable::from_polyline(&[]);
        assert_eq!(table.total_length(), 0.0);
        assert_eq!(table.point_at_length(1.0), None);
    }
}
