// SPDX-License-Identifier: MIT OR Apache-2.0
//! Polyline with a cumulative-distance index.

use crate::point::{distance, meters_to_ms, GeoPoint};
use serde::{Deserialize, Serialize};

/// Result of interpolating along a [`Path`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interpolated {
    /// The interpolated coordinate
    pub point: GeoPoint,
    /// Index of the last path vertex at or before `point`
    pub predecessor: usize,
}

/// An ordered sequence of coordinates.
///
/// Alongside the points the path keeps `prefix[k]`, the distance travelled
/// from the first point to point `k`. Interpolation and the backward
/// boundary search are binary searches over that array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<GeoPoint>", into = "Vec<GeoPoint>")]
pub struct Path {
    points: Vec<GeoPoint>,
    prefix: Vec<f64>,
}

impl Path {
    /// Create a path from its points
    pub fn new(points: Vec<GeoPoint>) -> Self {
        let mut prefix = Vec::with_capacity(points.len());
        let mut total = 0.0;
        for (i, p) in points.iter().enumerate() {
            if i > 0 {
                total += distance(points[i - 1], *p);
            }
            prefix.push(total);
        }
        Self { points, prefix }
    }

    /// Create an empty path
    pub fn empty() -> Self {
        Self::default()
    }

    /// All points
    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    /// Number of points
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the path has no points
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// First point
    pub fn first(&self) -> Option<GeoPoint> {
        self.points.first().copied()
    }

    /// Last point
    pub fn last(&self) -> Option<GeoPoint> {
        self.points.last().copied()
    }

    /// Total length in meters
    pub fn length(&self) -> f64 {
        self.prefix.last().copied().unwrap_or(0.0)
    }

    /// Distance from the first point to point `index`
    pub fn prefix_distance(&self, index: usize) -> Option<f64> {
        self.prefix.get(index).copied()
    }

    /// Milliseconds needed to traverse the whole path at `speed_kmh`
    pub fn duration_for_speed(&self, speed_kmh: f64) -> f64 {
        meters_to_ms(self.length(), speed_kmh)
    }

    /// Append a point
    pub fn push(&mut self, point: GeoPoint) {
        let total = match self.points.last() {
            Some(prev) => self.length() + distance(*prev, point),
            None => 0.0,
        };
        self.points.push(point);
        self.prefix.push(total);
    }

    /// Keep only the first `len` points
    pub fn truncate(&mut self, len: usize) {
        self.points.truncate(len);
        self.prefix.truncate(len);
    }

    /// Remove every point
    pub fn clear(&mut self) {
        self.points.clear();
        self.prefix.clear();
    }

    /// The first `end` points as a new path
    pub fn head(&self, end: usize) -> Path {
        let end = end.min(self.points.len());
        Path {
            points: self.points[..end].to_vec(),
            prefix: self.prefix[..end].to_vec(),
        }
    }

    /// Point at `ratio` of the total length, measured by distance.
    ///
    /// `ratio` is clamped to `[0, 1]`; NaN is treated as `0`. Returns `None`
    /// for an empty path.
    pub fn point_at_ratio(&self, ratio: f64) -> Option<Interpolated> {
        let first = self.first()?;
        let total = self.length();
        if self.points.len() == 1 || total <= 0.0 {
            return Some(Interpolated { point: first, predecessor: 0 });
        }

        let ratio = if ratio.is_nan() { 0.0 } else { ratio.clamp(0.0, 1.0) };
        let target = ratio * total;

        // Last vertex whose prefix is <= target, capped so a leg follows it
        let upper = self.prefix.partition_point(|&d| d <= target);
        let k = upper.saturating_sub(1).min(self.points.len() - 2);

        let leg = self.prefix[k + 1] - self.prefix[k];
        let t = if leg > 0.0 { ((target - self.prefix[k]) / leg).clamp(0.0, 1.0) } else { 0.0 };

        Some(Interpolated {
            point: self.points[k].lerp(self.points[k + 1], t),
            predecessor: k,
        })
    }

    /// Vertices travelled through at `ratio`, ending with the interpolated tip
    pub fn traveled(&self, ratio: f64) -> Vec<GeoPoint> {
        let Some(at) = self.point_at_ratio(ratio) else {
            return Vec::new();
        };
        let mut out = self.points[..=at.predecessor].to_vec();
        if out.last() != Some(&at.point) {
            out.push(at.point);
        }
        out
    }

    /// Largest index `i <= len - 2` whose suffix distance (from point `i` to
    /// the end) is strictly greater than `meters`.
    ///
    /// Returns `None` when the path has fewer than two points or no suffix
    /// is long enough.
    pub fn rewind_boundary(&self, meters: f64) -> Option<usize> {
        if self.points.len() < 2 {
            return None;
        }
        // suffix(i) = total - prefix[i] > meters  <=>  prefix[i] < total - meters
        let threshold = self.length() - meters;
        let count = self.prefix.partition_point(|&d| d < threshold);
        if count == 0 {
            return None;
        }
        Some((count - 1).min(self.points.len() - 2))
    }
}

impl From<Vec<GeoPoint>> for Path {
    fn from(points: Vec<GeoPoint>) -> Self {
        Self::new(points)
    }
}

impl From<Path> for Vec<GeoPoint> {
    fn from(path: Path) -> Self {
        path.points
    }
}

impl FromIterator<GeoPoint> for Path {
    fn from_iter<I: IntoIterator<Item = GeoPoint>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
