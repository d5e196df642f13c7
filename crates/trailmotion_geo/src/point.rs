// SPDX-License-Identifier: MIT OR Apache-2.0
//! Geographic coordinates and spherical formulas.

use geo::{Bearing, Distance, Haversine, Point};
use serde::{Deserialize, Serialize};

/// Mean Earth radius used by the host map's CRS, in meters
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Mean radius `geo`'s haversine measures on
const GEO_MEAN_RADIUS_M: f64 = 6_371_008.8;

/// Meters in a statute mile
pub const METERS_PER_MILE: f64 = 1609.344;

/// A latitude/longitude pair in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees
    pub lat: f64,
    /// Longitude in degrees
    pub lng: f64,
}

impl GeoPoint {
    /// Create a new point
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Linear interpolation in degree space
    pub fn lerp(self, other: GeoPoint, t: f64) -> GeoPoint {
        GeoPoint {
            lat: self.lat + (other.lat - self.lat) * t,
            lng: self.lng + (other.lng - self.lng) * t,
        }
    }

    /// Great-circle distance to another point, in meters
    pub fn distance_to(&self, other: &GeoPoint) -> f64 {
        distance(*self, *other)
    }

    /// Initial bearing towards another point, in degrees
    pub fn bearing_to(&self, other: &GeoPoint) -> f64 {
        bearing(*self, *other)
    }
}

impl From<(f64, f64)> for GeoPoint {
    fn from((lat, lng): (f64, f64)) -> Self {
        Self::new(lat, lng)
    }
}

impl From<[f64; 2]> for GeoPoint {
    fn from([lat, lng]: [f64; 2]) -> Self {
        Self::new(lat, lng)
    }
}

impl From<GeoPoint> for Point<f64> {
    fn from(p: GeoPoint) -> Self {
        Point::new(p.lng, p.lat)
    }
}

impl From<Point<f64>> for GeoPoint {
    fn from(p: Point<f64>) -> Self {
        Self::new(p.y(), p.x())
    }
}

/// Initial compass bearing (forward azimuth) from `from` to `to`.
///
/// The result is in `[0, 360)`, clockwise from north. Identical points
/// yield `0`.
pub fn bearing(from: GeoPoint, to: GeoPoint) -> f64 {
    let deg = Haversine::bearing(Point::from(from), Point::from(to)).rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if deg >= 360.0 {
        0.0
    } else {
        deg
    }
}

/// Haversine great-circle distance between two points, in meters.
///
/// Measured on a sphere of radius [`EARTH_RADIUS_M`].
pub fn distance(a: GeoPoint, b: GeoPoint) -> f64 {
    Haversine::distance(Point::from(a), Point::from(b)) * (EARTH_RADIUS_M / GEO_MEAN_RADIUS_M)
}

/// Sum of consecutive great-circle distances along `points`.
///
/// Returns `0` for fewer than two points.
pub fn cumulative_distance(points: &[GeoPoint]) -> f64 {
    points.windows(2).map(|w| distance(w[0], w[1])).sum()
}

/// Milliseconds needed to travel `points` at `speed_kmh`.
///
/// A zero, negative or non-finite speed yields `0` (an instant animation).
pub fn duration_for_speed(points: &[GeoPoint], speed_kmh: f64) -> f64 {
    meters_to_ms(cumulative_distance(points), speed_kmh)
}

/// Milliseconds needed to cover `meters` at `speed_kmh`
pub(crate) fn meters_to_ms(meters: f64, speed_kmh: f64) -> f64 {
    if !speed_kmh.is_finite() || speed_kmh <= 0.0 {
        return 0.0;
    }
    // km/h -> m/ms is a division by 3600
    meters / (speed_kmh / 3600.0)
}

/// Convert statute miles to meters
pub fn miles_to_meters(miles: f64) -> f64 {
    miles * METERS_PER_MILE
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn test_bearing_cardinal_directions() {
        let origin = GeoPoint::new(0.0, 0.0);
        assert_relative_eq!(bearing(origin, GeoPoint::new(1.0, 0.0)), 0.0, epsilon = 1e-9);
        assert_relative_eq!(bearing(origin, GeoPoint::new(0.0, 1.0)), 90.0, epsilon = 1e-9);
        assert_relative_eq!(bearing(origin, GeoPoint::new(-1.0, 0.0)), 180.0, epsilon = 1e-9);
        assert_relative_eq!(bearing(origin, GeoPoint::new(0.0, -1.0)), 270.0, epsilon = 1e-9);
    }

    #[test]
    fn test_bearing_same_point() {
        let p = GeoPoint::new(47.6, -122.3);
        let b = bearing(p, p);
        assert!(b.is_finite());
        assert_relative_eq!(b, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_distance_one_degree_longitude_at_equator() {
        let d = distance(GeoPoint::new(0.0, 0.0), GeoPoint::new(0.0, 1.0));
        // 2 * pi * R / 360
        assert_relative_eq!(d, 111_194.93, epsilon = 0.1);
    }

    #[test]
    fn test_cumulative_distance_short_paths() {
        assert_eq!(cumulative_distance(&[]), 0.0);
        assert_eq!(cumulative_distance(&[GeoPoint::new(1.0, 1.0)]), 0.0);
    }

    #[test]
    fn test_duration_for_speed() {
        let points = [GeoPoint::new(0.0, 0.0), GeoPoint::new(0.0, 1.0)];
        let meters = cumulative_distance(&points);
        // 36 km/h is 10 m/s
        assert_relative_eq!(duration_for_speed(&points, 36.0), meters * 100.0, epsilon = 1e-6);
        assert_eq!(duration_for_speed(&points, 0.0), 0.0);
        assert_eq!(duration_for_speed(&points, f64::NAN), 0.0);
    }

    #[test]
    fn test_geo_point_conversion_swaps_axes() {
        let p = GeoPoint::new(47.6, -122.3);
        let point: Point<f64> = p.into();
        assert_eq!(point.x(), -122.3);
        assert_eq!(point.y(), 47.6);
        assert_eq!(GeoPoint::from(point), p);
    }

    #[test]
    fn test_distance_uses_host_radius() {
        let d = distance(GeoPoint::new(10.0, 20.0), GeoPoint::new(10.0, 21.0));
        let lat = 10.0f64.to_radians();
        let h = lat.cos() * lat.cos() * (0.5f64.to_radians()).sin().powi(2);
        let expected = 2.0 * EARTH_RADIUS_M * h.sqrt().asin();
        assert_relative_eq!(d, expected, max_relative = 1e-9);
    }

    #[test]
    fn test_miles_to_meters() {
        assert_relative_eq!(miles_to_meters(0.1), 160.9344, epsilon = 1e-9);
    }

    fn coordinate() -> impl Strategy<Value = GeoPoint> {
        (-60.0f64..60.0, -170.0f64..170.0).prop_map(|(lat, lng)| GeoPoint::new(lat, lng))
    }

    proptest! {
        #[test]
        fn prop_bearing_in_range(a in coordinate(), b in coordinate()) {
            let deg = bearing(a, b);
            prop_assert!((0.0..360.0).contains(&deg));
        }

        #[test]
        fn prop_cumulative_distance_is_additive(
            points in proptest::collection::vec(coordinate(), 2..24),
            split in 0usize..24,
        ) {
            let k = split % points.len();
            let whole = cumulative_distance(&points);
            let parts = cumulative_distance(&points[..=k]) + cumulative_distance(&points[k..]);
            prop_assert!((whole - parts).abs() <= 1e-6 * whole.max(1.0));
        }
    }
}
