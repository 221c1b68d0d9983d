//! Spatial primitives: bounding rectangles, distance metrics, and
//! coordinate validation.
//!
//! Distance calculations lean on the `geo` crate; the bounding rectangle is
//! our own because the index needs cheap area/enlargement arithmetic on it.

use crate::error::{GeoRankError, Result};
use geo::{Distance, Euclidean, Geodesic, Haversine, HaversineMeasure, Point};
use serde::{Deserialize, Serialize};

/// Distance metrics for scoring and radius queries.
///
/// - **Haversine**: spherical distance, fast and accurate enough for most
///   lon/lat workloads (default)
/// - **Geodesic**: ellipsoidal distance (Karney 2013), more accurate, slower
/// - **Euclidean**: planar distance on raw lon/lat degrees; acceptable only
///   for small regional extents where the ranking cares about relative
///   rather than absolute distances
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Haversine formula - assumes spherical Earth
    #[default]
    Haversine,
    /// Geodesic distance using Karney (2013)
    Geodesic,
    /// Planar distance on raw coordinates
    Euclidean,
}

/// Calculate the distance between two points using the specified metric.
///
/// Returns meters for the geographic metrics, degrees for `Euclidean`.
///
/// # Examples
///
/// ```rust
/// use georank::{Point, spatial::{distance_between, DistanceMetric}};
///
/// let nyc = Point::new(-74.0060, 40.7128);
/// let la = Point::new(-118.2437, 34.0522);
///
/// let dist = distance_between(&nyc, &la, DistanceMetric::Haversine);
/// assert!(dist > 3_900_000.0); // ~3,944 km
/// ```
pub fn distance_between(point1: &Point, point2: &Point, metric: DistanceMetric) -> f64 {
    match metric {
        DistanceMetric::Haversine => Haversine.distance(*point1, *point2),
        DistanceMetric::Geodesic => Geodesic.distance(*point1, *point2),
        DistanceMetric::Euclidean => Euclidean.distance(*point1, *point2),
    }
}

/// Validate that a point carries finite, in-range geographic coordinates.
///
/// Longitude: [-180.0, 180.0], Latitude: [-90.0, 90.0]
pub fn validate_point(point: &Point) -> Result<()> {
    let (x, y) = (point.x(), point.y());

    if !x.is_finite() {
        return Err(GeoRankError::InvalidInput(format!(
            "longitude must be finite, got: {}",
            x
        )));
    }

    if !y.is_finite() {
        return Err(GeoRankError::InvalidInput(format!(
            "latitude must be finite, got: {}",
            y
        )));
    }

    if !(-180.0..=180.0).contains(&x) {
        return Err(GeoRankError::InvalidInput(format!(
            "longitude out of range [-180.0, 180.0]: {}",
            x
        )));
    }

    if !(-90.0..=90.0).contains(&y) {
        return Err(GeoRankError::InvalidInput(format!(
            "latitude out of range [-90.0, 90.0]: {}",
            y
        )));
    }

    Ok(())
}

/// An axis-aligned bounding rectangle in lon/lat degrees.
///
/// Invariant: `min_lon <= max_lon` and `min_lat <= max_lat` for every
/// rectangle observable outside this crate ([`Rect::empty`] is the one
/// internal exception and absorbs into any union).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl Rect {
    /// Create a rectangle from min/max corners.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if min > max on either axis.
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Result<Self> {
        if min_lon > max_lon {
            return Err(GeoRankError::InvalidInput(format!(
                "min_lon ({}) must be <= max_lon ({})",
                min_lon, max_lon
            )));
        }
        if min_lat > max_lat {
            return Err(GeoRankError::InvalidInput(format!(
                "min_lat ({}) must be <= max_lat ({})",
                min_lat, max_lat
            )));
        }

        Ok(Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        })
    }

    /// The degenerate rectangle covering a single point.
    pub fn from_point(point: Point) -> Self {
        Self {
            min_lon: point.x(),
            min_lat: point.y(),
            max_lon: point.x(),
            max_lat: point.y(),
        }
    }

    /// An inverted rectangle that unions as the identity element.
    pub(crate) fn empty() -> Self {
        Self {
            min_lon: f64::INFINITY,
            min_lat: f64::INFINITY,
            max_lon: f64::NEG_INFINITY,
            max_lat: f64::NEG_INFINITY,
        }
    }

    /// The smallest rectangle enclosing `self` and `other`.
    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            min_lon: self.min_lon.min(other.min_lon),
            min_lat: self.min_lat.min(other.min_lat),
            max_lon: self.max_lon.max(other.max_lon),
            max_lat: self.max_lat.max(other.max_lat),
        }
    }

    /// Grow in place to enclose `other`.
    pub fn expand_to(&mut self, other: &Rect) {
        self.min_lon = self.min_lon.min(other.min_lon);
        self.min_lat = self.min_lat.min(other.min_lat);
        self.max_lon = self.max_lon.max(other.max_lon);
        self.max_lat = self.max_lat.max(other.max_lat);
    }

    /// Grow in place to enclose a point.
    pub fn expand_to_point(&mut self, point: Point) {
        self.min_lon = self.min_lon.min(point.x());
        self.min_lat = self.min_lat.min(point.y());
        self.max_lon = self.max_lon.max(point.x());
        self.max_lat = self.max_lat.max(point.y());
    }

    /// Area in square degrees. Zero for point rectangles.
    pub fn area(&self) -> f64 {
        (self.max_lon - self.min_lon) * (self.max_lat - self.min_lat)
    }

    /// How much area would be added by growing to enclose `other`.
    pub fn enlargement(&self, other: &Rect) -> f64 {
        self.union(other).area() - self.area()
    }

    /// Closed-interval intersection test.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.min_lon <= other.max_lon
            && self.max_lon >= other.min_lon
            && self.min_lat <= other.max_lat
            && self.max_lat >= other.min_lat
    }

    /// Closed-interval containment test for a point.
    pub fn contains_point(&self, point: Point) -> bool {
        point.x() >= self.min_lon
            && point.x() <= self.max_lon
            && point.y() >= self.min_lat
            && point.y() <= self.max_lat
    }

    /// Whether `other` lies entirely inside `self`.
    pub fn contains_rect(&self, other: &Rect) -> bool {
        self.min_lon <= other.min_lon
            && self.min_lat <= other.min_lat
            && self.max_lon >= other.max_lon
            && self.max_lat >= other.max_lat
    }

    /// Center point of the rectangle.
    pub fn center(&self) -> Point {
        Point::new(
            (self.min_lon + self.max_lon) / 2.0,
            (self.min_lat + self.max_lat) / 2.0,
        )
    }
}

/// Compute a lon/lat envelope guaranteed to contain every point within
/// `radius_meters` of `center`.
///
/// Latitude degrees are linear in angular distance. The longitude
/// half-width is the exact extent of the spherical cap,
/// `asin(sin(c) / cos(lat))` for angular radius `c`, which is attained
/// slightly poleward of the center latitude; a plain `c / cos(lat)`
/// under-covers there. A cap that reaches a pole (the ratio hits 1) spans
/// every longitude. The envelope over-approximates; callers filter
/// candidates by exact distance afterwards, so false positives are harmless
/// and false negatives cannot occur.
pub fn radius_envelope(center: &Point, radius_meters: f64) -> Rect {
    let earth_radius = HaversineMeasure::GRS80_MEAN_RADIUS.radius();
    let angular = radius_meters / earth_radius;
    let lat_degrees = angular.to_degrees();

    let lon_degrees = if angular >= std::f64::consts::FRAC_PI_2 {
        180.0
    } else {
        let ratio = angular.sin() / center.y().to_radians().cos();
        if ratio >= 1.0 {
            180.0
        } else {
            ratio.asin().to_degrees()
        }
    };

    Rect {
        min_lon: center.x() - lon_degrees,
        min_lat: center.y() - lat_degrees,
        max_lon: center.x() + lon_degrees,
        max_lat: center.y() + lat_degrees,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_between() {
        let nyc = Point::new(-74.0060, 40.7128);
        let la = Point::new(-118.2437, 34.0522);

        let haversine = distance_between(&nyc, &la, DistanceMetric::Haversine);
        let geodesic = distance_between(&nyc, &la, DistanceMetric::Geodesic);

        assert!(haversine > 3_900_000.0 && haversine < 4_000_000.0);
        assert!(geodesic > 3_900_000.0 && geodesic < 4_000_000.0);
        assert!((haversine - geodesic).abs() < 10_000.0);
    }

    #[test]
    fn test_validate_point() {
        assert!(validate_point(&Point::new(-74.0, 40.7)).is_ok());
        assert!(validate_point(&Point::new(200.0, 40.0)).is_err());
        assert!(validate_point(&Point::new(-74.0, 95.0)).is_err());
        assert!(validate_point(&Point::new(f64::NAN, 0.0)).is_err());
    }

    #[test]
    fn test_rect_invalid_corners() {
        assert!(Rect::new(-73.9, 40.7, -74.0, 40.8).is_err());
        assert!(Rect::new(-74.0, 40.8, -73.9, 40.7).is_err());
        assert!(Rect::new(-74.0, 40.7, -73.9, 40.8).is_ok());
    }

    #[test]
    fn test_rect_union_and_area() {
        let a = Rect::new(0.0, 0.0, 2.0, 2.0).unwrap();
        let b = Rect::new(1.0, 1.0, 4.0, 3.0).unwrap();

        let u = a.union(&b);
        assert_eq!(u, Rect::new(0.0, 0.0, 4.0, 3.0).unwrap());
        assert_eq!(u.area(), 12.0);
        assert_eq!(a.enlargement(&b), 12.0 - 4.0);
    }

    #[test]
    fn test_rect_empty_unions_as_identity() {
        let a = Rect::new(1.0, 2.0, 3.0, 4.0).unwrap();
        assert_eq!(Rect::empty().union(&a), a);
    }

    #[test]
    fn test_rect_intersects() {
        let a = Rect::new(0.0, 0.0, 2.0, 2.0).unwrap();
        let b = Rect::new(1.0, 1.0, 3.0, 3.0).unwrap();
        let c = Rect::new(5.0, 5.0, 6.0, 6.0).unwrap();
        let edge = Rect::new(2.0, 0.0, 4.0, 2.0).unwrap();

        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
        // Shared edges count as intersecting; pruning must not skip them.
        assert!(a.intersects(&edge));
    }

    #[test]
    fn test_rect_contains() {
        let r = Rect::new(-74.0, 40.7, -73.9, 40.8).unwrap();
        assert!(r.contains_point(Point::new(-73.95, 40.75)));
        assert!(r.contains_point(Point::new(-74.0, 40.7)));
        assert!(!r.contains_point(Point::new(-73.85, 40.75)));
        assert!(r.contains_rect(&Rect::from_point(Point::new(-73.95, 40.75))));
    }

    #[test]
    fn test_radius_envelope_contains_circle() {
        let center = Point::new(-74.0, 40.7);
        let envelope = radius_envelope(&center, 1_000.0);

        // Points just inside 1km in the cardinal directions must be covered.
        for (dx, dy) in [(0.0, 0.0089), (0.0, -0.0089), (0.0117, 0.0), (-0.0117, 0.0)] {
            let p = Point::new(center.x() + dx, center.y() + dy);
            let d = distance_between(&center, &p, DistanceMetric::Haversine);
            if d <= 1_000.0 {
                assert!(envelope.contains_point(p), "envelope misses {:?}", p);
            }
        }
    }

    #[test]
    fn test_radius_envelope_covers_high_latitude_boundary() {
        // The widest longitude extent of the cap sits poleward of the
        // center latitude; a cosine correction at the center alone misses
        // this point even though it is inside the radius.
        let center = Point::new(0.0, 80.0);
        let radius = 100_000.0;
        let p = Point::new(5.18198, 80.04011);

        let d = distance_between(&center, &p, DistanceMetric::Haversine);
        assert!(d <= radius, "expected an in-radius point, got {}", d);

        let envelope = radius_envelope(&center, radius);
        assert!(envelope.contains_point(p), "envelope misses {:?}", p);
    }

    #[test]
    fn test_radius_envelope_spans_all_longitudes_near_pole() {
        let envelope = radius_envelope(&Point::new(10.0, 89.5), 100_000.0);
        assert!(envelope.min_lon <= -170.0 && envelope.max_lon >= 190.0);
    }

    #[test]
    fn test_radius_envelope_at_pole_is_finite() {
        let envelope = radius_envelope(&Point::new(0.0, 90.0), 5_000.0);
        assert!(envelope.min_lon.is_finite());
        assert!(envelope.max_lon.is_finite());
    }
}
