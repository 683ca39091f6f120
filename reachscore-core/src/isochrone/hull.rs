//! Reachable-area polygons derived from sampled destinations.

use geo::{ConvexHull, Coord, LineString, MultiPoint, Polygon};

/// The polygon representing "nothing is reachable".
///
/// It has no exterior vertices, so it contains no points and has no
/// bounding rectangle.
pub fn empty_polygon() -> Polygon<f64> {
    Polygon::new(LineString::new(Vec::new()), Vec::new())
}

/// Report whether `polygon` has no exterior vertices.
pub fn is_empty_polygon(polygon: &Polygon<f64>) -> bool {
    polygon.exterior().0.is_empty()
}

/// Smallest convex polygon containing every point.
///
/// An empty point set yields [`empty_polygon`].
pub fn convex_hull(points: Vec<Coord<f64>>) -> Polygon<f64> {
    if points.is_empty() {
        return empty_polygon();
    }
    MultiPoint::from(points).convex_hull()
}
