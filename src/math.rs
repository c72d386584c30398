//! Geometric helpers shared by the crossing logic and the search heuristics.

use cgmath::prelude::*;
use cgmath::{Point2, Vector2};

/// A 2D point
pub type Point2d = Point2<f64>;

/// A 2D vector
pub type Vector2d = Vector2<f64>;

/// Mean radius of the earth.
const EARTH_MEAN_RADIUS: f64 = 6_371_000.0; // m

/// A geographic position in degrees.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Coordinate {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
}

impl Coordinate {
    /// Creates a coordinate from a latitude and longitude in degrees.
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Computes the great-circle distance between two coordinates in m.
pub fn haversine_distance(from: Coordinate, to: Coordinate) -> f64 {
    let lat1 = from.lat.to_radians();
    let lat2 = to.lat.to_radians();
    let dlat = (to.lat - from.lat).to_radians();
    let dlon = (to.lon - from.lon).to_radians();
    let h = (0.5 * dlat).sin().powi(2) + lat1.cos() * lat2.cos() * (0.5 * dlon).sin().powi(2);
    2.0 * EARTH_MEAN_RADIUS * h.sqrt().asin()
}

/// Turn direction of a curve through three points.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CurveDirection {
    Left,
    Right,
    Collinear,
}

/// Determines whether the curve from `p` through `q` to `r` turns left,
/// turns right, or stays on one line.
pub fn curve_direction(p: Point2d, q: Point2d, r: Point2d) -> CurveDirection {
    let cross = (q - p).perp_dot(r - p);
    if cross > 0.0 {
        CurveDirection::Left
    } else if cross < 0.0 {
        CurveDirection::Right
    } else {
        CurveDirection::Collinear
    }
}

/// Angle of `v` measured from the reference vector `zero`, ascending in
/// clockwise direction if `clockwise` is true, counter-clockwise otherwise.
///
/// Sorting a set of vectors by this key arranges them angularly around their
/// common origin, which is how junctions order their edges for crossing-index
/// assignment.
pub fn clockwise_angle(zero: Vector2d, v: Vector2d, clockwise: bool) -> f64 {
    let flip = if clockwise {
        CurveDirection::Left
    } else {
        CurveDirection::Right
    };
    let cos = zero.dot(v) / (zero.magnitude() * v.magnitude());
    let alpha = cos.clamp(-1.0, 1.0).acos();
    let origin = Point2d::new(0.0, 0.0);
    if curve_direction(origin, origin + zero, origin + zero + v) == flip {
        2.0 * std::f64::consts::PI - alpha
    } else {
        alpha
    }
}
