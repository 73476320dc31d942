//! Area, perimeter and validity of walked polygons.
//!
//! Measurements are taken in a local equirectangular projection centered on
//! the mean of the vertices, which keeps the error well below a percent for
//! territories up to a few square kilometers.

use geo::{
    algorithm::line_intersection::{line_intersection, LineIntersection},
    Area, Coord, Intersects, Line, LineString, Polygon,
};
use itertools::Itertools;
use model::coordinate::{projection_for, Coordinate};

use crate::{config::CaptureConfig, error::InvalidReason};

/// Points closer than this (in m) to the line through the others count as on it.
const COLLINEAR_TOLERANCE_M: f64 = 1e-3;

/// A polygon that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    /// Distinct vertices in walking order, no repeated closing point.
    pub polygon: Vec<Coordinate>,
    pub area_m2: f64,
    pub perimeter_m: f64,
}

impl Measurement {
    /// Rejects loops too short or too small to be worth a territory.
    pub fn check_minimums(self, config: &CaptureConfig) -> Result<Self, InvalidReason> {
        if self.perimeter_m < config.min_path_length_m {
            return Err(InvalidReason::PathTooShort {
                length_m: self.perimeter_m,
                required_m: config.min_path_length_m,
            });
        }
        if self.area_m2 < config.min_area_m2 {
            return Err(InvalidReason::AreaTooSmall {
                area_m2: self.area_m2,
                required_m2: config.min_area_m2,
            });
        }
        Ok(self)
    }
}

/// Drops consecutive duplicates and a last point repeating the first.
pub fn normalize(points: &[Coordinate]) -> Vec<Coordinate> {
    let mut ring: Vec<Coordinate> = points.iter().copied().dedup().collect();
    if ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }
    ring
}

fn project(ring: &[Coordinate]) -> Vec<Coord> {
    let Some(projection) = projection_for(ring) else {
        return Vec::new();
    };
    ring.iter().map(|p| p.project(&projection)).collect()
}

fn planar_area(ring: &[Coord]) -> f64 {
    Polygon::new(LineString::from(ring.to_vec()), vec![]).unsigned_area()
}

/// Enclosed area in m². Orientation and an explicit closing point do not
/// matter. Fewer than 3 distinct points enclose nothing.
pub fn area_m2(points: &[Coordinate]) -> f64 {
    let ring = normalize(points);
    if ring.len() < 3 {
        return 0.0;
    }
    planar_area(&project(&ring))
}

/// Sum of great-circle distances between consecutive points. The closing edge
/// only counts if the first point is repeated at the end.
pub fn perimeter_m(points: &[Coordinate]) -> f64 {
    points
        .iter()
        .tuple_windows()
        .map(|(a, b)| a.distance_to(b))
        .sum()
}

/// First pair of edges `(i, j)` of the closed ring that cross, touch or
/// overlap. Edge `i` runs from vertex `i` to vertex `i + 1`, the last edge
/// closes the ring. Neighbouring edges always share a vertex, so for them
/// only folding back onto each other counts.
///
/// Quadratic in the number of vertices; paths are kept short by the distance
/// filter.
fn find_self_intersection(ring: &[Coord]) -> Option<(usize, usize)> {
    let n = ring.len();
    let edge = |i: usize| Line::new(ring[i], ring[(i + 1) % n]);

    (0..n).tuple_combinations().find(|&(i, j)| {
        let (a, b) = (edge(i), edge(j));
        if j == i + 1 || (i == 0 && j == n - 1) {
            matches!(
                line_intersection(a, b),
                Some(LineIntersection::Collinear { .. })
            )
        } else {
            a.intersects(&b)
        }
    })
}

fn is_collinear(ring: &[Coord]) -> bool {
    let origin = ring[0];
    let length = |p: &Coord| {
        let d = *p - origin;
        d.x.hypot(d.y)
    };
    let Some(far) = ring.iter().copied().max_by(|a, b| length(a).total_cmp(&length(b)))
    else {
        return true;
    };
    let span = length(&far);
    if span <= COLLINEAR_TOLERANCE_M {
        return true;
    }
    let direction = far - origin;
    ring.iter().all(|&p| {
        let offset = p - origin;
        (direction.x * offset.y - direction.y * offset.x).abs() / span <= COLLINEAR_TOLERANCE_M
    })
}

/// Checks that the points describe a simple polygon with a positive area and
/// measures it.
pub fn measure(points: &[Coordinate]) -> Result<Measurement, InvalidReason> {
    let ring = normalize(points);
    if ring.len() < 3 {
        return Err(InvalidReason::TooFewPoints { count: ring.len() });
    }

    let projected = project(&ring);
    if is_collinear(&projected) {
        return Err(InvalidReason::Collinear);
    }
    if let Some((first, second)) = find_self_intersection(&projected) {
        return Err(InvalidReason::SelfIntersecting { first, second });
    }

    let area_m2 = planar_area(&projected);
    if !(area_m2 > 0.0 && area_m2.is_finite()) {
        return Err(InvalidReason::ZeroArea);
    }

    Ok(Measurement {
        perimeter_m: perimeter_m(points),
        polygon: ring,
        area_m2,
    })
}
