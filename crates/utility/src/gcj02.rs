//! Conversion between WGS-84 (what the GPS reports) and GCJ-02, the offset
//! datum map tiles of mainland China are drawn in.
//!
//! Only display code should ever see GCJ-02 coordinates; everything that is
//! stored or measured stays in WGS-84.

use std::f64::consts::PI;

/// Semi-major axis of the Krasovsky 1940 ellipsoid.
const SEMI_MAJOR_AXIS: f64 = 6_378_245.0;
/// First eccentricity squared of the Krasovsky 1940 ellipsoid.
const ECCENTRICITY_SQ: f64 = 0.006_693_421_622_965_943;

/// Positions outside this box are not shifted by GCJ-02.
pub fn out_of_china(latitude: f64, longitude: f64) -> bool {
    !(72.004..=137.8347).contains(&longitude) || !(0.8293..=55.8271).contains(&latitude)
}

fn transform_latitude(x: f64, y: f64) -> f64 {
    let mut ret =
        -100.0 + 2.0 * x + 3.0 * y + 0.2 * y * y + 0.1 * x * y + 0.2 * x.abs().sqrt();
    ret += (20.0 * (6.0 * x * PI).sin() + 20.0 * (2.0 * x * PI).sin()) * 2.0 / 3.0;
    ret += (20.0 * (y * PI).sin() + 40.0 * (y / 3.0 * PI).sin()) * 2.0 / 3.0;
    ret += (160.0 * (y / 12.0 * PI).sin() + 320.0 * (y * PI / 30.0).sin()) * 2.0 / 3.0;
    ret
}

fn transform_longitude(x: f64, y: f64) -> f64 {
    let mut ret = 300.0 + x + 2.0 * y + 0.1 * x * x + 0.1 * x * y + 0.1 * x.abs().sqrt();
    ret += (20.0 * (6.0 * x * PI).sin() + 20.0 * (2.0 * x * PI).sin()) * 2.0 / 3.0;
    ret += (20.0 * (x * PI).sin() + 40.0 * (x / 3.0 * PI).sin()) * 2.0 / 3.0;
    ret += (150.0 * (x / 12.0 * PI).sin() + 300.0 * (x / 30.0 * PI).sin()) * 2.0 / 3.0;
    ret
}

/// The `(dlat, dlon)` offset GCJ-02 applies at the given position.
fn delta(latitude: f64, longitude: f64) -> (f64, f64) {
    let dlat = transform_latitude(longitude - 105.0, latitude - 35.0);
    let dlon = transform_longitude(longitude - 105.0, latitude - 35.0);

    let rad_lat = latitude / 180.0 * PI;
    let magic = 1.0 - ECCENTRICITY_SQ * rad_lat.sin().powi(2);
    let sqrt_magic = magic.sqrt();

    let dlat = (dlat * 180.0)
        / ((SEMI_MAJOR_AXIS * (1.0 - ECCENTRICITY_SQ)) / (magic * sqrt_magic) * PI);
    let dlon = (dlon * 180.0) / (SEMI_MAJOR_AXIS / sqrt_magic * rad_lat.cos() * PI);
    (dlat, dlon)
}

/// Converts a WGS-84 position to GCJ-02. Returns `(latitude, longitude)`.
///
/// Never fails: positions outside mainland China are returned unchanged and
/// nonsensical input produces a nonsensical (but deterministic) result.
pub fn wgs84_to_gcj02(latitude: f64, longitude: f64) -> (f64, f64) {
    if out_of_china(latitude, longitude) {
        return (latitude, longitude);
    }
    let (dlat, dlon) = delta(latitude, longitude);
    (latitude + dlat, longitude + dlon)
}

/// Approximate inverse of [`wgs84_to_gcj02`], accurate to a couple of meters.
pub fn gcj02_to_wgs84(latitude: f64, longitude: f64) -> (f64, f64) {
    if out_of_china(latitude, longitude) {
        return (latitude, longitude);
    }
    let (dlat, dlon) = delta(latitude, longitude);
    (latitude - dlat, longitude - dlon)
}
