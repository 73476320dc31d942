/// Mean earth radius, as used by the haversine formula and the local planar
/// projection.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

fn to_radians(degrees: f64) -> f64 {
    degrees * std::f64::consts::PI / 180.0
}

/// Great-circle distance in meters between two WGS-84 positions given in
/// degrees.
pub fn haversine_distance(
    latitude_1: f64,
    longitude_1: f64,
    latitude_2: f64,
    longitude_2: f64,
) -> f64 {
    let lat1_rad = to_radians(latitude_1);
    let lat2_rad = to_radians(latitude_2);

    let dlat = lat2_rad - lat1_rad;
    let dlon = to_radians(longitude_2 - longitude_1);

    let a = (dlat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (dlon / 2.0).sin().powi(2);
    // clamp guards against rounding pushing `a` slightly above 1.0
    let c = 2.0 * a.sqrt().atan2((1.0 - a).max(0.0).sqrt());

    EARTH_RADIUS_M * c
}

/// Local planar frame in meters, centered on a reference position.
///
/// Uses the equirectangular approximation: longitudes are scaled by the cosine
/// of the reference latitude. Good enough for regions a few kilometers across,
/// which is what a walked territory is.
#[derive(Debug, Clone, Copy)]
pub struct LocalProjection {
    origin_latitude: f64,
    origin_longitude: f64,
    longitude_scale: f64,
}

impl LocalProjection {
    pub fn new(origin_latitude: f64, origin_longitude: f64) -> Self {
        Self {
            origin_latitude,
            origin_longitude,
            longitude_scale: to_radians(origin_latitude).cos(),
        }
    }

    /// Projection centered on the mean of `(latitude, longitude)` pairs.
    ///
    /// Longitudes are averaged relative to the first position, so point sets
    /// straddling the 180th meridian get a center next to them instead of one
    /// on the other side of the globe. `None` for an empty set.
    pub fn centered<I>(positions: I) -> Option<Self>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let mut positions = positions.into_iter();
        let (first_latitude, first_longitude) = positions.next()?;
        let (mut latitude, mut longitude, mut count) = (first_latitude, 0.0, 1.0);
        for (lat, lon) in positions {
            latitude += lat;
            longitude += wrap_longitude(lon - first_longitude);
            count += 1.0;
        }
        Some(Self::new(
            latitude / count,
            wrap_longitude(first_longitude + longitude / count),
        ))
    }

    /// Projects `(latitude, longitude)` in degrees to `(x, y)` in meters.
    pub fn project(&self, latitude: f64, longitude: f64) -> (f64, f64) {
        let x = to_radians(wrap_longitude(longitude - self.origin_longitude))
            * self.longitude_scale
            * EARTH_RADIUS_M;
        let y = to_radians(latitude - self.origin_latitude) * EARTH_RADIUS_M;
        (x, y)
    }

    /// Reference position as `(latitude, longitude)`.
    pub fn origin(&self) -> (f64, f64) {
        (self.origin_latitude, self.origin_longitude)
    }
}

/// Brings a longitude (or a longitude difference) into `[-180, 180]`.
pub fn wrap_longitude(longitude: f64) -> f64 {
    if (-180.0..=180.0).contains(&longitude) {
        longitude
    } else {
        (longitude + 180.0).rem_euclid(360.0) - 180.0
    }
}

/// Offsets a position by the given number of meters to the north and east.
/// Inverse of [`LocalProjection::project`] for a projection centered on the
/// position itself.
pub fn offset_by_meters(
    latitude: f64,
    longitude: f64,
    north_m: f64,
    east_m: f64,
) -> (f64, f64) {
    let dlat = (north_m / EARTH_RADIUS_M).to_degrees();
    let dlon = (east_m / (EARTH_RADIUS_M * to_radians(latitude).cos())).to_degrees();
    (latitude + dlat, longitude + dlon)
}
