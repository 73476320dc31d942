use geo::{BoundingRect, Coord, LineString};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::{
    gcj02,
    geo::{self as earth, LocalProjection},
};

/// A WGS-84 position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Great-circle distance in meters.
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        earth::haversine_distance(
            self.latitude,
            self.longitude,
            other.latitude,
            other.longitude,
        )
    }

    /// The position this coordinate is drawn at on GCJ-02 map tiles.
    pub fn to_gcj02(self) -> Coordinate {
        let (latitude, longitude) = gcj02::wgs84_to_gcj02(self.latitude, self.longitude);
        Coordinate::new(latitude, longitude)
    }

    /// Recovers a WGS-84 position from a point picked on a GCJ-02 map.
    pub fn from_gcj02(display: Coordinate) -> Coordinate {
        let (latitude, longitude) =
            gcj02::gcj02_to_wgs84(display.latitude, display.longitude);
        Coordinate::new(latitude, longitude)
    }

    /// Position within `projection` in meters, `x` pointing east.
    pub fn project(&self, projection: &LocalProjection) -> Coord {
        let (x, y) = projection.project(self.latitude, self.longitude);
        Coord { x, y }
    }

    /// Moves the coordinate by the given amount of meters.
    pub fn offset(self, north_m: f64, east_m: f64) -> Coordinate {
        let (latitude, longitude) =
            earth::offset_by_meters(self.latitude, self.longitude, north_m, east_m);
        Coordinate::new(latitude, longitude)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    pub south_west: Coordinate,
    pub north_east: Coordinate,
}

/// Planar frame centered on `points`, `None` if there are none.
pub fn projection_for(points: &[Coordinate]) -> Option<LocalProjection> {
    LocalProjection::centered(points.iter().map(|p| (p.latitude, p.longitude)))
}

impl BoundingBox {
    /// Smallest box containing all points, `None` for an empty slice.
    pub fn of(points: &[Coordinate]) -> Option<Self> {
        let line: LineString = points
            .iter()
            .map(|p| Coord {
                x: p.longitude,
                y: p.latitude,
            })
            .collect();
        let rect = line.bounding_rect()?;
        Some(Self {
            south_west: Coordinate::new(rect.min().y, rect.min().x),
            north_east: Coordinate::new(rect.max().y, rect.max().x),
        })
    }

    pub fn contains(&self, point: &Coordinate) -> bool {
        (self.south_west.latitude..=self.north_east.latitude).contains(&point.latitude)
            && (self.south_west.longitude..=self.north_east.longitude)
                .contains(&point.longitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounding_box_spans_all_points() {
        let points = [
            Coordinate::new(54.31, 10.14),
            Coordinate::new(54.33, 10.12),
            Coordinate::new(54.32, 10.13),
        ];
        let bbox = BoundingBox::of(&points).unwrap();
        assert_eq!(bbox.south_west, Coordinate::new(54.31, 10.12));
        assert_eq!(bbox.north_east, Coordinate::new(54.33, 10.14));
        assert!(points.iter().all(|p| bbox.contains(p)));
        assert!(!bbox.contains(&Coordinate::new(54.30, 10.13)));
        assert!(BoundingBox::of(&[]).is_none());
    }

    #[test]
    fn display_position_maps_back() {
        // a point picked on a GCJ-02 map of Beijing
        let position = Coordinate::new(39.9087, 116.3975);
        let recovered = Coordinate::from_gcj02(position.to_gcj02());
        assert!(position.to_gcj02().distance_to(&position) > 100.0);
        assert!(recovered.distance_to(&position) < 5.0);
    }

    #[test]
    fn projects_east_and_north() {
        let origin = Coordinate::new(-33.86, 151.21);
        let projection = projection_for(&[origin]).unwrap();
        let point = origin.offset(30.0, -40.0).project(&projection);
        assert!((point.x + 40.0).abs() < 1e-6);
        assert!((point.y - 30.0).abs() < 1e-6);
    }
}
