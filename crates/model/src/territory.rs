use chrono::{DateTime, Utc};
use geo::{Contains, EuclideanDistance, LineString, Point, Polygon};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::{
    geo::{wrap_longitude, LocalProjection},
    id::{HasId, Id},
};
use uuid::Uuid;

use crate::{
    coordinate::{projection_for, BoundingBox, Coordinate},
    player::Player,
    ExampleData,
};

/// Outcome of a successful capture, not yet named or persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TerritoryDraft {
    pub owner_id: Id<Player>,
    /// Vertices in walking order, WGS-84, without a repeated closing point.
    pub polygon: Vec<Coordinate>,
    pub area_m2: f64,
    pub perimeter_m: f64,
    pub point_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Territory {
    pub owner_id: Id<Player>,
    pub name: String,
    pub polygon: Vec<Coordinate>,
    pub area_m2: f64,
    pub perimeter_m: f64,
    pub point_count: usize,
    pub created_at: DateTime<Utc>,
}

impl HasId for Territory {
    type IdType = Uuid;
}

impl Territory {
    pub fn from_draft(draft: TerritoryDraft, name: String, created_at: DateTime<Utc>) -> Self {
        Self {
            owner_id: draft.owner_id,
            name,
            polygon: draft.polygon,
            area_m2: draft.area_m2,
            perimeter_m: draft.perimeter_m,
            point_count: draft.point_count,
            created_at,
        }
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::of(&self.polygon)
    }

    /// Mean of the vertices, also across the 180th meridian.
    pub fn center(&self) -> Option<Coordinate> {
        let (latitude, longitude) = projection_for(&self.polygon)?.origin();
        Some(Coordinate::new(latitude, wrap_longitude(longitude)))
    }

    /// The polygon in meters around its own center.
    fn local_polygon(&self) -> Option<(LocalProjection, Polygon)> {
        let projection = projection_for(&self.polygon)?;
        let ring: LineString = self
            .polygon
            .iter()
            .map(|p| p.project(&projection))
            .collect();
        Some((projection, Polygon::new(ring, vec![])))
    }

    /// Whether `point` lies strictly inside the polygon.
    pub fn contains(&self, point: &Coordinate) -> bool {
        if self.polygon.len() < 3 {
            return false;
        }
        match self.local_polygon() {
            Some((projection, polygon)) => {
                polygon.contains(&Point::from(point.project(&projection)))
            }
            None => false,
        }
    }

    /// Distance in meters from `point` to the territory, zero inside it.
    pub fn distance_to(&self, point: &Coordinate) -> Option<f64> {
        let (projection, polygon) = self.local_polygon()?;
        Some(Point::from(point.project(&projection)).euclidean_distance(&polygon))
    }
}

impl ExampleData for Territory {
    fn example_data() -> Self {
        // a roughly 100 m x 100 m block next to Kiel Hbf
        let origin = Coordinate::new(54.3150, 10.1320);
        Territory {
            owner_id: Id::from("player-1"),
            name: "Bahnhofsvorplatz".to_owned(),
            polygon: vec![
                origin,
                origin.offset(0.0, 100.0),
                origin.offset(100.0, 100.0),
                origin.offset(100.0, 0.0),
            ],
            area_m2: 10_000.0,
            perimeter_m: 300.0,
            point_count: 4,
            created_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_points_inside_only() {
        let territory = Territory::example_data();
        let origin = territory.polygon[0];
        assert!(territory.contains(&origin.offset(50.0, 50.0)));
        assert!(territory.contains(&origin.offset(5.0, 95.0)));
        assert!(!territory.contains(&origin.offset(-5.0, 50.0)));
        assert!(!territory.contains(&origin.offset(50.0, 150.0)));
    }

    #[test]
    fn contains_respects_concave_shapes() {
        // U-shape: the notch between the arms is outside
        let o = Coordinate::new(48.0, 11.0);
        let territory = Territory {
            polygon: vec![
                o,
                o.offset(0.0, 90.0),
                o.offset(90.0, 90.0),
                o.offset(90.0, 60.0),
                o.offset(30.0, 60.0),
                o.offset(30.0, 30.0),
                o.offset(90.0, 30.0),
                o.offset(90.0, 0.0),
            ],
            ..Territory::example_data()
        };
        assert!(!territory.contains(&o.offset(60.0, 45.0)));
        assert!(territory.contains(&o.offset(60.0, 15.0)));
        assert!(territory.contains(&o.offset(15.0, 45.0)));
    }

    #[test]
    fn center_is_mean_of_vertices() {
        let territory = Territory::example_data();
        let center = territory.center().unwrap();
        let expected = territory.polygon[0].offset(50.0, 50.0);
        assert!(center.distance_to(&expected) < 0.5);
    }

    #[test]
    fn works_across_the_antimeridian() {
        let origin = Coordinate::new(-16.5, 179.9998);
        let territory = Territory {
            polygon: [
                origin,
                origin.offset(0.0, 100.0),
                origin.offset(100.0, 100.0),
                origin.offset(100.0, 0.0),
            ]
            .into_iter()
            .map(|p| Coordinate::new(p.latitude, wrap_longitude(p.longitude)))
            .collect(),
            ..Territory::example_data()
        };
        let inside = origin.offset(50.0, 50.0);
        let inside = Coordinate::new(inside.latitude, wrap_longitude(inside.longitude));
        assert!(inside.longitude < 0.0);
        assert!(territory.contains(&inside));
        assert!(!territory.contains(&Coordinate::new(-16.49955, 0.0)));
        let center = territory.center().unwrap();
        assert!(center.distance_to(&inside) < 1.0, "center = {center:?}");
    }

    #[test]
    fn distance_is_zero_inside() {
        let territory = Territory::example_data();
        let origin = territory.polygon[0];
        assert_eq!(territory.distance_to(&origin.offset(50.0, 50.0)), Some(0.0));
        let distance = territory.distance_to(&origin.offset(50.0, 130.0)).unwrap();
        assert!((distance - 30.0).abs() < 0.5, "distance = {distance}");
    }

    #[test]
    fn empty_polygon_contains_nothing() {
        let territory = Territory {
            polygon: vec![],
            ..Territory::example_data()
        };
        assert!(!territory.contains(&Coordinate::new(0.0, 0.0)));
        assert!(territory.center().is_none());
        assert!(territory.distance_to(&Coordinate::new(0.0, 0.0)).is_none());
    }
}
