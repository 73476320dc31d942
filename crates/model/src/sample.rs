use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{coordinate::Coordinate, ExampleData};

/// A single fix as delivered by the device's location service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LocationSample {
    pub timestamp: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    /// Radius of uncertainty in meters. Negative values mark an invalid fix.
    pub horizontal_accuracy: f64,
}

impl LocationSample {
    pub fn new(
        timestamp: DateTime<Utc>,
        coordinate: Coordinate,
        horizontal_accuracy: f64,
    ) -> Self {
        Self {
            timestamp,
            latitude: coordinate.latitude,
            longitude: coordinate.longitude,
            horizontal_accuracy,
        }
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

impl ExampleData for LocationSample {
    fn example_data() -> Self {
        LocationSample {
            timestamp: DateTime::<Utc>::UNIX_EPOCH,
            latitude: 54.3233,
            longitude: 10.1228,
            horizontal_accuracy: 5.0,
        }
    }
}
