use model::{coordinate::Coordinate, sample::LocationSample};

use crate::config::CaptureConfig;

/// Drops noisy and near-duplicate fixes before they reach the capture path.
#[derive(Debug, Clone)]
pub struct SampleFilter {
    accuracy_threshold_m: f64,
    distance_threshold_m: f64,
    last_accepted: Option<Coordinate>,
}

impl SampleFilter {
    pub fn new(config: &CaptureConfig) -> Self {
        Self {
            accuracy_threshold_m: config.accuracy_threshold_m,
            distance_threshold_m: config.distance_threshold_m,
            last_accepted: None,
        }
    }

    /// Returns the coordinate to append if the sample passes, `None` if it is
    /// dropped. An accepted sample becomes the new reference for the distance
    /// check.
    pub fn accept(&mut self, sample: &LocationSample) -> Option<Coordinate> {
        // negative accuracy marks an invalid fix, NaN fails the comparison
        if !(0.0..=self.accuracy_threshold_m).contains(&sample.horizontal_accuracy) {
            log::trace!(
                "dropping sample at {}: accuracy {} m",
                sample.timestamp,
                sample.horizontal_accuracy
            );
            return None;
        }

        let coordinate = sample.coordinate();
        if !(coordinate.latitude.is_finite() && coordinate.longitude.is_finite()) {
            log::trace!("dropping sample at {}: no position", sample.timestamp);
            return None;
        }
        if let Some(last) = &self.last_accepted {
            let distance = last.distance_to(&coordinate);
            if distance.is_nan() || distance < self.distance_threshold_m {
                log::trace!(
                    "dropping sample at {}: only {:.2} m from last point",
                    sample.timestamp,
                    distance
                );
                return None;
            }
        }

        self.last_accepted = Some(coordinate);
        Some(coordinate)
    }

    pub fn last_accepted(&self) -> Option<Coordinate> {
        self.last_accepted
    }

    pub fn reset(&mut self) {
        self.last_accepted = None;
    }
}
