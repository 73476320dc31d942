use std::{env, str::FromStr};

use serde::{Deserialize, Serialize};

/// Tuning knobs of the capture pipeline. All distances in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CaptureConfig {
    /// Fixes with a larger uncertainty radius are dropped.
    pub accuracy_threshold_m: f64,
    /// Minimum distance to the last accepted fix.
    pub distance_threshold_m: f64,
    /// Minimum path length before closure is offered.
    pub min_closure_points: usize,
    /// How close the walker has to come back to the start for the loop to count
    /// as closed.
    pub closure_radius_m: f64,
    /// Shortest walk that can be committed.
    pub min_path_length_m: f64,
    /// Smallest area a territory may enclose, in m².
    pub min_area_m2: f64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            accuracy_threshold_m: 20.0,
            distance_threshold_m: 1.0,
            min_closure_points: 5,
            closure_radius_m: 20.0,
            min_path_length_m: 50.0,
            min_area_m2: 100.0,
        }
    }
}

impl CaptureConfig {
    /// Defaults, overridden by `CAPTURE_ACCURACY_THRESHOLD`,
    /// `CAPTURE_DISTANCE_THRESHOLD`, `CAPTURE_MIN_CLOSURE_POINTS`,
    /// `CAPTURE_CLOSURE_RADIUS`, `CAPTURE_MIN_PATH_LENGTH` and
    /// `CAPTURE_MIN_AREA` where set.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        override_from(&lookup, "CAPTURE_ACCURACY_THRESHOLD", &mut config.accuracy_threshold_m);
        override_from(&lookup, "CAPTURE_DISTANCE_THRESHOLD", &mut config.distance_threshold_m);
        override_from(&lookup, "CAPTURE_MIN_CLOSURE_POINTS", &mut config.min_closure_points);
        override_from(&lookup, "CAPTURE_CLOSURE_RADIUS", &mut config.closure_radius_m);
        override_from(&lookup, "CAPTURE_MIN_PATH_LENGTH", &mut config.min_path_length_m);
        override_from(&lookup, "CAPTURE_MIN_AREA", &mut config.min_area_m2);
        config
    }
}

fn override_from<F, T>(lookup: &F, key: &str, target: &mut T)
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    let Some(raw) = lookup(key) else {
        return;
    };
    match raw.trim().parse() {
        Ok(value) => *target = value,
        Err(_) => log::warn!("ignoring {key}={raw:?}: not a valid value"),
    }
}
