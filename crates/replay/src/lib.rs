use std::{fs::File, io, path::PathBuf};

use capture::{
    error::TerritoryError, service, CaptureConfig, CaptureSession, InMemoryRepo, ServiceError,
    TerritoryManager,
};
use clap::Parser;
use schemars::{schema::RootSchema, schema_for, JsonSchema};
use futures::stream;
use model::{
    coordinate::Coordinate, player::Player, sample::LocationSample, territory::Territory,
    WithId,
};
use serde::Serialize;
use thiserror::Error;
use utility::id::Id;

/// Replays a recorded GPS track through the territory capture pipeline and
/// prints the resulting territory as JSON.
#[derive(Debug, Clone, Parser)]
#[command(version, about)]
pub struct Args {
    /// CSV file with the columns `timestamp,latitude,longitude,horizontalAccuracy`.
    #[arg(required_unless_present = "schema")]
    pub track: Option<PathBuf>,

    /// Print the JSON schema of the output instead of replaying a track.
    #[arg(long)]
    pub schema: bool,

    /// Player the territory is claimed for.
    #[arg(long, default_value = "replay")]
    pub owner: String,

    /// Name of the claimed territory.
    #[arg(long, default_value = "Replayed territory")]
    pub name: String,

    /// Also print the polygon in GCJ-02 display coordinates.
    #[arg(long)]
    pub gcj02: bool,

    #[arg(long)]
    pub accuracy_threshold: Option<f64>,

    #[arg(long)]
    pub distance_threshold: Option<f64>,

    #[arg(long)]
    pub min_closure_points: Option<usize>,

    #[arg(long)]
    pub closure_radius: Option<f64>,

    #[arg(long)]
    pub min_path_length: Option<f64>,

    #[arg(long)]
    pub min_area: Option<f64>,
}

impl Args {
    /// Flags take precedence over the given (usually environment) config.
    pub fn config(&self, base: CaptureConfig) -> CaptureConfig {
        CaptureConfig {
            accuracy_threshold_m: self.accuracy_threshold.unwrap_or(base.accuracy_threshold_m),
            distance_threshold_m: self.distance_threshold.unwrap_or(base.distance_threshold_m),
            min_closure_points: self.min_closure_points.unwrap_or(base.min_closure_points),
            closure_radius_m: self.closure_radius.unwrap_or(base.closure_radius_m),
            min_path_length_m: self.min_path_length.unwrap_or(base.min_path_length_m),
            min_area_m2: self.min_area.unwrap_or(base.min_area_m2),
        }
    }
}

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("no track given")]
    NoTrack,
    #[error("can not open track: {0}")]
    Io(#[from] io::Error),
    #[error("malformed track: {0}")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Capture(#[from] ServiceError),
    #[error(transparent)]
    Territory(#[from] TerritoryError),
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReplayOutput {
    pub territory: WithId<Territory>,
    pub accepted_samples: usize,
    pub rejected_samples: usize,
    pub closed_loop: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_polygon: Option<Vec<Coordinate>>,
}

pub fn output_schema() -> RootSchema {
    schema_for!(ReplayOutput)
}

pub fn read_track<R: io::Read>(reader: R) -> Result<Vec<LocationSample>, csv::Error> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader)
        .deserialize()
        .collect()
}

pub async fn replay(args: &Args, config: CaptureConfig) -> Result<ReplayOutput, ReplayError> {
    let track = args.track.as_ref().ok_or(ReplayError::NoTrack)?;
    let samples = read_track(File::open(track)?)?;
    log::info!("replaying {} samples from {}", samples.len(), track.display());

    let owner: Id<Player> = Id::new(args.owner.clone());
    let client = service::run(move || CaptureSession::new(owner.clone(), config));
    client.start().await?;
    let summary = client.feed(stream::iter(samples)).await?;
    log::info!(
        "{} samples accepted, {} rejected",
        summary.accepted,
        summary.rejected
    );
    if !summary.eligible {
        log::warn!("track does not return to its start, closing it anyway");
    }

    let draft = client.commit().await?;
    let manager = TerritoryManager::new(InMemoryRepo::new(), config);
    let territory = manager.claim(draft, &args.name).await?;

    let display_polygon = args
        .gcj02
        .then(|| territory.content.polygon.iter().map(|p| p.to_gcj02()).collect());

    Ok(ReplayOutput {
        territory,
        accepted_samples: summary.accepted,
        rejected_samples: summary.rejected,
        closed_loop: summary.eligible,
        display_polygon,
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use chrono::{DateTime, Duration, SecondsFormat, Utc};

    use super::*;

    fn track_csv(points: &[(Coordinate, f64)]) -> String {
        let mut csv = String::from("timestamp,latitude,longitude,horizontalAccuracy\n");
        for (i, (point, accuracy)) in points.iter().enumerate() {
            let time = DateTime::<Utc>::UNIX_EPOCH + Duration::seconds(i as i64);
            csv.push_str(&format!(
                "{},{},{},{}\n",
                time.to_rfc3339_opts(SecondsFormat::Secs, true),
                point.latitude,
                point.longitude,
                accuracy
            ));
        }
        csv
    }

    fn args(track: PathBuf) -> Args {
        Args::parse_from(["replay", "--name", "Park", "--gcj02"]
            .into_iter()
            .map(String::from)
            .chain([track.display().to_string()]))
    }

    #[test]
    fn reads_camel_case_header() {
        let origin = Coordinate::new(39.9, 116.4);
        let samples = read_track(track_csv(&[(origin, 3.0)]).as_bytes()).unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].coordinate(), origin);
        assert_eq!(samples[0].horizontal_accuracy, 3.0);
    }

    #[test]
    fn flags_override_config() {
        let args = Args::parse_from(["replay", "track.csv", "--closure-radius", "8"]);
        let config = args.config(CaptureConfig::default());
        assert_eq!(config.closure_radius_m, 8.0);
        assert_eq!(config.min_closure_points, 5);
        assert_eq!(config.min_area_m2, 100.0);

        let args = Args::parse_from(["replay", "track.csv", "--min-area", "400"]);
        assert_eq!(args.config(CaptureConfig::default()).min_area_m2, 400.0);
    }

    #[test]
    fn schema_needs_no_track() {
        let args = Args::try_parse_from(["replay", "--schema"]).unwrap();
        assert!(args.schema);
        assert!(args.track.is_none());
        assert!(Args::try_parse_from(["replay"]).is_err());

        let schema = serde_json::to_value(output_schema()).unwrap();
        let properties = &schema["properties"];
        assert!(properties["territory"].is_object());
        assert!(properties["closedLoop"].is_object());
        assert!(schema["definitions"]["Coordinate"].is_object());
    }

    #[tokio::test]
    async fn small_loops_are_not_claimed() {
        let origin = Coordinate::new(39.9, 116.4);
        let points: Vec<_> = [(0.0, 0.0), (0.0, 20.0), (20.0, 20.0), (20.0, 0.0)]
            .into_iter()
            .map(|(north, east)| (origin.offset(north, east), 5.0))
            .collect();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(track_csv(&points).as_bytes()).unwrap();

        let mut args = args(file.path().to_owned());
        args.min_area = Some(1_000.0);
        let config = args.config(CaptureConfig::default());
        assert!(matches!(
            replay(&args, config).await,
            Err(ReplayError::Capture(ServiceError::Capture(
                capture::CaptureError::CaptureInvalid(capture::InvalidReason::AreaTooSmall { .. })
            )))
        ));
    }

    #[tokio::test]
    async fn replays_a_loop_into_a_territory() {
        let origin = Coordinate::new(39.9, 116.4);
        let mut points = Vec::new();
        for i in 0..8 {
            points.push((origin.offset(0.0, i as f64 * 10.0), 5.0));
        }
        for i in 0..8 {
            points.push((origin.offset(i as f64 * 10.0, 80.0), 5.0));
        }
        points.push((origin.offset(80.0, 80.0), 90.0));
        for i in 0..8 {
            points.push((origin.offset(80.0, 80.0 - i as f64 * 10.0), 5.0));
        }
        for i in 0..7 {
            points.push((origin.offset(80.0 - i as f64 * 10.0 - 5.0, 0.0), 5.0));
        }

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(track_csv(&points).as_bytes()).unwrap();

        let output = replay(&args(file.path().to_owned()), CaptureConfig::default())
            .await
            .unwrap();
        assert_eq!(output.rejected_samples, 1);
        assert!(output.closed_loop);
        assert_eq!(output.territory.content.name, "Park");
        assert!((output.territory.content.area_m2 - 6_400.0).abs() < 320.0);
        assert_eq!(
            output.display_polygon.map(|p| p.len()),
            Some(output.territory.content.polygon.len())
        );
    }
}
