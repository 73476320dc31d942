use std::sync::Arc;

use model::{
    coordinate::Coordinate, player::Player, sample::LocationSample,
    territory::TerritoryDraft,
};
use serde::Serialize;
use tokio::sync::broadcast;
use utility::id::Id;

use crate::{
    config::CaptureConfig,
    error::{CaptureError, Result},
    events::{CaptureEvent, EventBus},
    filter::SampleFilter,
    geometry,
};

/// Lifecycle of a capture: `Idle -> Capturing -> (Committing | Cancelled)`.
/// A failed commit drops back to `Capturing`. `reset` returns to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    Idle,
    Capturing,
    Committing,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Dropped by the filter.
    Rejected,
    Accepted {
        point_count: usize,
        /// The path currently forms a closed loop and may be committed.
        eligible: bool,
    },
}

/// Immutable copy of the path for live preview drawing. Cheap to clone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathSnapshot {
    points: Arc<[Coordinate]>,
    closure_eligible: bool,
}

impl PathSnapshot {
    pub fn points(&self) -> &[Coordinate] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn is_closure_eligible(&self) -> bool {
        self.closure_eligible
    }

    /// The path in map display coordinates.
    pub fn to_gcj02(&self) -> Vec<Coordinate> {
        self.points.iter().map(|p| p.to_gcj02()).collect()
    }
}

/// Records one walk around a would-be territory.
///
/// All mutation goes through `&mut self`, so a session is driven by exactly
/// one writer. Readers get [`PathSnapshot`]s, never the live buffer.
#[derive(Debug)]
pub struct CaptureSession {
    owner_id: Id<Player>,
    config: CaptureConfig,
    state: SessionState,
    filter: SampleFilter,
    path: Vec<Coordinate>,
    /// Some point of the path left the closure radius around the start.
    departed: bool,
    snapshot: PathSnapshot,
    events: EventBus<CaptureEvent>,
}

impl CaptureSession {
    pub fn new(owner_id: Id<Player>, config: CaptureConfig) -> Self {
        Self {
            owner_id,
            filter: SampleFilter::new(&config),
            config,
            state: SessionState::Idle,
            path: Vec::new(),
            departed: false,
            snapshot: PathSnapshot::default(),
            events: EventBus::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn owner_id(&self) -> &Id<Player> {
        &self.owner_id
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CaptureEvent> {
        self.events.subscribe()
    }

    /// Moves the subscribers of `previous` over to this session.
    pub(crate) fn take_subscribers(&mut self, previous: &mut CaptureSession) {
        self.events = std::mem::take(&mut previous.events);
    }

    pub fn snapshot(&self) -> PathSnapshot {
        self.snapshot.clone()
    }

    pub fn is_closure_eligible(&self) -> bool {
        self.snapshot.closure_eligible
    }

    pub fn start(&mut self) -> Result<()> {
        match self.state {
            SessionState::Idle => {}
            SessionState::Capturing => return Err(CaptureError::AlreadyCapturing),
            state => return Err(CaptureError::SessionNotActive { state }),
        }
        self.clear();
        self.state = SessionState::Capturing;
        log::info!("capture started for {}", self.owner_id);
        self.events.publish(CaptureEvent::Started);
        Ok(())
    }

    /// Feeds one location fix. Fixes are only consumed while capturing.
    pub fn push(&mut self, sample: &LocationSample) -> Result<PushOutcome> {
        self.ensure_capturing()?;
        let Some(coordinate) = self.filter.accept(sample) else {
            return Ok(PushOutcome::Rejected);
        };

        self.path.push(coordinate);
        if let Some(start) = self.path.first() {
            if start.distance_to(&coordinate) > self.config.closure_radius_m {
                self.departed = true;
            }
        }

        let was_eligible = self.snapshot.closure_eligible;
        let eligible = self.closure_condition();
        self.snapshot = PathSnapshot {
            points: Arc::from(self.path.as_slice()),
            closure_eligible: eligible,
        };

        let point_count = self.path.len();
        log::debug!("point {} at {}", point_count, sample.timestamp);
        self.events.publish(CaptureEvent::PointAdded { point_count });
        if eligible != was_eligible {
            log::info!("closure eligible: {eligible} after {point_count} points");
            self.events
                .publish(CaptureEvent::ClosureEligible { eligible });
        }

        Ok(PushOutcome::Accepted {
            point_count,
            eligible,
        })
    }

    /// Ends the walk and measures the enclosed polygon. The closing edge from
    /// the last point back to the start is implied, so committing does not
    /// require the path to be closure eligible. Walks shorter than
    /// `min_path_length_m` or enclosing less than `min_area_m2` are rejected.
    ///
    /// If the path is not a valid polygon the session keeps capturing.
    pub fn commit(&mut self) -> Result<TerritoryDraft> {
        self.ensure_capturing()?;
        self.state = SessionState::Committing;

        let measured = geometry::measure(&self.path)
            .and_then(|measurement| measurement.check_minimums(&self.config));
        match measured {
            Ok(measurement) => {
                let draft = TerritoryDraft {
                    owner_id: self.owner_id.clone(),
                    point_count: measurement.polygon.len(),
                    polygon: measurement.polygon,
                    area_m2: measurement.area_m2,
                    perimeter_m: measurement.perimeter_m,
                };
                log::info!(
                    "capture committed: {:.0} m², {:.0} m, {} points",
                    draft.area_m2,
                    draft.perimeter_m,
                    draft.point_count
                );
                self.clear();
                self.events.publish(CaptureEvent::Committed {
                    area_m2: draft.area_m2,
                    perimeter_m: draft.perimeter_m,
                    point_count: draft.point_count,
                });
                Ok(draft)
            }
            Err(reason) => {
                log::warn!("commit rejected: {reason}");
                self.state = SessionState::Capturing;
                self.events.publish(CaptureEvent::CommitRejected { reason });
                Err(reason.into())
            }
        }
    }

    /// Throws the path away. The session can only be used again after `reset`.
    pub fn cancel(&mut self) -> Result<()> {
        self.ensure_capturing()?;
        self.clear();
        self.state = SessionState::Cancelled;
        log::info!("capture cancelled for {}", self.owner_id);
        self.events.publish(CaptureEvent::Cancelled);
        Ok(())
    }

    /// Returns to `Idle` from any state, discarding the path. Subscribers are
    /// kept.
    pub fn reset(&mut self) {
        self.clear();
        self.state = SessionState::Idle;
        self.events.publish(CaptureEvent::Reset);
    }

    fn ensure_capturing(&self) -> Result<()> {
        match self.state {
            SessionState::Capturing => Ok(()),
            state => Err(CaptureError::SessionNotActive { state }),
        }
    }

    fn closure_condition(&self) -> bool {
        let min_points = self.config.min_closure_points.max(3);
        match (self.path.first(), self.path.last()) {
            (Some(first), Some(last)) if self.path.len() >= min_points && self.departed => {
                first.distance_to(last) <= self.config.closure_radius_m
            }
            _ => false,
        }
    }

    fn clear(&mut self) {
        self.path.clear();
        self.filter.reset();
        self.departed = false;
        self.snapshot = PathSnapshot::default();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::{DateTime, Duration, Utc};

    use super::*;
    use crate::error::InvalidReason;

    pub(crate) fn samples(points: &[Coordinate]) -> Vec<LocationSample> {
        points
            .iter()
            .enumerate()
            .map(|(i, p)| {
                LocationSample::new(
                    DateTime::<Utc>::UNIX_EPOCH + Duration::seconds(i as i64),
                    *p,
                    5.0,
                )
            })
            .collect()
    }

    /// Walks around a square of `side_m` clockwise in steps of `step_m`,
    /// stopping one step short of the start.
    pub(crate) fn square_walk(origin: Coordinate, side_m: f64, step_m: f64) -> Vec<Coordinate> {
        let steps = (side_m / step_m).round() as usize;
        let mut points = Vec::new();
        for i in 0..steps {
            points.push(origin.offset(0.0, i as f64 * step_m));
        }
        for i in 0..steps {
            points.push(origin.offset(i as f64 * step_m, side_m));
        }
        for i in 0..steps {
            points.push(origin.offset(side_m, side_m - i as f64 * step_m));
        }
        for i in 0..steps {
            points.push(origin.offset(side_m - i as f64 * step_m, 0.0));
        }
        points
    }

    fn capturing() -> CaptureSession {
        let mut session = CaptureSession::new(Id::from("player-1"), CaptureConfig::default());
        session.start().unwrap();
        session
    }

    fn feed(session: &mut CaptureSession, points: &[Coordinate]) {
        for sample in samples(points) {
            session.push(&sample).unwrap();
        }
    }

    #[test]
    fn square_walk_is_about_a_hectare() {
        let mut session = capturing();
        feed(&mut session, &square_walk(Coordinate::new(54.3150, 10.1320), 100.0, 10.0));
        assert!(session.is_closure_eligible());

        let draft = session.commit().unwrap();
        assert!((draft.area_m2 - 10_000.0).abs() < 500.0, "area = {}", draft.area_m2);
        assert_eq!(&draft.owner_id, session.owner_id());
        assert_eq!(draft.point_count, draft.polygon.len());
        assert_eq!(session.state(), SessionState::Committing);
        assert!(session.snapshot().is_empty());
    }

    #[test]
    fn four_corners_commit_without_closure() {
        let origin = Coordinate::new(40.0, -74.0);
        let mut session = capturing();
        feed(
            &mut session,
            &[
                origin,
                origin.offset(0.0, 100.0),
                origin.offset(100.0, 100.0),
                origin.offset(100.0, 0.0),
            ],
        );
        assert!(!session.is_closure_eligible());
        let draft = session.commit().unwrap();
        assert!((draft.area_m2 - 10_000.0).abs() < 500.0);
    }

    #[test]
    fn drops_sample_closer_than_a_meter() {
        let origin = Coordinate::new(54.32, 10.12);
        let mut session = capturing();
        let walk = samples(&[origin, origin.offset(0.3, 0.0)]);

        assert!(matches!(
            session.push(&walk[0]).unwrap(),
            PushOutcome::Accepted { point_count: 1, .. }
        ));
        assert_eq!(session.push(&walk[1]).unwrap(), PushOutcome::Rejected);
        assert_eq!(session.snapshot().len(), 1);
    }

    #[test]
    fn too_few_points_keep_capturing() {
        let origin = Coordinate::new(54.32, 10.12);
        let mut session = capturing();
        feed(&mut session, &[origin, origin.offset(30.0, 0.0)]);

        assert_eq!(
            session.commit(),
            Err(CaptureError::CaptureInvalid(InvalidReason::TooFewPoints { count: 2 }))
        );
        assert_eq!(session.state(), SessionState::Capturing);

        // walking on makes the commit succeed
        feed(&mut session, &[origin.offset(30.0, 30.0)]);
        assert!(session.commit().is_ok());
    }

    #[test]
    fn self_intersecting_walk_is_rejected() {
        let o = Coordinate::new(47.0, 8.0);
        let mut session = capturing();
        feed(
            &mut session,
            &[o, o.offset(50.0, 50.0), o.offset(0.0, 50.0), o.offset(50.0, 0.0)],
        );
        assert!(matches!(
            session.commit(),
            Err(CaptureError::CaptureInvalid(InvalidReason::SelfIntersecting { .. }))
        ));
        assert_eq!(session.snapshot().len(), 4);
    }

    #[test]
    fn short_walks_keep_capturing() {
        let origin = Coordinate::new(54.32, 10.12);
        let mut session = capturing();
        feed(&mut session, &[origin, origin.offset(0.0, 8.0), origin.offset(8.0, 8.0)]);

        assert!(matches!(
            session.commit(),
            Err(CaptureError::CaptureInvalid(InvalidReason::PathTooShort { .. }))
        ));
        assert_eq!(session.state(), SessionState::Capturing);
        assert_eq!(session.snapshot().len(), 3);
    }

    #[test]
    fn thin_walks_are_too_small() {
        let origin = Coordinate::new(54.32, 10.12);
        let mut session = capturing();
        feed(&mut session, &[origin, origin.offset(0.0, 40.0), origin.offset(2.0, 20.0)]);

        assert!(matches!(
            session.commit(),
            Err(CaptureError::CaptureInvalid(InvalidReason::AreaTooSmall { .. }))
        ));
    }

    #[test]
    fn cancel_then_commit_is_not_active() {
        let mut session = capturing();
        session.cancel().unwrap();
        assert_eq!(
            session.commit(),
            Err(CaptureError::SessionNotActive {
                state: SessionState::Cancelled
            })
        );
        assert_eq!(
            session.cancel(),
            Err(CaptureError::SessionNotActive {
                state: SessionState::Cancelled
            })
        );
        assert!(session.start().is_err());

        session.reset();
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.start().is_ok());
    }

    #[test]
    fn idle_session_rejects_everything_but_start() {
        let mut session = CaptureSession::new(Id::from("p"), CaptureConfig::default());
        let walk = samples(&[Coordinate::new(1.0, 1.0)]);
        assert!(matches!(
            session.push(&walk[0]),
            Err(CaptureError::SessionNotActive {
                state: SessionState::Idle
            })
        ));
        assert!(session.commit().is_err());
        session.start().unwrap();
        assert_eq!(session.start(), Err(CaptureError::AlreadyCapturing));
    }

    #[test]
    fn nearby_points_at_the_start_are_not_a_loop() {
        let origin = Coordinate::new(54.32, 10.12);
        let mut session = capturing();
        let shuffle: Vec<_> = (0..8).map(|i| origin.offset(0.0, i as f64 * 1.5)).collect();
        feed(&mut session, &shuffle);
        assert!(!session.is_closure_eligible());
    }

    #[test]
    fn snapshots_do_not_change_after_the_fact() {
        let origin = Coordinate::new(54.32, 10.12);
        let mut session = capturing();
        feed(&mut session, &[origin, origin.offset(5.0, 0.0)]);
        let before = session.snapshot();
        feed(&mut session, &[origin.offset(10.0, 0.0)]);

        assert_eq!(before.len(), 2);
        assert_eq!(session.snapshot().len(), 3);
        assert_eq!(before.points(), &session.snapshot().points()[..2]);
    }

    #[test]
    fn publishes_events_in_order() {
        let mut session = CaptureSession::new(Id::from("p"), CaptureConfig::default());
        let mut events = session.subscribe();
        session.start().unwrap();
        feed(&mut session, &square_walk(Coordinate::new(10.0, 10.0), 40.0, 10.0));
        session.commit().unwrap();

        let mut received = Vec::new();
        while let Ok(event) = events.try_recv() {
            received.push(event);
        }
        assert_eq!(received.first(), Some(&CaptureEvent::Started));
        assert!(matches!(received.last(), Some(CaptureEvent::Committed { .. })));
        let eligible_at = received
            .iter()
            .position(|e| *e == CaptureEvent::ClosureEligible { eligible: true })
            .unwrap();
        assert!(matches!(
            received[eligible_at - 1],
            CaptureEvent::PointAdded { .. }
        ));
    }
}
