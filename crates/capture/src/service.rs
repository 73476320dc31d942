//! Runs a [`CaptureSession`] on its own task.
//!
//! The location callback, the UI and anything else talk to the session through
//! a [`CaptureClient`]. Requests are queued in a single mailbox and handled one
//! after another, so samples are applied strictly in the order they were sent
//! and readers only ever see complete snapshots.

use std::panic::{self, AssertUnwindSafe};

use futures::{Stream, StreamExt};
use model::{sample::LocationSample, territory::TerritoryDraft};
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::{
    error::{CaptureError, Result, ServiceError, ServiceResult},
    events::CaptureEvent,
    session::{CaptureSession, PathSnapshot, PushOutcome, SessionState},
};

const MAILBOX_SIZE: usize = 64;

#[derive(Debug)]
pub enum CaptureRequest {
    Start {
        responder: oneshot::Sender<Result<()>>,
    },
    Push {
        sample: LocationSample,
        responder: oneshot::Sender<Result<PushOutcome>>,
    },
    Commit {
        responder: oneshot::Sender<Result<TerritoryDraft>>,
    },
    Cancel {
        responder: oneshot::Sender<Result<()>>,
    },
    Reset {
        responder: oneshot::Sender<()>,
    },
    Snapshot {
        responder: oneshot::Sender<PathSnapshot>,
    },
    State {
        responder: oneshot::Sender<SessionState>,
    },
    Subscribe {
        responder: oneshot::Sender<broadcast::Receiver<CaptureEvent>>,
    },
    #[cfg(test)]
    Panic { responder: oneshot::Sender<()> },
}

fn respond<T>(responder: oneshot::Sender<T>, value: T) {
    if responder.send(value).is_err() {
        log::debug!("requester went away before the response was sent");
    }
}

impl CaptureRequest {
    fn handle(self, session: &mut CaptureSession) {
        match self {
            Self::Start { responder } => respond(responder, session.start()),
            Self::Push { sample, responder } => respond(responder, session.push(&sample)),
            Self::Commit { responder } => respond(responder, session.commit()),
            Self::Cancel { responder } => respond(responder, session.cancel()),
            Self::Reset { responder } => respond(responder, session.reset()),
            Self::Snapshot { responder } => respond(responder, session.snapshot()),
            Self::State { responder } => respond(responder, session.state()),
            Self::Subscribe { responder } => respond(responder, session.subscribe()),
            #[cfg(test)]
            Self::Panic { responder } => {
                let _responder = responder;
                panic!("session blew up");
            }
        }
    }
}

/// Spawns the session task.
///
/// If handling a request panics, the capture in progress is lost: the session
/// is replaced by a fresh one from `factory`, keeps its subscribers and
/// announces the restart with [`CaptureEvent::Reset`]. The panicking request's
/// caller sees [`ServiceError::Receive`].
pub fn run<F>(factory: F) -> CaptureClient
where
    F: 'static + Send + Fn() -> CaptureSession,
{
    let (tx, mut rx) = mpsc::channel::<CaptureRequest>(MAILBOX_SIZE);
    let mut session = factory();

    tokio::spawn(async move {
        while let Some(request) = rx.recv().await {
            let result = panic::catch_unwind(AssertUnwindSafe(|| request.handle(&mut session)));
            if let Err(why) = result {
                log::error!("capture session panicked, restarting: {:?}", why);
                let mut fresh = factory();
                fresh.take_subscribers(&mut session);
                session = fresh;
                session.reset();
            }
        }
        log::debug!("all capture clients dropped, stopping");
    });

    CaptureClient { sender: tx }
}

/// Counts of what happened to the samples of a [`CaptureClient::feed`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedSummary {
    pub accepted: usize,
    pub rejected: usize,
    /// Arrived while no capture was running.
    pub ignored: usize,
    /// Closure eligibility after the last accepted sample.
    pub eligible: bool,
}

#[derive(Debug, Clone)]
pub struct CaptureClient {
    sender: mpsc::Sender<CaptureRequest>,
}

impl CaptureClient {
    async fn ask<T, F>(&self, request: F) -> ServiceResult<T>
    where
        F: FnOnce(oneshot::Sender<T>) -> CaptureRequest,
    {
        let (responder, response) = oneshot::channel();
        self.sender
            .send(request(responder))
            .await
            .map_err(|_| ServiceError::Send)?;
        Ok(response.await?)
    }

    pub async fn start(&self) -> ServiceResult<()> {
        Ok(self.ask(|responder| CaptureRequest::Start { responder }).await??)
    }

    pub async fn push(&self, sample: LocationSample) -> ServiceResult<PushOutcome> {
        Ok(self
            .ask(|responder| CaptureRequest::Push { sample, responder })
            .await??)
    }

    pub async fn commit(&self) -> ServiceResult<TerritoryDraft> {
        Ok(self.ask(|responder| CaptureRequest::Commit { responder }).await??)
    }

    pub async fn cancel(&self) -> ServiceResult<()> {
        Ok(self.ask(|responder| CaptureRequest::Cancel { responder }).await??)
    }

    pub async fn reset(&self) -> ServiceResult<()> {
        self.ask(|responder| CaptureRequest::Reset { responder }).await
    }

    pub async fn snapshot(&self) -> ServiceResult<PathSnapshot> {
        self.ask(|responder| CaptureRequest::Snapshot { responder })
            .await
    }

    pub async fn state(&self) -> ServiceResult<SessionState> {
        self.ask(|responder| CaptureRequest::State { responder }).await
    }

    pub async fn subscribe(&self) -> ServiceResult<broadcast::Receiver<CaptureEvent>> {
        self.ask(|responder| CaptureRequest::Subscribe { responder })
            .await
    }

    /// Pushes every sample of the stream, one at a time and in order. Samples
    /// arriving while no capture is running are counted and skipped.
    pub async fn feed<S>(&self, samples: S) -> ServiceResult<FeedSummary>
    where
        S: Stream<Item = LocationSample>,
    {
        futures::pin_mut!(samples);
        let mut summary = FeedSummary::default();
        while let Some(sample) = samples.next().await {
            match self.push(sample).await {
                Ok(PushOutcome::Accepted { eligible, .. }) => {
                    summary.accepted += 1;
                    summary.eligible = eligible;
                }
                Ok(PushOutcome::Rejected) => summary.rejected += 1,
                Err(ServiceError::Capture(CaptureError::SessionNotActive { .. })) => {
                    summary.ignored += 1
                }
                Err(why) => return Err(why),
            }
        }
        Ok(summary)
    }
}
