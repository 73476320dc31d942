use std::{error, result};

use model::territory::Territory;
use serde::Serialize;
use thiserror::Error;
use utility::id::Id;

use crate::session::SessionState;

/// Why a captured path can not become a territory.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Error)]
#[serde(rename_all = "camelCase", tag = "reason")]
pub enum InvalidReason {
    #[error("need at least 3 distinct points, got {count}")]
    TooFewPoints { count: usize },
    #[error("all points lie on one line")]
    Collinear,
    #[error("edge {first} crosses edge {second}")]
    SelfIntersecting { first: usize, second: usize },
    #[error("polygon encloses no area")]
    ZeroArea,
    #[error("walked {length_m:.0} m, need at least {required_m:.0} m")]
    #[serde(rename_all = "camelCase")]
    PathTooShort { length_m: f64, required_m: f64 },
    #[error("encloses {area_m2:.0} m², need at least {required_m2:.0} m²")]
    #[serde(rename_all = "camelCase")]
    AreaTooSmall { area_m2: f64, required_m2: f64 },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CaptureError {
    /// The path can not be committed yet. The session keeps capturing.
    #[error("capture invalid: {0}")]
    CaptureInvalid(#[from] InvalidReason),
    #[error("no active capture (session is {state:?})")]
    SessionNotActive { state: SessionState },
    #[error("a capture is already running")]
    AlreadyCapturing,
}

pub type Result<T> = result::Result<T, CaptureError>;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("not found")]
    NotFound,
    #[error(transparent)]
    Other(Box<dyn error::Error + Send + Sync>),
}

#[derive(Debug, Error)]
pub enum TerritoryError {
    #[error("territory name must not be empty")]
    EmptyName,
    #[error("territory belongs to another player")]
    NotOwner,
    #[error("coordinate lies outside of the territory")]
    OutsideTerritory,
    #[error("not a valid territory: {0}")]
    Invalid(#[from] InvalidReason),
    #[error("overlaps territory {other} of another player")]
    Overlaps { other: Id<Territory> },
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error("capture service is not running")]
    Send,
    #[error("capture service dropped the request")]
    Receive(#[from] tokio::sync::oneshot::error::RecvError),
}

pub type ServiceResult<T> = result::Result<T, ServiceError>;
