//! GPS territory capture: filtering location fixes, recording a walked loop,
//! turning it into a measured polygon and managing the claimed territories.

pub mod config;
pub mod error;
pub mod events;
pub mod filter;
pub mod geometry;
pub mod manager;
pub mod repo;
pub mod service;
pub mod session;

pub use config::CaptureConfig;
pub use error::{CaptureError, InvalidReason, ServiceError};
pub use manager::{Proximity, TerritoryManager, WarningLevel};
pub use repo::{InMemoryRepo, TerritoryRepo};
pub use service::CaptureClient;
pub use session::{CaptureSession, PathSnapshot, PushOutcome, SessionState};
