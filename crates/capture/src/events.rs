use serde::Serialize;
use tokio::sync::broadcast;
use utility::id::Id;

use model::{building::PlayerBuilding, territory::Territory};

use crate::error::InvalidReason;

/// State changes of a capture session, in the order they happened.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum CaptureEvent {
    Started,
    #[serde(rename_all = "camelCase")]
    PointAdded { point_count: usize },
    /// Sent whenever the path starts or stops being a closed loop.
    ClosureEligible { eligible: bool },
    CommitRejected { reason: InvalidReason },
    #[serde(rename_all = "camelCase")]
    Committed {
        area_m2: f64,
        perimeter_m: f64,
        point_count: usize,
    },
    Cancelled,
    Reset,
}

/// Changes to the set of persisted territories.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum TerritoryEvent {
    Claimed { id: Id<Territory> },
    Renamed { id: Id<Territory>, name: String },
    Deleted { id: Id<Territory> },
    #[serde(rename_all = "camelCase")]
    BuildingPlaced {
        territory_id: Id<Territory>,
        building_id: Id<PlayerBuilding>,
    },
}

/// Events a subscriber may fall behind by before it starts losing the oldest.
pub const EVENT_BACKLOG: usize = 1024;

/// Fan-out of events to any number of subscribers.
///
/// Publishing never blocks. Every subscriber reads from one shared ring of
/// [`EVENT_BACKLOG`] events; a subscriber that stops reading only loses the
/// events it fell behind on (its next `recv` reports how many) and does not
/// hold on to more memory.
#[derive(Debug)]
pub struct EventBus<E> {
    sender: broadcast::Sender<E>,
}

impl<E: Clone> Default for EventBus<E> {
    fn default() -> Self {
        let (sender, _) = broadcast::channel(EVENT_BACKLOG);
        Self { sender }
    }
}

impl<E: Clone> EventBus<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<E> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: E) {
        // fails only while nobody listens
        let _ = self.sender.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
