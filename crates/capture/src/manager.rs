use std::result;

use chrono::Utc;
use model::{
    building::{BuildingTemplate, PlayerBuilding},
    coordinate::Coordinate,
    player::Player,
    territory::{Territory, TerritoryDraft},
    WithId,
};
use serde::Serialize;
use tokio::sync::broadcast;
use utility::id::Id;

use crate::{
    config::CaptureConfig,
    error::TerritoryError,
    events::{EventBus, TerritoryEvent},
    geometry,
    repo::TerritoryRepo,
};

pub type Result<T> = result::Result<T, TerritoryError>;

const CAUTION_DISTANCE_M: f64 = 100.0;
const WARNING_DISTANCE_M: f64 = 50.0;
const DANGER_DISTANCE_M: f64 = 25.0;

/// How close a position is to a territory of another player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum WarningLevel {
    Safe,
    /// Within 100 m.
    Caution,
    /// Within 50 m.
    Warning,
    /// Within 25 m.
    Danger,
    /// Inside the other territory.
    Violation,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Proximity {
    pub level: WarningLevel,
    /// Closest territory of another player, if there is any.
    pub territory_id: Option<Id<Territory>>,
    pub distance_m: Option<f64>,
}

/// Owner-facing operations on persisted territories.
///
/// Constructed once and handed to whoever needs it; there is no global
/// instance.
pub struct TerritoryManager<R: TerritoryRepo> {
    repo: R,
    config: CaptureConfig,
    events: EventBus<TerritoryEvent>,
}

fn clean_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(TerritoryError::EmptyName);
    }
    Ok(name.to_owned())
}

fn overlap(a: &Territory, b: &Territory) -> bool {
    a.polygon.iter().any(|p| b.contains(p)) || b.polygon.iter().any(|p| a.contains(p))
}

impl<R: TerritoryRepo> TerritoryManager<R> {
    /// `config` supplies the minimum walk length and area a claim has to meet.
    pub fn new(repo: R, config: CaptureConfig) -> Self {
        Self {
            repo,
            config,
            events: EventBus::new(),
        }
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TerritoryEvent> {
        self.events.subscribe()
    }

    /// Names and stores the outcome of a capture.
    ///
    /// The polygon is validated again and its area is recomputed, so a
    /// hand-made draft can not sneak in a degenerate shape. Territories of
    /// different players must not overlap.
    pub async fn claim(&self, draft: TerritoryDraft, name: &str) -> Result<WithId<Territory>> {
        let name = clean_name(name)?;
        let mut measurement = geometry::measure(&draft.polygon)?;
        // the walked path can be longer than the open outline of the polygon
        measurement.perimeter_m = measurement.perimeter_m.max(draft.perimeter_m);
        let measurement = measurement.check_minimums(&self.config)?;

        let territory = Territory::from_draft(
            TerritoryDraft {
                owner_id: draft.owner_id,
                point_count: measurement.polygon.len(),
                polygon: measurement.polygon,
                area_m2: measurement.area_m2,
                perimeter_m: measurement.perimeter_m,
            },
            name,
            Utc::now(),
        );
        let collision = self
            .repo
            .all()
            .await?
            .into_iter()
            .find(|other| {
                other.content.owner_id != territory.owner_id && overlap(&other.content, &territory)
            });
        if let Some(other) = collision {
            log::warn!(
                "{} tried to claim into territory {} of {}",
                territory.owner_id,
                other.id,
                other.content.owner_id
            );
            return Err(TerritoryError::Overlaps { other: other.id });
        }

        let territory = self.repo.insert(territory).await?;
        log::info!(
            "{} claimed territory {} ({:.0} m²)",
            territory.content.owner_id,
            territory.id,
            territory.content.area_m2
        );
        self.events.publish(TerritoryEvent::Claimed { id: territory.id });
        Ok(territory)
    }

    /// Warns a walker approaching territories of other players.
    pub async fn proximity(&self, walker: &Id<Player>, position: &Coordinate) -> Result<Proximity> {
        let closest = self
            .repo
            .all()
            .await?
            .into_iter()
            .filter(|territory| territory.content.owner_id != *walker)
            .filter_map(|territory| Some((territory.id, territory.content.distance_to(position)?)))
            .min_by(|a, b| a.1.total_cmp(&b.1));

        let Some((territory_id, distance_m)) = closest else {
            return Ok(Proximity {
                level: WarningLevel::Safe,
                territory_id: None,
                distance_m: None,
            });
        };
        let level = if distance_m <= 0.0 {
            WarningLevel::Violation
        } else if distance_m < DANGER_DISTANCE_M {
            WarningLevel::Danger
        } else if distance_m < WARNING_DISTANCE_M {
            WarningLevel::Warning
        } else if distance_m < CAUTION_DISTANCE_M {
            WarningLevel::Caution
        } else {
            WarningLevel::Safe
        };
        Ok(Proximity {
            level,
            territory_id: Some(territory_id),
            distance_m: Some(distance_m),
        })
    }

    pub async fn territories_of(&self, owner: &Id<Player>) -> Result<Vec<WithId<Territory>>> {
        Ok(self.repo.by_owner(owner).await?)
    }

    pub async fn rename(
        &self,
        owner: &Id<Player>,
        id: &Id<Territory>,
        name: &str,
    ) -> Result<WithId<Territory>> {
        let name = clean_name(name)?;
        let mut territory = self.owned(owner, id).await?;
        territory.content.name = name.clone();
        let territory = self.repo.update(territory).await?;
        self.events.publish(TerritoryEvent::Renamed { id: *id, name });
        Ok(territory)
    }

    /// Deletes the territory and everything built on it.
    pub async fn delete(&self, owner: &Id<Player>, id: &Id<Territory>) -> Result<()> {
        self.owned(owner, id).await?;
        self.repo.delete(id).await?;
        log::info!("{owner} gave up territory {id}");
        self.events.publish(TerritoryEvent::Deleted { id: *id });
        Ok(())
    }

    /// Places a level 1 building. The coordinate has to lie inside the
    /// territory; this is only checked here, not when the territory changes.
    pub async fn place_building(
        &self,
        owner: &Id<Player>,
        territory_id: &Id<Territory>,
        template_id: Id<BuildingTemplate>,
        coordinate: Coordinate,
    ) -> Result<WithId<PlayerBuilding>> {
        let territory = self.owned(owner, territory_id).await?;
        if !territory.content.contains(&coordinate) {
            return Err(TerritoryError::OutsideTerritory);
        }
        let building = self
            .repo
            .insert_building(PlayerBuilding {
                territory_id: *territory_id,
                template_id,
                coordinate,
                level: 1,
            })
            .await?;
        self.events.publish(TerritoryEvent::BuildingPlaced {
            territory_id: *territory_id,
            building_id: building.id,
        });
        Ok(building)
    }

    pub async fn buildings_in(
        &self,
        territory_id: &Id<Territory>,
    ) -> Result<Vec<WithId<PlayerBuilding>>> {
        Ok(self.repo.buildings_in(territory_id).await?)
    }

    async fn owned(&self, owner: &Id<Player>, id: &Id<Territory>) -> Result<WithId<Territory>> {
        let territory = self.repo.get(id).await?;
        if territory.content.owner_id != *owner {
            return Err(TerritoryError::NotOwner);
        }
        Ok(territory)
    }
}
