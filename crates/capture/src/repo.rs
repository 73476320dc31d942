use std::{result, sync::Arc};

use async_trait::async_trait;
use indexmap::IndexMap;
use model::{building::PlayerBuilding, player::Player, territory::Territory, WithId};
use tokio::sync::Mutex;
use utility::id::Id;
use uuid::Uuid;

use crate::error::RepoError;

pub type Result<T> = result::Result<T, RepoError>;

/// Storage of claimed territories and the buildings placed in them.
#[async_trait]
pub trait TerritoryRepo: Send + Sync {
    async fn insert(&self, territory: Territory) -> Result<WithId<Territory>>;
    async fn get(&self, id: &Id<Territory>) -> Result<WithId<Territory>>;
    async fn all(&self) -> Result<Vec<WithId<Territory>>>;
    async fn by_owner(&self, owner: &Id<Player>) -> Result<Vec<WithId<Territory>>>;
    async fn update(&self, territory: WithId<Territory>) -> Result<WithId<Territory>>;
    /// Removes the territory together with every building inside it.
    async fn delete(&self, id: &Id<Territory>) -> Result<()>;
    async fn insert_building(
        &self,
        building: PlayerBuilding,
    ) -> Result<WithId<PlayerBuilding>>;
    async fn buildings_in(
        &self,
        territory: &Id<Territory>,
    ) -> Result<Vec<WithId<PlayerBuilding>>>;
}

#[derive(Debug, Default)]
struct Tables {
    territories: IndexMap<Id<Territory>, Territory>,
    buildings: IndexMap<Id<PlayerBuilding>, PlayerBuilding>,
}

/// Process local repo, mostly for tests and offline replays. Lists come back
/// in insertion order.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepo {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TerritoryRepo for InMemoryRepo {
    async fn insert(&self, territory: Territory) -> Result<WithId<Territory>> {
        let id = Id::new(Uuid::new_v4());
        let mut tables = self.tables.lock().await;
        tables.territories.insert(id, territory.clone());
        Ok(WithId::new(id, territory))
    }

    async fn get(&self, id: &Id<Territory>) -> Result<WithId<Territory>> {
        let tables = self.tables.lock().await;
        tables
            .territories
            .get(id)
            .map(|territory| WithId::new(*id, territory.clone()))
            .ok_or(RepoError::NotFound)
    }

    async fn all(&self) -> Result<Vec<WithId<Territory>>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .territories
            .iter()
            .map(|(id, territory)| WithId::new(*id, territory.clone()))
            .collect())
    }

    async fn by_owner(&self, owner: &Id<Player>) -> Result<Vec<WithId<Territory>>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .territories
            .iter()
            .filter(|(_, territory)| territory.owner_id == *owner)
            .map(|(id, territory)| WithId::new(*id, territory.clone()))
            .collect())
    }

    async fn update(&self, territory: WithId<Territory>) -> Result<WithId<Territory>> {
        let mut tables = self.tables.lock().await;
        let stored = tables
            .territories
            .get_mut(&territory.id)
            .ok_or(RepoError::NotFound)?;
        *stored = territory.content.clone();
        Ok(territory)
    }

    async fn delete(&self, id: &Id<Territory>) -> Result<()> {
        let mut tables = self.tables.lock().await;
        // shift_remove keeps the insertion order of the remaining entries
        tables
            .territories
            .shift_remove(id)
            .ok_or(RepoError::NotFound)?;
        tables
            .buildings
            .retain(|_, building| building.territory_id != *id);
        Ok(())
    }

    async fn insert_building(
        &self,
        building: PlayerBuilding,
    ) -> Result<WithId<PlayerBuilding>> {
        let mut tables = self.tables.lock().await;
        if !tables.territories.contains_key(&building.territory_id) {
            return Err(RepoError::NotFound);
        }
        let id = Id::new(Uuid::new_v4());
        tables.buildings.insert(id, building.clone());
        Ok(WithId::new(id, building))
    }

    async fn buildings_in(
        &self,
        territory: &Id<Territory>,
    ) -> Result<Vec<WithId<PlayerBuilding>>> {
        let tables = self.tables.lock().await;
        if !tables.territories.contains_key(territory) {
            return Err(RepoError::NotFound);
        }
        Ok(tables
            .buildings
            .iter()
            .filter(|(_, building)| building.territory_id == *territory)
            .map(|(id, building)| WithId::new(*id, building.clone()))
            .collect())
    }
}
