use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::{HasId, Id};
use uuid::Uuid;

use crate::{coordinate::Coordinate, territory::Territory};

/// Static description of a building kind. Balancing data lives elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BuildingTemplate {
    pub name: String,
}

impl HasId for BuildingTemplate {
    type IdType = String;
}

/// A building a player placed inside one of their territories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlayerBuilding {
    pub territory_id: Id<Territory>,
    pub template_id: Id<BuildingTemplate>,
    pub coordinate: Coordinate,
    pub level: u32,
}

impl HasId for PlayerBuilding {
    type IdType = Uuid;
}
