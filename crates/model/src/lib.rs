use std::fmt::Debug;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::{HasId, Id};

pub mod building;
pub mod coordinate;
pub mod player;
pub mod sample;
pub mod territory;

pub trait ExampleData {
    fn example_data() -> Self;
}

/// An entity together with the id it was persisted under.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(bound(deserialize = "V: Deserialize<'de>, V::IdType: Deserialize<'de>"))]
pub struct WithId<V>
where
    V: HasId,
    V::IdType: Serialize + Debug + Clone,
{
    pub id: Id<V>,
    #[serde(flatten)]
    pub content: V,
}

impl<V> WithId<V>
where
    V: HasId,
    V::IdType: Serialize + Debug + Clone,
{
    pub fn new(id: Id<V>, content: V) -> Self {
        Self { id, content }
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::territory::Territory;

    #[test]
    fn with_id_flattens_content() {
        let id = Id::new(Uuid::nil());
        let territory = WithId::new(id, Territory::example_data());
        let json = serde_json::to_value(&territory).unwrap();
        assert_eq!(json["id"], "00000000-0000-0000-0000-000000000000");
        assert_eq!(json["name"], "Bahnhofsvorplatz");
        assert_eq!(json["ownerId"], "player-1");

        let back: WithId<Territory> = serde_json::from_value(json).unwrap();
        assert_eq!(back.id, territory.id);
        assert_eq!(back.content, territory.content);
    }
}
