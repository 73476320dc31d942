use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::HasId;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub display_name: String,
}

impl HasId for Player {
    type IdType = String;
}
