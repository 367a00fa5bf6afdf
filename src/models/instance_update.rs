use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;

/// Status update for one instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceUpdate {
    /// Id of the instance this update describes.
    pub id: u32,

    /// Opaque payload fields (name, assigned slave, run status, ...).
    #[serde(flatten)]
    pub fields: HashMap<String, JsonValue>,
}
