use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Updated list of saves for one instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveListUpdate {
    /// Id of the instance whose save list changed.
    pub instance_id: u32,

    /// The save entries; their schema is the server's concern.
    #[serde(default)]
    pub list: Vec<JsonValue>,
}
