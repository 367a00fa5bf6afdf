use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;

/// Status update for one slave.
///
/// Only the id matters for routing; the remaining fields are the server's
/// business payload and are carried through untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlaveUpdate {
    /// Id of the slave this update describes.
    pub id: u32,

    /// Opaque payload fields (name, connection status, version, ...).
    #[serde(flatten)]
    pub fields: HashMap<String, JsonValue>,
}
