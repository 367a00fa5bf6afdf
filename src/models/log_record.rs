use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;

use super::log_level::LogLevel;

/// One pushed log line.
///
/// A record is keyed by two independent optional fields: the instance it
/// came from and/or the slave it came from. Either or both may be present;
/// a record with neither originated on the master itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    /// Instance the line originated from, when applicable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<u32>,

    /// Slave the line originated from, when applicable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slave_id: Option<u32>,

    pub level: LogLevel,
    pub message: String,

    /// Remaining fields (timestamps, parsed server output, ...).
    #[serde(flatten)]
    pub extra: HashMap<String, JsonValue>,
}

impl LogRecord {
    /// Whether this line originated on the master itself (no instance and
    /// no slave attribution).
    pub fn is_master_level(&self) -> bool {
        self.instance_id.is_none() && self.slave_id.is_none()
    }
}
