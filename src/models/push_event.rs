use serde::{Deserialize, Serialize};

use super::instance_update::InstanceUpdate;
use super::log_record::LogRecord;
use super::save_list_update::SaveListUpdate;
use super::slave_update::SlaveUpdate;

/// Server-pushed events, decoded once at the transport boundary.
///
/// Routing keys on the variant and its id fields; everything else rides
/// along opaquely.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PushEvent {
    SlaveUpdate(SlaveUpdate),
    InstanceUpdate(InstanceUpdate),
    SaveListUpdate(SaveListUpdate),
    LogMessage(LogRecord),
}
