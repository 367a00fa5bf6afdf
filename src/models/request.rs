use serde::{Deserialize, Serialize};

use super::log_level::LogLevel;

/// Client-to-server request messages sent through the RPC boundary.
///
/// The subscription-set messages always carry the full desired interest set
/// for their family; the server replaces, not merges, its record of this
/// client's interests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlRequest {
    /// Replace the set of slaves whose status updates this client wants.
    SetSlaveSubscriptions {
        all: bool,
        slave_ids: Vec<u32>,
    },

    /// Replace the set of instances whose status updates this client wants.
    SetInstanceSubscriptions {
        all: bool,
        instance_ids: Vec<u32>,
    },

    /// Replace the set of instances whose save-list updates this client wants.
    SetSaveListSubscriptions {
        all: bool,
        instance_ids: Vec<u32>,
    },

    /// Replace the combined log subscription: slave lines, instance lines,
    /// master-level lines, and an optional verbosity cap.
    SetLogSubscriptions {
        all: bool,
        master: bool,
        slave_ids: Vec<u32>,
        instance_ids: Vec<u32>,
        /// `null` when no cap is set.
        max_level: Option<LogLevel>,
    },

    /// Polite notice that this client is about to disconnect.
    PrepareDisconnect,
}

impl ControlRequest {
    /// Stable request name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            ControlRequest::SetSlaveSubscriptions { .. } => "set_slave_subscriptions",
            ControlRequest::SetInstanceSubscriptions { .. } => "set_instance_subscriptions",
            ControlRequest::SetSaveListSubscriptions { .. } => "set_save_list_subscriptions",
            ControlRequest::SetLogSubscriptions { .. } => "set_log_subscriptions",
            ControlRequest::PrepareDisconnect => "prepare_disconnect",
        }
    }
}
