use serde::{Deserialize, Serialize};

/// Session details delivered with the `connect` transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    /// Name of the account this link authenticated as.
    pub account_name: String,
}

impl SessionInfo {
    pub fn new(account_name: impl Into<String>) -> Self {
        Self {
            account_name: account_name.into(),
        }
    }
}
