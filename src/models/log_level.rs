use serde::{Deserialize, Serialize};
use std::fmt;

/// Verbosity levels of cluster log lines, most to least severe.
///
/// `Server` lines are raw game-server console output forwarded as-is and
/// sort outside the severity scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Fatal,
    Error,
    Warn,
    Audit,
    Info,
    Verbose,
    Server,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Fatal => "fatal",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Audit => "audit",
            LogLevel::Info => "info",
            LogLevel::Verbose => "verbose",
            LogLevel::Server => "server",
        };
        write!(f, "{}", name)
    }
}
