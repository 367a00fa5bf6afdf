//! Error types for the control-link crate.
//!
//! Registration-time errors ([`InvalidKey`](ControlLinkError::InvalidKey),
//! [`NotRegistered`](ControlLinkError::NotRegistered)) are synchronous and
//! surface to the caller immediately. Synchronization errors
//! ([`SyncFailure`](ControlLinkError::SyncFailure)) are non-fatal: local
//! subscription state stays valid and the next successful synchronize
//! reconciles it with the server.

use thiserror::Error;

/// Errors produced by the control link.
#[derive(Error, Debug)]
pub enum ControlLinkError {
    /// A malformed topic key was passed to a registration call: a zero id,
    /// or a sentinel the topic family does not permit.
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// An unregistration named a key with no handlers, or a handler that was
    /// never registered under that key. This is a local programmer error and
    /// alters no registry state.
    #[error("Not registered: {0}")]
    NotRegistered(String),

    /// Sending the desired interest set to the server failed. The local
    /// registry is unchanged; correctness is restored by the next sync
    /// trigger or reconnect.
    #[error("Subscription sync failed: {0}")]
    SyncFailure(String),

    /// The session backing the connection was invalidated server-side.
    /// Expected during shutdown races; an error anywhere else.
    #[error("Session lost")]
    SessionLost,

    /// Any other transport fault reported at the RPC boundary.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The link was constructed with incomplete or inconsistent options.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Convenience result type for control-link operations.
pub type Result<T> = std::result::Result<T, ControlLinkError>;
