//! Boundary to the transport and RPC collaborator.
//!
//! The link never touches socket internals. It consumes exactly three things
//! from the transport layer: a request-sending primitive, a close primitive,
//! and connection lifecycle notifications delivered as
//! [`ConnectionEvent`]s. Connection establishment, framing, authentication,
//! and reconnection backoff all live behind this boundary.

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::error::Result;
use crate::models::{ControlRequest, SessionInfo};

/// Whether subscription synchronization may currently reach the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    Disconnected,
    Connected,
}

/// Transport lifecycle signals, delivered to
/// [`ControlLink::handle_connection_event`](crate::ControlLink::handle_connection_event).
#[derive(Debug, Clone)]
pub enum ConnectionEvent {
    /// A fresh connection was established (including the first one). The
    /// server holds no prior subscription state for this session.
    Connect(SessionInfo),
    /// The connection was lost; the transport may attempt to recover it.
    Drop,
    /// An existing session was recovered after a transient drop. Server-side
    /// subscription state is not assumed to have survived.
    Resume,
    /// Terminal for this connection instance; no resumption expected.
    Close,
}

/// Request surface of the transport.
///
/// `send` resolves with the server's reply and fails with
/// [`SessionLost`](crate::ControlLinkError::SessionLost) or
/// [`Transport`](crate::ControlLinkError::Transport) when the connection is
/// lost mid-call.
#[async_trait]
pub trait RequestTransport: Send + Sync {
    async fn send(&self, request: ControlRequest) -> Result<JsonValue>;

    /// Close the underlying connection. Used by the graceful shutdown path
    /// after the prepare-disconnect notice.
    async fn close(&self) -> Result<()>;
}
