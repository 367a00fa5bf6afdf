//! Subscription multiplexing and event dispatch for the control connection
//! to a cluster master server.
//!
//! Many independent consumers (pages, widgets, tools) each want a narrow
//! slice of the events the master pushes: status updates for one slave or
//! instance, the save list of one instance, log lines from one source. None
//! of them should need to open its own channel. [`ControlLink`] multiplexes them
//! over a single duplex connection:
//!
//! - **Interest tracking**: one reference-counted [`Registry`] per topic
//!   family maps topic keys to ordered handler lists. The desired interest
//!   set is derived from the live mapping on demand, never cached.
//! - **Synchronization**: whenever a key becomes present or absent, the
//!   owning family transmits its full desired set to the server. While
//!   disconnected, sends are deferred; every connect or resume issues a
//!   full resync.
//! - **Dispatch**: each decoded inbound event fans out to exactly the
//!   listeners whose key matches, wildcard listeners included, with
//!   per-handler panic isolation.
//!
//! The transport itself (sockets, framing, authentication, reconnect
//! backoff) lives behind the [`RequestTransport`] boundary; lifecycle
//! signals and decoded pushes are fed to the link as plain method calls,
//! which keeps the whole core testable without a network.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use control_link::{ConnectionEvent, ControlLink, LogHandler, RequestTransport, SessionInfo};
//!
//! # async fn example(transport: Arc<dyn RequestTransport>) -> control_link::Result<()> {
//! let mut link = ControlLink::builder().transport(transport).build()?;
//!
//! let handler: LogHandler = Arc::new(|record| println!("{}: {}", record.level, record.message));
//! link.on_instance_log(Some(42), handler.clone()).await?;
//!
//! // The transport owner drives the lifecycle:
//! link.handle_connection_event(ConnectionEvent::Connect(SessionInfo::new("admin"))).await;
//! # Ok(())
//! # }
//! ```

pub mod control;
pub mod error;
pub mod handlers;
pub mod models;
pub mod registry;
pub mod transport;

pub use control::{ControlLink, ControlLinkBuilder};
pub use error::{ControlLinkError, Result};
pub use handlers::{
    ConnectionEventHandlers, InstanceUpdateHandler, LogHandler, SaveListUpdateHandler,
    SlaveUpdateHandler,
};
pub use models::{
    ControlRequest, InstanceUpdate, LogLevel, LogRecord, PushEvent, SaveListUpdate, SessionInfo,
    SlaveUpdate,
};
pub use registry::{EventHandler, InterestSet, KeyPolicy, Registry, TopicKey};
pub use transport::{ConnectionEvent, ConnectionPhase, RequestTransport};
