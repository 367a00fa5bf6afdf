//! Handler types for pushed events and connection lifecycle callbacks.
//!
//! Event handlers are plain `Arc<dyn Fn>` values; the `Arc` identity is what
//! registration and removal compare, so keep the clone you registered if you
//! intend to unregister it later.

use std::fmt;
use std::sync::Arc;

use crate::models::{InstanceUpdate, LogRecord, SaveListUpdate, SessionInfo, SlaveUpdate};
use crate::registry::EventHandler;

/// Handler for slave status updates.
pub type SlaveUpdateHandler = EventHandler<SlaveUpdate>;

/// Handler for instance status updates.
pub type InstanceUpdateHandler = EventHandler<InstanceUpdate>;

/// Handler for save-list updates.
pub type SaveListUpdateHandler = EventHandler<SaveListUpdate>;

/// Handler for log lines (instance, slave, or master scoped).
pub type LogHandler = EventHandler<LogRecord>;

/// Type alias for the on_connect callback.
pub type OnConnectCallback = Arc<dyn Fn(&SessionInfo) + Send + Sync>;

/// Type alias for the on_drop / on_resume / on_close callbacks.
pub type OnTransitionCallback = Arc<dyn Fn() + Send + Sync>;

/// Connection lifecycle observers.
///
/// All callbacks are optional and invoked after the corresponding transition
/// has been applied, so a callback reading the link sees the new phase.
#[derive(Clone, Default)]
pub struct ConnectionEventHandlers {
    pub(crate) on_connect: Option<OnConnectCallback>,
    pub(crate) on_drop: Option<OnTransitionCallback>,
    pub(crate) on_resume: Option<OnTransitionCallback>,
    pub(crate) on_close: Option<OnTransitionCallback>,
}

impl fmt::Debug for ConnectionEventHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionEventHandlers")
            .field("on_connect", &self.on_connect.is_some())
            .field("on_drop", &self.on_drop.is_some())
            .field("on_resume", &self.on_resume.is_some())
            .field("on_close", &self.on_close.is_some())
            .finish()
    }
}

impl ConnectionEventHandlers {
    /// Create a new empty set (no callbacks registered).
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback invoked when a fresh connection is established.
    pub fn on_connect(mut self, f: impl Fn(&SessionInfo) + Send + Sync + 'static) -> Self {
        self.on_connect = Some(Arc::new(f));
        self
    }

    /// Register a callback invoked when the connection is lost.
    pub fn on_drop(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_drop = Some(Arc::new(f));
        self
    }

    /// Register a callback invoked when a dropped session is recovered.
    pub fn on_resume(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_resume = Some(Arc::new(f));
        self
    }

    /// Register a callback invoked when the connection closes for good.
    pub fn on_close(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_close = Some(Arc::new(f));
        self
    }

    /// Returns `true` if any callback is registered.
    pub fn has_any(&self) -> bool {
        self.on_connect.is_some()
            || self.on_drop.is_some()
            || self.on_resume.is_some()
            || self.on_close.is_some()
    }

    pub(crate) fn emit_connect(&self, session: &SessionInfo) {
        if let Some(cb) = &self.on_connect {
            cb(session);
        }
    }

    pub(crate) fn emit_drop(&self) {
        if let Some(cb) = &self.on_drop {
            cb();
        }
    }

    pub(crate) fn emit_resume(&self) {
        if let Some(cb) = &self.on_resume {
            cb();
        }
    }

    pub(crate) fn emit_close(&self) {
        if let Some(cb) = &self.on_close {
            cb();
        }
    }
}
