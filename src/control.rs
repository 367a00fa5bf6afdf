//! The control link: subscription multiplexing over one master connection.
//!
//! [`ControlLink`] owns one handler registry per topic family and keeps the
//! server informed of exactly the set of keys local consumers are listening
//! to. Registration churn while disconnected succeeds locally and is
//! deferred; every `connect`/`resume` issues a full resync because the
//! server is not assumed to hold prior subscription state for the session.
//!
//! All registry mutation, dispatch, and synchronization is meant to run on
//! one logical thread (the connection's event loop); the desired interest
//! set is recomputed synchronously at send time, so interleaved mutations
//! are always covered by the synchronize they themselves trigger.

use std::sync::Arc;

use crate::error::{ControlLinkError, Result};
use crate::handlers::{
    ConnectionEventHandlers, InstanceUpdateHandler, LogHandler, SaveListUpdateHandler,
    SlaveUpdateHandler,
};
use crate::models::{
    ControlRequest, InstanceUpdate, LogLevel, LogRecord, PushEvent, SaveListUpdate, SessionInfo,
    SlaveUpdate,
};
use crate::registry::{KeyPolicy, Registry, TopicKey};
use crate::transport::{ConnectionEvent, ConnectionPhase, RequestTransport};

/// Client-side core for the control connection to the master server.
///
/// Consumers register interest in slices of server-pushed events through the
/// `on_*`/`off_*` pairs; the transport owner feeds decoded pushes into
/// [`handle_event`](Self::handle_event) and lifecycle signals into
/// [`handle_connection_event`](Self::handle_connection_event).
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use control_link::{ControlLink, RequestTransport, SlaveUpdateHandler};
///
/// # async fn example(transport: Arc<dyn RequestTransport>) -> control_link::Result<()> {
/// let mut link = ControlLink::builder().transport(transport).build()?;
///
/// let handler: SlaveUpdateHandler = Arc::new(|update| {
///     println!("slave {} changed", update.id);
/// });
/// link.on_slave_update(Some(7), handler.clone()).await?;
/// // ... later
/// link.off_slave_update(Some(7), &handler).await?;
/// # Ok(())
/// # }
/// ```
pub struct ControlLink {
    transport: Arc<dyn RequestTransport>,
    phase: ConnectionPhase,
    session: Option<SessionInfo>,
    max_log_level: Option<LogLevel>,
    connection_handlers: ConnectionEventHandlers,

    slave_updates: Registry<SlaveUpdate>,
    instance_updates: Registry<InstanceUpdate>,
    save_list_updates: Registry<SaveListUpdate>,
    instance_logs: Registry<LogRecord>,
    slave_logs: Registry<LogRecord>,
}

impl ControlLink {
    /// Create a new builder for configuring the link.
    pub fn builder() -> ControlLinkBuilder {
        ControlLinkBuilder::new()
    }

    // ── slave status ──────────────────────────────────────────────────────

    /// Register a handler for updates to one slave, or to every slave when
    /// `id` is `None`.
    ///
    /// The first handler for a key triggers a synchronize; its failure is
    /// returned to the caller but the local registration stands, and the
    /// next successful synchronize reconciles.
    pub async fn on_slave_update(
        &mut self,
        id: Option<u32>,
        handler: SlaveUpdateHandler,
    ) -> Result<()> {
        if self.slave_updates.add(TopicKey::from_id(id), handler)? {
            self.sync_slave_subscriptions().await?;
        }
        Ok(())
    }

    /// Remove a previously registered slave update handler.
    pub async fn off_slave_update(
        &mut self,
        id: Option<u32>,
        handler: &SlaveUpdateHandler,
    ) -> Result<()> {
        if self.slave_updates.remove(TopicKey::from_id(id), handler)? {
            self.sync_slave_subscriptions().await?;
        }
        Ok(())
    }

    // ── instance status ───────────────────────────────────────────────────

    /// Register a handler for updates to one instance. Instances have no
    /// wildcard subscription.
    pub async fn on_instance_update(
        &mut self,
        id: u32,
        handler: InstanceUpdateHandler,
    ) -> Result<()> {
        if self.instance_updates.add(TopicKey::Id(id), handler)? {
            self.sync_instance_subscriptions().await?;
        }
        Ok(())
    }

    /// Remove a previously registered instance update handler.
    pub async fn off_instance_update(
        &mut self,
        id: u32,
        handler: &InstanceUpdateHandler,
    ) -> Result<()> {
        if self.instance_updates.remove(TopicKey::Id(id), handler)? {
            self.sync_instance_subscriptions().await?;
        }
        Ok(())
    }

    // ── save lists ────────────────────────────────────────────────────────

    /// Register a handler for save-list changes on one instance.
    pub async fn on_save_list_update(
        &mut self,
        id: u32,
        handler: SaveListUpdateHandler,
    ) -> Result<()> {
        if self.save_list_updates.add(TopicKey::Id(id), handler)? {
            self.sync_save_list_subscriptions().await?;
        }
        Ok(())
    }

    /// Remove a previously registered save-list handler.
    pub async fn off_save_list_update(
        &mut self,
        id: u32,
        handler: &SaveListUpdateHandler,
    ) -> Result<()> {
        if self.save_list_updates.remove(TopicKey::Id(id), handler)? {
            self.sync_save_list_subscriptions().await?;
        }
        Ok(())
    }

    // ── logs ──────────────────────────────────────────────────────────────

    /// Register a handler for log lines from one instance, or from every
    /// instance when `id` is `None`.
    pub async fn on_instance_log(&mut self, id: Option<u32>, handler: LogHandler) -> Result<()> {
        if self.instance_logs.add(TopicKey::from_id(id), handler)? {
            self.sync_log_subscriptions().await?;
        }
        Ok(())
    }

    /// Remove a previously registered instance log handler.
    pub async fn off_instance_log(&mut self, id: Option<u32>, handler: &LogHandler) -> Result<()> {
        if self.instance_logs.remove(TopicKey::from_id(id), handler)? {
            self.sync_log_subscriptions().await?;
        }
        Ok(())
    }

    /// Register a handler for log lines from one slave, or from every slave
    /// when `id` is `None`.
    pub async fn on_slave_log(&mut self, id: Option<u32>, handler: LogHandler) -> Result<()> {
        if self.slave_logs.add(TopicKey::from_id(id), handler)? {
            self.sync_log_subscriptions().await?;
        }
        Ok(())
    }

    /// Remove a previously registered slave log handler.
    pub async fn off_slave_log(&mut self, id: Option<u32>, handler: &LogHandler) -> Result<()> {
        if self.slave_logs.remove(TopicKey::from_id(id), handler)? {
            self.sync_log_subscriptions().await?;
        }
        Ok(())
    }

    /// Register a handler for log lines originating on the master itself.
    pub async fn on_master_log(&mut self, handler: LogHandler) -> Result<()> {
        if self.slave_logs.add(TopicKey::Master, handler)? {
            self.sync_log_subscriptions().await?;
        }
        Ok(())
    }

    /// Remove a previously registered master log handler.
    pub async fn off_master_log(&mut self, handler: &LogHandler) -> Result<()> {
        if self.slave_logs.remove(TopicKey::Master, handler)? {
            self.sync_log_subscriptions().await?;
        }
        Ok(())
    }

    /// Change the verbosity cap carried in log subscription messages and
    /// push the updated subscription to the server.
    pub async fn set_max_log_level(&mut self, level: Option<LogLevel>) -> Result<()> {
        self.max_log_level = level;
        self.sync_log_subscriptions().await
    }

    // ── event dispatch ────────────────────────────────────────────────────

    /// Route one decoded inbound event to the matching listeners.
    ///
    /// Slave updates reach both the slave's own listeners and any wildcard
    /// listeners. Log lines are routed by their instance and slave
    /// attribution independently (a line carrying both reaches both log
    /// registries); unattributed lines go to the master-log position.
    pub fn handle_event(&self, event: &PushEvent) {
        match event {
            PushEvent::SlaveUpdate(update) => {
                self.slave_updates.dispatch(TopicKey::Id(update.id), update);
            }
            PushEvent::InstanceUpdate(update) => {
                self.instance_updates.dispatch(TopicKey::Id(update.id), update);
            }
            PushEvent::SaveListUpdate(update) => {
                self.save_list_updates
                    .dispatch(TopicKey::Id(update.instance_id), update);
            }
            PushEvent::LogMessage(record) => {
                if let Some(id) = record.instance_id {
                    self.instance_logs.dispatch(TopicKey::Id(id), record);
                }
                if let Some(id) = record.slave_id {
                    self.slave_logs.dispatch(TopicKey::Id(id), record);
                }
                if record.is_master_level() {
                    self.slave_logs.dispatch(TopicKey::Master, record);
                }
            }
        }
    }

    // ── connection lifecycle ──────────────────────────────────────────────

    /// Apply one transport lifecycle signal.
    pub async fn handle_connection_event(&mut self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::Connect(session) => self.connection_established(session).await,
            ConnectionEvent::Drop => self.connection_dropped(),
            ConnectionEvent::Resume => self.connection_resumed().await,
            ConnectionEvent::Close => self.connection_closed(),
        }
    }

    async fn connection_established(&mut self, session: SessionInfo) {
        log::debug!("[LIFECYCLE] connected as {}", session.account_name);
        self.phase = ConnectionPhase::Connected;
        self.session = Some(session.clone());
        self.resync_subscriptions().await;
        self.connection_handlers.emit_connect(&session);
    }

    async fn connection_resumed(&mut self) {
        log::debug!("[LIFECYCLE] session resumed");
        self.phase = ConnectionPhase::Connected;
        self.resync_subscriptions().await;
        self.connection_handlers.emit_resume();
    }

    fn connection_dropped(&mut self) {
        log::debug!("[LIFECYCLE] connection dropped");
        self.phase = ConnectionPhase::Disconnected;
        self.connection_handlers.emit_drop();
    }

    fn connection_closed(&mut self) {
        log::debug!("[LIFECYCLE] connection closed");
        self.phase = ConnectionPhase::Disconnected;
        self.session = None;
        self.connection_handlers.emit_close();
    }

    /// Full resync: one synchronize per family with live entries. Failures
    /// are logged, not fatal; subscriptions retry on the next reconnect or
    /// the next local registration churn.
    async fn resync_subscriptions(&self) {
        if !self.slave_updates.is_empty() {
            if let Err(err) = self.sync_slave_subscriptions().await {
                log::warn!("slave subscription resync failed: {}", err);
            }
        }
        if !self.instance_updates.is_empty() {
            if let Err(err) = self.sync_instance_subscriptions().await {
                log::warn!("instance subscription resync failed: {}", err);
            }
        }
        if !self.save_list_updates.is_empty() {
            if let Err(err) = self.sync_save_list_subscriptions().await {
                log::warn!("save-list subscription resync failed: {}", err);
            }
        }
        if !self.instance_logs.is_empty() || !self.slave_logs.is_empty() {
            if let Err(err) = self.sync_log_subscriptions().await {
                log::warn!("log subscription resync failed: {}", err);
            }
        }
    }

    // ── synchronization ───────────────────────────────────────────────────

    async fn sync_slave_subscriptions(&self) -> Result<()> {
        let set = self.slave_updates.interests();
        self.send_subscription_update(ControlRequest::SetSlaveSubscriptions {
            all: set.all,
            slave_ids: set.ids,
        })
        .await
    }

    async fn sync_instance_subscriptions(&self) -> Result<()> {
        let set = self.instance_updates.interests();
        self.send_subscription_update(ControlRequest::SetInstanceSubscriptions {
            all: set.all,
            instance_ids: set.ids,
        })
        .await
    }

    async fn sync_save_list_subscriptions(&self) -> Result<()> {
        let set = self.save_list_updates.interests();
        self.send_subscription_update(ControlRequest::SetSaveListSubscriptions {
            all: set.all,
            instance_ids: set.ids,
        })
        .await
    }

    /// Both log registries synchronize as a single combined message.
    async fn sync_log_subscriptions(&self) -> Result<()> {
        let instance_set = self.instance_logs.interests();
        let slave_set = self.slave_logs.interests();
        self.send_subscription_update(ControlRequest::SetLogSubscriptions {
            all: instance_set.all || slave_set.all,
            master: slave_set.master,
            slave_ids: slave_set.ids,
            instance_ids: instance_set.ids,
            max_level: self.max_log_level,
        })
        .await
    }

    /// Send one desired-interest-set message, or defer silently while
    /// disconnected. The interest set was computed by the caller from the
    /// live registries immediately before this call.
    async fn send_subscription_update(&self, request: ControlRequest) -> Result<()> {
        if self.phase != ConnectionPhase::Connected {
            log::debug!("[SYNC] {} deferred while disconnected", request.name());
            return Ok(());
        }
        log::debug!("[SYNC] sending {}", request.name());
        self.transport
            .send(request)
            .await
            .map(|_| ())
            .map_err(|err| ControlLinkError::SyncFailure(err.to_string()))
    }

    // ── shutdown ──────────────────────────────────────────────────────────

    /// Gracefully shut down: send the prepare-disconnect notice, close the
    /// transport, and apply the close transition.
    ///
    /// A `SessionLost` failure on the notice is swallowed: the session
    /// being invalidated while we are quitting is an expected race. Any
    /// other failure propagates before the transport is closed.
    pub async fn shutdown(&mut self) -> Result<()> {
        match self.transport.send(ControlRequest::PrepareDisconnect).await {
            Ok(_) => {}
            Err(ControlLinkError::SessionLost) => {
                log::debug!("[LIFECYCLE] session already lost during shutdown");
            }
            Err(err) => return Err(err),
        }

        self.transport.close().await?;
        self.connection_closed();
        Ok(())
    }

    // ── accessors ─────────────────────────────────────────────────────────

    /// Current connection phase as seen by the subscription machinery.
    pub fn phase(&self) -> ConnectionPhase {
        self.phase
    }

    pub fn is_connected(&self) -> bool {
        self.phase == ConnectionPhase::Connected
    }

    /// Name of the account this link is connected as, while a session lasts.
    pub fn account_name(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.account_name.as_str())
    }

    /// Verbosity cap carried in log subscription messages.
    pub fn max_log_level(&self) -> Option<LogLevel> {
        self.max_log_level
    }
}

impl std::fmt::Debug for ControlLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlLink")
            .field("phase", &self.phase)
            .field("session", &self.session)
            .field("slave_updates", &self.slave_updates)
            .field("instance_updates", &self.instance_updates)
            .field("save_list_updates", &self.save_list_updates)
            .field("instance_logs", &self.instance_logs)
            .field("slave_logs", &self.slave_logs)
            .finish()
    }
}

// ── Builder ─────────────────────────────────────────────────────────────────

/// Builder for configuring [`ControlLink`] instances.
pub struct ControlLinkBuilder {
    transport: Option<Arc<dyn RequestTransport>>,
    max_log_level: Option<LogLevel>,
    connection_handlers: ConnectionEventHandlers,
}

impl ControlLinkBuilder {
    fn new() -> Self {
        Self {
            transport: None,
            max_log_level: None,
            connection_handlers: ConnectionEventHandlers::new(),
        }
    }

    /// Set the transport handle the link sends requests through. Required.
    pub fn transport(mut self, transport: Arc<dyn RequestTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Cap the verbosity of log lines the server is asked to push.
    pub fn max_log_level(mut self, level: LogLevel) -> Self {
        self.max_log_level = Some(level);
        self
    }

    /// Attach connection lifecycle observers.
    pub fn connection_handlers(mut self, handlers: ConnectionEventHandlers) -> Self {
        self.connection_handlers = handlers;
        self
    }

    /// Build the link. Registries start empty and the phase starts
    /// `Disconnected`; the first `Connect` event performs the initial sync.
    pub fn build(self) -> Result<ControlLink> {
        let transport = self.transport.ok_or_else(|| {
            ControlLinkError::Configuration("transport is required".to_string())
        })?;

        Ok(ControlLink {
            transport,
            phase: ConnectionPhase::Disconnected,
            session: None,
            max_log_level: self.max_log_level,
            connection_handlers: self.connection_handlers,
            slave_updates: Registry::new("slave", KeyPolicy::IdOrAll),
            instance_updates: Registry::new("instance", KeyPolicy::IdOnly),
            save_list_updates: Registry::new("save-list", KeyPolicy::IdOnly),
            instance_logs: Registry::new("instance-log", KeyPolicy::IdOrAll),
            slave_logs: Registry::new("slave-log", KeyPolicy::IdAllOrMaster),
        })
    }
}
