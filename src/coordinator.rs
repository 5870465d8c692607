use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::api::{
    ApiAck, AppointmentAction, AppointmentPage, ConnectionApi, ConnectionStatusResponse,
    MessagePage, NotificationPage, ResourcePage, SendMessageAck, SendMessageRequest,
    ShareResourceRequest, SyncAppointmentRequest,
};
use crate::config::CoordinatorConfig;
use crate::event::{
    AppointmentEvent, ChannelEvent, EventError, EventHandler, EventTag, HandlerRegistry,
    MessageDirection, MessageEvent, NotificationEvent, ResourceEvent, StatusEvent, SubscriptionId,
};
use crate::identity::{PeerIdentity, Role};
use crate::notify::{
    Notification, NotificationKind, NotificationSink, Notifier, DEFAULT_DISMISS_MS,
};
use crate::shared::BridgeError;
use crate::transport::{PushTransport, ServerFrame, TransportEvent};

/// Link status as last observed, readable by indicator renderers.
#[derive(Debug, Clone, Default)]
pub struct ConnectionState {
    pub connected: bool,
    pub last_confirmed: Option<DateTime<Utc>>,
}

/// Lifecycle of a coordinator instance.
///
/// `Degraded` and `Linked` both accept REST operations; only `Linked`
/// receives push-delivered events, so `Degraded` relies on explicit polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Uninitialized,
    Resolving,
    Linked,
    Degraded,
    Disconnected,
}

/// Bridges the push transport and the polling REST backend into one event
/// surface, so application code never needs to know which source produced a
/// given fact.
///
/// One instance owns its handler registry and connection state exclusively;
/// collaborators are injected rather than reached through ambient globals.
pub struct ConnectionCoordinator {
    config: CoordinatorConfig,
    api: Arc<dyn ConnectionApi>,
    transport: Arc<dyn PushTransport>,
    registry: Arc<HandlerRegistry>,
    notifier: Notifier,
    state: Arc<RwLock<ConnectionState>>,
    link: Arc<RwLock<LinkState>>,
    identity: Arc<RwLock<Option<PeerIdentity>>>,
    role: Arc<RwLock<Option<Role>>>,
    pump: tokio::sync::Mutex<Option<JoinHandle<()>>>,
    torn_down: AtomicBool,
}

impl ConnectionCoordinator {
    pub fn new(
        config: CoordinatorConfig,
        api: Arc<dyn ConnectionApi>,
        transport: Arc<dyn PushTransport>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        let identity = config
            .identity_pair()
            .map(|(student, therapist)| PeerIdentity::new(student, therapist));
        let role = config.role;

        Self {
            api,
            transport,
            registry: Arc::new(HandlerRegistry::new()),
            notifier: Notifier::new(sink),
            state: Arc::new(RwLock::new(ConnectionState::default())),
            link: Arc::new(RwLock::new(LinkState::Uninitialized)),
            identity: Arc::new(RwLock::new(identity)),
            role: Arc::new(RwLock::new(role)),
            config,
            pump: tokio::sync::Mutex::new(None),
            torn_down: AtomicBool::new(false),
        }
    }

    /// Bring the coordinator up.
    ///
    /// Missing identities are resolved through the REST collaborator; if that
    /// fails the coordinator logs and runs `Degraded` rather than erroring,
    /// since the surface must stay usable while a peer is not yet linked.
    /// With a full identity pair the push transport is attached and the
    /// status indicator primed.
    pub async fn initialize(&self) {
        self.set_link(LinkState::Resolving);

        if self.identity().is_none() {
            self.resolve_identity().await;
        }

        match self.identity() {
            Some(identity) => {
                info!(
                    room_key = %identity.room_key(),
                    role = ?self.role(),
                    "Care link initialized"
                );
                self.attach_transport(identity).await;
                if let Err(e) = self.request_connection_status().await {
                    debug!(error = %e, "Initial status poll failed");
                }
            }
            None => {
                warn!("Peer identity unknown - running degraded, polling only");
                self.set_link(LinkState::Degraded);
            }
        }
    }

    // === EVENT SURFACE ===

    /// Register a handler for a tag. Invocation order is registration order.
    pub fn subscribe(&self, tag: EventTag, handler: Arc<dyn EventHandler>) -> SubscriptionId {
        self.registry.subscribe(tag, handler)
    }

    /// Register a plain closure as a handler.
    pub fn subscribe_fn<F>(&self, tag: EventTag, handler: F) -> SubscriptionId
    where
        F: Fn(&ChannelEvent) -> Result<(), EventError> + Send + Sync + 'static,
    {
        self.registry.subscribe(tag, Arc::new(handler))
    }

    /// Remove exactly the handler registered under `id`.
    pub fn unsubscribe(&self, tag: EventTag, id: SubscriptionId) -> bool {
        self.registry.unsubscribe(tag, id)
    }

    /// Synchronous fan-out to every handler registered for the event's tag.
    ///
    /// Usable for locally-originated optimistic events as well as
    /// transport-originated ones.
    pub fn publish(&self, event: ChannelEvent) {
        self.registry.dispatch(&event);
    }

    // === MESSAGING ===

    /// Send a chat message to the peer.
    ///
    /// On acknowledgment a `message` event is published and a notification
    /// shown; a rejection publishes nothing and surfaces the server's reason.
    /// No retry either way.
    #[instrument(skip(self, metadata))]
    pub async fn send_message(
        &self,
        content: &str,
        kind: &str,
        metadata: serde_json::Value,
    ) -> Result<SendMessageAck, BridgeError> {
        let identity = self.require_identity()?;
        let request = SendMessageRequest {
            student_id: identity.student_id,
            therapist_id: identity.therapist_id,
            message: content.to_string(),
            kind: kind.to_string(),
            metadata,
        };

        match self.api.send_message(&request).await {
            Ok(ack) if ack.success => {
                self.publish(ChannelEvent::Message(MessageEvent {
                    direction: MessageDirection::Sent,
                    content: content.to_string(),
                    kind: kind.to_string(),
                    timestamp: ack.timestamp.or_else(|| Some(Utc::now())),
                    message_id: ack.message_id.clone(),
                    sender: self.role(),
                    correlation_id: Uuid::new_v4(),
                }));
                self.show_notification("Message sent", NotificationKind::Success, DEFAULT_DISMISS_MS);
                Ok(ack)
            }
            Ok(ack) => {
                let reason = ack
                    .error
                    .unwrap_or_else(|| "Failed to send message".to_string());
                self.show_notification(
                    &format!("Failed to send message: {}", reason),
                    NotificationKind::Error,
                    DEFAULT_DISMISS_MS,
                );
                Err(BridgeError::Network(reason))
            }
            Err(e) => {
                self.show_notification(
                    &format!("Failed to send message: {}", e),
                    NotificationKind::Error,
                    DEFAULT_DISMISS_MS,
                );
                Err(e)
            }
        }
    }

    /// Fetch a page of persisted messages for this link.
    pub async fn load_messages(&self, limit: u32, offset: u32) -> Result<MessagePage, BridgeError> {
        let identity = self.require_identity()?;
        self.api.fetch_messages(&identity, limit, offset).await
    }

    // === APPOINTMENTS ===

    /// Apply an action to a shared appointment.
    pub async fn sync_appointment(
        &self,
        appointment_id: &str,
        action: AppointmentAction,
        extra: serde_json::Map<String, serde_json::Value>,
    ) -> Result<ApiAck, BridgeError> {
        let identity = self.require_identity()?;
        let request = SyncAppointmentRequest {
            student_id: identity.student_id,
            therapist_id: identity.therapist_id,
            appointment_id: appointment_id.to_string(),
            action,
            extra,
        };

        match self.api.sync_appointment(&request).await {
            Ok(ack) if ack.success => {
                self.show_notification(
                    &format!("Appointment {} successful", action),
                    NotificationKind::Success,
                    DEFAULT_DISMISS_MS,
                );
                self.publish(ChannelEvent::AppointmentUpdated(AppointmentEvent {
                    appointment_id: appointment_id.to_string(),
                    action: action.to_string(),
                    updated_by: self.role(),
                    timestamp: Some(Utc::now()),
                }));
                Ok(ack)
            }
            Ok(ack) => {
                let reason = ack
                    .error
                    .unwrap_or_else(|| format!("Failed to {} appointment", action));
                self.show_notification(
                    &format!("Failed to {} appointment: {}", action, reason),
                    NotificationKind::Error,
                    DEFAULT_DISMISS_MS,
                );
                Err(BridgeError::Network(reason))
            }
            Err(e) => {
                self.show_notification(
                    &format!("Failed to {} appointment: {}", action, e),
                    NotificationKind::Error,
                    DEFAULT_DISMISS_MS,
                );
                Err(e)
            }
        }
    }

    /// Fetch appointments shared on this link.
    pub async fn load_appointments(
        &self,
        status: &str,
        limit: u32,
    ) -> Result<AppointmentPage, BridgeError> {
        let identity = self.require_identity()?;
        self.api.fetch_appointments(&identity, status, limit).await
    }

    // === RESOURCES ===

    /// Share a resource with the peer.
    pub async fn share_resource(
        &self,
        resource_id: &str,
        message: &str,
    ) -> Result<ApiAck, BridgeError> {
        let identity = self.require_identity()?;
        let request = ShareResourceRequest {
            student_id: identity.student_id,
            therapist_id: identity.therapist_id,
            resource_id: resource_id.to_string(),
            message: message.to_string(),
        };

        match self.api.share_resource(&request).await {
            Ok(ack) if ack.success => {
                self.show_notification(
                    "Resource shared successfully",
                    NotificationKind::Success,
                    DEFAULT_DISMISS_MS,
                );
                let title = ack
                    .extra
                    .get("resource")
                    .and_then(|r| r.get("title"))
                    .and_then(|t| t.as_str())
                    .map(str::to_string);
                self.publish(ChannelEvent::ResourceShared(ResourceEvent {
                    resource_id: resource_id.to_string(),
                    title,
                    message: (!message.is_empty()).then(|| message.to_string()),
                    timestamp: Some(Utc::now()),
                }));
                Ok(ack)
            }
            Ok(ack) => {
                let reason = ack
                    .error
                    .unwrap_or_else(|| "Failed to share resource".to_string());
                self.show_notification(
                    &format!("Failed to share resource: {}", reason),
                    NotificationKind::Error,
                    DEFAULT_DISMISS_MS,
                );
                Err(BridgeError::Network(reason))
            }
            Err(e) => {
                self.show_notification(
                    &format!("Failed to share resource: {}", e),
                    NotificationKind::Error,
                    DEFAULT_DISMISS_MS,
                );
                Err(e)
            }
        }
    }

    /// Fetch resources already shared on this link.
    pub async fn load_shared_resources(&self, limit: u32) -> Result<ResourcePage, BridgeError> {
        let identity = self.require_identity()?;
        self.api.fetch_shared_resources(&identity, limit).await
    }

    // === NOTIFICATIONS ===

    /// Fetch server-side notifications for the current user.
    pub async fn load_notifications(
        &self,
        limit: u32,
        unread_only: bool,
    ) -> Result<NotificationPage, BridgeError> {
        self.api.fetch_notifications(limit, unread_only).await
    }

    /// Mark one server-side notification as read.
    pub async fn mark_notification_read(&self, notification_id: &str) -> Result<(), BridgeError> {
        let ack = self.api.mark_notification_read(notification_id).await?;
        if ack.success {
            Ok(())
        } else {
            Err(BridgeError::Network(ack.error.unwrap_or_else(|| {
                "Failed to mark notification as read".to_string()
            })))
        }
    }

    /// Show a transient notification and publish the matching event.
    ///
    /// `duration_ms <= 0` keeps the notification until explicitly dismissed.
    pub fn show_notification(
        &self,
        message: &str,
        kind: NotificationKind,
        duration_ms: i64,
    ) -> Notification {
        show_and_publish(&self.registry, &self.notifier, message, kind, duration_ms)
    }

    /// Dismiss a notification shown earlier.
    pub fn dismiss_notification(&self, id: Uuid) -> bool {
        self.notifier.dismiss(id)
    }

    /// Snapshot of notifications currently visible.
    pub fn visible_notifications(&self) -> Vec<Notification> {
        self.notifier.active()
    }

    // === STATUS ===

    /// Poll the backend for link status.
    ///
    /// A `connection_status` event is republished whether or not the value
    /// changed; callers needing change-only semantics must diff themselves.
    #[instrument(skip(self))]
    pub async fn request_connection_status(
        &self,
    ) -> Result<ConnectionStatusResponse, BridgeError> {
        let identity = self.require_identity()?;

        match self.api.connection_status(&identity).await {
            Ok(response) => {
                {
                    let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
                    state.connected = response.connection_active;
                    if response.connection_active {
                        state.last_confirmed = Some(Utc::now());
                    }
                }
                self.notifier.update_status(response.connection_active);
                self.publish(ChannelEvent::ConnectionStatus(StatusEvent {
                    connection_active: response.connection_active,
                    checked_at: Utc::now(),
                }));
                Ok(response)
            }
            Err(e) => {
                // The indicator goes red, but a failed poll does not rewrite
                // the transport-owned state.
                self.notifier.update_status(false);
                Err(e)
            }
        }
    }

    // === ACCESSORS ===

    pub fn identity(&self) -> Option<PeerIdentity> {
        *self.identity.read().unwrap_or_else(|e| e.into_inner())
    }

    pub fn role(&self) -> Option<Role> {
        *self.role.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Canonical room key, once the identity pair is known.
    pub fn room_key(&self) -> Option<String> {
        self.identity().map(|identity| identity.room_key())
    }

    pub fn link_state(&self) -> LinkState {
        *self.link.read().unwrap_or_else(|e| e.into_inner())
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.state.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    // === CLEANUP ===

    /// Close the transport, clear handlers and notifications.
    ///
    /// Idempotent: the second call is a no-op.
    pub async fn teardown(&self) {
        if self.torn_down.swap(true, Ordering::SeqCst) {
            debug!("Teardown already performed");
            return;
        }

        info!("Tearing down coordinator");
        if let Some(handle) = self.pump.lock().await.take() {
            handle.abort();
        }
        self.transport.close().await;
        self.registry.clear();
        self.notifier.clear();
        {
            let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
            state.connected = false;
        }
        self.set_link(LinkState::Uninitialized);
    }

    // === INTERNAL ===

    fn set_link(&self, next: LinkState) {
        let mut link = self.link.write().unwrap_or_else(|e| e.into_inner());
        if *link != next {
            debug!(from = ?*link, to = ?next, "Link state changed");
            *link = next;
        }
    }

    fn require_identity(&self) -> Result<PeerIdentity, BridgeError> {
        self.identity()
            .ok_or_else(|| BridgeError::network("peer identity not resolved"))
    }

    /// Fill in missing party ids from the identity-resolution endpoint.
    ///
    /// A student learns their therapist from the connection list; a therapist
    /// only learns their own id, the student id arrives with the view
    /// context. Failure is soft.
    async fn resolve_identity(&self) {
        let info = match self.api.resolve_identity().await {
            Ok(info) => info,
            Err(e) => {
                warn!(error = %e, "Identity resolution failed");
                return;
            }
        };

        {
            let mut role = self.role.write().unwrap_or_else(|e| e.into_inner());
            *role = Some(info.user_role);
        }

        let mut student = self.config.student_id;
        let mut therapist = self.config.therapist_id;
        match info.user_role {
            Role::Student => {
                student = student.or(Some(info.user_id));
                if therapist.is_none() {
                    therapist = info
                        .connections
                        .iter()
                        .find(|link| link.kind == "therapist")
                        .map(|link| link.id);
                }
            }
            Role::Therapist => {
                therapist = therapist.or(Some(info.user_id));
            }
        }

        if let (Some(student), Some(therapist)) = (student, therapist) {
            let mut identity = self.identity.write().unwrap_or_else(|e| e.into_inner());
            *identity = Some(PeerIdentity::new(student, therapist));
        }
    }

    async fn attach_transport(&self, identity: PeerIdentity) {
        match self.transport.connect(identity).await {
            Ok(rx) => {
                let context = PumpContext {
                    registry: Arc::clone(&self.registry),
                    notifier: self.notifier.clone(),
                    state: Arc::clone(&self.state),
                    link: Arc::clone(&self.link),
                    role: Arc::clone(&self.role),
                };
                let handle = tokio::spawn(pump(rx, context));
                *self.pump.lock().await = Some(handle);
                self.set_link(LinkState::Linked);
            }
            Err(e) => {
                warn!(error = %e, "Transport attach failed");
                self.set_link(LinkState::Disconnected);
            }
        }
    }
}

/// Everything the event pump needs from the coordinator.
struct PumpContext {
    registry: Arc<HandlerRegistry>,
    notifier: Notifier,
    state: Arc<RwLock<ConnectionState>>,
    link: Arc<RwLock<LinkState>>,
    role: Arc<RwLock<Option<Role>>>,
}

/// Convert transport events into publications, notifications and state
/// updates. Runs until the transport channel closes or the pump is aborted.
async fn pump(mut rx: mpsc::UnboundedReceiver<TransportEvent>, context: PumpContext) {
    while let Some(event) = rx.recv().await {
        match event {
            TransportEvent::Connected => {
                {
                    let mut state = context.state.write().unwrap_or_else(|e| e.into_inner());
                    state.connected = true;
                    state.last_confirmed = Some(Utc::now());
                }
                *context.link.write().unwrap_or_else(|e| e.into_inner()) = LinkState::Linked;
                context.notifier.update_status(true);
                debug!("Push channel connected");
            }
            TransportEvent::Disconnected { reason } => {
                {
                    let mut state = context.state.write().unwrap_or_else(|e| e.into_inner());
                    state.connected = false;
                }
                *context.link.write().unwrap_or_else(|e| e.into_inner()) = LinkState::Disconnected;
                context.notifier.update_status(false);
                warn!(reason = %reason, "Push channel lost");
            }
            TransportEvent::Frame(frame) => handle_frame(&context, frame),
        }
    }
    debug!("Event pump stopped");
}

fn handle_frame(context: &PumpContext, frame: ServerFrame) {
    match frame {
        ServerFrame::NewMessage(message) => {
            let own_role = *context.role.read().unwrap_or_else(|e| e.into_inner());
            let from_peer = own_role != Some(message.sender);
            if from_peer {
                show_and_publish(
                    &context.registry,
                    &context.notifier,
                    "New message received",
                    NotificationKind::Success,
                    DEFAULT_DISMISS_MS,
                );
            }
            context
                .registry
                .dispatch(&ChannelEvent::Message(MessageEvent {
                    direction: if from_peer {
                        MessageDirection::Received
                    } else {
                        MessageDirection::Sent
                    },
                    content: message.content,
                    kind: message.kind,
                    timestamp: message.timestamp,
                    message_id: Some(message.message_id),
                    sender: Some(message.sender),
                    correlation_id: Uuid::new_v4(),
                }));
        }
        ServerFrame::AppointmentUpdated(update) => {
            let text = update
                .action
                .parse::<AppointmentAction>()
                .map(|action| action.past_tense().to_string())
                .unwrap_or_else(|_| update.action.clone());
            show_and_publish(
                &context.registry,
                &context.notifier,
                &format!("Appointment {}", text),
                NotificationKind::Success,
                DEFAULT_DISMISS_MS,
            );
            context
                .registry
                .dispatch(&ChannelEvent::AppointmentUpdated(AppointmentEvent {
                    appointment_id: update.appointment_id,
                    action: update.action,
                    updated_by: update.updated_by,
                    timestamp: update.timestamp,
                }));
        }
        ServerFrame::ResourceShared(share) => {
            let title = share.title.clone().unwrap_or_else(|| "resource".to_string());
            show_and_publish(
                &context.registry,
                &context.notifier,
                &format!("Resource shared: {}", title),
                NotificationKind::Success,
                DEFAULT_DISMISS_MS,
            );
            context
                .registry
                .dispatch(&ChannelEvent::ResourceShared(ResourceEvent {
                    resource_id: share.resource_id,
                    title: share.title,
                    message: None,
                    timestamp: share.timestamp,
                }));
        }
        ServerFrame::MessageDelivered { message_id, .. } => {
            debug!(message_id = %message_id, "Message delivered");
        }
        ServerFrame::JoinedConnectionRoom { room_id } => {
            debug!(room_id = %room_id, "Join acknowledged");
        }
        ServerFrame::UserJoined { user_role } => {
            debug!(peer = ?user_role, "Peer joined room");
        }
        ServerFrame::UserLeft { user_role } => {
            debug!(peer = ?user_role, "Peer left room");
        }
        ServerFrame::RoomStatus(status) => {
            debug!(status = %status, "Room status");
        }
        ServerFrame::Error { message } => {
            warn!(message = %message, "Push channel rejected a frame");
        }
    }
}

fn show_and_publish(
    registry: &HandlerRegistry,
    notifier: &Notifier,
    message: &str,
    kind: NotificationKind,
    duration_ms: i64,
) -> Notification {
    let shown = notifier.show(message, kind, duration_ms);
    registry.dispatch(&ChannelEvent::Notification(NotificationEvent {
        id: shown.id,
        message: shown.message.clone(),
        kind: shown.kind,
        created_at: shown.created_at,
    }));
    shown
}
