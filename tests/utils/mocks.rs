use async_trait::async_trait;
use std::sync::Mutex;
use tokio::sync::mpsc;
use uuid::Uuid;

use carelink::api::{
    ApiAck, AppointmentPage, ConnectionApi, ConnectionStatusResponse, IdentityInfo, MessagePage,
    NotificationPage, ResourcePage, SendMessageAck, SendMessageRequest, ShareResourceRequest,
    SyncAppointmentRequest,
};
use carelink::event::{ChannelEvent, EventError, EventHandler, EventTag};
use carelink::identity::PeerIdentity;
use carelink::notify::{Notification, NotificationKind, NotificationSink};
use carelink::shared::BridgeError;
use carelink::transport::{PushTransport, TransportEvent};

// ============================================================================
// Mock Infrastructure
// ============================================================================

pub fn ack_success() -> ApiAck {
    ApiAck {
        success: true,
        error: None,
        extra: serde_json::Map::new(),
    }
}

pub fn ack_failure(reason: &str) -> ApiAck {
    ApiAck {
        success: false,
        error: Some(reason.to_string()),
        extra: serde_json::Map::new(),
    }
}

/// Scripted REST collaborator.
///
/// Every response can be replaced from the test body; every mutating request
/// is recorded for inspection.
pub struct MockConnectionApi {
    pub identity_response: Mutex<Option<IdentityInfo>>,
    pub send_message_ack: Mutex<SendMessageAck>,
    pub send_message_unreachable: Mutex<bool>,
    pub sync_ack: Mutex<ApiAck>,
    pub share_ack: Mutex<ApiAck>,
    pub status_response: Mutex<Result<bool, String>>,

    pub sent_messages: Mutex<Vec<SendMessageRequest>>,
    pub synced_appointments: Mutex<Vec<SyncAppointmentRequest>>,
    pub shared_resources: Mutex<Vec<ShareResourceRequest>>,
    pub status_polls: Mutex<u32>,
    pub notifications_marked_read: Mutex<Vec<String>>,
}

impl MockConnectionApi {
    pub fn new() -> Self {
        Self {
            identity_response: Mutex::new(None),
            send_message_ack: Mutex::new(SendMessageAck {
                success: true,
                message_id: Some("m-1".to_string()),
                timestamp: None,
                error: None,
            }),
            send_message_unreachable: Mutex::new(false),
            sync_ack: Mutex::new(ack_success()),
            share_ack: Mutex::new(ack_success()),
            status_response: Mutex::new(Ok(true)),
            sent_messages: Mutex::new(Vec::new()),
            synced_appointments: Mutex::new(Vec::new()),
            shared_resources: Mutex::new(Vec::new()),
            status_polls: Mutex::new(0),
            notifications_marked_read: Mutex::new(Vec::new()),
        }
    }

    pub fn set_identity_response(&self, info: IdentityInfo) {
        *self.identity_response.lock().unwrap() = Some(info);
    }

    pub fn set_send_message_ack(&self, ack: SendMessageAck) {
        *self.send_message_ack.lock().unwrap() = ack;
    }

    pub fn set_send_message_unreachable(&self) {
        *self.send_message_unreachable.lock().unwrap() = true;
    }

    pub fn set_sync_ack(&self, ack: ApiAck) {
        *self.sync_ack.lock().unwrap() = ack;
    }

    pub fn set_share_ack(&self, ack: ApiAck) {
        *self.share_ack.lock().unwrap() = ack;
    }

    pub fn set_status_response(&self, response: Result<bool, String>) {
        *self.status_response.lock().unwrap() = response;
    }
}

#[async_trait]
impl ConnectionApi for MockConnectionApi {
    async fn resolve_identity(&self) -> Result<IdentityInfo, BridgeError> {
        self.identity_response
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| BridgeError::network("identity endpoint unavailable"))
    }

    async fn send_message(
        &self,
        request: &SendMessageRequest,
    ) -> Result<SendMessageAck, BridgeError> {
        if *self.send_message_unreachable.lock().unwrap() {
            return Err(BridgeError::network("connection refused"));
        }
        self.sent_messages.lock().unwrap().push(request.clone());
        Ok(self.send_message_ack.lock().unwrap().clone())
    }

    async fn fetch_messages(
        &self,
        _identity: &PeerIdentity,
        _limit: u32,
        _offset: u32,
    ) -> Result<MessagePage, BridgeError> {
        Ok(MessagePage {
            messages: Vec::new(),
            total_count: 0,
            has_more: false,
        })
    }

    async fn sync_appointment(
        &self,
        request: &SyncAppointmentRequest,
    ) -> Result<ApiAck, BridgeError> {
        self.synced_appointments
            .lock()
            .unwrap()
            .push(request.clone());
        Ok(self.sync_ack.lock().unwrap().clone())
    }

    async fn fetch_appointments(
        &self,
        _identity: &PeerIdentity,
        _status: &str,
        _limit: u32,
    ) -> Result<AppointmentPage, BridgeError> {
        Ok(AppointmentPage {
            appointments: Vec::new(),
            total_count: 0,
        })
    }

    async fn share_resource(&self, request: &ShareResourceRequest) -> Result<ApiAck, BridgeError> {
        self.shared_resources.lock().unwrap().push(request.clone());
        Ok(self.share_ack.lock().unwrap().clone())
    }

    async fn fetch_shared_resources(
        &self,
        _identity: &PeerIdentity,
        _limit: u32,
    ) -> Result<ResourcePage, BridgeError> {
        Ok(ResourcePage {
            shared_resources: Vec::new(),
            total_count: 0,
        })
    }

    async fn fetch_notifications(
        &self,
        _limit: u32,
        _unread_only: bool,
    ) -> Result<NotificationPage, BridgeError> {
        Ok(NotificationPage {
            notifications: Vec::new(),
            unread_count: 0,
            total_count: 0,
        })
    }

    async fn mark_notification_read(&self, notification_id: &str) -> Result<ApiAck, BridgeError> {
        self.notifications_marked_read
            .lock()
            .unwrap()
            .push(notification_id.to_string());
        Ok(ack_success())
    }

    async fn connection_status(
        &self,
        _identity: &PeerIdentity,
    ) -> Result<ConnectionStatusResponse, BridgeError> {
        *self.status_polls.lock().unwrap() += 1;
        match self.status_response.lock().unwrap().clone() {
            Ok(active) => Ok(ConnectionStatusResponse {
                connection_active: active,
            }),
            Err(reason) => Err(BridgeError::network(reason)),
        }
    }
}

/// Push transport the test drives by hand.
pub struct MockPushTransport {
    sender: Mutex<Option<mpsc::UnboundedSender<TransportEvent>>>,
    pub connected_with: Mutex<Vec<PeerIdentity>>,
    pub close_calls: Mutex<u32>,
}

impl MockPushTransport {
    pub fn new() -> Self {
        Self {
            sender: Mutex::new(None),
            connected_with: Mutex::new(Vec::new()),
            close_calls: Mutex::new(0),
        }
    }

    /// Inject a transport event as if the server had pushed it.
    pub fn emit(&self, event: TransportEvent) {
        let sender = self.sender.lock().unwrap();
        sender
            .as_ref()
            .expect("transport not connected")
            .send(event)
            .expect("pump receiver dropped");
    }

    pub fn connect_count(&self) -> usize {
        self.connected_with.lock().unwrap().len()
    }
}

#[async_trait]
impl PushTransport for MockPushTransport {
    async fn connect(
        &self,
        identity: PeerIdentity,
    ) -> Result<mpsc::UnboundedReceiver<TransportEvent>, BridgeError> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.connected_with.lock().unwrap().push(identity);
        *self.sender.lock().unwrap() = Some(tx);
        Ok(rx)
    }

    async fn close(&self) {
        *self.close_calls.lock().unwrap() += 1;
        *self.sender.lock().unwrap() = None;
    }
}

/// Sink that records every rendering side effect.
#[derive(Default)]
pub struct RecordingSink {
    pub rendered: Mutex<Vec<(String, NotificationKind)>>,
    pub dismissed: Mutex<Vec<Uuid>>,
    pub status_updates: Mutex<Vec<bool>>,
}

impl RecordingSink {
    pub fn rendered_messages(&self) -> Vec<String> {
        self.rendered
            .lock()
            .unwrap()
            .iter()
            .map(|(message, _)| message.clone())
            .collect()
    }

    pub fn last_status(&self) -> Option<bool> {
        self.status_updates.lock().unwrap().last().copied()
    }
}

impl NotificationSink for RecordingSink {
    fn render(&self, notification: &Notification) {
        self.rendered
            .lock()
            .unwrap()
            .push((notification.message.clone(), notification.kind));
    }

    fn dismiss(&self, id: Uuid) {
        self.dismissed.lock().unwrap().push(id);
    }

    fn render_status(&self, connected: bool) {
        self.status_updates.lock().unwrap().push(connected);
    }
}

/// Handler that records every event it sees.
pub struct CollectingHandler {
    events: Mutex<Vec<ChannelEvent>>,
}

impl CollectingHandler {
    pub fn new() -> std::sync::Arc<Self> {
        std::sync::Arc::new(Self {
            events: Mutex::new(Vec::new()),
        })
    }

    pub fn events(&self) -> Vec<ChannelEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn tags(&self) -> Vec<EventTag> {
        self.events().iter().map(ChannelEvent::tag).collect()
    }

    pub fn count(&self) -> usize {
        self.events.lock().unwrap().len()
    }
}

impl EventHandler for CollectingHandler {
    fn handle(&self, event: &ChannelEvent) -> Result<(), EventError> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "CollectingHandler"
    }
}
