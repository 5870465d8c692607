use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};
use uuid::Uuid;

use crate::identity::Role;
use crate::notify::NotificationKind;

/// Discriminant of [`ChannelEvent`], used as the handler registry key.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EventTag {
    Message,
    AppointmentUpdated,
    ResourceShared,
    Notification,
    ConnectionStatus,
}

/// Events flowing through the coordinator's bus.
///
/// Events represent facts about things that have already happened, whether
/// they were delivered by the push transport, confirmed by a REST call, or
/// raised locally. Subscribers never learn which source produced a fact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ChannelEvent {
    /// A chat message was sent or received on this care link.
    Message(MessageEvent),

    /// An appointment shared on this care link changed.
    AppointmentUpdated(AppointmentEvent),

    /// The therapist shared a resource with the student.
    ResourceShared(ResourceEvent),

    /// A transient notification was raised locally.
    Notification(NotificationEvent),

    /// The link status was re-evaluated.
    ConnectionStatus(StatusEvent),
}

impl ChannelEvent {
    /// The tag this event dispatches under.
    pub fn tag(&self) -> EventTag {
        match self {
            ChannelEvent::Message(_) => EventTag::Message,
            ChannelEvent::AppointmentUpdated(_) => EventTag::AppointmentUpdated,
            ChannelEvent::ResourceShared(_) => EventTag::ResourceShared,
            ChannelEvent::Notification(_) => EventTag::Notification,
            ChannelEvent::ConnectionStatus(_) => EventTag::ConnectionStatus,
        }
    }
}

/// Whether a message event describes an outgoing or incoming message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageDirection {
    Sent,
    Received,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEvent {
    pub direction: MessageDirection,
    pub content: String,
    /// Message kind as understood by the backend ("text", "resource", ...).
    pub kind: String,
    pub timestamp: Option<DateTime<Utc>>,
    /// Backend identifier, present once the server has persisted the message.
    pub message_id: Option<String>,
    /// Role of the sending party, when known.
    pub sender: Option<Role>,
    /// Reconciliation handle between an optimistic local event and a later
    /// transport-delivered echo of the same message.
    pub correlation_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentEvent {
    pub appointment_id: String,
    pub action: String,
    /// Role of the party that performed the action, when known.
    pub updated_by: Option<Role>,
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceEvent {
    pub resource_id: String,
    pub title: Option<String>,
    pub message: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub id: Uuid,
    pub message: String,
    pub kind: NotificationKind,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusEvent {
    pub connection_active: bool,
    pub checked_at: DateTime<Utc>,
}
