use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::{PeerIdentity, Role};

fn default_message_kind() -> String {
    "text".to_string()
}

/// Frames this client sends over the push channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Room-join handshake keyed by the identity pair.
    JoinConnectionRoom { student_id: i64, therapist_id: i64 },
    LeaveConnectionRoom { student_id: i64, therapist_id: i64 },
}

impl ClientFrame {
    /// Create the join handshake for a care link.
    pub fn join(identity: &PeerIdentity) -> Self {
        ClientFrame::JoinConnectionRoom {
            student_id: identity.student_id,
            therapist_id: identity.therapist_id,
        }
    }

    pub fn leave(identity: &PeerIdentity) -> Self {
        ClientFrame::LeaveConnectionRoom {
            student_id: identity.student_id,
            therapist_id: identity.therapist_id,
        }
    }
}

/// Frames the server pushes to this client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Acknowledges the join handshake.
    JoinedConnectionRoom { room_id: String },

    /// A chat message was posted to the room.
    NewMessage(IncomingMessage),

    /// Delivery confirmation for a message this client sent.
    MessageDelivered {
        message_id: String,
        #[serde(default)]
        timestamp: Option<DateTime<Utc>>,
    },

    /// An appointment on this link changed.
    AppointmentUpdated(AppointmentUpdate),

    /// A resource was shared on this link.
    ResourceShared(ResourceShare),

    /// Presence: the peer joined the room.
    UserJoined {
        #[serde(default)]
        user_role: Option<Role>,
    },

    /// Presence: the peer left the room.
    UserLeft {
        #[serde(default)]
        user_role: Option<Role>,
    },

    /// Snapshot of who is currently in the room.
    RoomStatus(serde_json::Value),

    /// Server-side rejection of a frame this client sent.
    Error { message: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub message_id: String,
    pub sender: Role,
    #[serde(default)]
    pub sender_id: Option<i64>,
    pub content: String,
    #[serde(rename = "type", default = "default_message_kind")]
    pub kind: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentUpdate {
    pub appointment_id: String,
    pub action: String,
    #[serde(default)]
    pub updated_by: Option<Role>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceShare {
    pub resource_id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub shared_by: Option<Role>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}
