use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::identity::Role;

/// Response of the identity-resolution endpoint (`get-navigation-links`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityInfo {
    pub user_role: Role,
    pub user_id: i64,
    #[serde(default)]
    pub connections: Vec<PeerLink>,
}

/// One linked peer as reported by identity resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerLink {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Request body for the send-message endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub student_id: i64,
    pub therapist_id: i64,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Acknowledgment of a sent message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageAck {
    pub success: bool,
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub error: Option<String>,
}

/// One persisted chat message, as returned by the fetch endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub sender: Role,
    pub content: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
}

/// Page of chat messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagePage {
    pub messages: Vec<ChatMessage>,
    pub total_count: u64,
    pub has_more: bool,
}

/// Appointment actions accepted by the sync endpoint.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AppointmentAction {
    Confirm,
    Reschedule,
    Cancel,
    Complete,
}

impl AppointmentAction {
    /// Past-tense form used in user-facing notifications.
    pub fn past_tense(&self) -> &'static str {
        match self {
            AppointmentAction::Confirm => "confirmed",
            AppointmentAction::Reschedule => "rescheduled",
            AppointmentAction::Cancel => "cancelled",
            AppointmentAction::Complete => "completed",
        }
    }
}

/// Request body for the appointment-sync endpoint.
///
/// `extra` carries action-specific fields (`new_datetime` for reschedule,
/// `reason` for cancel) flattened into the JSON object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncAppointmentRequest {
    pub student_id: i64,
    pub therapist_id: i64,
    pub appointment_id: String,
    pub action: AppointmentAction,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Generic `{success, error?}` acknowledgment shared by mutating endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiAck {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    /// Endpoint-specific fields the caller may want to inspect.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// One shared appointment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,
    #[serde(default)]
    pub datetime: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub can_join: Option<bool>,
}

/// Page of shared appointments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentPage {
    pub appointments: Vec<Appointment>,
    pub total_count: u64,
}

/// Request body for the resource-share endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareResourceRequest {
    pub student_id: i64,
    pub therapist_id: i64,
    pub resource_id: String,
    #[serde(default)]
    pub message: String,
}

/// One resource shared on the link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedResource {
    pub id: String,
    pub resource_id: String,
    pub title: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub custom_message: Option<String>,
    #[serde(default)]
    pub shared_at: Option<DateTime<Utc>>,
}

/// Page of shared resources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourcePage {
    pub shared_resources: Vec<SharedResource>,
    pub total_count: u64,
}

/// One server-side notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerNotification {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub related_id: Option<String>,
}

/// Page of server-side notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPage {
    pub notifications: Vec<ServerNotification>,
    pub unread_count: u64,
    pub total_count: u64,
}

/// Response of the connection-status endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionStatusResponse {
    pub connection_active: bool,
}
