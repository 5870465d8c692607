// REST collaborator of the coordinator.
//
// `ConnectionApi` is the seam: the coordinator only sees the trait, tests
// swap in a scripted mock, and `HttpConnectionApi` speaks the backend's
// actual JSON wire format.

pub use client::{ConnectionApi, HttpConnectionApi, StaticTokenProvider, TokenProvider};
pub use models::{
    ApiAck, Appointment, AppointmentAction, AppointmentPage, ChatMessage, ConnectionStatusResponse,
    IdentityInfo, MessagePage, NotificationPage, PeerLink, ResourcePage, SendMessageAck,
    SendMessageRequest, ServerNotification, ShareResourceRequest, SharedResource,
    SyncAppointmentRequest,
};

mod client;
mod models;
