// Event bus infrastructure
//
// This module provides the typed publish/subscribe surface the coordinator
// exposes to application code.

// Public API - what other modules can use
pub use events::{
    AppointmentEvent, ChannelEvent, EventTag, MessageDirection, MessageEvent, NotificationEvent,
    ResourceEvent, StatusEvent,
};
pub use handler::{EventError, EventHandler, NoOpEventHandler};
pub use registry::{HandlerRegistry, SubscriptionId};

// Internal modules
mod events;
mod handler;
mod registry;
