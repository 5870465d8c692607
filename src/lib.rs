// Library crate for the care-link coordination layer
// This file exposes the public API for integration tests

pub mod api;
pub mod config;
pub mod coordinator;
pub mod event;
pub mod identity;
pub mod notify;
pub mod shared;
pub mod transport;

// Re-export commonly used types for easier access in tests
pub use api::{ConnectionApi, HttpConnectionApi, StaticTokenProvider, TokenProvider};
pub use config::CoordinatorConfig;
pub use coordinator::{ConnectionCoordinator, ConnectionState, LinkState};
pub use event::{ChannelEvent, EventError, EventHandler, EventTag, HandlerRegistry, SubscriptionId};
pub use identity::{room_key, PeerIdentity, Role};
pub use notify::{Notification, NotificationKind, NotificationSink, Notifier, TracingSink};
pub use shared::BridgeError;
pub use transport::{PushTransport, ServerFrame, TransportEvent, WebSocketTransport};
