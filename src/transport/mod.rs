// Push transport: server-to-client event delivery.
//
// The coordinator only sees the `PushTransport` trait; the WebSocket
// implementation lives in `socket.rs` and tests inject their own.

pub use messages::{AppointmentUpdate, ClientFrame, IncomingMessage, ResourceShare, ServerFrame};
pub use socket::WebSocketTransport;

mod messages;
mod socket;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::identity::PeerIdentity;
use crate::shared::BridgeError;

/// What the transport delivers to its consumer.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// The channel is up and the room-join handshake has been sent.
    Connected,

    /// The channel dropped; the transport keeps retrying until closed.
    Disconnected { reason: String },

    /// A pushed server frame.
    Frame(ServerFrame),
}

/// A push-delivery channel for one care link.
///
/// `connect` attaches to the room derived from the identity pair and returns
/// the stream of transport events. Lifecycle changes (connect, disconnect,
/// reconnect) are delivered in-band so the consumer observes them in order
/// with the frames.
#[async_trait]
pub trait PushTransport: Send + Sync {
    async fn connect(
        &self,
        identity: PeerIdentity,
    ) -> Result<mpsc::UnboundedReceiver<TransportEvent>, BridgeError>;

    /// Stop delivering events and release the channel. Safe to call twice.
    async fn close(&self);
}
