use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use std::ops::ControlFlow;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

use super::messages::{ClientFrame, ServerFrame};
use super::{PushTransport, TransportEvent};
use crate::identity::PeerIdentity;
use crate::shared::BridgeError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Push transport over a WebSocket connection.
///
/// `connect` spawns a background task that dials the endpoint, performs the
/// room-join handshake, and forwards parsed frames to the receiver. On any
/// drop it reports `Disconnected` and redials with exponential backoff until
/// `close` is called or the receiver is dropped.
pub struct WebSocketTransport {
    endpoint: String,
    shutdown: watch::Sender<bool>,
}

impl WebSocketTransport {
    pub fn new(endpoint: impl Into<String>) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            endpoint: endpoint.into(),
            shutdown,
        }
    }
}

#[async_trait]
impl PushTransport for WebSocketTransport {
    async fn connect(
        &self,
        identity: PeerIdentity,
    ) -> Result<mpsc::UnboundedReceiver<TransportEvent>, BridgeError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let endpoint = self.endpoint.clone();
        let mut shutdown = self.shutdown.subscribe();

        tokio::spawn(async move {
            let mut attempt: u32 = 0;

            loop {
                if *shutdown.borrow() || tx.is_closed() {
                    break;
                }

                match connect_async(endpoint.as_str()).await {
                    Ok((stream, _)) => {
                        attempt = 0;
                        if run_session(stream, &identity, &tx, &mut shutdown)
                            .await
                            .is_break()
                        {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(endpoint = %endpoint, error = %e, "WebSocket connect failed");
                        let _ = tx.send(TransportEvent::Disconnected {
                            reason: e.to_string(),
                        });
                    }
                }

                attempt += 1;
                let delay = reconnect_delay(attempt);
                debug!(attempt = attempt, delay_ms = delay.as_millis() as u64, "Reconnecting");
                tokio::select! {
                    changed = shutdown.changed() => {
                        // A dropped transport counts as shutdown.
                        if changed.is_err() {
                            break;
                        }
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
            }

            debug!("WebSocket transport task stopped");
        });

        Ok(rx)
    }

    async fn close(&self) {
        let _ = self.shutdown.send(true);
    }
}

/// Drive one connected session until the socket drops or shutdown is
/// requested. `Break` means stop for good, `Continue` means redial.
async fn run_session(
    stream: WsStream,
    identity: &PeerIdentity,
    tx: &mpsc::UnboundedSender<TransportEvent>,
    shutdown: &mut watch::Receiver<bool>,
) -> ControlFlow<()> {
    let (mut write, mut read) = stream.split();

    let join = ClientFrame::join(identity);
    let join_text = match serde_json::to_string(&join) {
        Ok(text) => text,
        Err(e) => {
            warn!(error = %e, "Failed to encode join frame");
            return ControlFlow::Break(());
        }
    };
    if let Err(e) = write.send(Message::Text(join_text)).await {
        let _ = tx.send(TransportEvent::Disconnected {
            reason: e.to_string(),
        });
        return ControlFlow::Continue(());
    }

    debug!(room_key = %identity.room_key(), "Joined connection room");
    if tx.send(TransportEvent::Connected).is_err() {
        return ControlFlow::Break(());
    }

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    let _ = write.send(Message::Close(None)).await;
                    return ControlFlow::Break(());
                }
            }
            incoming = read.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ServerFrame>(&text) {
                            Ok(frame) => {
                                if tx.send(TransportEvent::Frame(frame)).is_err() {
                                    return ControlFlow::Break(());
                                }
                            }
                            Err(e) => {
                                // Unknown event names are expected; skip them.
                                debug!(error = %e, "Ignoring unrecognized frame");
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        let _ = tx.send(TransportEvent::Disconnected {
                            reason: "connection closed".to_string(),
                        });
                        return ControlFlow::Continue(());
                    }
                    Some(Ok(_)) => {
                        // Binary/ping/pong frames carry nothing for us.
                    }
                    Some(Err(e)) => {
                        let _ = tx.send(TransportEvent::Disconnected {
                            reason: e.to_string(),
                        });
                        return ControlFlow::Continue(());
                    }
                }
            }
        }
    }
}

fn reconnect_delay(attempt: u32) -> Duration {
    // Exponential backoff capped at 30s.
    let exp = attempt.min(6);
    Duration::from_millis(500 * 2_u64.pow(exp)).min(Duration::from_secs(30))
}
