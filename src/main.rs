use std::sync::Arc;
use strum::IntoEnumIterator;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use carelink::api::{HttpConnectionApi, StaticTokenProvider};
use carelink::config::CoordinatorConfig;
use carelink::coordinator::ConnectionCoordinator;
use carelink::event::EventTag;
use carelink::notify::TracingSink;
use carelink::transport::WebSocketTransport;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "carelink=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting care link client");

    let config = CoordinatorConfig::from_env();

    // Explicit dependency injection: HTTP client with its token provider,
    // WebSocket transport, and a log-backed rendering sink.
    let tokens = Arc::new(StaticTokenProvider::new(
        std::env::var("CARELINK_CSRF_TOKEN").ok(),
    ));
    let api = Arc::new(HttpConnectionApi::new(config.api_base.clone(), tokens));
    let transport = Arc::new(WebSocketTransport::new(config.transport_endpoint.clone()));

    let coordinator = ConnectionCoordinator::new(config, api, transport, Arc::new(TracingSink));
    coordinator.initialize().await;

    // Log every event surfaced to application code.
    for tag in EventTag::iter() {
        coordinator.subscribe_fn(tag, move |event| {
            info!(tag = %tag, event = ?event, "Channel event");
            Ok(())
        });
    }

    match coordinator.room_key() {
        Some(room_key) => info!(room_key = %room_key, "Listening for events, Ctrl-C to stop"),
        None => info!("No peer linked yet, polling only, Ctrl-C to stop"),
    }

    tokio::signal::ctrl_c()
        .await
        .expect("Failed to listen for Ctrl-C");

    coordinator.teardown().await;
    info!("Stopped");
}
