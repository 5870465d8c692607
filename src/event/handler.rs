use thiserror::Error;

use super::events::ChannelEvent;

/// Errors that can occur when handling events
#[derive(Debug, Error)]
pub enum EventError {
    #[error("Handler failed: {0}")]
    Failed(String),

    #[error("Handler panicked: {0}")]
    Panic(String),
}

impl EventError {
    /// Create a failure error
    pub fn failed(msg: impl Into<String>) -> Self {
        EventError::Failed(msg.into())
    }
}

/// Trait for components that react to channel events
///
/// Handlers are the reactive components in the system. Dispatch is
/// synchronous and run-to-completion: `handle` must not block and must not
/// assume any ordering relative to handlers registered under other tags.
///
/// A failing handler never affects sibling handlers or the publisher; the
/// registry catches the error (or panic) and logs it.
pub trait EventHandler: Send + Sync {
    /// React to an event published under a tag this handler subscribed to.
    fn handle(&self, event: &ChannelEvent) -> Result<(), EventError>;

    /// Human-readable name for logging/debugging
    fn name(&self) -> &str {
        "anonymous"
    }
}

/// Any plain closure with the right shape can act as a handler.
impl<F> EventHandler for F
where
    F: Fn(&ChannelEvent) -> Result<(), EventError> + Send + Sync,
{
    fn handle(&self, event: &ChannelEvent) -> Result<(), EventError> {
        self(event)
    }

    fn name(&self) -> &str {
        "closure"
    }
}

/// A no-op event handler for testing
///
/// Does nothing, but can be used in tests where an [`EventHandler`] is
/// required and the actual behavior does not matter.
pub struct NoOpEventHandler;

impl EventHandler for NoOpEventHandler {
    fn handle(&self, _event: &ChannelEvent) -> Result<(), EventError> {
        Ok(())
    }

    fn name(&self) -> &str {
        "NoOpEventHandler"
    }
}
