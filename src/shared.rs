use thiserror::Error;

/// Errors surfaced by the coordinator and its collaborators.
///
/// The taxonomy mirrors where a failure originates:
/// - `Network`: a REST call failed outright, returned a non-success status,
///   or the server answered with `success: false`.
/// - `Protocol`: the response arrived but did not have the expected shape
///   (non-JSON body, missing fields).
/// - `Transport`: the push channel failed to connect or dropped. These are
///   expected to be transient and are never fatal.
/// - `Handler`: a subscriber callback failed during dispatch. Always caught
///   and logged by the dispatcher, never propagated to the publisher.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("network error: {0}")]
    Network(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("handler error: {0}")]
    Handler(String),
}

impl BridgeError {
    pub fn network(msg: impl Into<String>) -> Self {
        BridgeError::Network(msg.into())
    }

    pub fn protocol(msg: impl Into<String>) -> Self {
        BridgeError::Protocol(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        BridgeError::Transport(msg.into())
    }
}

impl From<reqwest::Error> for BridgeError {
    fn from(err: reqwest::Error) -> Self {
        BridgeError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        BridgeError::Protocol(err.to_string())
    }
}
