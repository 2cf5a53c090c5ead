//! Client channel abstraction.
//!
//! A scan session talks to its client through two halves: a sink that
//! receives target notifications and raw scanner output, and an event
//! source that reports when the client goes away. The WebSocket server
//! implements both; tests use in-memory doubles.

use crate::error::SessionResult;
use crate::types::TargetRecord;
use async_trait::async_trait;
use serde_json::json;

/// A message pushed to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    /// A target that is about to be fed to the scanner.
    Target(TargetRecord),
    /// A chunk of scanner output, forwarded verbatim.
    Output(Vec<u8>),
    /// The session could not run.
    Error(String),
}

impl ClientMessage {
    /// JSON text for structured messages; `None` for raw output.
    pub fn to_json(&self) -> SessionResult<Option<String>> {
        match self {
            Self::Target(record) => Ok(Some(serde_json::to_string(record)?)),
            Self::Error(message) => Ok(Some(
                json!({ "type": "error", "message": message }).to_string(),
            )),
            Self::Output(_) => Ok(None),
        }
    }

    /// Whether this is a target notification.
    pub fn is_target(&self) -> bool {
        matches!(self, Self::Target(_))
    }
}

/// Outgoing half of a client connection.
#[async_trait]
pub trait ClientSink: Send + 'static {
    /// Deliver one message. An error means the client can no longer be
    /// written to.
    async fn send(&mut self, message: ClientMessage) -> SessionResult<()>;

    /// Close the connection. Must tolerate an already-closed peer.
    async fn close(&mut self);
}

/// Incoming half of a client connection.
#[async_trait]
pub trait ClientEvents: Send + 'static {
    /// Resolve once the client has disconnected or its channel failed.
    ///
    /// Must be cancel-safe: the session may drop this future and call it
    /// again.
    async fn closed(&mut self);
}
