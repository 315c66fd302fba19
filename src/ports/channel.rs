//! Session channel port: the bidirectional control link to a consumer.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::Identity;
use crate::domain::payment::{Invoice, Promise};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel closed")]
    Closed,

    #[error("Channel send failed: {0}")]
    Send(String),
}

/// Messages exchanged on a session channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChannelMessage {
    Invoice(Invoice),
    Promise(Promise),
    /// Transport configuration the consumer needs to connect.
    SessionConfig { config: serde_json::Value },
    /// Either side ends the session.
    End { reason: String },
}

#[async_trait]
pub trait Channel: Send + Sync {
    /// Identity of the peer on the other end.
    fn peer(&self) -> &Identity;

    async fn send(&self, message: ChannelMessage) -> Result<(), ChannelError>;

    /// Waits for the next message. `Closed` once the peer went away.
    async fn recv(&self) -> Result<ChannelMessage, ChannelError>;

    async fn close(&self);
}
