//! Dialog ports: accepting consumer dialogs on a service topic.

use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::Arc;

use super::Channel;
use crate::domain::foundation::Identity;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DialogError {
    /// The listener is gone; the accept loop must exit.
    #[error("Dialog listener closed")]
    Closed,

    /// One dialog failed; the accept loop keeps going.
    #[error("Dialog failed: {0}")]
    Failed(String),

    #[error("Topic already in use: {0}")]
    TopicTaken(String),
}

impl DialogError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, DialogError::Failed(_))
    }
}

/// A consumer dialog ready to become a session.
pub struct IncomingDialog {
    pub consumer_id: Identity,
    /// Public endpoint of the consumer, when known, for NAT pinging.
    pub consumer_endpoint: Option<SocketAddr>,
    pub channel: Arc<dyn Channel>,
}

/// Peer-to-peer transport that opens listeners on dialog topics.
#[async_trait]
pub trait DialogTransport: Send + Sync {
    async fn listen(&self, topic: &str) -> Result<Box<dyn DialogWaiter>, DialogError>;
}

/// Listener bound to one topic.
#[async_trait]
pub trait DialogWaiter: Send {
    /// Waits for the next consumer dialog.
    async fn accept(&mut self) -> Result<IncomingDialog, DialogError>;

    /// Stops listening. Pending and future `accept` calls return `Closed`.
    async fn close(&mut self);
}
