//! NAT traversal port.

use async_trait::async_trait;
use std::net::SocketAddr;

use crate::domain::service::Port;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NatError {
    #[error("NAT pinger stopped")]
    Stopped,

    #[error("No reply from {0}")]
    NoReply(SocketAddr),

    #[error("NAT socket error: {0}")]
    Io(String),
}

/// Opens a traversable path from a local port to a consumer endpoint.
#[async_trait]
pub trait NatPinger: Send + Sync {
    /// Returns false for pingers that never punch holes (fixed, forwarded ports).
    fn is_active(&self) -> bool;

    /// Sends hole-punching probes from `local` to `consumer`.
    async fn ping_consumer(&self, local: Port, consumer: SocketAddr) -> Result<(), NatError>;
}
