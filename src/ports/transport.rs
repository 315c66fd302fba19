//! Transport backend port: the VPN data plane behind a service.
//!
//! OpenVPN and WireGuard process management are external; services drive
//! them through this contract.

use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::Arc;

use super::ClientAuthenticator;
use crate::domain::foundation::SessionId;
use crate::domain::service::Port;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("Transport failed to start: {0}")]
    Start(String),

    #[error("Transport not running")]
    NotRunning,

    #[error("Peer error: {0}")]
    Peer(String),
}

/// Byte counters for sessions carried by a transport.
pub trait TrafficMeter: Send + Sync {
    /// Bytes sent and received for `session_id` so far.
    fn bytes_transferred(&self, session_id: SessionId) -> u64;
}

#[async_trait]
pub trait TransportBackend: Send + Sync {
    /// Counters for the sessions this transport carries.
    fn traffic_meter(&self) -> Arc<dyn TrafficMeter>;

    /// Starts listening on `port`. Connection-oriented transports call
    /// `authenticator` on every client login.
    async fn start(
        &self,
        port: Port,
        authenticator: Option<Arc<dyn ClientAuthenticator>>,
    ) -> Result<(), TransportError>;

    async fn stop(&self) -> Result<(), TransportError>;

    async fn add_peer(
        &self,
        session_id: SessionId,
        consumer_endpoint: Option<SocketAddr>,
    ) -> Result<(), TransportError>;

    async fn remove_peer(&self, session_id: SessionId) -> Result<(), TransportError>;
}
