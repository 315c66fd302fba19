//! Firewall port.

use async_trait::async_trait;

use crate::domain::service::Port;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FirewallError {
    #[error("Firewall rule failed for port {port}: {reason}")]
    Rule { port: Port, reason: String },
}

/// Opens and closes inbound ports for service instances.
#[async_trait]
pub trait Firewall: Send + Sync {
    async fn allow_port(&self, port: Port) -> Result<(), FirewallError>;

    async fn remove_port(&self, port: Port) -> Result<(), FirewallError>;
}
