use async_trait::async_trait;
use tracing::debug;

use crate::domain::service::Port;
use crate::ports::{Firewall, FirewallError};

/// Firewall for hosts where inbound ports are managed outside the node.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopFirewall;

#[async_trait]
impl Firewall for NoopFirewall {
    async fn allow_port(&self, port: Port) -> Result<(), FirewallError> {
        debug!(port = %port, "Firewall allow (noop)");
        Ok(())
    }

    async fn remove_port(&self, port: Port) -> Result<(), FirewallError> {
        debug!(port = %port, "Firewall remove (noop)");
        Ok(())
    }
}
