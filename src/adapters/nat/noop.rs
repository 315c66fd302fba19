use async_trait::async_trait;
use std::net::SocketAddr;

use crate::domain::service::Port;
use crate::ports::{NatError, NatPinger};

/// Pinger for services on operator-forwarded ports: there is no NAT to traverse.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNatPinger;

#[async_trait]
impl NatPinger for NoopNatPinger {
    fn is_active(&self) -> bool {
        false
    }

    async fn ping_consumer(&self, _local: Port, _consumer: SocketAddr) -> Result<(), NatError> {
        Ok(())
    }
}
