//! Service instance backed by a VPN transport.

use async_trait::async_trait;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::TransportResources;
use crate::domain::foundation::SessionId;
use crate::domain::market::ServiceProposal;
use crate::domain::service::{Port, Protocol};
use crate::ports::{
    ClientAuthenticator, Firewall, PortLease, Service, ServiceError, TrafficMeter,
    TransportBackend,
};

/// OpenVPN or WireGuard instance: one leased port, one firewall rule, one
/// running transport.
pub struct TunnelService {
    proposal: ServiceProposal,
    resources: TransportResources,
    firewall: Arc<dyn Firewall>,
    transport: Arc<dyn TransportBackend>,
    authenticator: Option<Arc<dyn ClientAuthenticator>>,
    protocol: Protocol,
    lease: Mutex<Option<PortLease>>,
}

impl TunnelService {
    pub fn new(
        proposal: ServiceProposal,
        resources: TransportResources,
        firewall: Arc<dyn Firewall>,
        transport: Arc<dyn TransportBackend>,
    ) -> Self {
        Self {
            proposal,
            resources,
            firewall,
            transport,
            authenticator: None,
            protocol: Protocol::Udp,
            lease: Mutex::new(None),
        }
    }

    /// Has the transport call `authenticator` on every client login.
    pub fn with_authenticator(mut self, authenticator: Arc<dyn ClientAuthenticator>) -> Self {
        self.authenticator = Some(authenticator);
        self
    }

    pub fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = protocol;
        self
    }

    /// Port currently leased by the instance.
    pub async fn port(&self) -> Option<Port> {
        self.lease.lock().await.as_ref().map(PortLease::port)
    }
}

#[async_trait]
impl Service for TunnelService {
    fn proposal(&self) -> &ServiceProposal {
        &self.proposal
    }

    async fn start(&self) -> Result<(), ServiceError> {
        let mut lease = self.lease.lock().await;
        if lease.is_some() {
            return Ok(());
        }

        let acquired = self.resources.ports.acquire()?;
        let port = acquired.port();
        self.firewall.allow_port(port).await?;

        if let Err(e) = self
            .transport
            .start(port, self.authenticator.clone())
            .await
        {
            if let Err(fw) = self.firewall.remove_port(port).await {
                warn!(port = %port, error = %fw, "Firewall cleanup failed");
            }
            return Err(e.into());
        }

        info!(
            service_type = %self.proposal.service_type(),
            port = %port,
            ports = %self.resources.ports.describe(),
            "Transport started"
        );
        *lease = Some(acquired);
        Ok(())
    }

    async fn stop(&self) -> Result<(), ServiceError> {
        let Some(lease) = self.lease.lock().await.take() else {
            return Ok(());
        };
        let port = lease.port();

        let stopped = self.transport.stop().await;
        let removed = self.firewall.remove_port(port).await;
        drop(lease);

        info!(service_type = %self.proposal.service_type(), port = %port, "Transport stopped");
        stopped?;
        removed?;
        Ok(())
    }

    async fn provide_config(
        &self,
        session_id: SessionId,
        consumer_endpoint: Option<SocketAddr>,
    ) -> Result<serde_json::Value, ServiceError> {
        let port = self.port().await.ok_or(ServiceError::NotStarted)?;
        self.transport.add_peer(session_id, consumer_endpoint).await?;

        if let Some(consumer) = consumer_endpoint {
            if self.resources.pinger.is_active() {
                // A failed punch is not fatal: the consumer may still reach us.
                if let Err(e) = self.resources.pinger.ping_consumer(port, consumer).await {
                    warn!(session_id = %session_id, consumer = %consumer, error = %e, "NAT ping failed");
                }
            }
        }

        debug!(session_id = %session_id, port = %port, "Session config prepared");
        Ok(json!({
            "service_type": self.proposal.service_type(),
            "port": port.value(),
            "protocol": self.protocol,
        }))
    }

    async fn release_session(&self, session_id: SessionId) {
        if let Err(e) = self.transport.remove_peer(session_id).await {
            warn!(session_id = %session_id, error = %e, "Peer removal failed");
        }
    }

    fn traffic_meter(&self) -> Arc<dyn TrafficMeter> {
        self.transport.traffic_meter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{LoopbackTransport, NoopFirewall, NoopNatPinger, PortPool};
    use crate::domain::foundation::Identity;
    use crate::domain::market::{Location, Price, ServiceType};
    use crate::domain::service::PortRange;
    use crate::ports::PortError;

    fn service(pool: Arc<PortPool>, transport: LoopbackTransport) -> TunnelService {
        TunnelService::new(
            ServiceProposal::new(
                Identity::new("0xaa").unwrap(),
                ServiceType::Wireguard,
                Location::in_country("DE"),
                Price::default(),
            ),
            TransportResources {
                ports: pool,
                pinger: Arc::new(NoopNatPinger),
            },
            Arc::new(NoopFirewall),
            Arc::new(transport),
        )
    }

    fn single_port_pool() -> Arc<PortPool> {
        Arc::new(PortPool::fixed(PortRange::new(51820, 51820).unwrap()))
    }

    #[tokio::test]
    async fn start_leases_port_and_stop_returns_it() {
        let pool = single_port_pool();
        let transport = LoopbackTransport::new();
        let service = service(Arc::clone(&pool), transport.clone());

        service.start().await.unwrap();
        assert_eq!(pool.leased_count(), 1);
        assert_eq!(transport.listening_port().map(|p| p.value()), Some(51820));

        service.stop().await.unwrap();
        assert_eq!(pool.leased_count(), 0);
        assert!(transport.listening_port().is_none());
    }

    #[tokio::test]
    async fn exhausted_pool_fails_start() {
        let pool = single_port_pool();
        let first = service(Arc::clone(&pool), LoopbackTransport::new());
        let second = service(Arc::clone(&pool), LoopbackTransport::new());

        first.start().await.unwrap();
        let result = second.start().await;

        assert!(matches!(
            result,
            Err(ServiceError::Port(PortError::Exhausted(_)))
        ));
    }

    #[tokio::test]
    async fn provide_config_requires_running_transport() {
        let service = service(single_port_pool(), LoopbackTransport::new());

        let result = service.provide_config(SessionId::new(), None).await;

        assert!(matches!(result, Err(ServiceError::NotStarted)));
    }

    #[tokio::test]
    async fn provide_config_adds_peer_and_reports_port() {
        let transport = LoopbackTransport::new();
        let service = service(single_port_pool(), transport.clone());
        service.start().await.unwrap();

        let config = service.provide_config(SessionId::new(), None).await.unwrap();

        assert_eq!(config["port"], 51820);
        assert_eq!(config["service_type"], "wireguard");
        assert_eq!(transport.peer_count(), 1);
    }
}
