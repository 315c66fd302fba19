//! Service ports: a running VPN service instance and the factory that builds it.

use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::Arc;

use super::{
    DialogError, FirewallError, LocationError, PortError, TrafficMeter, TransportError,
};
use crate::domain::foundation::{Identity, SessionId};
use crate::domain::market::{ServiceProposal, ServiceType};
use crate::domain::service::ServiceOptions;

#[derive(Debug, Clone, thiserror::Error)]
pub enum ServiceError {
    #[error("No factory registered for {0}")]
    UnknownType(ServiceType),

    #[error("Options for {actual} given to {expected} factory")]
    OptionsMismatch {
        expected: ServiceType,
        actual: ServiceType,
    },

    #[error("{service_type} is already running for {provider}")]
    AlreadyRunning {
        service_type: ServiceType,
        provider: Identity,
    },

    #[error("Service not found: {0}")]
    NotFound(String),

    #[error("Service not started")]
    NotStarted,

    #[error(transparent)]
    Port(#[from] PortError),

    #[error(transparent)]
    Location(#[from] LocationError),

    #[error(transparent)]
    Firewall(#[from] FirewallError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Dialog(#[from] DialogError),
}

/// A service instance: `start`, `stop`, `proposal`, plus per-session config.
#[async_trait]
pub trait Service: Send + Sync {
    fn proposal(&self) -> &ServiceProposal;

    /// Acquires transport resources and starts the data plane.
    async fn start(&self) -> Result<(), ServiceError>;

    /// Stops the data plane and releases every resource taken by `start`.
    async fn stop(&self) -> Result<(), ServiceError>;

    /// Prepares the transport for a new session and returns the config sent
    /// to the consumer.
    async fn provide_config(
        &self,
        session_id: SessionId,
        consumer_endpoint: Option<SocketAddr>,
    ) -> Result<serde_json::Value, ServiceError>;

    /// Drops per-session transport state.
    async fn release_session(&self, session_id: SessionId);

    fn traffic_meter(&self) -> Arc<dyn TrafficMeter>;
}

/// Builds a service instance from start options. Invoked once per start request.
#[async_trait]
pub trait ServiceFactory: Send + Sync {
    async fn create(
        &self,
        options: ServiceOptions,
    ) -> Result<(Arc<dyn Service>, ServiceProposal), ServiceError>;
}
