//! Service factories, one per [`ServiceType`].
//!
//! Each factory detects the node location when invoked, so a proposal always
//! carries the location at the time its instance was started.

use async_trait::async_trait;
use std::sync::Arc;

use super::{NoopService, TransportSelector, TunnelService};
use crate::domain::foundation::Identity;
use crate::domain::market::{Price, ServiceProposal, ServiceType};
use crate::domain::service::ServiceOptions;
use crate::ports::{
    ClientAuthenticator, Firewall, LocationResolver, Service, ServiceError, ServiceFactory,
    TransportBackend,
};

/// What every tunnel factory needs besides its transport.
#[derive(Clone)]
pub struct TunnelFactoryDeps {
    pub provider_id: Identity,
    pub price: Price,
    pub location: Arc<dyn LocationResolver>,
    pub selector: Arc<TransportSelector>,
    pub firewall: Arc<dyn Firewall>,
}

impl TunnelFactoryDeps {
    async fn proposal(&self, service_type: ServiceType) -> Result<ServiceProposal, ServiceError> {
        let location = self.location.detect_location().await?;
        Ok(ServiceProposal::new(
            self.provider_id.clone(),
            service_type,
            location,
            self.price,
        ))
    }
}

fn mismatch(expected: ServiceType, options: &ServiceOptions) -> ServiceError {
    ServiceError::OptionsMismatch {
        expected,
        actual: options.service_type(),
    }
}

pub struct OpenvpnServiceFactory {
    deps: TunnelFactoryDeps,
    transport: Arc<dyn TransportBackend>,
    authenticator: Arc<dyn ClientAuthenticator>,
}

impl OpenvpnServiceFactory {
    /// OpenVPN clients log in through `authenticator` with their session id
    /// and a signature over it.
    pub fn new(
        deps: TunnelFactoryDeps,
        transport: Arc<dyn TransportBackend>,
        authenticator: Arc<dyn ClientAuthenticator>,
    ) -> Self {
        Self {
            deps,
            transport,
            authenticator,
        }
    }
}

#[async_trait]
impl ServiceFactory for OpenvpnServiceFactory {
    async fn create(
        &self,
        options: ServiceOptions,
    ) -> Result<(Arc<dyn Service>, ServiceProposal), ServiceError> {
        let ServiceOptions::Openvpn(openvpn) = options else {
            return Err(mismatch(ServiceType::Openvpn, &options));
        };

        let proposal = self.deps.proposal(ServiceType::Openvpn).await?;
        let service = TunnelService::new(
            proposal.clone(),
            self.deps.selector.select(&options),
            Arc::clone(&self.deps.firewall),
            Arc::clone(&self.transport),
        )
        .with_authenticator(Arc::clone(&self.authenticator))
        .with_protocol(openvpn.protocol);

        Ok((Arc::new(service), proposal))
    }
}

pub struct WireguardServiceFactory {
    deps: TunnelFactoryDeps,
    transport: Arc<dyn TransportBackend>,
}

impl WireguardServiceFactory {
    pub fn new(deps: TunnelFactoryDeps, transport: Arc<dyn TransportBackend>) -> Self {
        Self { deps, transport }
    }
}

#[async_trait]
impl ServiceFactory for WireguardServiceFactory {
    async fn create(
        &self,
        options: ServiceOptions,
    ) -> Result<(Arc<dyn Service>, ServiceProposal), ServiceError> {
        if !matches!(options, ServiceOptions::Wireguard(_)) {
            return Err(mismatch(ServiceType::Wireguard, &options));
        }

        let proposal = self.deps.proposal(ServiceType::Wireguard).await?;
        let service = TunnelService::new(
            proposal.clone(),
            self.deps.selector.select(&options),
            Arc::clone(&self.deps.firewall),
            Arc::clone(&self.transport),
        );

        Ok((Arc::new(service), proposal))
    }
}

pub struct NoopServiceFactory {
    provider_id: Identity,
    price: Price,
    location: Arc<dyn LocationResolver>,
}

impl NoopServiceFactory {
    pub fn new(provider_id: Identity, price: Price, location: Arc<dyn LocationResolver>) -> Self {
        Self {
            provider_id,
            price,
            location,
        }
    }
}

#[async_trait]
impl ServiceFactory for NoopServiceFactory {
    async fn create(
        &self,
        options: ServiceOptions,
    ) -> Result<(Arc<dyn Service>, ServiceProposal), ServiceError> {
        if options != ServiceOptions::Noop {
            return Err(mismatch(ServiceType::Noop, &options));
        }

        let location = self.location.detect_location().await?;
        let proposal = ServiceProposal::new(
            self.provider_id.clone(),
            ServiceType::Noop,
            location,
            self.price,
        );
        Ok((Arc::new(NoopService::new(proposal.clone())), proposal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{LoopbackTransport, NoopFirewall, NoopNatPinger, PortPool};
    use crate::domain::market::Location;
    use crate::domain::service::{OpenvpnOptions, PortRange, Protocol};
    use crate::ports::{AuthError, LocationError};
    use crate::domain::foundation::ClientHandle;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct SequenceResolver {
        countries: Mutex<Vec<&'static str>>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LocationResolver for SequenceResolver {
        async fn detect_location(&self) -> Result<Location, LocationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let country = self
                .countries
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| LocationError::Request("offline".to_string()))?;
            Ok(Location::in_country(country))
        }
    }

    struct AllowAll;

    #[async_trait]
    impl ClientAuthenticator for AllowAll {
        async fn validate(&self, _: ClientHandle, _: &str, _: &str) -> Result<bool, AuthError> {
            Ok(true)
        }

        async fn cleanup(&self, _: &str) -> Result<(), AuthError> {
            Ok(())
        }
    }

    fn deps(location: Arc<dyn LocationResolver>) -> TunnelFactoryDeps {
        TunnelFactoryDeps {
            provider_id: Identity::new("0xaa").unwrap(),
            price: Price::default(),
            location,
            selector: Arc::new(TransportSelector::new(
                Arc::new(PortPool::dynamic(PortRange::new(42000, 42010).unwrap()).without_probe()),
                Arc::new(NoopNatPinger),
            )),
            firewall: Arc::new(NoopFirewall),
        }
    }

    #[tokio::test]
    async fn location_is_detected_on_every_create() {
        let resolver = Arc::new(SequenceResolver {
            countries: Mutex::new(vec!["US", "LT"]),
            calls: AtomicUsize::new(0),
        });
        let factory =
            WireguardServiceFactory::new(deps(resolver.clone()), Arc::new(LoopbackTransport::new()));
        let options = ServiceOptions::default_for(ServiceType::Wireguard);

        let (_, first) = factory.create(options).await.unwrap();
        let (_, second) = factory.create(options).await.unwrap();

        assert_eq!(first.location().country, "LT");
        assert_eq!(second.location().country, "US");
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn location_failure_fails_create() {
        let resolver = Arc::new(SequenceResolver {
            countries: Mutex::new(vec![]),
            calls: AtomicUsize::new(0),
        });
        let factory = NoopServiceFactory::new(Identity::new("0xaa").unwrap(), Price::default(), resolver);

        let result = factory.create(ServiceOptions::Noop).await;

        assert!(matches!(result, Err(ServiceError::Location(_))));
    }

    #[tokio::test]
    async fn factory_rejects_options_of_other_kind() {
        let factory = OpenvpnServiceFactory::new(
            deps(Arc::new(crate::adapters::StaticLocationResolver::new(
                Location::in_country("LT"),
            ))),
            Arc::new(LoopbackTransport::new()),
            Arc::new(AllowAll),
        );

        let result = factory.create(ServiceOptions::Noop).await;

        assert!(matches!(
            result,
            Err(ServiceError::OptionsMismatch {
                expected: ServiceType::Openvpn,
                actual: ServiceType::Noop
            })
        ));
    }

    #[tokio::test]
    async fn openvpn_config_carries_protocol() {
        let factory = OpenvpnServiceFactory::new(
            deps(Arc::new(crate::adapters::StaticLocationResolver::new(
                Location::in_country("LT"),
            ))),
            Arc::new(LoopbackTransport::new()),
            Arc::new(AllowAll),
        );
        let options = ServiceOptions::Openvpn(OpenvpnOptions {
            port: None,
            protocol: Protocol::Tcp,
        });

        let (service, _) = factory.create(options).await.unwrap();
        service.start().await.unwrap();
        let config = service
            .provide_config(crate::domain::foundation::SessionId::new(), None)
            .await
            .unwrap();

        assert_eq!(config["protocol"], "tcp");
        assert_eq!(config["service_type"], "openvpn");
    }
}
