//! Node bootstrap: wires the handlers over the supplied adapters and owns
//! the background tasks.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{info, warn};

use super::handlers::payment::{
    AccountantPromiseSettler, InvoiceEngineConfig, InvoicePaymentEngineFactory, NoopSettler,
    SettlementConfig,
};
use super::handlers::policy::PolicyOracle;
use super::handlers::registry::{ProviderRegistrar, RegistrarConfig};
use super::handlers::service::{
    DialogHandler, NoopServiceFactory, OpenvpnServiceFactory, ServiceCleaner, ServiceManager,
    ServiceRegistry, TransportSelector, TunnelFactoryDeps, WireguardServiceFactory,
};
use super::handlers::session::{PromiseRejectionHandler, SessionManager};
use crate::adapters::openvpn::{AuthValidator, ClientMap};
use crate::domain::foundation::{topics, Identity, ServiceId};
use crate::domain::market::{Price, ServiceType};
use crate::domain::policy::PolicyRepository;
use crate::domain::service::ServiceOptions;
use crate::ports::{
    DialogTransport, EventPublisher, EventSubscriber, Firewall, IdentityExtractor,
    LocationResolver, NatPinger, PolicyFetcher, PortSupplier, PromiseHistory, PromiseSettler,
    RegistrationClient, ServiceError, SessionStorage, SessionTerminator, SettlementClient,
    TransportBackend,
};

/// Node-level settings, resolved from configuration.
#[derive(Debug, Clone)]
pub struct NodeOptions {
    pub identity: Identity,
    /// Mobile consumer mode: no services, no registration, no settlement.
    pub consumer_only: bool,
    pub price: Price,
    pub invoice: InvoiceEngineConfig,
    pub settlement: SettlementConfig,
    /// On-chain registration. `None` runs without registering.
    pub registrar: Option<RegistrarConfig>,
    pub policy_ids: Vec<String>,
    pub policy_fetch_interval: Duration,
}

/// Adapters the node runs on.
pub struct NodeDependencies {
    pub publisher: Arc<dyn EventPublisher>,
    pub subscriber: Arc<dyn EventSubscriber>,
    pub session_storage: Arc<dyn SessionStorage>,
    pub dialogs: Arc<dyn DialogTransport>,
    pub settlement_client: Arc<dyn SettlementClient>,
    pub registration_client: Arc<dyn RegistrationClient>,
    pub identity_extractor: Arc<dyn IdentityExtractor>,
    pub location: Arc<dyn LocationResolver>,
    pub policy_fetcher: Option<Arc<dyn PolicyFetcher>>,
    pub firewall: Arc<dyn Firewall>,
    pub openvpn_transport: Arc<dyn TransportBackend>,
    pub wireguard_transport: Arc<dyn TransportBackend>,
    pub dynamic_ports: Arc<dyn PortSupplier>,
    pub nat_pinger: Arc<dyn NatPinger>,
}

pub struct Node {
    options: NodeOptions,
    services: Arc<ServiceManager>,
    sessions: Arc<SessionManager>,
    settler: Arc<dyn PromiseSettler>,
    registrar: Option<Arc<ProviderRegistrar>>,
    policies: Arc<PolicyRepository>,
    shutdown: watch::Sender<bool>,
    tasks: JoinSet<()>,
}

impl Node {
    /// Wires every component, subscribes the event handlers and starts the
    /// policy refresh and settlement sweep loops. Must run inside a Tokio
    /// runtime.
    pub fn start(options: NodeOptions, deps: NodeDependencies) -> Self {
        let (shutdown, _) = watch::channel(false);
        let mut tasks = JoinSet::new();

        let (settler, history): (Arc<dyn PromiseSettler>, Arc<dyn PromiseHistory>) =
            if options.consumer_only {
                let settler: Arc<dyn PromiseSettler> = Arc::new(NoopSettler);
                let history: Arc<dyn PromiseHistory> = Arc::new(NoopSettler);
                (settler, history)
            } else {
                let settler = Arc::new(AccountantPromiseSettler::new(
                    options.settlement.clone(),
                    Arc::clone(&deps.settlement_client),
                    Arc::clone(&deps.publisher),
                ));
                let sweeper = Arc::clone(&settler);
                let stop = shutdown.subscribe();
                tasks.spawn(async move { sweeper.run(stop).await });
                let history: Arc<dyn PromiseHistory> = settler.clone();
                (settler as Arc<dyn PromiseSettler>, history)
            };
        settler.subscribe(deps.subscriber.as_ref());

        let engines = Arc::new(InvoicePaymentEngineFactory::new(
            options.invoice.clone(),
            Arc::clone(&deps.identity_extractor),
            history,
            Arc::clone(&deps.publisher),
        ));
        let sessions = Arc::new(SessionManager::new(
            Arc::clone(&deps.session_storage),
            engines,
            Arc::clone(&deps.publisher),
        ));

        let policies = Arc::new(PolicyRepository::new());
        if let Some(fetcher) = deps.policy_fetcher.clone() {
            let oracle = PolicyOracle::new(
                fetcher,
                Arc::clone(&policies),
                options.policy_ids.clone(),
                options.policy_fetch_interval,
            );
            let stop = shutdown.subscribe();
            tasks.spawn(async move { oracle.run(stop).await });
        }

        let registrar_config = options.registrar.clone().filter(|_| !options.consumer_only);
        let registrar = registrar_config.map(|config| {
            let registrar = Arc::new(ProviderRegistrar::new(
                config,
                Arc::clone(&deps.registration_client),
                Arc::clone(&deps.publisher),
            ));
            registrar.subscribe(deps.subscriber.as_ref());
            registrar
        });

        deps.subscriber.subscribe(
            topics::PROMISE_REJECTED,
            Arc::new(PromiseRejectionHandler::new(Arc::clone(&sessions))),
        );
        deps.subscriber.subscribe(
            topics::SERVICE_STATUS_CHANGED,
            Arc::new(ServiceCleaner::new(Arc::clone(&sessions))),
        );

        let registry = Arc::new(Self::service_registry(&options, &deps, &sessions));
        let services = Arc::new(ServiceManager::new(
            registry,
            Arc::clone(&deps.dialogs),
            Arc::new(DialogHandler::new(Arc::clone(&sessions), Arc::clone(&policies))),
            Arc::clone(&sessions),
            Arc::clone(&deps.publisher),
        ));

        info!(
            identity = %options.identity,
            consumer_only = options.consumer_only,
            "Node started"
        );
        Self {
            options,
            services,
            sessions,
            settler,
            registrar,
            policies,
            shutdown,
            tasks,
        }
    }

    fn service_registry(
        options: &NodeOptions,
        deps: &NodeDependencies,
        sessions: &Arc<SessionManager>,
    ) -> ServiceRegistry {
        let tunnel_deps = TunnelFactoryDeps {
            provider_id: options.identity.clone(),
            price: options.price,
            location: Arc::clone(&deps.location),
            selector: Arc::new(TransportSelector::new(
                Arc::clone(&deps.dynamic_ports),
                Arc::clone(&deps.nat_pinger),
            )),
            firewall: Arc::clone(&deps.firewall),
        };
        let client_map = Arc::new(ClientMap::new(
            Arc::clone(&deps.session_storage),
            Arc::clone(sessions) as Arc<dyn SessionTerminator>,
        ));
        let validator = Arc::new(AuthValidator::new(
            client_map,
            Arc::clone(&deps.identity_extractor),
        ));

        let registry = ServiceRegistry::new();
        registry.register(
            ServiceType::Openvpn,
            Arc::new(OpenvpnServiceFactory::new(
                tunnel_deps.clone(),
                Arc::clone(&deps.openvpn_transport),
                validator,
            )),
        );
        registry.register(
            ServiceType::Wireguard,
            Arc::new(WireguardServiceFactory::new(
                tunnel_deps,
                Arc::clone(&deps.wireguard_transport),
            )),
        );
        registry.register(
            ServiceType::Noop,
            Arc::new(NoopServiceFactory::new(
                options.identity.clone(),
                options.price,
                Arc::clone(&deps.location),
            )),
        );
        registry
    }

    /// Runs `task` until node shutdown. The task receives the shutdown signal.
    pub fn spawn_task<F, Fut>(&mut self, task: F)
    where
        F: FnOnce(watch::Receiver<bool>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.tasks.spawn(task(self.shutdown.subscribe()));
    }

    /// Starts one instance per option set. Consumer-only nodes start none.
    ///
    /// # Errors
    ///
    /// The first start failure. Instances started before it keep running.
    pub async fn start_services(
        &self,
        services: &[ServiceOptions],
    ) -> Result<Vec<ServiceId>, ServiceError> {
        if self.options.consumer_only {
            info!("Consumer-only node, not starting services");
            return Ok(Vec::new());
        }
        let mut started = Vec::with_capacity(services.len());
        for options in services {
            started.push(self.services.start(*options).await?);
        }
        Ok(started)
    }

    pub fn services(&self) -> &Arc<ServiceManager> {
        &self.services
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    pub fn policies(&self) -> &Arc<PolicyRepository> {
        &self.policies
    }

    pub fn options(&self) -> &NodeOptions {
        &self.options
    }

    /// Stops services, cancels and awaits background tasks, ends remaining
    /// sessions and waits for in-flight settlements.
    pub async fn shutdown(mut self) {
        info!("Node shutting down");
        self.services.stop_all().await;

        let _ = self.shutdown.send(true);
        while let Some(done) = self.tasks.join_next().await {
            if let Err(e) = done {
                warn!(error = %e, "Background task ended abnormally");
            }
        }

        self.sessions.shutdown().await;
        if let Some(registrar) = &self.registrar {
            registrar.shutdown().await;
        }
        self.settler.shutdown().await;
        info!("Node stopped");
    }
}
