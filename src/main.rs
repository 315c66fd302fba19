use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use dvpn_node::adapters::{
    DigestIdentityExtractor, HttpLocationResolver, HttpPolicyFetcher, InMemoryDialogTransport,
    InMemoryEventBus, InMemorySessionStorage, LoopbackTransport, MockLedger, NoopFirewall,
    PortPool, StaticLocationResolver, UdpNatPinger, UdpPingerConfig,
};
use dvpn_node::application::{Node, NodeDependencies};
use dvpn_node::config::{LocationSource, LoggingConfig, NodeConfig};
use dvpn_node::ports::{LocationResolver, PolicyFetcher};

const HTTP_TIMEOUT: Duration = Duration::from_secs(20);

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.level.as_str()));

    let builder = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let config = NodeConfig::load()?;
    init_tracing(&config.logging);
    config.validate()?;
    let options = config.to_node_options()?;

    let location: Arc<dyn LocationResolver> = match config.services.location()? {
        LocationSource::Static(location) => Arc::new(StaticLocationResolver::new(location)),
        LocationSource::Resolver(address) => Arc::new(HttpLocationResolver::new(address, HTTP_TIMEOUT)?),
    };
    let policy_fetcher: Option<Arc<dyn PolicyFetcher>> = match &config.access_policy.address {
        Some(address) => Some(Arc::new(HttpPolicyFetcher::new(address.as_str(), HTTP_TIMEOUT)?)),
        None => None,
    };

    let bus = Arc::new(InMemoryEventBus::without_capture());
    let ledger = Arc::new(MockLedger::new());
    let (nat_pinger, pinger_loop) = UdpNatPinger::new(UdpPingerConfig::default());
    let dynamic_ports = PortPool::dynamic(config.services.dynamic_ports()?);

    let deps = NodeDependencies {
        publisher: bus.clone(),
        subscriber: bus.clone(),
        session_storage: Arc::new(InMemorySessionStorage::new()),
        dialogs: Arc::new(InMemoryDialogTransport::new()),
        settlement_client: ledger.clone(),
        registration_client: ledger,
        identity_extractor: Arc::new(DigestIdentityExtractor),
        location,
        policy_fetcher,
        firewall: Arc::new(NoopFirewall),
        openvpn_transport: Arc::new(LoopbackTransport::new()),
        wireguard_transport: Arc::new(LoopbackTransport::new()),
        dynamic_ports: Arc::new(dynamic_ports),
        nat_pinger,
    };

    let mut node = Node::start(options, deps);
    node.spawn_task(|shutdown| pinger_loop.run(shutdown));

    let services = if config.node.consumer_only {
        Vec::new()
    } else {
        config.services.options()?
    };
    match node.start_services(&services).await {
        Ok(started) => info!(count = started.len(), "Services started"),
        Err(e) => {
            error!(error = %e, "Failed to start services");
            node.shutdown().await;
            bus.close().await;
            return Err(e.into());
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Received shutdown signal, exiting gracefully");

    node.shutdown().await;
    bus.drain().await;
    bus.close().await;
    Ok(())
}

