//! Shared harness: a node wired entirely to in-memory adapters.

#![allow(dead_code)]

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use dvpn_node::adapters::{
    DigestIdentityExtractor, DigestSigner, InMemoryDialogTransport, InMemoryEventBus,
    InMemorySessionStorage, LoopbackTransport, MockLedger, NoopFirewall, NoopNatPinger, PortPool,
    StaticLocationResolver,
};
use dvpn_node::application::handlers::payment::{InvoiceEngineConfig, SettlementConfig};
use dvpn_node::application::handlers::registry::RegistrarConfig;
use dvpn_node::application::{Node, NodeDependencies, NodeOptions};
use dvpn_node::domain::foundation::{Amount, ContractAddress, Identity};
use dvpn_node::domain::market::{Location, Price, ServiceType};
use dvpn_node::domain::payment::Promise;
use dvpn_node::domain::service::PortRange;

pub const PROVIDER: &str = "0xaa";
pub const CONSUMER: &str = "0xbb";

pub fn provider() -> Identity {
    Identity::new(PROVIDER).unwrap()
}

pub fn accountant() -> ContractAddress {
    ContractAddress::new("0xacc").unwrap()
}

pub fn registry() -> ContractAddress {
    ContractAddress::new("0x4e9").unwrap()
}

pub fn options(consumer_only: bool) -> NodeOptions {
    NodeOptions {
        identity: provider(),
        consumer_only,
        price: Price {
            per_minute: Amount::from_units(60),
            per_gib: Amount::from_units(1000),
        },
        invoice: InvoiceEngineConfig {
            accountant: accountant(),
            invoice_frequency: Duration::from_secs(60),
            promise_wait_timeout: Duration::from_secs(30),
            max_missed_promises: 1,
        },
        settlement: SettlementConfig {
            accountant: accountant(),
            threshold: Amount::from_units(100),
            max_wait: Duration::from_secs(30),
            sweep_interval: Duration::from_secs(10),
        },
        registrar: Some(RegistrarConfig {
            registry: registry(),
            accountant: accountant(),
            stake: Amount::ZERO,
            max_attempts: NonZeroU32::new(3).unwrap(),
            retry_delay: Duration::from_secs(5),
        }),
        policy_ids: Vec::new(),
        policy_fetch_interval: Duration::from_secs(600),
    }
}

pub struct TestNode {
    pub node: Node,
    pub bus: Arc<InMemoryEventBus>,
    pub dialogs: Arc<InMemoryDialogTransport>,
    pub ledger: Arc<MockLedger>,
    pub storage: Arc<InMemorySessionStorage>,
    pub wireguard: LoopbackTransport,
}

impl TestNode {
    pub fn start(options: NodeOptions) -> Self {
        let bus = Arc::new(InMemoryEventBus::new());
        let dialogs = Arc::new(InMemoryDialogTransport::new());
        let ledger = Arc::new(MockLedger::new());
        let storage = Arc::new(InMemorySessionStorage::new());
        let wireguard = LoopbackTransport::new();

        let node = Node::start(
            options,
            NodeDependencies {
                publisher: bus.clone(),
                subscriber: bus.clone(),
                session_storage: storage.clone(),
                dialogs: dialogs.clone(),
                settlement_client: ledger.clone(),
                registration_client: ledger.clone(),
                identity_extractor: Arc::new(DigestIdentityExtractor),
                location: Arc::new(StaticLocationResolver::new(Location::in_country("LT"))),
                policy_fetcher: None,
                firewall: Arc::new(NoopFirewall),
                openvpn_transport: Arc::new(LoopbackTransport::new()),
                wireguard_transport: Arc::new(wireguard.clone()),
                dynamic_ports: Arc::new(
                    PortPool::dynamic(PortRange::new(41000, 41010).unwrap()).without_probe(),
                ),
                nat_pinger: Arc::new(NoopNatPinger),
            },
        );

        Self {
            node,
            bus,
            dialogs,
            ledger,
            storage,
            wireguard,
        }
    }

    pub fn topic(service_type: ServiceType) -> String {
        format!("{}.{}", PROVIDER, service_type)
    }
}

pub fn consumer_signer() -> DigestSigner {
    DigestSigner::new(Identity::new(CONSUMER).unwrap())
}

pub fn promise(signer: &DigestSigner, amount: Amount) -> Promise {
    Promise {
        issuer: signer.identity().clone(),
        accountant: accountant(),
        cumulative_amount: amount,
        signature: signer
            .sign(&Promise::signed_message(&accountant(), amount))
            .unwrap(),
    }
}
