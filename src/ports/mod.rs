//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the node's orchestration and the outside world. Adapters implement them.
//!
//! ## Event Ports
//!
//! - `EventPublisher` / `EventSubscriber` / `EventHandler`
//!
//! ## Network
//!
//! - `DialogTransport`, `Channel` - consumer dialogs and session channels
//! - `PortSupplier`, `NatPinger`, `Firewall`, `TransportBackend`
//! - `ClientAuthenticator` - login callback for connection-oriented transports
//!
//! ## Chain and Oracles
//!
//! - `SettlementClient`, `RegistrationClient`
//! - `IdentityExtractor`, `LocationResolver`, `PolicyFetcher`
//! - `PromiseSettler`, `PromiseHistory` - settlement and per-channel amounts

mod authenticator;
mod channel;
mod dialog;
mod event_publisher;
mod event_subscriber;
mod firewall;
mod identity_extractor;
mod ledger;
mod location_resolver;
mod nat_pinger;
mod payment_engine;
mod policy_fetcher;
mod port_supplier;
mod service;
mod session_storage;
mod settler;
mod transport;

pub use authenticator::{AuthError, ClientAuthenticator};
pub use channel::{Channel, ChannelError, ChannelMessage};
pub use dialog::{DialogError, DialogTransport, DialogWaiter, IncomingDialog};
pub use event_publisher::EventPublisher;
pub use event_subscriber::{EventBus, EventHandler, EventSubscriber};
pub use firewall::{Firewall, FirewallError};
pub use identity_extractor::{ExtractionError, IdentityExtractor};
pub use ledger::{LedgerError, RegistrationClient, SettlementClient, TxHandle, TxOutcome};
pub use location_resolver::{LocationError, LocationResolver};
pub use nat_pinger::{NatError, NatPinger};
pub use payment_engine::{EngineExit, PaymentEngine, PaymentEngineContext, PaymentEngineFactory};
pub use policy_fetcher::{PolicyError, PolicyFetcher};
pub use port_supplier::{PortError, PortLease, PortSupplier};
pub use service::{Service, ServiceError, ServiceFactory};
pub use session_storage::{SessionStorage, SessionTerminator};
pub use settler::{PromiseHistory, PromiseSettler};
pub use transport::{TrafficMeter, TransportBackend, TransportError};
