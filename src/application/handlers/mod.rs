//! Application handlers.
//!
//! Orchestration of the node's use cases over the ports.

pub mod payment;
pub mod policy;
pub mod registry;
pub mod service;
pub mod session;

pub use payment::{
    AccountantPromiseSettler, InvoiceEngineConfig, InvoicePaymentEngineFactory, NoopSettler,
    SettlementConfig, SettlementError,
};
pub use policy::PolicyOracle;
pub use registry::{ProviderRegistrar, RegistrarConfig, RegistrationError};
pub use service::{
    DialogHandler, ServiceCleaner, ServiceInfo, ServiceManager, ServiceRegistry, TransportSelector,
};
pub use session::{CreateSessionCommand, PromiseRejectionHandler, SessionManager};
