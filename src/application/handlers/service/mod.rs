//! Service handlers: registry, factories, lifecycle and dialog acceptance.

mod dialog_handler;
mod factories;
mod noop_service;
mod port_selector;
mod registry;
mod service_cleaner;
mod service_manager;
mod tunnel_service;

pub use dialog_handler::{DialogHandler, DialogHandlingError};
pub use factories::{
    NoopServiceFactory, OpenvpnServiceFactory, TunnelFactoryDeps, WireguardServiceFactory,
};
pub use noop_service::NoopService;
pub use port_selector::{TransportResources, TransportSelector};
pub use registry::ServiceRegistry;
pub use service_cleaner::ServiceCleaner;
pub use service_manager::{ServiceInfo, ServiceManager};
pub use tunnel_service::TunnelService;
