//! Chooses ports and NAT traversal for a service instance.

use std::sync::Arc;

use crate::adapters::{NoopNatPinger, PortPool};
use crate::domain::service::ServiceOptions;
use crate::ports::{NatPinger, PortSupplier};

/// Port supplier and pinger handed to one service instance.
#[derive(Clone)]
pub struct TransportResources {
    pub ports: Arc<dyn PortSupplier>,
    pub pinger: Arc<dyn NatPinger>,
}

/// Picks transport resources from service options.
///
/// Operator-forwarded ports need no hole punching, so they get a pool bound
/// to exactly that range and the noop pinger. Everything else shares the
/// node-wide dynamic pool and pinger.
pub struct TransportSelector {
    dynamic_ports: Arc<dyn PortSupplier>,
    pinger: Arc<dyn NatPinger>,
}

impl TransportSelector {
    pub fn new(dynamic_ports: Arc<dyn PortSupplier>, pinger: Arc<dyn NatPinger>) -> Self {
        Self {
            dynamic_ports,
            pinger,
        }
    }

    pub fn select(&self, options: &ServiceOptions) -> TransportResources {
        match options.fixed_ports() {
            Some(range) => TransportResources {
                ports: Arc::new(PortPool::fixed(range)),
                pinger: Arc::new(NoopNatPinger),
            },
            None => TransportResources {
                ports: Arc::clone(&self.dynamic_ports),
                pinger: Arc::clone(&self.pinger),
            },
        }
    }
}
