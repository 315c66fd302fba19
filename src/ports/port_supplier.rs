//! Port supplier port with leased allocation.

use std::fmt;

use crate::domain::service::Port;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("No free port in {0}")]
    Exhausted(String),

    #[error("Port {0} is not available")]
    Unavailable(Port),
}

/// A port held by one service instance. Dropping the lease returns the port.
pub struct PortLease {
    port: Port,
    release: Option<Box<dyn FnOnce(Port) + Send + Sync>>,
}

impl PortLease {
    pub fn new(port: Port, release: impl FnOnce(Port) + Send + Sync + 'static) -> Self {
        Self {
            port,
            release: Some(Box::new(release)),
        }
    }

    pub fn port(&self) -> Port {
        self.port
    }
}

impl fmt::Debug for PortLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortLease").field("port", &self.port).finish()
    }
}

impl Drop for PortLease {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release(self.port);
        }
    }
}

/// Hands out ports to service instances.
pub trait PortSupplier: Send + Sync {
    /// Leases a free port.
    ///
    /// # Errors
    ///
    /// `Exhausted` when every port of the supplier is leased.
    fn acquire(&self) -> Result<PortLease, PortError>;

    /// Short description for logs, e.g. `dynamic 10000:60000`.
    fn describe(&self) -> String;
}
