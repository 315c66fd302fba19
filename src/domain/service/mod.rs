//! Service domain module.
//!
//! Lifecycle of service instances, their start options and the ports they bind.
//!
//! # Events
//!
//! - `ServiceStatusChanged` - Published on each lifecycle transition

mod events;
mod options;
mod port;
mod status;

pub use events::ServiceStatusChanged;
pub use options::{OpenvpnOptions, Protocol, ServiceOptions, WireguardOptions};
pub use port::{Port, PortRange};
pub use status::ServiceStatus;
