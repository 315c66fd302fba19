//! Host integration stand-ins: firewall and data plane.

mod loopback_transport;
mod noop_firewall;

pub use loopback_transport::LoopbackTransport;
pub use noop_firewall::NoopFirewall;
