//! NAT traversal adapters.
//!
//! - `NoopNatPinger` - for operator-forwarded ports
//! - `UdpNatPinger` - shared hole-punching pinger with its background loop

mod noop;
mod udp;

pub use noop::NoopNatPinger;
pub use udp::{UdpNatPinger, UdpPingerConfig, UdpPingerLoop};
