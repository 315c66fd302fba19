//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the node to external systems:
//! - `events` - In-process event bus
//! - `storage` - Session storage
//! - `port`, `nat`, `system` - Host networking: port pools, hole punching, firewall, data plane
//! - `dialog` - Consumer dialogs and session channels
//! - `openvpn` - Client login validation for connection-oriented transports
//! - `identity` - Signature verification
//! - `ledger` - Settlement and registry transactions
//! - `location`, `policy` - Oracle clients

pub mod dialog;
pub mod events;
pub mod identity;
pub mod ledger;
pub mod location;
pub mod nat;
pub mod openvpn;
pub mod policy;
pub mod port;
pub mod storage;
pub mod system;

pub use dialog::{InMemoryChannel, InMemoryDialogTransport};
pub use events::InMemoryEventBus;
pub use identity::{DigestIdentityExtractor, DigestSigner};
pub use ledger::MockLedger;
pub use location::{HttpLocationResolver, StaticLocationResolver};
pub use nat::{NoopNatPinger, UdpNatPinger, UdpPingerConfig, UdpPingerLoop};
pub use openvpn::{AuthValidator, ClientMap};
pub use policy::HttpPolicyFetcher;
pub use port::PortPool;
pub use storage::InMemorySessionStorage;
pub use system::{LoopbackTransport, NoopFirewall};
