//! Service start options, one variant per service kind.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Port, PortRange};
use crate::domain::market::ServiceType;

/// Transport protocol of the OpenVPN service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Udp,
    Tcp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Udp => f.write_str("udp"),
            Protocol::Tcp => f.write_str("tcp"),
        }
    }
}

/// OpenVPN options. A fixed `port` means the operator forwarded it manually.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OpenvpnOptions {
    #[serde(default)]
    pub port: Option<Port>,
    #[serde(default)]
    pub protocol: Protocol,
}

/// WireGuard options. A fixed `ports` range means the operator forwarded it manually.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WireguardOptions {
    #[serde(default)]
    pub ports: Option<PortRange>,
}

/// Options for starting a service, tagged by service kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServiceOptions {
    Openvpn(OpenvpnOptions),
    Wireguard(WireguardOptions),
    Noop,
}

impl ServiceOptions {
    /// Default options for a service kind.
    pub fn default_for(service_type: ServiceType) -> Self {
        match service_type {
            ServiceType::Openvpn => ServiceOptions::Openvpn(OpenvpnOptions::default()),
            ServiceType::Wireguard => ServiceOptions::Wireguard(WireguardOptions::default()),
            ServiceType::Noop => ServiceOptions::Noop,
        }
    }

    pub fn service_type(&self) -> ServiceType {
        match self {
            ServiceOptions::Openvpn(_) => ServiceType::Openvpn,
            ServiceOptions::Wireguard(_) => ServiceType::Wireguard,
            ServiceOptions::Noop => ServiceType::Noop,
        }
    }

    /// Operator-forwarded ports, if any were configured.
    pub fn fixed_ports(&self) -> Option<PortRange> {
        match self {
            ServiceOptions::Openvpn(opts) => opts.port.map(PortRange::single),
            ServiceOptions::Wireguard(opts) => opts.ports,
            ServiceOptions::Noop => None,
        }
    }
}
