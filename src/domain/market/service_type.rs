//! Supported service kinds.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

/// Kind of service a provider can run.
///
/// Closed set: each variant has exactly one factory registered at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    Openvpn,
    Wireguard,
    Noop,
}

impl ServiceType {
    pub const ALL: [ServiceType; 3] = [ServiceType::Openvpn, ServiceType::Wireguard, ServiceType::Noop];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Openvpn => "openvpn",
            ServiceType::Wireguard => "wireguard",
            ServiceType::Noop => "noop",
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ServiceType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                ValidationError::invalid_format("service_type", format!("unknown service type '{}'", s))
            })
    }
}
