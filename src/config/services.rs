//! Service configuration

use serde::Deserialize;

use super::error::ValidationError;
use crate::domain::market::{Location, ServiceType};
use crate::domain::service::{OpenvpnOptions, Port, PortRange, Protocol, ServiceOptions, WireguardOptions};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenvpnSection {
    /// Manually forwarded port
    pub port: Option<u16>,

    #[serde(default)]
    pub protocol: Protocol,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireguardSection {
    /// Manually forwarded range, `start:end`
    pub ports: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocationSection {
    /// Fixed ISO 3166-1 alpha-2 country
    pub country: Option<String>,

    /// Location resolver URL, used when no country is fixed
    pub address: Option<String>,
}

/// Where the node's location comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationSource {
    Static(Location),
    Resolver(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServicesConfig {
    /// Comma separated service types to start
    #[serde(default = "default_active")]
    pub active: String,

    #[serde(default)]
    pub openvpn: OpenvpnSection,

    #[serde(default)]
    pub wireguard: WireguardSection,

    /// Pool leased to services without forwarded ports
    #[serde(default = "default_dynamic_ports")]
    pub dynamic_ports: String,

    #[serde(default)]
    pub location: LocationSection,
}

fn default_active() -> String {
    "wireguard".to_string()
}

fn default_dynamic_ports() -> String {
    "10000:60000".to_string()
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            active: default_active(),
            openvpn: OpenvpnSection::default(),
            wireguard: WireguardSection::default(),
            dynamic_ports: default_dynamic_ports(),
            location: LocationSection::default(),
        }
    }
}

impl ServicesConfig {
    pub fn active_types(&self) -> Result<Vec<ServiceType>, ValidationError> {
        let mut types = Vec::new();
        for name in self.active.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            let service_type = name
                .parse::<ServiceType>()
                .map_err(|_| ValidationError::UnknownServiceType(name.to_string()))?;
            if !types.contains(&service_type) {
                types.push(service_type);
            }
        }
        Ok(types)
    }

    /// Start options for each active service, in configured order.
    pub fn options(&self) -> Result<Vec<ServiceOptions>, ValidationError> {
        self.active_types()?
            .into_iter()
            .map(|service_type| match service_type {
                ServiceType::Openvpn => {
                    let port = self
                        .openvpn
                        .port
                        .map(Port::new)
                        .transpose()
                        .map_err(ValidationError::invalid("services.openvpn.port"))?;
                    Ok(ServiceOptions::Openvpn(OpenvpnOptions {
                        port,
                        protocol: self.openvpn.protocol,
                    }))
                }
                ServiceType::Wireguard => {
                    let ports = self
                        .wireguard
                        .ports
                        .as_deref()
                        .map(str::parse::<PortRange>)
                        .transpose()
                        .map_err(ValidationError::invalid("services.wireguard.ports"))?;
                    Ok(ServiceOptions::Wireguard(WireguardOptions { ports }))
                }
                ServiceType::Noop => Ok(ServiceOptions::Noop),
            })
            .collect()
    }

    pub fn dynamic_ports(&self) -> Result<PortRange, ValidationError> {
        self.dynamic_ports
            .parse()
            .map_err(ValidationError::invalid("services.dynamic_ports"))
    }

    pub fn location(&self) -> Result<LocationSource, ValidationError> {
        match (&self.location.country, &self.location.address) {
            (Some(country), _) if !country.trim().is_empty() => {
                Ok(LocationSource::Static(Location::in_country(country.trim())))
            }
            (_, Some(address)) => {
                if !address.starts_with("http://") && !address.starts_with("https://") {
                    return Err(ValidationError::InvalidUrl {
                        field: "services.location.address",
                        value: address.clone(),
                    });
                }
                Ok(LocationSource::Resolver(address.clone()))
            }
            _ => Err(ValidationError::MissingRequired("services.location.country")),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.options()?.is_empty() {
            return Err(ValidationError::NoServices);
        }
        self.dynamic_ports()?;
        self.location()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_country() -> ServicesConfig {
        ServicesConfig {
            location: LocationSection {
                country: Some("lt".to_string()),
                address: None,
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_active_services_in_order_without_duplicates() {
        let config = ServicesConfig {
            active: "noop, openvpn,noop".to_string(),
            ..with_country()
        };
        assert_eq!(
            config.active_types().unwrap(),
            vec![ServiceType::Noop, ServiceType::Openvpn]
        );
    }

    #[test]
    fn test_unknown_service_type() {
        let config = ServicesConfig {
            active: "ipsec".to_string(),
            ..with_country()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::UnknownServiceType(name)) if name == "ipsec"
        ));
    }

    #[test]
    fn test_forwarded_ports_become_fixed_options() {
        let config = ServicesConfig {
            active: "openvpn,wireguard".to_string(),
            openvpn: OpenvpnSection {
                port: Some(1194),
                protocol: Protocol::Tcp,
            },
            wireguard: WireguardSection {
                ports: Some("51820:51822".to_string()),
            },
            ..with_country()
        };

        let options = config.options().unwrap();
        assert_eq!(options[0].fixed_ports().unwrap().len(), 1);
        assert_eq!(options[1].fixed_ports().unwrap().len(), 3);
    }

    #[test]
    fn test_static_location_wins_over_resolver() {
        let config = ServicesConfig {
            location: LocationSection {
                country: Some("de".to_string()),
                address: Some("https://location.example".to_string()),
            },
            ..Default::default()
        };
        assert_eq!(
            config.location().unwrap(),
            LocationSource::Static(Location::in_country("DE"))
        );
    }

    #[test]
    fn test_location_is_required() {
        assert!(matches!(
            ServicesConfig::default().validate(),
            Err(ValidationError::MissingRequired("services.location.country"))
        ));
    }
}
