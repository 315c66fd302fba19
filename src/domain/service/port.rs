//! Port and port range value objects.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

/// A non-zero network port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct Port(u16);

impl Port {
    pub fn new(value: u16) -> Result<Self, ValidationError> {
        if value == 0 {
            return Err(ValidationError::out_of_range("port", 1, 65535, 0));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> u16 {
        self.0
    }
}

impl TryFrom<u16> for Port {
    type Error = ValidationError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Port> for u16 {
    fn from(port: Port) -> Self {
        port.0
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Inclusive range of ports, written `start:end` in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PortRange {
    start: Port,
    end: Port,
}

impl PortRange {
    pub fn new(start: u16, end: u16) -> Result<Self, ValidationError> {
        let start = Port::new(start)?;
        let end = Port::new(end)?;
        if start > end {
            return Err(ValidationError::invalid_format(
                "port_range",
                format!("start {} is greater than end {}", start, end),
            ));
        }
        Ok(Self { start, end })
    }

    /// A range covering exactly one port.
    pub fn single(port: Port) -> Self {
        Self { start: port, end: port }
    }

    pub fn start(&self) -> Port {
        self.start
    }

    pub fn end(&self) -> Port {
        self.end
    }

    pub fn len(&self) -> usize {
        (self.end.0 - self.start.0) as usize + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, port: Port) -> bool {
        port >= self.start && port <= self.end
    }

    pub fn iter(&self) -> impl Iterator<Item = Port> {
        (self.start.0..=self.end.0).map(Port)
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start, self.end)
    }
}

impl FromStr for PortRange {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse = |part: &str| {
            part.trim().parse::<u16>().map_err(|_| {
                ValidationError::invalid_format("port_range", format!("'{}' is not a port", part))
            })
        };
        match s.split_once(':') {
            Some((start, end)) => PortRange::new(parse(start)?, parse(end)?),
            None => {
                let port = parse(s)?;
                PortRange::new(port, port)
            }
        }
    }
}

impl TryFrom<String> for PortRange {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PortRange> for String {
    fn from(range: PortRange) -> Self {
        range.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_zero_is_rejected() {
        assert!(Port::new(0).is_err());
        assert!(Port::new(1).is_ok());
    }

    #[test]
    fn range_parses_start_end_syntax() {
        let range: PortRange = "51820:51822".parse().unwrap();
        assert_eq!(range.start().value(), 51820);
        assert_eq!(range.end().value(), 51822);
        assert_eq!(range.len(), 3);
    }

    #[test]
    fn range_parses_single_port() {
        let range: PortRange = "1194".parse().unwrap();
        assert_eq!(range.len(), 1);
        assert!(range.contains(Port::new(1194).unwrap()));
    }

    #[test]
    fn inverted_range_is_rejected() {
        assert!("20:10".parse::<PortRange>().is_err());
    }

    #[test]
    fn iter_yields_every_port_in_order() {
        let range = PortRange::new(10, 12).unwrap();
        let ports: Vec<u16> = range.iter().map(|p| p.value()).collect();
        assert_eq!(ports, vec![10, 11, 12]);
    }
}
