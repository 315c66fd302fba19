//! Leased port pools.

use std::collections::HashSet;
use std::net::{Ipv4Addr, UdpSocket};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tracing::debug;

use crate::domain::service::{Port, PortRange};
use crate::ports::{PortError, PortLease, PortSupplier};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PoolKind {
    /// Shared by every service without forwarded ports; skips ports bound by
    /// other processes.
    Dynamic,
    /// Operator-forwarded ports owned by one service.
    Fixed,
}

#[derive(Debug, Default)]
struct PoolState {
    leased: HashSet<Port>,
    cursor: usize,
}

/// Hands out ports from a range. A port stays taken until its lease drops,
/// so instances never revoke each other's ports.
#[derive(Debug)]
pub struct PortPool {
    range: PortRange,
    kind: PoolKind,
    probe_availability: bool,
    state: Arc<Mutex<PoolState>>,
}

impl PortPool {
    /// Node-wide pool for services that did not ask for fixed ports.
    pub fn dynamic(range: PortRange) -> Self {
        Self::build(range, PoolKind::Dynamic, true)
    }

    /// Pool bound to exactly the operator-forwarded `range`.
    pub fn fixed(range: PortRange) -> Self {
        Self::build(range, PoolKind::Fixed, false)
    }

    /// Disables the bind probe, for hosts where binding is not permitted.
    pub fn without_probe(mut self) -> Self {
        self.probe_availability = false;
        self
    }

    fn build(range: PortRange, kind: PoolKind, probe_availability: bool) -> Self {
        Self {
            range,
            kind,
            probe_availability,
            state: Arc::new(Mutex::new(PoolState::default())),
        }
    }

    pub fn range(&self) -> PortRange {
        self.range
    }

    pub fn leased_count(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .leased
            .len()
    }

    fn is_bindable(port: Port) -> bool {
        UdpSocket::bind((Ipv4Addr::UNSPECIFIED, port.value())).is_ok()
    }
}

impl PortSupplier for PortPool {
    fn acquire(&self) -> Result<PortLease, PortError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let len = self.range.len();

        for offset in 0..len {
            let index = (state.cursor + offset) % len;
            let Some(port) = self.range.iter().nth(index) else {
                continue;
            };
            if state.leased.contains(&port) {
                continue;
            }
            if self.probe_availability && !Self::is_bindable(port) {
                debug!(port = %port, "Port in use by another process, skipping");
                continue;
            }

            state.leased.insert(port);
            state.cursor = (index + 1) % len;

            let pool: Weak<Mutex<PoolState>> = Arc::downgrade(&self.state);
            return Ok(PortLease::new(port, move |port| {
                if let Some(pool) = pool.upgrade() {
                    pool.lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .leased
                        .remove(&port);
                }
            }));
        }

        Err(PortError::Exhausted(self.range.to_string()))
    }

    fn describe(&self) -> String {
        match self.kind {
            PoolKind::Dynamic => format!("dynamic {}", self.range),
            PoolKind::Fixed => format!("fixed {}", self.range),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(start: u16, end: u16) -> PortRange {
        PortRange::new(start, end).unwrap()
    }

    #[test]
    fn leases_distinct_ports_until_exhausted() {
        let pool = PortPool::fixed(range(41000, 41001));

        let a = pool.acquire().unwrap();
        let b = pool.acquire().unwrap();

        assert_ne!(a.port(), b.port());
        assert!(matches!(pool.acquire(), Err(PortError::Exhausted(_))));
    }

    #[test]
    fn dropped_lease_returns_port() {
        let pool = PortPool::fixed(range(41010, 41010));
        let lease = pool.acquire().unwrap();
        assert_eq!(pool.leased_count(), 1);

        drop(lease);

        assert_eq!(pool.leased_count(), 0);
        assert_eq!(pool.acquire().unwrap().port().value(), 41010);
    }

    #[test]
    fn releasing_one_lease_keeps_the_others() {
        let pool = PortPool::dynamic(range(41020, 41030)).without_probe();
        let a = pool.acquire().unwrap();
        let b = pool.acquire().unwrap();

        drop(a);

        assert_eq!(pool.leased_count(), 1);
        let c = pool.acquire().unwrap();
        assert_ne!(c.port(), b.port());
    }

    #[test]
    fn lease_outliving_pool_is_harmless() {
        let pool = PortPool::fixed(range(41040, 41040));
        let lease = pool.acquire().unwrap();
        drop(pool);
        drop(lease);
    }

    #[test]
    fn describe_names_the_kind() {
        assert_eq!(PortPool::fixed(range(1194, 1194)).describe(), "fixed 1194:1194");
        assert!(PortPool::dynamic(range(10000, 10010)).describe().starts_with("dynamic"));
    }
}
