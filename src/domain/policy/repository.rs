use std::sync::{Arc, PoisonError, RwLock};

use super::AccessPolicy;
use crate::domain::foundation::{Identity, Timestamp};

/// Consistent view of the policy set at one refresh.
#[derive(Debug, Clone, Default)]
pub struct PolicySnapshot {
    policies: Vec<AccessPolicy>,
    refreshed_at: Option<Timestamp>,
}

impl PolicySnapshot {
    pub fn new(policies: Vec<AccessPolicy>) -> Self {
        Self {
            policies,
            refreshed_at: Some(Timestamp::now()),
        }
    }

    pub fn policies(&self) -> &[AccessPolicy] {
        &self.policies
    }

    pub fn refreshed_at(&self) -> Option<Timestamp> {
        self.refreshed_at
    }

    /// An empty policy set allows everyone.
    pub fn allows(&self, identity: &Identity) -> bool {
        self.policies.is_empty() || self.policies.iter().any(|p| p.allows(identity))
    }
}

/// Read-mostly store of the current policy snapshot.
///
/// Readers clone the `Arc` and never observe a half-applied refresh.
#[derive(Debug, Default)]
pub struct PolicyRepository {
    current: RwLock<Arc<PolicySnapshot>>,
}

impl PolicyRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Arc<PolicySnapshot> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Replaces the whole policy set.
    pub fn replace(&self, policies: Vec<AccessPolicy>) {
        let next = Arc::new(PolicySnapshot::new(policies));
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = next;
    }

    pub fn allows(&self, identity: &Identity) -> bool {
        self.snapshot().allows(identity)
    }
}
