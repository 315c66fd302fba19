//! Access policy domain module.
//!
//! Policies list the consumer identities allowed to use this node's services.
//! The repository holds one immutable snapshot that a refresh swaps whole.

mod repository;

pub use repository::{PolicyRepository, PolicySnapshot};

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::domain::foundation::Identity;

/// One named allow-list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessPolicy {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub allowed_identities: HashSet<Identity>,
}

impl AccessPolicy {
    pub fn new(id: impl Into<String>, allowed_identities: impl IntoIterator<Item = Identity>) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            allowed_identities: allowed_identities.into_iter().collect(),
        }
    }

    pub fn allows(&self, identity: &Identity) -> bool {
        self.allowed_identities.contains(identity)
    }
}
