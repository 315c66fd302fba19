//! Policy fetcher port.

use async_trait::async_trait;

use crate::domain::policy::AccessPolicy;

#[derive(Debug, Clone, thiserror::Error)]
pub enum PolicyError {
    #[error("Policy request failed: {0}")]
    Request(String),

    #[error("Policy response invalid: {0}")]
    InvalidResponse(String),
}

/// Loads access policies from the policy oracle.
#[async_trait]
pub trait PolicyFetcher: Send + Sync {
    async fn fetch(&self, policy_ids: &[String]) -> Result<Vec<AccessPolicy>, PolicyError>;
}
