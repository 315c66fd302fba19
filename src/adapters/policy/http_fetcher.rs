//! Policy oracle client.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::domain::policy::AccessPolicy;
use crate::ports::{PolicyError, PolicyFetcher};

/// Fetches each configured policy from `{address}/{policy_id}`.
pub struct HttpPolicyFetcher {
    address: String,
    client: Client,
}

impl HttpPolicyFetcher {
    pub fn new(address: impl Into<String>, timeout: Duration) -> Result<Self, PolicyError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PolicyError::Request(e.to_string()))?;
        Ok(Self {
            address: address.into(),
            client,
        })
    }

    fn policy_url(&self, policy_id: &str) -> String {
        format!("{}/{}", self.address.trim_end_matches('/'), policy_id)
    }
}

#[async_trait]
impl PolicyFetcher for HttpPolicyFetcher {
    async fn fetch(&self, policy_ids: &[String]) -> Result<Vec<AccessPolicy>, PolicyError> {
        let mut policies = Vec::with_capacity(policy_ids.len());
        for id in policy_ids {
            let response = self
                .client
                .get(self.policy_url(id))
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .map_err(|e| PolicyError::Request(format!("{}: {}", id, e)))?;
            let policy: AccessPolicy = response
                .json()
                .await
                .map_err(|e| PolicyError::InvalidResponse(format!("{}: {}", id, e)))?;
            policies.push(policy);
        }
        Ok(policies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_url_joins_address_and_id() {
        let fetcher =
            HttpPolicyFetcher::new("https://oracle.example/api/v1/lists/", Duration::from_secs(5))
                .unwrap();

        assert_eq!(
            fetcher.policy_url("mysterium"),
            "https://oracle.example/api/v1/lists/mysterium"
        );
    }

    #[test]
    fn policy_body_deserializes() {
        let policy: AccessPolicy = serde_json::from_str(
            r#"{"id":"mysterium","title":"Mysterium verified","allowed_identities":["0xAB"]}"#,
        )
        .unwrap();

        assert!(policy.allows(&crate::domain::foundation::Identity::new("0xab").unwrap()));
    }
}
