//! Access policy oracle configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use super::payment::non_zero;

#[derive(Debug, Clone, Deserialize)]
pub struct AccessPolicyConfig {
    /// Oracle base URL
    pub address: Option<String>,

    /// Comma separated policy ids
    #[serde(default)]
    pub list: String,

    #[serde(default = "default_fetch_interval")]
    pub fetch_interval_secs: u64,
}

fn default_fetch_interval() -> u64 {
    600
}

impl Default for AccessPolicyConfig {
    fn default() -> Self {
        Self {
            address: None,
            list: String::new(),
            fetch_interval_secs: default_fetch_interval(),
        }
    }
}

impl AccessPolicyConfig {
    pub fn policy_ids(&self) -> Vec<String> {
        self.list
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn fetch_interval(&self) -> Duration {
        Duration::from_secs(self.fetch_interval_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(address) = &self.address {
            if !address.starts_with("http://") && !address.starts_with("https://") {
                return Err(ValidationError::InvalidUrl {
                    field: "access_policy.address",
                    value: address.clone(),
                });
            }
        } else if !self.policy_ids().is_empty() {
            return Err(ValidationError::MissingRequired("access_policy.address"));
        }
        non_zero("access_policy.fetch_interval_secs", self.fetch_interval_secs)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_list_is_comma_separated() {
        let config = AccessPolicyConfig {
            list: " mysterium, ,partners ".to_string(),
            ..Default::default()
        };
        assert_eq!(config.policy_ids(), vec!["mysterium", "partners"]);
    }

    #[test]
    fn test_policies_need_an_oracle() {
        let config = AccessPolicyConfig {
            list: "mysterium".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::MissingRequired("access_policy.address"))
        ));
    }

    #[test]
    fn test_oracle_address_must_be_http() {
        let config = AccessPolicyConfig {
            address: Some("ftp://oracle".to_string()),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ValidationError::InvalidUrl { .. })));
    }

    #[test]
    fn test_default_fetch_interval_is_ten_minutes() {
        assert_eq!(AccessPolicyConfig::default().fetch_interval(), Duration::from_secs(600));
    }
}
