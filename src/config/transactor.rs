//! On-chain registration configuration

use serde::Deserialize;
use std::num::NonZeroU32;
use std::time::Duration;

use super::error::ValidationError;
use crate::domain::foundation::{Amount, ContractAddress};

#[derive(Debug, Clone, Deserialize)]
pub struct TransactorConfig {
    #[serde(default)]
    pub registry_address: String,

    /// Total registration attempts before giving up
    #[serde(default = "default_max_attempts")]
    pub provider_max_registration_attempts: u32,

    /// Stake, in whole tokens
    #[serde(default)]
    pub provider_registration_stake: f64,

    #[serde(default = "default_retry_delay")]
    pub provider_registration_retry_delay_secs: u64,
}

fn default_max_attempts() -> u32 {
    10
}

fn default_retry_delay() -> u64 {
    180
}

impl Default for TransactorConfig {
    fn default() -> Self {
        Self {
            registry_address: String::new(),
            provider_max_registration_attempts: default_max_attempts(),
            provider_registration_stake: 0.0,
            provider_registration_retry_delay_secs: default_retry_delay(),
        }
    }
}

impl TransactorConfig {
    pub fn registry(&self) -> Result<ContractAddress, ValidationError> {
        if self.registry_address.trim().is_empty() {
            return Err(ValidationError::MissingRequired("transactor.registry_address"));
        }
        ContractAddress::new(self.registry_address.as_str())
            .map_err(ValidationError::invalid("transactor.registry_address"))
    }

    pub fn stake(&self) -> Result<Amount, ValidationError> {
        Amount::from_tokens(self.provider_registration_stake)
            .map_err(ValidationError::invalid("transactor.provider_registration_stake"))
    }

    pub fn max_attempts(&self) -> Result<NonZeroU32, ValidationError> {
        NonZeroU32::new(self.provider_max_registration_attempts).ok_or(ValidationError::ZeroCount(
            "transactor.provider_max_registration_attempts",
        ))
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.provider_registration_retry_delay_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.registry()?;
        self.stake()?;
        self.max_attempts()?;
        Ok(())
    }
}
