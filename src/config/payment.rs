//! Payment configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::domain::foundation::{Amount, ContractAddress};
use crate::domain::market::Price;

/// Invoicing, pricing and settlement. Amounts are in whole tokens.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Accountant contract promises are issued against
    #[serde(default)]
    pub accountant_address: String,

    /// Unsettled amount that triggers a settlement
    pub settlement_threshold: Option<f64>,

    /// How long a submitted settlement may take to confirm
    pub max_wait_for_settlement_secs: Option<u64>,

    #[serde(default = "default_sweep_interval")]
    pub settlement_sweep_interval_secs: u64,

    #[serde(default = "default_invoice_frequency")]
    pub invoice_frequency_secs: u64,

    #[serde(default = "default_promise_wait_timeout")]
    pub promise_wait_timeout_secs: u64,

    #[serde(default = "default_max_missed_promises")]
    pub max_missed_promises: u32,

    #[serde(default = "default_price_per_gib")]
    pub price_per_gib: f64,

    #[serde(default = "default_price_per_minute")]
    pub price_per_minute: f64,
}

fn default_sweep_interval() -> u64 {
    30
}

fn default_invoice_frequency() -> u64 {
    60
}

fn default_promise_wait_timeout() -> u64 {
    30
}

fn default_max_missed_promises() -> u32 {
    3
}

fn default_price_per_gib() -> f64 {
    0.07
}

fn default_price_per_minute() -> f64 {
    0.0005
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            accountant_address: String::new(),
            settlement_threshold: None,
            max_wait_for_settlement_secs: None,
            settlement_sweep_interval_secs: default_sweep_interval(),
            invoice_frequency_secs: default_invoice_frequency(),
            promise_wait_timeout_secs: default_promise_wait_timeout(),
            max_missed_promises: default_max_missed_promises(),
            price_per_gib: default_price_per_gib(),
            price_per_minute: default_price_per_minute(),
        }
    }
}

impl PaymentConfig {
    pub fn accountant(&self) -> Result<ContractAddress, ValidationError> {
        if self.accountant_address.trim().is_empty() {
            return Err(ValidationError::MissingRequired("payment.accountant_address"));
        }
        ContractAddress::new(self.accountant_address.as_str())
            .map_err(ValidationError::invalid("payment.accountant_address"))
    }

    pub fn threshold(&self) -> Result<Amount, ValidationError> {
        let tokens = self
            .settlement_threshold
            .ok_or(ValidationError::MissingRequired("payment.settlement_threshold"))?;
        Amount::from_tokens(tokens).map_err(ValidationError::invalid("payment.settlement_threshold"))
    }

    pub fn max_wait_for_settlement(&self) -> Result<Duration, ValidationError> {
        let secs = self
            .max_wait_for_settlement_secs
            .ok_or(ValidationError::MissingRequired("payment.max_wait_for_settlement_secs"))?;
        non_zero("payment.max_wait_for_settlement_secs", secs)
    }

    pub fn settlement_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.settlement_sweep_interval_secs)
    }

    pub fn invoice_frequency(&self) -> Duration {
        Duration::from_secs(self.invoice_frequency_secs)
    }

    pub fn promise_wait_timeout(&self) -> Duration {
        Duration::from_secs(self.promise_wait_timeout_secs)
    }

    pub fn price(&self) -> Result<Price, ValidationError> {
        Ok(Price {
            per_minute: Amount::from_tokens(self.price_per_minute)
                .map_err(ValidationError::invalid("payment.price_per_minute"))?,
            per_gib: Amount::from_tokens(self.price_per_gib)
                .map_err(ValidationError::invalid("payment.price_per_gib"))?,
        })
    }

    /// Validate payment configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.accountant()?;
        self.threshold()?;
        self.max_wait_for_settlement()?;
        non_zero("payment.settlement_sweep_interval_secs", self.settlement_sweep_interval_secs)?;
        non_zero("payment.invoice_frequency_secs", self.invoice_frequency_secs)?;
        non_zero("payment.promise_wait_timeout_secs", self.promise_wait_timeout_secs)?;
        self.price()?;
        Ok(())
    }
}

pub(super) fn non_zero(field: &'static str, secs: u64) -> Result<Duration, ValidationError> {
    if secs == 0 {
        return Err(ValidationError::ZeroDuration(field));
    }
    Ok(Duration::from_secs(secs))
}
