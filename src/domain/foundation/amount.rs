//! Token amounts in the smallest on-chain unit.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ValidationError;

/// Number of base units in one whole token.
pub const UNITS_PER_TOKEN: u128 = 1_000_000_000_000_000_000;

/// Non-negative token amount, counted in base units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(u128);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub fn from_units(units: u128) -> Self {
        Self(units)
    }

    /// Converts a whole-token figure (as written in configuration) to base units.
    ///
    /// # Errors
    ///
    /// `OutOfRange` for negative or non-finite values.
    pub fn from_tokens(tokens: f64) -> Result<Self, ValidationError> {
        if !tokens.is_finite() || tokens < 0.0 {
            return Err(ValidationError::invalid_format(
                "amount",
                format!("token amount must be a non-negative number, got {}", tokens),
            ));
        }
        Ok(Self((tokens * UNITS_PER_TOKEN as f64).round() as u128))
    }

    pub fn units(&self) -> u128 {
        self.0
    }

    pub fn saturating_sub(self, other: Amount) -> Amount {
        Amount(self.0.saturating_sub(other.0))
    }

    pub fn saturating_add(self, other: Amount) -> Amount {
        Amount(self.0.saturating_add(other.0))
    }

    /// Multiplies by a fractional quantity (minutes, GiB), rounding down.
    pub fn scale(self, factor: f64) -> Amount {
        if !factor.is_finite() || factor <= 0.0 {
            return Amount::ZERO;
        }
        Amount((self.0 as f64 * factor) as u128)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
