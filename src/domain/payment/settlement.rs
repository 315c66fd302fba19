//! Per-channel settlement bookkeeping.
//!
//! Pure state: callers hold one [`SettlementState`] per [`PaymentChannel`]
//! behind a lock and apply every change through these methods, so the amount
//! update and the in-flight decision happen as one unit.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::PaymentError;
use crate::domain::foundation::{Amount, Identity, Timestamp};

/// One consumer paying one provider. Promise amounts are cumulative per
/// channel, across every session the consumer opens with the provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaymentChannel {
    pub provider: Identity,
    pub consumer: Identity,
}

impl PaymentChannel {
    pub fn new(provider: Identity, consumer: Identity) -> Self {
        Self { provider, consumer }
    }
}

impl fmt::Display for PaymentChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}<-{}", self.provider, self.consumer)
    }
}

/// Outcome of applying a promise to the settlement state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromiseOutcome {
    /// Amount increased; no settlement started.
    Accepted,
    /// Same amount as already recorded.
    Duplicate,
    /// Amount increased and crossed the threshold; the caller must submit
    /// a settlement for `amount`.
    SettlementDue { amount: Amount },
}

/// Settlement bookkeeping for one payment channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementState {
    pending_amount: Amount,
    last_settled_amount: Amount,
    settlement_in_flight: bool,
    last_settlement_attempt: Option<Timestamp>,
}

impl SettlementState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending_amount(&self) -> Amount {
        self.pending_amount
    }

    pub fn last_settled_amount(&self) -> Amount {
        self.last_settled_amount
    }

    pub fn settlement_in_flight(&self) -> bool {
        self.settlement_in_flight
    }

    pub fn last_settlement_attempt(&self) -> Option<Timestamp> {
        self.last_settlement_attempt
    }

    /// Amount accrued since the last confirmed settlement.
    pub fn unsettled(&self) -> Amount {
        self.pending_amount.saturating_sub(self.last_settled_amount)
    }

    /// Records a promise amount and starts a settlement when one is due.
    ///
    /// # Errors
    ///
    /// `AmountRegression` if `amount` is below the recorded pending amount.
    /// The state is left untouched.
    pub fn apply_promise(
        &mut self,
        amount: Amount,
        threshold: Amount,
    ) -> Result<PromiseOutcome, PaymentError> {
        if amount < self.pending_amount {
            return Err(PaymentError::AmountRegression {
                recorded: self.pending_amount,
                received: amount,
            });
        }
        if amount == self.pending_amount {
            return Ok(PromiseOutcome::Duplicate);
        }

        self.pending_amount = amount;
        match self.try_begin_settlement(threshold) {
            Some(amount) => Ok(PromiseOutcome::SettlementDue { amount }),
            None => Ok(PromiseOutcome::Accepted),
        }
    }

    /// Marks a settlement in flight if the unsettled amount reached
    /// `threshold` and none is running. Returns the amount to settle.
    pub fn try_begin_settlement(&mut self, threshold: Amount) -> Option<Amount> {
        if self.settlement_in_flight || self.unsettled() < threshold || self.unsettled().is_zero() {
            return None;
        }
        self.settlement_in_flight = true;
        self.last_settlement_attempt = Some(Timestamp::now());
        Some(self.pending_amount)
    }

    /// Records a confirmed settlement of `settled_amount`.
    pub fn confirm_settlement(&mut self, settled_amount: Amount) {
        if settled_amount > self.last_settled_amount {
            self.last_settled_amount = settled_amount;
        }
        self.settlement_in_flight = false;
    }

    /// Clears the in-flight flag after a failure or timeout. Pending amount is kept.
    pub fn abandon_settlement(&mut self) {
        self.settlement_in_flight = false;
    }
}
