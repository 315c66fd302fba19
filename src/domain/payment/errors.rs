//! Payment error types.

use thiserror::Error;

use crate::domain::foundation::{Amount, DomainError, ErrorCode};

/// Errors raised while exchanging invoices and promises.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentError {
    #[error("Promise amount regressed: recorded {recorded}, received {received}")]
    AmountRegression { recorded: Amount, received: Amount },

    #[error("Promise signature invalid: {0}")]
    InvalidSignature(String),

    #[error("Promise issued by {actual}, expected {expected}")]
    WrongIssuer { expected: String, actual: String },

    #[error("Promise for accountant {actual}, expected {expected}")]
    WrongAccountant { expected: String, actual: String },

    #[error("Promise of {received} does not cover invoiced {invoiced}")]
    Underpaid { invoiced: Amount, received: Amount },

    #[error("Consumer missed {0} promises in a row")]
    TooManyMissedPromises(u32),

    #[error("Channel error: {0}")]
    Channel(String),
}

impl PaymentError {
    /// Returns true for errors caused by the peer breaking the payment protocol.
    pub fn is_protocol_violation(&self) -> bool {
        !matches!(self, PaymentError::Channel(_))
    }

    pub fn code(&self) -> ErrorCode {
        if self.is_protocol_violation() {
            ErrorCode::ProtocolViolation
        } else {
            ErrorCode::TransportError
        }
    }
}

impl From<PaymentError> for DomainError {
    fn from(err: PaymentError) -> Self {
        DomainError::new(err.code(), err.to_string())
    }
}
