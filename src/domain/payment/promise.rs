//! Signed payment claims exchanged over a session channel.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{Amount, ContractAddress, Identity, SessionId, Timestamp, ValidationError};

/// Prefix mixed into every promise before signing, so a promise signature can
/// never be replayed as a login signature or vice versa.
pub const PROMISE_SIGNATURE_PREFIX: &str = "DVPN promise:";

/// Hex-encoded signature over a message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Signature(String);

impl Signature {
    /// # Errors
    ///
    /// `EmptyField` if the text is blank.
    pub fn new(text: impl Into<String>) -> Result<Self, ValidationError> {
        let text = text.into().trim().to_string();
        if text.is_empty() {
            return Err(ValidationError::empty_field("signature"));
        }
        Ok(Self(text))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl TryFrom<String> for Signature {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Signature> for String {
    fn from(signature: Signature) -> Self {
        signature.0
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A signed claim that `issuer` owes the provider `cumulative_amount` in
/// total through `accountant`.
///
/// Amounts are cumulative over the provider's accountant channel, so the
/// sequence of accepted promises for one provider never decreases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Promise {
    pub issuer: Identity,
    pub accountant: ContractAddress,
    pub cumulative_amount: Amount,
    pub signature: Signature,
}

impl Promise {
    /// Bytes covered by the issuer's signature.
    pub fn signed_message(accountant: &ContractAddress, cumulative_amount: Amount) -> Vec<u8> {
        format!(
            "{}{}:{}",
            PROMISE_SIGNATURE_PREFIX,
            accountant.as_str(),
            cumulative_amount.units()
        )
        .into_bytes()
    }

    pub fn message(&self) -> Vec<u8> {
        Self::signed_message(&self.accountant, self.cumulative_amount)
    }
}

/// Request for payment sent by the provider at every invoice tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub session_id: SessionId,
    /// Amount accrued by this session since it started.
    pub agreed_amount: Amount,
    pub issued_at: Timestamp,
}

impl Invoice {
    pub fn new(session_id: SessionId, agreed_amount: Amount) -> Self {
        Self {
            session_id,
            agreed_amount,
            issued_at: Timestamp::now(),
        }
    }
}
