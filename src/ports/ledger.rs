//! Blockchain ports: accountant settlement and provider registry.
//!
//! Only the narrow submit/await contracts are modelled; RPC details live in
//! the adapters.

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

use crate::domain::foundation::{Amount, ContractAddress, Identity};
use crate::domain::payment::PaymentChannel;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("Transaction rejected: {0}")]
    Rejected(String),

    #[error("Ledger unreachable: {0}")]
    Unavailable(String),
}

/// Handle to a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TxHandle(String);

impl TxHandle {
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Final state of a submitted transaction as observed within a wait bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxOutcome {
    Confirmed,
    TimedOut,
    Failed(String),
}

/// Settlement of accumulated promises through an accountant.
#[async_trait]
pub trait SettlementClient: Send + Sync {
    /// Submits a settlement of the promises `channel`'s consumer issued up
    /// to the cumulative `amount`.
    async fn submit_settlement(
        &self,
        channel: &PaymentChannel,
        accountant: &ContractAddress,
        amount: Amount,
    ) -> Result<TxHandle, LedgerError>;

    /// Waits up to `timeout` for the transaction to be mined.
    async fn await_confirmation(&self, tx: &TxHandle, timeout: Duration) -> TxOutcome;
}

/// On-chain registration of provider identities.
#[async_trait]
pub trait RegistrationClient: Send + Sync {
    async fn is_registered(&self, identity: &Identity, registry: &ContractAddress) -> Result<bool, LedgerError>;

    /// Registers `identity` with `stake` and waits for the transaction.
    async fn register_provider(
        &self,
        identity: &Identity,
        registry: &ContractAddress,
        accountant: &ContractAddress,
        stake: Amount,
    ) -> Result<TxHandle, LedgerError>;
}
