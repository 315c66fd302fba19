//! Mock ledger for development and testing.
//!
//! Implements both chain ports in memory. Supports:
//! - Configurable confirmation delay (to exercise settlement timeouts)
//! - Error injection for the next N submissions or registrations
//! - Call tracking

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::domain::foundation::{Amount, ContractAddress, Identity};
use crate::domain::payment::PaymentChannel;
use crate::ports::{LedgerError, RegistrationClient, SettlementClient, TxHandle, TxOutcome};

/// Recorded settlement submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedSettlement {
    pub tx: TxHandle,
    pub channel: PaymentChannel,
    pub accountant: ContractAddress,
    pub amount: Amount,
}

#[derive(Default)]
struct LedgerState {
    confirmation_delay: Duration,
    failing_submissions: u32,
    failing_confirmations: u32,
    failing_registrations: u32,
    submissions: Vec<SubmittedSettlement>,
    outcomes: HashMap<TxHandle, TxOutcome>,
    registration_attempts: u32,
    registered: HashSet<Identity>,
}

/// In-memory chain.
///
/// # Example
///
/// ```ignore
/// let ledger = MockLedger::new().with_confirmation_delay(Duration::from_secs(30));
/// ledger.fail_next_registrations(2);
/// ```
#[derive(Default)]
pub struct MockLedger {
    inner: Arc<Mutex<LedgerState>>,
    next_tx: AtomicU64,
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Methods
    // ════════════════════════════════════════════════════════════════════════════

    /// Time a settlement takes to be mined.
    pub fn with_confirmation_delay(self, delay: Duration) -> Self {
        self.state().confirmation_delay = delay;
        self
    }

    pub fn set_confirmation_delay(&self, delay: Duration) {
        self.state().confirmation_delay = delay;
    }

    /// Rejects the next `count` settlement submissions.
    pub fn fail_next_submissions(&self, count: u32) {
        self.state().failing_submissions = count;
    }

    /// Reverts the next `count` mined settlements.
    pub fn fail_next_confirmations(&self, count: u32) {
        self.state().failing_confirmations = count;
    }

    /// Rejects the next `count` registration attempts.
    pub fn fail_next_registrations(&self, count: u32) {
        self.state().failing_registrations = count;
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Assertions
    // ════════════════════════════════════════════════════════════════════════════

    pub fn submissions(&self) -> Vec<SubmittedSettlement> {
        self.state().submissions.clone()
    }

    pub fn registration_attempts(&self) -> u32 {
        self.state().registration_attempts
    }

    pub fn is_provider_registered(&self, identity: &Identity) -> bool {
        self.state().registered.contains(identity)
    }

    fn state(&self) -> std::sync::MutexGuard<'_, LedgerState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_tx(&self) -> TxHandle {
        let n = self.next_tx.fetch_add(1, Ordering::SeqCst) + 1;
        TxHandle::new(format!("0x{:064x}", n))
    }
}

#[async_trait]
impl SettlementClient for MockLedger {
    async fn submit_settlement(
        &self,
        channel: &PaymentChannel,
        accountant: &ContractAddress,
        amount: Amount,
    ) -> Result<TxHandle, LedgerError> {
        let tx = self.next_tx();
        let mut state = self.state();
        if state.failing_submissions > 0 {
            state.failing_submissions -= 1;
            return Err(LedgerError::Rejected("injected submission failure".to_string()));
        }

        let outcome = if state.failing_confirmations > 0 {
            state.failing_confirmations -= 1;
            TxOutcome::Failed("transaction reverted".to_string())
        } else {
            TxOutcome::Confirmed
        };
        state.outcomes.insert(tx.clone(), outcome);
        state.submissions.push(SubmittedSettlement {
            tx: tx.clone(),
            channel: channel.clone(),
            accountant: accountant.clone(),
            amount,
        });
        Ok(tx)
    }

    async fn await_confirmation(&self, tx: &TxHandle, timeout: Duration) -> TxOutcome {
        let (delay, outcome) = {
            let state = self.state();
            (state.confirmation_delay, state.outcomes.get(tx).cloned())
        };
        let Some(outcome) = outcome else {
            return TxOutcome::Failed(format!("unknown transaction {}", tx));
        };

        if delay > timeout {
            tokio::time::sleep(timeout).await;
            return TxOutcome::TimedOut;
        }
        tokio::time::sleep(delay).await;
        outcome
    }
}

#[async_trait]
impl RegistrationClient for MockLedger {
    async fn is_registered(
        &self,
        identity: &Identity,
        _registry: &ContractAddress,
    ) -> Result<bool, LedgerError> {
        Ok(self.state().registered.contains(identity))
    }

    async fn register_provider(
        &self,
        identity: &Identity,
        _registry: &ContractAddress,
        _accountant: &ContractAddress,
        _stake: Amount,
    ) -> Result<TxHandle, LedgerError> {
        let tx = self.next_tx();
        let mut state = self.state();
        state.registration_attempts += 1;
        if state.failing_registrations > 0 {
            state.failing_registrations -= 1;
            return Err(LedgerError::Unavailable("injected registration failure".to_string()));
        }
        state.registered.insert(identity.clone());
        Ok(tx)
    }
}
