//! Payment and settlement events.

use serde::{Deserialize, Serialize};

use super::{PaymentChannel, Promise};
use crate::domain::foundation::{
    domain_event, topics, Amount, ContractAddress, EventId, Identity, SessionId, Timestamp,
};

// ════════════════════════════════════════════════════════════════════════════
// Promises
// ════════════════════════════════════════════════════════════════════════════

/// Published by a session's payment engine for every verified promise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromiseReceived {
    pub event_id: EventId,
    pub session_id: SessionId,
    pub provider_id: Identity,
    pub promise: Promise,
    pub received_at: Timestamp,
}

domain_event!(
    PromiseReceived,
    event_type = topics::PROMISE_RECEIVED,
    aggregate_id = session_id,
    aggregate_type = "Session",
    occurred_at = received_at,
    event_id = event_id
);

impl PromiseReceived {
    pub fn new(session_id: SessionId, provider_id: Identity, promise: Promise) -> Self {
        Self {
            event_id: EventId::new(),
            session_id,
            provider_id,
            promise,
            received_at: Timestamp::now(),
        }
    }
}

/// Published when the settler refuses a promise as a protocol violation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromiseRejected {
    pub event_id: EventId,
    pub session_id: SessionId,
    pub provider_id: Identity,
    pub amount: Amount,
    pub reason: String,
    pub rejected_at: Timestamp,
}

domain_event!(
    PromiseRejected,
    event_type = topics::PROMISE_REJECTED,
    aggregate_id = session_id,
    aggregate_type = "Session",
    occurred_at = rejected_at,
    event_id = event_id
);

impl PromiseRejected {
    pub fn new(
        session_id: SessionId,
        provider_id: Identity,
        amount: Amount,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            event_id: EventId::new(),
            session_id,
            provider_id,
            amount,
            reason: reason.into(),
            rejected_at: Timestamp::now(),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Settlement
// ════════════════════════════════════════════════════════════════════════════

/// Published when a settlement transaction is submitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementRequested {
    pub event_id: EventId,
    pub provider_id: Identity,
    pub consumer_id: Identity,
    pub accountant: ContractAddress,
    pub amount: Amount,
    pub requested_at: Timestamp,
}

domain_event!(
    SettlementRequested,
    event_type = topics::SETTLEMENT_REQUESTED,
    aggregate_id = provider_id,
    aggregate_type = "Settlement",
    occurred_at = requested_at,
    event_id = event_id
);

impl SettlementRequested {
    pub fn new(channel: PaymentChannel, accountant: ContractAddress, amount: Amount) -> Self {
        Self {
            event_id: EventId::new(),
            provider_id: channel.provider,
            consumer_id: channel.consumer,
            accountant,
            amount,
            requested_at: Timestamp::now(),
        }
    }
}

/// Published when the chain confirmed a settlement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementCompleted {
    pub event_id: EventId,
    pub provider_id: Identity,
    pub consumer_id: Identity,
    pub amount: Amount,
    pub tx_hash: String,
    pub completed_at: Timestamp,
}

domain_event!(
    SettlementCompleted,
    event_type = topics::SETTLEMENT_COMPLETED,
    aggregate_id = provider_id,
    aggregate_type = "Settlement",
    occurred_at = completed_at,
    event_id = event_id
);

impl SettlementCompleted {
    pub fn new(channel: PaymentChannel, amount: Amount, tx_hash: impl Into<String>) -> Self {
        Self {
            event_id: EventId::new(),
            provider_id: channel.provider,
            consumer_id: channel.consumer,
            amount,
            tx_hash: tx_hash.into(),
            completed_at: Timestamp::now(),
        }
    }
}

/// Published when a settlement was not confirmed within the allowed wait.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementTimedOut {
    pub event_id: EventId,
    pub provider_id: Identity,
    pub consumer_id: Identity,
    pub amount: Amount,
    pub waited_secs: u64,
    pub timed_out_at: Timestamp,
}

domain_event!(
    SettlementTimedOut,
    event_type = topics::SETTLEMENT_TIMED_OUT,
    aggregate_id = provider_id,
    aggregate_type = "Settlement",
    occurred_at = timed_out_at,
    event_id = event_id
);

impl SettlementTimedOut {
    pub fn new(channel: PaymentChannel, amount: Amount, waited_secs: u64) -> Self {
        Self {
            event_id: EventId::new(),
            provider_id: channel.provider,
            consumer_id: channel.consumer,
            amount,
            waited_secs,
            timed_out_at: Timestamp::now(),
        }
    }
}

/// Published when submission or confirmation failed outright.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementFailed {
    pub event_id: EventId,
    pub provider_id: Identity,
    pub consumer_id: Identity,
    pub amount: Amount,
    pub reason: String,
    pub failed_at: Timestamp,
}

domain_event!(
    SettlementFailed,
    event_type = topics::SETTLEMENT_FAILED,
    aggregate_id = provider_id,
    aggregate_type = "Settlement",
    occurred_at = failed_at,
    event_id = event_id
);

impl SettlementFailed {
    pub fn new(channel: PaymentChannel, amount: Amount, reason: impl Into<String>) -> Self {
        Self {
            event_id: EventId::new(),
            provider_id: channel.provider,
            consumer_id: channel.consumer,
            amount,
            reason: reason.into(),
            failed_at: Timestamp::now(),
        }
    }
}
