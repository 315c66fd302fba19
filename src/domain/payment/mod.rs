//! Payment domain module.
//!
//! Invoices and signed promises exchanged during a session, and the
//! per-channel settlement bookkeeping driven by them.
//!
//! # Events
//!
//! - `PromiseReceived` / `PromiseRejected`
//! - `SettlementRequested`, `SettlementCompleted`, `SettlementTimedOut`, `SettlementFailed`

mod errors;
mod events;
mod promise;
mod settlement;

pub use errors::PaymentError;
pub use events::{
    PromiseReceived, PromiseRejected, SettlementCompleted, SettlementFailed,
    SettlementRequested, SettlementTimedOut,
};
pub use promise::{Invoice, Promise, Signature, PROMISE_SIGNATURE_PREFIX};
pub use settlement::{PaymentChannel, PromiseOutcome, SettlementState};
