//! Payment handlers: the per-session engine and promise settlement.

mod invoice_engine;
mod noop_settler;
mod promise_settler;

pub use invoice_engine::{InvoiceEngineConfig, InvoicePaymentEngine, InvoicePaymentEngineFactory};
pub use noop_settler::NoopSettler;
pub use promise_settler::{AccountantPromiseSettler, SettlementConfig, SettlementError};
