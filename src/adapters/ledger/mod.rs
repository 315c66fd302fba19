//! Chain adapters.

mod mock_ledger;

pub use mock_ledger::{MockLedger, SubmittedSettlement};
