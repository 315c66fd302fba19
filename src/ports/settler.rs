//! Promise settler port.

use async_trait::async_trait;

use super::EventSubscriber;
use crate::domain::foundation::Amount;
use crate::domain::payment::PaymentChannel;

/// Settles accumulated promises on-chain.
///
/// Consumer-only nodes use a stand-in whose `subscribe` succeeds without
/// registering anything.
#[async_trait]
pub trait PromiseSettler: Send + Sync {
    /// Registers the settler's handlers on the bus.
    fn subscribe(&self, bus: &dyn EventSubscriber);

    /// Waits for settlements already in flight to confirm or time out.
    async fn shutdown(&self);
}

/// Cumulative amounts already promised per payment channel.
///
/// A new session continues its channel's sequence: invoices and the
/// regression check start from the recorded amount, not from zero.
pub trait PromiseHistory: Send + Sync {
    /// Highest cumulative amount recorded on `channel`, zero if none.
    fn promised(&self, channel: &PaymentChannel) -> Amount;
}
