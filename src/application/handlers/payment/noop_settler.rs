use async_trait::async_trait;
use tracing::debug;

use crate::domain::foundation::Amount;
use crate::domain::payment::PaymentChannel;
use crate::ports::{EventSubscriber, PromiseHistory, PromiseSettler};

/// Settler for consumer-only nodes, which never receive promises.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSettler;

#[async_trait]
impl PromiseSettler for NoopSettler {
    fn subscribe(&self, _bus: &dyn EventSubscriber) {
        debug!("Consumer-only node, promise settlement disabled");
    }

    async fn shutdown(&self) {}
}

impl PromiseHistory for NoopSettler {
    fn promised(&self, _channel: &PaymentChannel) -> Amount {
        Amount::ZERO
    }
}
