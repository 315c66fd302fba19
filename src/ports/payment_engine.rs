//! Payment engine port. One engine is attached to each session.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{oneshot, watch};

use super::{Channel, TrafficMeter};
use crate::domain::foundation::{Identity, SessionId};
use crate::domain::market::Price;
use crate::domain::payment::PaymentError;

/// Why an engine stopped without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineExit {
    /// Stop signal received.
    Stopped,
    /// Peer closed the channel or ended the session.
    ChannelClosed,
}

/// Everything an engine needs for one session.
#[derive(Clone)]
pub struct PaymentEngineContext {
    pub session_id: SessionId,
    pub consumer_id: Identity,
    pub provider_id: Identity,
    pub price: Price,
    pub channel: Arc<dyn Channel>,
    pub traffic: Arc<dyn TrafficMeter>,
}

#[async_trait]
pub trait PaymentEngine: Send + Sync {
    /// Runs the payment exchange until stopped, the channel closes, or the
    /// peer violates the protocol. `handshake` fires on the first accepted
    /// promise.
    async fn run(
        &self,
        handshake: oneshot::Sender<()>,
        stop: watch::Receiver<bool>,
    ) -> Result<EngineExit, PaymentError>;
}

/// Builds an engine for a new session using the node's invoice settings.
pub trait PaymentEngineFactory: Send + Sync {
    fn create(&self, context: PaymentEngineContext) -> Result<Arc<dyn PaymentEngine>, PaymentError>;
}
