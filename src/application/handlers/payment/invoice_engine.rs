//! Provider-side payment engine: invoices out, promises in.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::time::{interval_at, sleep_until, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::application::publish::publish_event;
use crate::domain::foundation::{Amount, ContractAddress};
use crate::domain::payment::{Invoice, PaymentChannel, PaymentError, Promise, PromiseReceived};
use crate::ports::{
    ChannelError, ChannelMessage, EngineExit, EventPublisher, IdentityExtractor, PaymentEngine,
    PaymentEngineContext, PaymentEngineFactory, PromiseHistory,
};

const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;
const MIN_INVOICE_PERIOD: Duration = Duration::from_millis(100);

/// Invoice exchange settings shared by every session.
#[derive(Debug, Clone)]
pub struct InvoiceEngineConfig {
    pub accountant: ContractAddress,
    pub invoice_frequency: Duration,
    pub promise_wait_timeout: Duration,
    pub max_missed_promises: u32,
}

pub struct InvoicePaymentEngineFactory {
    config: InvoiceEngineConfig,
    extractor: Arc<dyn IdentityExtractor>,
    history: Arc<dyn PromiseHistory>,
    publisher: Arc<dyn EventPublisher>,
}

impl InvoicePaymentEngineFactory {
    pub fn new(
        config: InvoiceEngineConfig,
        extractor: Arc<dyn IdentityExtractor>,
        history: Arc<dyn PromiseHistory>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            config,
            extractor,
            history,
            publisher,
        }
    }
}

impl PaymentEngineFactory for InvoicePaymentEngineFactory {
    fn create(&self, context: PaymentEngineContext) -> Result<Arc<dyn PaymentEngine>, PaymentError> {
        let channel = PaymentChannel::new(context.provider_id.clone(), context.consumer_id.clone());
        let promised_before = self.history.promised(&channel);
        if promised_before > Amount::ZERO {
            debug!(session_id = %context.session_id, channel = %channel, amount = %promised_before, "Continuing channel");
        }
        Ok(Arc::new(InvoicePaymentEngine {
            context,
            promised_before,
            config: self.config.clone(),
            extractor: Arc::clone(&self.extractor),
            publisher: Arc::clone(&self.publisher),
        }))
    }
}

/// Sends an invoice for the accrued amount every `invoice_frequency` and
/// expects a covering promise within `promise_wait_timeout`.
///
/// Amounts are cumulative per payment channel: invoices add this session's
/// charges to what the consumer had already promised before it started.
pub struct InvoicePaymentEngine {
    context: PaymentEngineContext,
    promised_before: Amount,
    config: InvoiceEngineConfig,
    extractor: Arc<dyn IdentityExtractor>,
    publisher: Arc<dyn EventPublisher>,
}

/// Invoice waiting for a promise.
struct Outstanding {
    amount: Amount,
    deadline: Instant,
}

impl InvoicePaymentEngine {
    /// Channel amount owed after `elapsed` time and the session's traffic so far.
    fn accrued(&self, elapsed: Duration) -> Amount {
        let price = &self.context.price;
        let minutes = elapsed.as_secs_f64() / 60.0;
        let gib = self.context.traffic.bytes_transferred(self.context.session_id) as f64 / BYTES_PER_GIB;
        self.promised_before
            .saturating_add(price.per_minute.scale(minutes))
            .saturating_add(price.per_gib.scale(gib))
    }

    fn verify(&self, promise: &Promise, invoiced: Amount, last: Amount) -> Result<(), PaymentError> {
        let consumer = &self.context.consumer_id;
        if &promise.issuer != consumer {
            return Err(PaymentError::WrongIssuer {
                expected: consumer.to_string(),
                actual: promise.issuer.to_string(),
            });
        }
        if promise.accountant != self.config.accountant {
            return Err(PaymentError::WrongAccountant {
                expected: self.config.accountant.to_string(),
                actual: promise.accountant.to_string(),
            });
        }

        let signer = self
            .extractor
            .extract(&promise.message(), &promise.signature)
            .map_err(|e| PaymentError::InvalidSignature(e.to_string()))?;
        if &signer != consumer {
            return Err(PaymentError::WrongIssuer {
                expected: consumer.to_string(),
                actual: signer.to_string(),
            });
        }

        if promise.cumulative_amount < last {
            return Err(PaymentError::AmountRegression {
                recorded: last,
                received: promise.cumulative_amount,
            });
        }
        if promise.cumulative_amount < invoiced {
            return Err(PaymentError::Underpaid {
                invoiced,
                received: promise.cumulative_amount,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentEngine for InvoicePaymentEngine {
    async fn run(
        &self,
        handshake: oneshot::Sender<()>,
        mut stop: watch::Receiver<bool>,
    ) -> Result<EngineExit, PaymentError> {
        let session_id = self.context.session_id;
        let channel = Arc::clone(&self.context.channel);
        let started = Instant::now();
        let period = self.config.invoice_frequency.max(MIN_INVOICE_PERIOD);
        let mut ticker = interval_at(started + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut handshake = Some(handshake);
        let mut outstanding: Option<Outstanding> = None;
        let mut last_promised = self.promised_before;
        let mut missed = 0u32;

        loop {
            let deadline = outstanding
                .as_ref()
                .map(|o| o.deadline)
                .unwrap_or_else(|| Instant::now() + self.config.promise_wait_timeout);

            tokio::select! {
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        return Ok(EngineExit::Stopped);
                    }
                }

                _ = ticker.tick() => {
                    let amount = self.accrued(started.elapsed());
                    match channel.send(ChannelMessage::Invoice(Invoice::new(session_id, amount))).await {
                        Ok(()) => {}
                        Err(ChannelError::Closed) => return Ok(EngineExit::ChannelClosed),
                        Err(e) => return Err(PaymentError::Channel(e.to_string())),
                    }
                    debug!(session_id = %session_id, amount = %amount, "Invoice sent");
                    // A newer invoice supersedes the amount but not the deadline.
                    let deadline = outstanding
                        .map(|o| o.deadline)
                        .unwrap_or_else(|| Instant::now() + self.config.promise_wait_timeout);
                    outstanding = Some(Outstanding { amount, deadline });
                }

                _ = sleep_until(deadline), if outstanding.is_some() => {
                    outstanding = None;
                    missed += 1;
                    warn!(session_id = %session_id, missed, "Promise not received in time");
                    if missed > self.config.max_missed_promises {
                        return Err(PaymentError::TooManyMissedPromises(missed));
                    }
                }

                message = channel.recv() => match message {
                    Ok(ChannelMessage::Promise(promise)) => {
                        let invoiced = outstanding.as_ref().map(|o| o.amount).unwrap_or(Amount::ZERO);
                        self.verify(&promise, invoiced, last_promised)?;

                        last_promised = promise.cumulative_amount;
                        outstanding = None;
                        missed = 0;
                        if let Some(handshake) = handshake.take() {
                            let _ = handshake.send(());
                        }

                        debug!(session_id = %session_id, amount = %promise.cumulative_amount, "Promise accepted");
                        publish_event(
                            self.publisher.as_ref(),
                            &PromiseReceived::new(session_id, self.context.provider_id.clone(), promise),
                        )
                        .await;
                    }
                    Ok(ChannelMessage::End { reason }) => {
                        debug!(session_id = %session_id, reason, "Consumer ended session");
                        return Ok(EngineExit::ChannelClosed);
                    }
                    Ok(other) => {
                        debug!(session_id = %session_id, message = ?other, "Ignoring unexpected message");
                    }
                    Err(ChannelError::Closed) => return Ok(EngineExit::ChannelClosed),
                    Err(e) => return Err(PaymentError::Channel(e.to_string())),
                },
            }
        }
    }
}
