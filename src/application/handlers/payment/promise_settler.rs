//! AccountantPromiseSettler - settles accumulated promises through the accountant.
//!
//! Promises arrive as `payment.promise_received` events. Per payment channel
//! (provider and issuing consumer) the settler keeps a [`SettlementState`];
//! crossing the threshold starts one
//! asynchronous settlement that either confirms or is abandoned after
//! `max_wait`. A sweep loop retries abandoned settlements that are still due.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::{timeout, Instant};
use tracing::{debug, error, info, warn};

use crate::application::publish::publish_event;
use crate::domain::foundation::{
    topics, Amount, ContractAddress, DomainError, ErrorCode, EventEnvelope, Identity,
};
use crate::domain::payment::{
    PaymentChannel, PaymentError, Promise, PromiseOutcome, PromiseReceived, PromiseRejected,
    SettlementCompleted, SettlementFailed, SettlementRequested, SettlementState,
    SettlementTimedOut,
};
use crate::ports::{
    EventHandler, EventPublisher, EventSubscriber, LedgerError, PromiseHistory, PromiseSettler,
    SettlementClient, TxOutcome,
};

/// Settlement settings, derived from the payment configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementConfig {
    pub accountant: ContractAddress,
    /// Unsettled amount that triggers a settlement.
    pub threshold: Amount,
    /// Upper bound on one settlement, submission included.
    pub max_wait: Duration,
    /// Period of the retry sweep.
    pub sweep_interval: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettlementError {
    #[error(transparent)]
    Promise(#[from] PaymentError),

    #[error("Settlement submission failed: {0}")]
    Submission(#[from] LedgerError),
}

#[derive(Clone)]
pub struct AccountantPromiseSettler {
    inner: Arc<SettlerInner>,
}

struct SettlerInner {
    config: SettlementConfig,
    ledger: Arc<dyn SettlementClient>,
    publisher: Arc<dyn EventPublisher>,
    states: Mutex<HashMap<PaymentChannel, Arc<Mutex<SettlementState>>>>,
    tasks: Mutex<JoinSet<()>>,
}

impl AccountantPromiseSettler {
    pub fn new(
        config: SettlementConfig,
        ledger: Arc<dyn SettlementClient>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            inner: Arc::new(SettlerInner {
                config,
                ledger,
                publisher,
                states: Mutex::new(HashMap::new()),
                tasks: Mutex::new(JoinSet::new()),
            }),
        }
    }

    pub fn config(&self) -> &SettlementConfig {
        &self.inner.config
    }

    /// Records `promise` on the channel between `provider` and its issuer and
    /// starts a settlement when due.
    ///
    /// # Errors
    ///
    /// - `WrongAccountant` for promises through another accountant
    /// - `AmountRegression` below the channel's pending amount; state unchanged
    pub fn on_promise(
        &self,
        provider: &Identity,
        promise: &Promise,
    ) -> Result<PromiseOutcome, SettlementError> {
        let config = &self.inner.config;
        if promise.accountant != config.accountant {
            return Err(PaymentError::WrongAccountant {
                expected: config.accountant.to_string(),
                actual: promise.accountant.to_string(),
            }
            .into());
        }

        let channel = PaymentChannel::new(provider.clone(), promise.issuer.clone());
        let state = self.state_for(&channel);
        let outcome = state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .apply_promise(promise.cumulative_amount, config.threshold)?;

        if let PromiseOutcome::SettlementDue { amount } = outcome {
            self.spawn_settlement(channel, amount, state);
        }
        Ok(outcome)
    }

    /// Snapshot of the settlement state of `channel`.
    pub fn state(&self, channel: &PaymentChannel) -> Option<SettlementState> {
        self.inner
            .states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(channel)
            .map(|state| state.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    /// Starts settlements that are due but not running. Returns how many started.
    pub fn sweep(&self) -> usize {
        let states: Vec<(PaymentChannel, Arc<Mutex<SettlementState>>)> = self
            .inner
            .states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(channel, state)| (channel.clone(), Arc::clone(state)))
            .collect();

        let mut started = 0;
        for (channel, state) in states {
            let due = state
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .try_begin_settlement(self.inner.config.threshold);
            if let Some(amount) = due {
                self.spawn_settlement(channel, amount, state);
                started += 1;
            }
        }
        started
    }

    /// Sweeps every `sweep_interval` until `shutdown` flips to true.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.inner.config.sweep_interval);
        ticker.tick().await;
        info!(interval = ?self.inner.config.sweep_interval, "Settlement sweep started");

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }

                _ = ticker.tick() => {
                    self.reap_finished();
                    let started = self.sweep();
                    if started > 0 {
                        debug!(started, "Sweep restarted settlements");
                    }
                }
            }
        }
        info!("Settlement sweep stopped");
    }

    fn state_for(&self, channel: &PaymentChannel) -> Arc<Mutex<SettlementState>> {
        let mut states = self
            .inner
            .states
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(states.entry(channel.clone()).or_default())
    }

    fn reap_finished(&self) {
        let mut tasks = self.inner.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        while let Some(done) = tasks.try_join_next() {
            if let Err(e) = done {
                warn!(error = %e, "Settlement task ended abnormally");
            }
        }
    }

    fn spawn_settlement(&self, channel: PaymentChannel, amount: Amount, state: Arc<Mutex<SettlementState>>) {
        let inner = Arc::clone(&self.inner);
        self.inner
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .spawn(async move { inner.settle(channel, amount, state).await });
    }
}

impl SettlerInner {
    async fn settle(&self, channel: PaymentChannel, amount: Amount, state: Arc<Mutex<SettlementState>>) {
        let accountant = self.config.accountant.clone();
        info!(channel = %channel, amount = %amount, "Settlement requested");
        publish_event(
            self.publisher.as_ref(),
            &SettlementRequested::new(channel.clone(), accountant.clone(), amount),
        )
        .await;

        let started = Instant::now();
        let attempt = timeout(self.config.max_wait, async {
            let tx = self
                .ledger
                .submit_settlement(&channel, &accountant, amount)
                .await?;
            let remaining = self.config.max_wait.saturating_sub(started.elapsed());
            let outcome = self.ledger.await_confirmation(&tx, remaining).await;
            Ok::<_, SettlementError>((tx, outcome))
        })
        .await;

        match attempt {
            Ok(Ok((tx, TxOutcome::Confirmed))) => {
                state
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .confirm_settlement(amount);
                info!(channel = %channel, amount = %amount, tx = %tx, "Settlement confirmed");
                publish_event(
                    self.publisher.as_ref(),
                    &SettlementCompleted::new(channel, amount, tx.as_str()),
                )
                .await;
            }
            Ok(Ok((_, TxOutcome::TimedOut))) | Err(_) => {
                state
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .abandon_settlement();
                let waited = started.elapsed().as_secs();
                warn!(channel = %channel, amount = %amount, waited_secs = waited, "Settlement timed out");
                publish_event(
                    self.publisher.as_ref(),
                    &SettlementTimedOut::new(channel, amount, waited),
                )
                .await;
            }
            Ok(Ok((_, TxOutcome::Failed(reason)))) => self.fail(channel, amount, &state, reason).await,
            Ok(Err(e)) => self.fail(channel, amount, &state, e.to_string()).await,
        }
    }

    async fn fail(
        &self,
        channel: PaymentChannel,
        amount: Amount,
        state: &Mutex<SettlementState>,
        reason: String,
    ) {
        state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .abandon_settlement();
        error!(channel = %channel, amount = %amount, reason, "Settlement failed");
        publish_event(
            self.publisher.as_ref(),
            &SettlementFailed::new(channel, amount, reason),
        )
        .await;
    }
}

#[async_trait]
impl EventHandler for AccountantPromiseSettler {
    async fn handle(&self, event: EventEnvelope) -> Result<(), DomainError> {
        let received: PromiseReceived = event
            .payload_as()
            .map_err(|e| DomainError::new(ErrorCode::ValidationFailed, e.to_string()))?;

        match self.on_promise(&received.provider_id, &received.promise) {
            Ok(outcome) => {
                debug!(session_id = %received.session_id, outcome = ?outcome, "Promise recorded");
                Ok(())
            }
            Err(SettlementError::Promise(e)) if e.is_protocol_violation() => {
                warn!(session_id = %received.session_id, error = %e, "Promise rejected");
                publish_event(
                    self.inner.publisher.as_ref(),
                    &PromiseRejected::new(
                        received.session_id,
                        received.provider_id,
                        received.promise.cumulative_amount,
                        e.to_string(),
                    ),
                )
                .await;
                Ok(())
            }
            Err(e) => Err(DomainError::new(ErrorCode::BlockchainError, e.to_string())),
        }
    }

    fn name(&self) -> &'static str {
        "AccountantPromiseSettler"
    }
}

impl PromiseHistory for AccountantPromiseSettler {
    fn promised(&self, channel: &PaymentChannel) -> Amount {
        self.state(channel)
            .map(|state| state.pending_amount())
            .unwrap_or(Amount::ZERO)
    }
}

#[async_trait]
impl PromiseSettler for AccountantPromiseSettler {
    fn subscribe(&self, bus: &dyn EventSubscriber) {
        bus.subscribe(topics::PROMISE_RECEIVED, Arc::new(self.clone()));
    }

    async fn shutdown(&self) {
        let mut tasks = std::mem::take(
            &mut *self.inner.tasks.lock().unwrap_or_else(PoisonError::into_inner),
        );
        if !tasks.is_empty() {
            info!(in_flight = tasks.len(), "Waiting for in-flight settlements");
        }
        while let Some(done) = tasks.join_next().await {
            if let Err(e) = done {
                warn!(error = %e, "Settlement task ended abnormally");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{DigestSigner, InMemoryEventBus, MockLedger};

    fn accountant() -> ContractAddress {
        ContractAddress::new("0xacc").unwrap()
    }

    fn provider() -> Identity {
        Identity::new("0xaa").unwrap()
    }

    fn consumer() -> Identity {
        Identity::new("0xbb").unwrap()
    }

    fn channel() -> PaymentChannel {
        PaymentChannel::new(provider(), consumer())
    }

    fn config(threshold: u128, max_wait: Duration) -> SettlementConfig {
        SettlementConfig {
            accountant: accountant(),
            threshold: Amount::from_units(threshold),
            max_wait,
            sweep_interval: Duration::from_secs(60),
        }
    }

    fn promise(amount: u128) -> Promise {
        promise_from(consumer(), amount)
    }

    fn promise_from(issuer: Identity, amount: u128) -> Promise {
        let signer = DigestSigner::new(issuer);
        let amount = Amount::from_units(amount);
        Promise {
            issuer: signer.identity().clone(),
            accountant: accountant(),
            cumulative_amount: amount,
            signature: signer.sign(&Promise::signed_message(&accountant(), amount)).unwrap(),
        }
    }

    fn settler(ledger: Arc<MockLedger>, cfg: SettlementConfig) -> (AccountantPromiseSettler, Arc<InMemoryEventBus>) {
        let bus = Arc::new(InMemoryEventBus::new());
        (AccountantPromiseSettler::new(cfg, ledger, bus.clone()), bus)
    }

    #[tokio::test(start_paused = true)]
    async fn settles_once_when_threshold_crossed() {
        let ledger = Arc::new(MockLedger::new());
        let (settler, bus) = settler(ledger.clone(), config(100, Duration::from_secs(30)));

        assert_eq!(settler.on_promise(&provider(), &promise(40)), Ok(PromiseOutcome::Accepted));
        assert_eq!(settler.on_promise(&provider(), &promise(90)), Ok(PromiseOutcome::Accepted));
        assert_eq!(
            settler.on_promise(&provider(), &promise(150)),
            Ok(PromiseOutcome::SettlementDue {
                amount: Amount::from_units(150)
            })
        );
        settler.shutdown().await;

        let submissions = ledger.submissions();
        assert_eq!(submissions.len(), 1);
        assert_eq!(submissions[0].amount, Amount::from_units(150));
        assert_eq!(submissions[0].channel, channel());

        let state = settler.state(&channel()).unwrap();
        assert_eq!(state.last_settled_amount(), Amount::from_units(150));
        assert!(!state.settlement_in_flight());
        assert!(bus.has_event(topics::SETTLEMENT_COMPLETED));
    }

    #[tokio::test(start_paused = true)]
    async fn second_crossing_while_in_flight_does_not_settle_again() {
        let ledger = Arc::new(MockLedger::new().with_confirmation_delay(Duration::from_secs(5)));
        let (settler, _bus) = settler(ledger.clone(), config(100, Duration::from_secs(30)));

        settler.on_promise(&provider(), &promise(150)).unwrap();
        assert_eq!(
            settler.on_promise(&provider(), &promise(300)),
            Ok(PromiseOutcome::Accepted)
        );
        settler.shutdown().await;

        assert_eq!(ledger.submissions().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn regression_is_rejected_and_state_kept() {
        let ledger = Arc::new(MockLedger::new());
        let (settler, _bus) = settler(ledger, config(1000, Duration::from_secs(30)));

        settler.on_promise(&provider(), &promise(90)).unwrap();
        let result = settler.on_promise(&provider(), &promise(40));

        assert!(matches!(
            result,
            Err(SettlementError::Promise(PaymentError::AmountRegression { .. }))
        ));
        assert_eq!(
            settler.state(&channel()).unwrap().pending_amount(),
            Amount::from_units(90)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn slow_confirmation_times_out_and_next_promise_retriggers() {
        let ledger = Arc::new(MockLedger::new().with_confirmation_delay(Duration::from_secs(120)));
        let (settler, bus) = settler(ledger.clone(), config(100, Duration::from_secs(10)));

        settler.on_promise(&provider(), &promise(150)).unwrap();
        settler.shutdown().await;

        let state = settler.state(&channel()).unwrap();
        assert!(!state.settlement_in_flight());
        assert_eq!(state.pending_amount(), Amount::from_units(150));
        assert_eq!(state.last_settled_amount(), Amount::ZERO);
        assert!(bus.has_event(topics::SETTLEMENT_TIMED_OUT));

        ledger.set_confirmation_delay(Duration::ZERO);
        assert!(matches!(
            settler.on_promise(&provider(), &promise(160)),
            Ok(PromiseOutcome::SettlementDue { .. })
        ));
        settler.shutdown().await;
        assert_eq!(ledger.submissions().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_submission_is_retried_by_sweep() {
        let ledger = Arc::new(MockLedger::new());
        ledger.fail_next_submissions(1);
        let (settler, bus) = settler(ledger.clone(), config(100, Duration::from_secs(10)));

        settler.on_promise(&provider(), &promise(150)).unwrap();
        settler.shutdown().await;
        assert!(bus.has_event(topics::SETTLEMENT_FAILED));

        assert_eq!(settler.sweep(), 1);
        settler.shutdown().await;

        assert_eq!(
            settler.state(&channel()).unwrap().last_settled_amount(),
            Amount::from_units(150)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn promise_for_other_accountant_is_rejected() {
        let (settler, _bus) = settler(Arc::new(MockLedger::new()), config(100, Duration::from_secs(10)));
        let mut foreign = promise(150);
        foreign.accountant = ContractAddress::new("0xdead").unwrap();

        assert!(matches!(
            settler.on_promise(&provider(), &foreign),
            Err(SettlementError::Promise(PaymentError::WrongAccountant { .. }))
        ));
        assert!(settler.state(&channel()).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_crossings_settle_exactly_once() {
        let ledger = Arc::new(MockLedger::new().with_confirmation_delay(Duration::from_secs(1)));
        let (settler, _bus) = settler(ledger.clone(), config(100, Duration::from_secs(30)));

        let mut handles = Vec::new();
        for amount in [120u128, 130, 140, 150, 160] {
            let settler = settler.clone();
            handles.push(tokio::spawn(async move {
                let _ = settler.on_promise(&provider(), &promise(amount));
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        settler.shutdown().await;

        assert_eq!(ledger.submissions().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_promise_event_is_published() {
        let (settler, bus) = settler(Arc::new(MockLedger::new()), config(1000, Duration::from_secs(10)));
        let session_id = crate::domain::foundation::SessionId::new();

        for amount in [90, 40] {
            let event = PromiseReceived::new(session_id, provider(), promise(amount));
            settler
                .handle(EventEnvelope::from_event(&event).unwrap())
                .await
                .unwrap();
        }

        let rejected: PromiseRejected = bus.events_of_type(topics::PROMISE_REJECTED)[0]
            .payload_as()
            .unwrap();
        assert_eq!(rejected.session_id, session_id);
        assert_eq!(rejected.amount, Amount::from_units(40));
    }

    #[tokio::test(start_paused = true)]
    async fn consumers_of_one_provider_keep_separate_channels() {
        let ledger = Arc::new(MockLedger::new());
        let (settler, _bus) = settler(ledger.clone(), config(1000, Duration::from_secs(30)));
        let other = Identity::new("0xcc").unwrap();

        settler.on_promise(&provider(), &promise(120)).unwrap();
        assert_eq!(
            settler.on_promise(&provider(), &promise_from(other.clone(), 60)),
            Ok(PromiseOutcome::Accepted)
        );

        let other_channel = PaymentChannel::new(provider(), other);
        assert_eq!(settler.promised(&channel()), Amount::from_units(120));
        assert_eq!(settler.promised(&other_channel), Amount::from_units(60));
        assert_eq!(
            settler.promised(&PaymentChannel::new(provider(), Identity::new("0xdd").unwrap())),
            Amount::ZERO
        );
    }

    #[tokio::test(start_paused = true)]
    async fn threshold_is_counted_per_channel() {
        let ledger = Arc::new(MockLedger::new());
        let (settler, _bus) = settler(ledger.clone(), config(100, Duration::from_secs(30)));
        let other = Identity::new("0xcc").unwrap();

        settler.on_promise(&provider(), &promise(60)).unwrap();
        settler.on_promise(&provider(), &promise_from(other, 60)).unwrap();
        settler.shutdown().await;

        assert!(ledger.submissions().is_empty());
    }
}
