//! ProviderRegistrar - on-chain registration of the provider identity.

use async_trait::async_trait;
use std::collections::HashSet;
use std::num::NonZeroU32;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::application::publish::publish_event;
use crate::domain::foundation::{
    topics, Amount, ContractAddress, DomainError, ErrorCode, EventEnvelope, Identity,
};
use crate::domain::registry::{ProviderRegistered, RegistrationFailed};
use crate::domain::service::{ServiceStatus, ServiceStatusChanged};
use crate::ports::{EventHandler, EventPublisher, EventSubscriber, LedgerError, RegistrationClient};

#[derive(Debug, Clone)]
pub struct RegistrarConfig {
    pub registry: ContractAddress,
    pub accountant: ContractAddress,
    pub stake: Amount,
    /// Total attempts, the first included.
    pub max_attempts: NonZeroU32,
    pub retry_delay: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
    #[error("Registration of {identity} failed after {attempts} attempts: {last_error}")]
    Exhausted {
        identity: Identity,
        attempts: u32,
        last_error: LedgerError,
    },
}

/// Registers provider identities once their first service is running.
pub struct ProviderRegistrar {
    config: RegistrarConfig,
    ledger: Arc<dyn RegistrationClient>,
    publisher: Arc<dyn EventPublisher>,
    claimed: Mutex<HashSet<Identity>>,
    tasks: Mutex<JoinSet<()>>,
}

impl ProviderRegistrar {
    pub fn new(
        config: RegistrarConfig,
        ledger: Arc<dyn RegistrationClient>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            config,
            ledger,
            publisher,
            claimed: Mutex::new(HashSet::new()),
            tasks: Mutex::new(JoinSet::new()),
        }
    }

    /// Listens for services becoming `Running`.
    pub fn subscribe(self: &Arc<Self>, bus: &dyn EventSubscriber) {
        bus.subscribe(
            topics::SERVICE_STATUS_CHANGED,
            Arc::new(RegistrationTrigger {
                registrar: Arc::clone(self),
            }),
        );
    }

    /// Registers `identity`, retrying up to `max_attempts` times spaced by
    /// `retry_delay`. Returns the number of attempts made, zero when the
    /// identity was already registered.
    ///
    /// # Errors
    ///
    /// `Exhausted` once every attempt failed. The node keeps serving.
    pub async fn register(&self, identity: &Identity) -> Result<u32, RegistrationError> {
        let config = &self.config;
        if let Ok(true) = self.ledger.is_registered(identity, &config.registry).await {
            info!(identity = %identity, "Provider already registered");
            return Ok(0);
        }

        let max_attempts = config.max_attempts.get();
        let mut last_error = None;
        for attempt in 1..=max_attempts {
            match self
                .ledger
                .register_provider(identity, &config.registry, &config.accountant, config.stake)
                .await
            {
                Ok(tx) => {
                    info!(identity = %identity, attempt, tx = %tx, "Provider registered");
                    publish_event(
                        self.publisher.as_ref(),
                        &ProviderRegistered::new(
                            identity.clone(),
                            config.registry.clone(),
                            config.stake,
                            attempt,
                        ),
                    )
                    .await;
                    return Ok(attempt);
                }
                Err(e) => {
                    warn!(identity = %identity, attempt, max_attempts, error = %e, "Registration attempt failed");
                    last_error = Some(e);
                    if attempt < max_attempts {
                        tokio::time::sleep(config.retry_delay).await;
                    }
                }
            }
        }

        let last_error =
            last_error.unwrap_or_else(|| LedgerError::Unavailable("no attempt made".to_string()));
        error!(identity = %identity, attempts = max_attempts, error = %last_error, "Registration gave up, node is not earning");
        publish_event(
            self.publisher.as_ref(),
            &RegistrationFailed::new(identity.clone(), max_attempts, last_error.to_string()),
        )
        .await;
        Err(RegistrationError::Exhausted {
            identity: identity.clone(),
            attempts: max_attempts,
            last_error,
        })
    }

    /// Aborts registrations still running.
    pub async fn shutdown(&self) {
        let mut tasks = std::mem::take(&mut *self.tasks.lock().unwrap_or_else(PoisonError::into_inner));
        tasks.shutdown().await;
    }

    fn claim(&self, identity: &Identity) -> bool {
        self.claimed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(identity.clone())
    }

    fn release(&self, identity: &Identity) {
        self.claimed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(identity);
    }
}

struct RegistrationTrigger {
    registrar: Arc<ProviderRegistrar>,
}

#[async_trait]
impl EventHandler for RegistrationTrigger {
    async fn handle(&self, event: EventEnvelope) -> Result<(), DomainError> {
        let changed: ServiceStatusChanged = event
            .payload_as()
            .map_err(|e| DomainError::new(ErrorCode::ValidationFailed, e.to_string()))?;
        if changed.status != ServiceStatus::Running || !self.registrar.claim(&changed.provider_id) {
            return Ok(());
        }

        let registrar = Arc::clone(&self.registrar);
        let identity = changed.provider_id;
        self.registrar
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .spawn(async move {
                if registrar.register(&identity).await.is_err() {
                    // A later service start may try again.
                    registrar.release(&identity);
                }
            });
        Ok(())
    }

    fn name(&self) -> &'static str {
        "ProviderRegistrar"
    }
}
