//! Turns accepted consumer dialogs into sessions.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::application::handlers::session::{CreateSessionCommand, SessionManager};
use crate::domain::foundation::{Identity, ServiceId, SessionId};
use crate::domain::policy::PolicyRepository;
use crate::domain::session::SessionError;
use crate::ports::{
    ChannelError, ChannelMessage, DialogError, DialogWaiter, IncomingDialog, Service, ServiceError,
};

/// Pause after a failed dialog before accepting the next one.
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, thiserror::Error)]
pub enum DialogHandlingError {
    #[error("Consumer {0} is not allowed by access policy")]
    NotAllowed(Identity),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error(transparent)]
    Channel(#[from] ChannelError),
}

/// Admits consumers, opens their session and sends the transport config.
pub struct DialogHandler {
    sessions: Arc<SessionManager>,
    policies: Arc<PolicyRepository>,
}

impl DialogHandler {
    pub fn new(sessions: Arc<SessionManager>, policies: Arc<PolicyRepository>) -> Self {
        Self { sessions, policies }
    }

    /// Handles one dialog on `service`. Any failure after the session was
    /// created tears the session down again.
    pub async fn handle(
        &self,
        service_id: ServiceId,
        service: Arc<dyn Service>,
        dialog: IncomingDialog,
    ) -> Result<SessionId, DialogHandlingError> {
        let IncomingDialog {
            consumer_id,
            consumer_endpoint,
            channel,
        } = dialog;

        if !self.policies.allows(&consumer_id) {
            let _ = channel
                .send(ChannelMessage::End {
                    reason: "consumer not allowed by access policy".to_string(),
                })
                .await;
            channel.close().await;
            return Err(DialogHandlingError::NotAllowed(consumer_id));
        }

        let session = self
            .sessions
            .create_session(CreateSessionCommand {
                service_id,
                proposal: service.proposal().clone(),
                consumer_id,
                channel: Arc::clone(&channel),
                service: Arc::clone(&service),
            })
            .await?;
        let session_id = session.id();

        let configured = async {
            let config = service.provide_config(session_id, consumer_endpoint).await?;
            channel.send(ChannelMessage::SessionConfig { config }).await?;
            Ok::<_, DialogHandlingError>(())
        }
        .await;

        if let Err(e) = configured {
            if let Err(teardown) = self.sessions.teardown(session_id).await {
                debug!(session_id = %session_id, error = %teardown, "Session already gone");
            }
            return Err(e);
        }

        info!(session_id = %session_id, consumer_id = %session.consumer_id(), "Consumer admitted");
        Ok(session_id)
    }

    /// Accepts dialogs on `waiter` until `shutdown`, handling each on its own task.
    pub async fn accept_loop(
        self: Arc<Self>,
        service_id: ServiceId,
        service: Arc<dyn Service>,
        mut waiter: Box<dyn DialogWaiter>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut handling = JoinSet::new();
        info!(service_id = %service_id, topic = %service.proposal().dialog_topic(), "Accepting dialogs");

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }

                dialog = waiter.accept() => match dialog {
                    Ok(dialog) => {
                        let handler = Arc::clone(&self);
                        let service = Arc::clone(&service);
                        handling.spawn(async move {
                            if let Err(e) = handler.handle(service_id, service, dialog).await {
                                warn!(service_id = %service_id, error = %e, "Dialog rejected");
                            }
                        });
                    }
                    Err(e) if e.is_retryable() => {
                        warn!(service_id = %service_id, error = %e, retry_in = ?ACCEPT_RETRY_DELAY, "Dialog failed");
                        tokio::select! {
                            changed = shutdown.changed() => {
                                if changed.is_err() || *shutdown.borrow() {
                                    break;
                                }
                            }
                            _ = tokio::time::sleep(ACCEPT_RETRY_DELAY) => {}
                        }
                    }
                    Err(DialogError::Closed) => break,
                    Err(e) => {
                        warn!(service_id = %service_id, error = %e, "Dialog listener failed");
                        break;
                    }
                },

                Some(done) = handling.join_next(), if !handling.is_empty() => {
                    if let Err(e) = done {
                        warn!(error = %e, "Dialog task ended abnormally");
                    }
                }
            }
        }

        waiter.close().await;
        handling.shutdown().await;
        info!(service_id = %service_id, "Dialog acceptance stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{
        DigestIdentityExtractor, InMemoryChannel, InMemoryEventBus, InMemorySessionStorage,
    };
    use crate::application::handlers::payment::{
        InvoiceEngineConfig, InvoicePaymentEngineFactory, NoopSettler,
    };
    use crate::application::handlers::service::NoopService;
    use crate::domain::foundation::ContractAddress;
    use crate::domain::market::{Location, Price, ServiceProposal, ServiceType};
    use crate::domain::policy::AccessPolicy;
    use crate::ports::Channel;
    use std::time::Duration;

    fn provider() -> Identity {
        Identity::new("0xaa").unwrap()
    }

    fn handler(policies: Arc<PolicyRepository>) -> (DialogHandler, Arc<SessionManager>) {
        let bus = Arc::new(InMemoryEventBus::new());
        let engines = Arc::new(InvoicePaymentEngineFactory::new(
            InvoiceEngineConfig {
                accountant: ContractAddress::new("0xacc").unwrap(),
                invoice_frequency: Duration::from_secs(60),
                promise_wait_timeout: Duration::from_secs(30),
                max_missed_promises: 3,
            },
            Arc::new(DigestIdentityExtractor),
            Arc::new(NoopSettler),
            bus.clone(),
        ));
        let sessions = Arc::new(SessionManager::new(
            Arc::new(InMemorySessionStorage::new()),
            engines,
            bus,
        ));
        (DialogHandler::new(Arc::clone(&sessions), policies), sessions)
    }

    fn service() -> Arc<dyn Service> {
        Arc::new(NoopService::new(ServiceProposal::new(
            provider(),
            ServiceType::Noop,
            Location::in_country("LT"),
            Price::default(),
        )))
    }

    fn dialog(consumer: &str) -> (IncomingDialog, InMemoryChannel) {
        let consumer = Identity::new(consumer).unwrap();
        let (provider_end, consumer_end) = InMemoryChannel::pair(provider(), consumer.clone());
        (
            IncomingDialog {
                consumer_id: consumer,
                consumer_endpoint: None,
                channel: Arc::new(provider_end),
            },
            consumer_end,
        )
    }

    #[tokio::test]
    async fn admitted_consumer_receives_session_config() {
        let (handler, sessions) = handler(Arc::new(PolicyRepository::new()));
        let (incoming, consumer) = dialog("0xbb");

        let session_id = handler
            .handle(ServiceId::new(), service(), incoming)
            .await
            .unwrap();

        assert!(sessions.session(session_id).await.is_some());
        let Ok(ChannelMessage::SessionConfig { config }) = consumer.recv().await else {
            panic!("expected session config");
        };
        assert_eq!(config["service_type"], "noop");
    }

    #[tokio::test]
    async fn consumer_outside_policy_is_refused() {
        let policies = Arc::new(PolicyRepository::new());
        policies.replace(vec![AccessPolicy::new(
            "verified",
            [Identity::new("0xbb").unwrap()],
        )]);
        let (handler, sessions) = handler(policies);
        let (incoming, consumer) = dialog("0xcc");

        let result = handler.handle(ServiceId::new(), service(), incoming).await;

        assert!(matches!(result, Err(DialogHandlingError::NotAllowed(_))));
        assert!(sessions.sessions().await.is_empty());
        assert!(matches!(consumer.recv().await, Ok(ChannelMessage::End { .. })));
    }

    #[tokio::test]
    async fn unstarted_service_tears_session_down() {
        use crate::adapters::{LoopbackTransport, NoopFirewall, NoopNatPinger, PortPool};
        use crate::application::handlers::service::{TransportResources, TunnelService};
        use crate::domain::service::PortRange;

        let (handler, sessions) = handler(Arc::new(PolicyRepository::new()));
        let tunnel: Arc<dyn Service> = Arc::new(TunnelService::new(
            ServiceProposal::new(
                provider(),
                ServiceType::Wireguard,
                Location::in_country("LT"),
                Price::default(),
            ),
            TransportResources {
                ports: Arc::new(PortPool::fixed(PortRange::new(51820, 51820).unwrap())),
                pinger: Arc::new(NoopNatPinger),
            },
            Arc::new(NoopFirewall),
            Arc::new(LoopbackTransport::new()),
        ));
        let (incoming, _consumer) = dialog("0xbb");

        let result = handler.handle(ServiceId::new(), tunnel, incoming).await;

        assert!(matches!(
            result,
            Err(DialogHandlingError::Service(ServiceError::NotStarted))
        ));
        assert!(sessions.sessions().await.is_empty());
    }

    struct FailingWaiter {
        accepts: Arc<std::sync::atomic::AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl DialogWaiter for FailingWaiter {
        async fn accept(&mut self) -> Result<IncomingDialog, DialogError> {
            self.accepts.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Err(DialogError::Failed("handshake reset".to_string()))
        }

        async fn close(&mut self) {}
    }

    #[tokio::test(start_paused = true)]
    async fn failing_dialogs_are_retried_with_delay() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let (handler, _sessions) = handler(Arc::new(PolicyRepository::new()));
        let accepts = Arc::new(AtomicUsize::new(0));
        let waiter = Box::new(FailingWaiter {
            accepts: Arc::clone(&accepts),
        });
        let (shutdown_tx, shutdown) = watch::channel(false);
        let accept_loop = tokio::spawn(Arc::new(handler).accept_loop(
            ServiceId::new(),
            service(),
            waiter,
            shutdown,
        ));

        tokio::time::sleep(ACCEPT_RETRY_DELAY * 10 + ACCEPT_RETRY_DELAY / 2).await;
        let seen = accepts.load(Ordering::SeqCst);
        assert!((10..=12).contains(&seen), "accepted {} times", seen);

        shutdown_tx.send(true).unwrap();
        accept_loop.await.unwrap();
    }
}
