//! SessionManager - lifecycle of consumer sessions.
//!
//! Storage holds the [`Session`] records. The manager keeps the live parts
//! beside them: the channel, the owning service and the stop signal of the
//! session's payment engine.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::application::publish::publish_event;
use crate::domain::foundation::{Identity, ServiceId, SessionId};
use crate::domain::market::ServiceProposal;
use crate::domain::payment::PaymentError;
use crate::domain::session::{
    ConnectivityStatus, Session, SessionCreated, SessionEnded, SessionError,
    SessionStatusChanged,
};
use crate::ports::{
    Channel, ChannelMessage, EngineExit, EventPublisher, PaymentEngine, PaymentEngineContext,
    PaymentEngineFactory, Service, SessionStorage, SessionTerminator,
};

/// Command to open a session for an accepted dialog.
pub struct CreateSessionCommand {
    pub service_id: ServiceId,
    pub proposal: ServiceProposal,
    pub consumer_id: Identity,
    pub channel: Arc<dyn Channel>,
    pub service: Arc<dyn Service>,
}

struct LiveSession {
    channel: Arc<dyn Channel>,
    service: Arc<dyn Service>,
    stop: watch::Sender<bool>,
    supervisor: Option<JoinHandle<()>>,
}

pub struct SessionManager {
    storage: Arc<dyn SessionStorage>,
    engines: Arc<dyn PaymentEngineFactory>,
    publisher: Arc<dyn EventPublisher>,
    live: Mutex<HashMap<SessionId, LiveSession>>,
}

impl SessionManager {
    pub fn new(
        storage: Arc<dyn SessionStorage>,
        engines: Arc<dyn PaymentEngineFactory>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            storage,
            engines,
            publisher,
            live: Mutex::new(HashMap::new()),
        }
    }

    /// Creates a session, attaches a payment engine to its channel and
    /// starts supervising the engine.
    ///
    /// # Errors
    ///
    /// - `PaymentEngine` if no engine can be built for the session
    /// - `AlreadyExists` from storage
    pub async fn create_session(
        self: &Arc<Self>,
        cmd: CreateSessionCommand,
    ) -> Result<Session, SessionError> {
        let session = Session::new(SessionId::new(), cmd.consumer_id, cmd.service_id, &cmd.proposal);
        let session_id = session.id();

        let engine = self
            .engines
            .create(PaymentEngineContext {
                session_id,
                consumer_id: session.consumer_id().clone(),
                provider_id: session.provider_id().clone(),
                price: *cmd.proposal.price(),
                channel: Arc::clone(&cmd.channel),
                traffic: cmd.service.traffic_meter(),
            })
            .map_err(|e| SessionError::PaymentEngine(e.to_string()))?;

        self.storage.add(session.clone()).await?;

        let (stop, stop_rx) = watch::channel(false);
        {
            let mut live = self.live.lock().unwrap_or_else(PoisonError::into_inner);
            let supervisor = tokio::spawn(Arc::clone(self).supervise(session_id, engine, stop_rx));
            live.insert(
                session_id,
                LiveSession {
                    channel: cmd.channel,
                    service: cmd.service,
                    stop,
                    supervisor: Some(supervisor),
                },
            );
        }

        info!(
            session_id = %session_id,
            consumer_id = %session.consumer_id(),
            service_type = %session.service_type(),
            "Session created"
        );
        publish_event(self.publisher.as_ref(), &SessionCreated::from_session(&session)).await;
        Ok(session)
    }

    /// Stops the session's engine, removes it from storage and publishes
    /// `session.ended`. A session that has not ended yet ends `Disconnected`.
    ///
    /// # Errors
    ///
    /// `NotFound` if the session is not live.
    pub async fn teardown(&self, session_id: SessionId) -> Result<Session, SessionError> {
        let live = self
            .live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&session_id);
        self.end_session(session_id, live).await
    }

    /// Tears down every session of a service. Returns how many ended.
    pub async fn teardown_service(&self, service_id: ServiceId) -> usize {
        let mut ended = 0;
        for session in self.storage.list_by_service(service_id).await {
            match self.teardown(session.id()).await {
                Ok(_) => ended += 1,
                Err(SessionError::NotFound(_)) => {}
                Err(e) => warn!(session_id = %session.id(), error = %e, "Session teardown failed"),
            }
        }
        ended
    }

    /// Marks the session `Failed` and tears it down.
    pub async fn fail_session(&self, session_id: SessionId, reason: &str) -> Result<(), SessionError> {
        warn!(session_id = %session_id, reason, "Session failed");
        match self.transition(session_id, ConnectivityStatus::Failed).await {
            Ok(()) | Err(SessionError::InvalidTransition { .. }) => {}
            Err(e) => return Err(e),
        }
        self.teardown(session_id).await.map(|_| ())
    }

    pub async fn session(&self, session_id: SessionId) -> Option<Session> {
        self.storage.find(session_id).await
    }

    pub async fn sessions(&self) -> Vec<Session> {
        self.storage.list().await
    }

    /// Ends every live session and waits for their engines to stop.
    pub async fn shutdown(&self) {
        let live: Vec<(SessionId, LiveSession)> = self
            .live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .collect();

        let mut supervisors = Vec::with_capacity(live.len());
        for (session_id, mut session) in live {
            supervisors.extend(session.supervisor.take());
            if let Err(e) = self.end_session(session_id, Some(session)).await {
                debug!(session_id = %session_id, error = %e, "Session already gone at shutdown");
            }
        }
        for supervisor in supervisors {
            if let Err(e) = supervisor.await {
                warn!(error = %e, "Session supervisor ended abnormally");
            }
        }
    }

    async fn end_session(
        &self,
        session_id: SessionId,
        live: Option<LiveSession>,
    ) -> Result<Session, SessionError> {
        if let Some(live) = &live {
            let _ = live.stop.send(true);
            live.service.release_session(session_id).await;
        }

        let Some(mut session) = self.storage.remove(session_id).await else {
            return Err(SessionError::NotFound(session_id));
        };

        if !session.is_ended() {
            if let Ok(from) = session.update_status(ConnectivityStatus::Disconnected) {
                publish_event(
                    self.publisher.as_ref(),
                    &SessionStatusChanged::new(session_id, from, session.status()),
                )
                .await;
            }
        }

        if let Some(live) = live {
            let _ = live
                .channel
                .send(ChannelMessage::End {
                    reason: format!("session {}", session.status()),
                })
                .await;
            live.channel.close().await;
        }

        info!(session_id = %session_id, status = %session.status(), "Session ended");
        publish_event(self.publisher.as_ref(), &SessionEnded::from_session(&session)).await;
        Ok(session)
    }

    async fn transition(
        &self,
        session_id: SessionId,
        target: ConnectivityStatus,
    ) -> Result<(), SessionError> {
        let mut session = self
            .storage
            .find(session_id)
            .await
            .ok_or(SessionError::NotFound(session_id))?;
        let from = session.update_status(target)?;
        self.storage.update(session).await?;

        debug!(session_id = %session_id, from = %from, to = %target, "Session status changed");
        publish_event(
            self.publisher.as_ref(),
            &SessionStatusChanged::new(session_id, from, target),
        )
        .await;
        Ok(())
    }

    /// Runs the engine and applies its outcome to the session.
    async fn supervise(
        self: Arc<Self>,
        session_id: SessionId,
        engine: Arc<dyn PaymentEngine>,
        stop: watch::Receiver<bool>,
    ) {
        let (handshake, mut handshake_rx) = oneshot::channel();
        let run = engine.run(handshake, stop);
        tokio::pin!(run);

        let mut connected = false;
        let outcome = loop {
            tokio::select! {
                outcome = &mut run => break outcome,
                done = &mut handshake_rx, if !connected => {
                    connected = true;
                    if done.is_ok() {
                        if let Err(e) = self.transition(session_id, ConnectivityStatus::Connected).await {
                            debug!(session_id = %session_id, error = %e, "Connected transition skipped");
                        }
                    }
                }
            }
        };

        let target = match outcome {
            Ok(EngineExit::Stopped) => return,
            Ok(EngineExit::ChannelClosed) => ConnectivityStatus::Disconnected,
            Err(PaymentError::Channel(reason)) => {
                warn!(session_id = %session_id, reason, "Session channel lost");
                ConnectivityStatus::Disconnected
            }
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "Payment protocol violation");
                ConnectivityStatus::Failed
            }
        };

        if let Err(e) = self.transition(session_id, target).await {
            debug!(session_id = %session_id, error = %e, "Final transition skipped");
        }
        if let Err(e) = self.teardown(session_id).await {
            debug!(session_id = %session_id, error = %e, "Session already torn down");
        }
    }
}

#[async_trait]
impl SessionTerminator for SessionManager {
    async fn terminate(&self, session_id: SessionId) -> Result<(), SessionError> {
        self.teardown(session_id).await.map(|_| ())
    }
}
