//! ServiceManager - starts and stops service instances.
//!
//! One instance per (service type, provider identity) may be active. Each
//! running instance owns a dialog acceptance task and its stop signal.
//! Stopping an instance ends its sessions before the transport goes down.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::{DialogHandler, ServiceRegistry};
use crate::application::handlers::session::SessionManager;
use crate::application::publish::publish_event;
use crate::domain::foundation::{ServiceId, StateMachine};
use crate::domain::market::ServiceProposal;
use crate::domain::service::{ServiceOptions, ServiceStatus, ServiceStatusChanged};
use crate::ports::{DialogTransport, EventPublisher, Service, ServiceError};

/// Snapshot of one managed instance.
#[derive(Debug, Clone)]
pub struct ServiceInfo {
    pub id: ServiceId,
    pub proposal: ServiceProposal,
    pub options: ServiceOptions,
    pub status: ServiceStatus,
}

struct ServiceInstance {
    info: ServiceInfo,
    service: Arc<dyn Service>,
    shutdown: watch::Sender<bool>,
    accept_loop: JoinHandle<()>,
}

pub struct ServiceManager {
    registry: Arc<ServiceRegistry>,
    dialogs: Arc<dyn DialogTransport>,
    dialog_handler: Arc<DialogHandler>,
    sessions: Arc<SessionManager>,
    publisher: Arc<dyn EventPublisher>,
    instances: Mutex<HashMap<ServiceId, ServiceInstance>>,
}

impl ServiceManager {
    pub fn new(
        registry: Arc<ServiceRegistry>,
        dialogs: Arc<dyn DialogTransport>,
        dialog_handler: Arc<DialogHandler>,
        sessions: Arc<SessionManager>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            registry,
            dialogs,
            dialog_handler,
            sessions,
            publisher,
            instances: Mutex::new(HashMap::new()),
        }
    }

    /// Builds, starts and begins serving an instance for `options`.
    ///
    /// # Errors
    ///
    /// - `AlreadyRunning` if an instance of the same kind serves the same provider
    /// - factory, port, firewall, transport or dialog errors; nothing stays
    ///   acquired when start fails
    pub async fn start(&self, options: ServiceOptions) -> Result<ServiceId, ServiceError> {
        // Held for the whole start so two requests cannot both pass the
        // AlreadyRunning check.
        let mut instances = self.instances.lock().await;

        let (service, proposal) = self.registry.create(options).await?;
        if instances.values().any(|running| {
            running.info.proposal.service_type() == proposal.service_type()
                && running.info.proposal.provider_id() == proposal.provider_id()
        }) {
            return Err(ServiceError::AlreadyRunning {
                service_type: proposal.service_type(),
                provider: proposal.provider_id().clone(),
            });
        }

        let id = ServiceId::new();
        let mut info = ServiceInfo {
            id,
            proposal,
            options,
            status: ServiceStatus::Starting,
        };
        self.announce(&info).await;

        if let Err(e) = service.start().await {
            warn!(service_id = %id, error = %e, "Service failed to start");
            self.finish_stop(&mut info).await;
            return Err(e);
        }

        let waiter = match self.dialogs.listen(&info.proposal.dialog_topic()).await {
            Ok(waiter) => waiter,
            Err(e) => {
                warn!(service_id = %id, error = %e, "Dialog listener failed to open");
                if let Err(stop) = service.stop().await {
                    warn!(service_id = %id, error = %stop, "Service stop failed");
                }
                self.finish_stop(&mut info).await;
                return Err(e.into());
            }
        };

        let (shutdown, shutdown_rx) = watch::channel(false);
        let accept_loop = tokio::spawn(Arc::clone(&self.dialog_handler).accept_loop(
            id,
            Arc::clone(&service),
            waiter,
            shutdown_rx,
        ));

        self.set_status(&mut info, ServiceStatus::Running);
        self.announce(&info).await;
        info!(
            service_id = %id,
            service_type = %info.proposal.service_type(),
            country = %info.proposal.location().country,
            "Service running"
        );

        instances.insert(
            id,
            ServiceInstance {
                info,
                service,
                shutdown,
                accept_loop,
            },
        );
        Ok(id)
    }

    /// Stops dialog acceptance, ends the instance's sessions, then stops
    /// the instance itself. When this returns no session of `id` remains.
    ///
    /// # Errors
    ///
    /// `NotFound` for unknown ids; otherwise the instance's stop error, after
    /// the instance was removed regardless.
    pub async fn stop(&self, id: ServiceId) -> Result<(), ServiceError> {
        let instance = self
            .instances
            .lock()
            .await
            .remove(&id)
            .ok_or_else(|| ServiceError::NotFound(id.to_string()))?;
        self.shut_down(instance).await
    }

    /// Stops every instance. Errors are logged.
    pub async fn stop_all(&self) {
        let instances: Vec<ServiceInstance> =
            self.instances.lock().await.drain().map(|(_, i)| i).collect();
        for instance in instances {
            let id = instance.info.id;
            if let Err(e) = self.shut_down(instance).await {
                warn!(service_id = %id, error = %e, "Service stop failed");
            }
        }
    }

    pub async fn list(&self) -> Vec<ServiceInfo> {
        self.instances
            .lock()
            .await
            .values()
            .map(|instance| instance.info.clone())
            .collect()
    }

    pub async fn get(&self, id: ServiceId) -> Option<ServiceInfo> {
        self.instances
            .lock()
            .await
            .get(&id)
            .map(|instance| instance.info.clone())
    }

    async fn shut_down(&self, instance: ServiceInstance) -> Result<(), ServiceError> {
        let ServiceInstance {
            mut info,
            service,
            shutdown,
            accept_loop,
        } = instance;

        self.set_status(&mut info, ServiceStatus::Stopping);
        self.announce(&info).await;

        let _ = shutdown.send(true);
        if let Err(e) = accept_loop.await {
            warn!(service_id = %info.id, error = %e, "Dialog loop ended abnormally");
        }

        let ended = self.sessions.teardown_service(info.id).await;
        if ended > 0 {
            info!(service_id = %info.id, sessions = ended, "Ended sessions of stopping service");
        }

        let stopped = service.stop().await;
        self.set_status(&mut info, ServiceStatus::Stopped);
        self.announce(&info).await;
        info!(service_id = %info.id, service_type = %info.proposal.service_type(), "Service stopped");
        stopped
    }

    /// Walks a failed start through `Stopping` to `Stopped`.
    async fn finish_stop(&self, info: &mut ServiceInfo) {
        self.set_status(info, ServiceStatus::Stopping);
        self.announce(info).await;
        self.set_status(info, ServiceStatus::Stopped);
        self.announce(info).await;
    }

    fn set_status(&self, info: &mut ServiceInfo, target: ServiceStatus) {
        match info.status.transition_to(target) {
            Ok(status) => info.status = status,
            Err(e) => warn!(service_id = %info.id, error = %e, "Unexpected service transition"),
        }
    }

    async fn announce(&self, info: &ServiceInfo) {
        publish_event(
            self.publisher.as_ref(),
            &ServiceStatusChanged::new(
                info.id,
                info.proposal.service_type(),
                info.proposal.provider_id().clone(),
                info.status,
            ),
        )
        .await;
    }
}
