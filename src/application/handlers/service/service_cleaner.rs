//! ServiceCleaner - ends the sessions of stopped services.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use crate::application::handlers::session::SessionManager;
use crate::domain::foundation::{DomainError, ErrorCode, EventEnvelope};
use crate::domain::service::{ServiceStatus, ServiceStatusChanged};
use crate::ports::EventHandler;

/// Handles `service.status_changed`; on `Stopped` every session of the
/// service is torn down.
pub struct ServiceCleaner {
    sessions: Arc<SessionManager>,
}

impl ServiceCleaner {
    pub fn new(sessions: Arc<SessionManager>) -> Self {
        Self { sessions }
    }
}

#[async_trait]
impl EventHandler for ServiceCleaner {
    async fn handle(&self, event: EventEnvelope) -> Result<(), DomainError> {
        let changed: ServiceStatusChanged = event
            .payload_as()
            .map_err(|e| DomainError::new(ErrorCode::ValidationFailed, e.to_string()))?;
        if changed.status != ServiceStatus::Stopped {
            return Ok(());
        }

        let ended = self.sessions.teardown_service(changed.service_id).await;
        if ended > 0 {
            info!(service_id = %changed.service_id, sessions = ended, "Removed sessions of stopped service");
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "ServiceCleaner"
    }
}
