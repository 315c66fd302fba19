//! Fails sessions whose promises the settler rejected.

use async_trait::async_trait;
use std::sync::Arc;

use super::SessionManager;
use crate::domain::foundation::{DomainError, ErrorCode, EventEnvelope};
use crate::domain::payment::PromiseRejected;
use crate::domain::session::SessionError;
use crate::ports::EventHandler;

/// Handles `payment.promise_rejected`.
///
/// A rejected promise is a protocol violation by the consumer, so the session
/// it arrived on ends `Failed`.
pub struct PromiseRejectionHandler {
    sessions: Arc<SessionManager>,
}

impl PromiseRejectionHandler {
    pub fn new(sessions: Arc<SessionManager>) -> Self {
        Self { sessions }
    }
}

#[async_trait]
impl EventHandler for PromiseRejectionHandler {
    async fn handle(&self, event: EventEnvelope) -> Result<(), DomainError> {
        let rejected: PromiseRejected = event
            .payload_as()
            .map_err(|e| DomainError::new(ErrorCode::ValidationFailed, e.to_string()))?;

        match self
            .sessions
            .fail_session(rejected.session_id, &rejected.reason)
            .await
        {
            Ok(()) | Err(SessionError::NotFound(_)) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn name(&self) -> &'static str {
        "PromiseRejectionHandler"
    }
}
