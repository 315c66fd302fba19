//! Session storage and session control ports.

use async_trait::async_trait;

use crate::domain::foundation::{ServiceId, SessionId};
use crate::domain::session::{Session, SessionError};

/// Storage of live sessions. The single source of truth for which sessions exist.
#[async_trait]
pub trait SessionStorage: Send + Sync {
    /// # Errors
    ///
    /// `AlreadyExists` if a session with the same id is stored.
    async fn add(&self, session: Session) -> Result<(), SessionError>;

    async fn find(&self, id: SessionId) -> Option<Session>;

    /// Replaces a stored session.
    ///
    /// # Errors
    ///
    /// `NotFound` if the session is not stored.
    async fn update(&self, session: Session) -> Result<(), SessionError>;

    /// Removes and returns the session, if it was stored.
    async fn remove(&self, id: SessionId) -> Option<Session>;

    async fn list(&self) -> Vec<Session>;

    async fn list_by_service(&self, service_id: ServiceId) -> Vec<Session>;
}

/// Ends sessions on behalf of components that do not own them.
#[async_trait]
pub trait SessionTerminator: Send + Sync {
    /// # Errors
    ///
    /// `NotFound` if no such session is live.
    async fn terminate(&self, session_id: SessionId) -> Result<(), SessionError>;
}
