//! In-Memory Session Storage Adapter
//!
//! Live sessions are never persisted; this is the node's session store.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{ServiceId, SessionId};
use crate::domain::session::{Session, SessionError};
use crate::ports::SessionStorage;

/// In-memory storage for live sessions
#[derive(Debug, Clone, Default)]
pub struct InMemorySessionStorage {
    sessions: Arc<RwLock<HashMap<SessionId, Session>>>,
}

impl InMemorySessionStorage {
    /// Create a new in-memory storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of stored sessions
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[async_trait]
impl SessionStorage for InMemorySessionStorage {
    async fn add(&self, session: Session) -> Result<(), SessionError> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&session.id()) {
            return Err(SessionError::AlreadyExists(session.id()));
        }
        sessions.insert(session.id(), session);
        Ok(())
    }

    async fn find(&self, id: SessionId) -> Option<Session> {
        self.sessions.read().await.get(&id).cloned()
    }

    async fn update(&self, session: Session) -> Result<(), SessionError> {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(&session.id()) {
            Some(stored) => {
                *stored = session;
                Ok(())
            }
            None => Err(SessionError::NotFound(session.id())),
        }
    }

    async fn remove(&self, id: SessionId) -> Option<Session> {
        self.sessions.write().await.remove(&id)
    }

    async fn list(&self) -> Vec<Session> {
        self.sessions.read().await.values().cloned().collect()
    }

    async fn list_by_service(&self, service_id: ServiceId) -> Vec<Session> {
        self.sessions
            .read()
            .await
            .values()
            .filter(|s| s.service_id() == service_id)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::Identity;
    use crate::domain::market::{Location, Price, ServiceProposal, ServiceType};
    use crate::domain::session::ConnectivityStatus;

    fn session(service_id: ServiceId) -> Session {
        let proposal = ServiceProposal::new(
            Identity::new("0x01").unwrap(),
            ServiceType::Noop,
            Location::in_country("US"),
            Price::default(),
        );
        Session::new(SessionId::new(), Identity::new("0x02").unwrap(), service_id, &proposal)
    }

    #[tokio::test]
    async fn add_then_find() {
        let storage = InMemorySessionStorage::new();
        let s = session(ServiceId::new());

        storage.add(s.clone()).await.unwrap();

        assert_eq!(storage.find(s.id()).await, Some(s));
    }

    #[tokio::test]
    async fn duplicate_add_is_rejected() {
        let storage = InMemorySessionStorage::new();
        let s = session(ServiceId::new());
        storage.add(s.clone()).await.unwrap();

        let err = storage.add(s.clone()).await.unwrap_err();

        assert_eq!(err, SessionError::AlreadyExists(s.id()));
        assert_eq!(storage.session_count().await, 1);
    }

    #[tokio::test]
    async fn update_requires_existing_session() {
        let storage = InMemorySessionStorage::new();
        let mut s = session(ServiceId::new());

        assert!(storage.update(s.clone()).await.is_err());

        storage.add(s.clone()).await.unwrap();
        s.update_status(ConnectivityStatus::Connected).unwrap();
        storage.update(s.clone()).await.unwrap();

        let stored = storage.find(s.id()).await.unwrap();
        assert_eq!(stored.status(), ConnectivityStatus::Connected);
    }

    #[tokio::test]
    async fn list_by_service_filters() {
        let storage = InMemorySessionStorage::new();
        let service_a = ServiceId::new();
        storage.add(session(service_a)).await.unwrap();
        storage.add(session(service_a)).await.unwrap();
        storage.add(session(ServiceId::new())).await.unwrap();

        assert_eq!(storage.list().await.len(), 3);
        assert_eq!(storage.list_by_service(service_a).await.len(), 2);
    }

    #[tokio::test]
    async fn remove_returns_session_once() {
        let storage = InMemorySessionStorage::new();
        let s = session(ServiceId::new());
        storage.add(s.clone()).await.unwrap();

        assert!(storage.remove(s.id()).await.is_some());
        assert!(storage.remove(s.id()).await.is_none());
    }
}
