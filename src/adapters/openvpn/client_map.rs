//! Client session map for connection-oriented transports.
//!
//! One transport process multiplexes many clients; each client handle is
//! pinned to the session it first claimed.

use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

use crate::domain::foundation::{ClientHandle, SessionId};
use crate::domain::session::{Session, SessionError};
use crate::ports::{SessionStorage, SessionTerminator};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientMapError {
    #[error("Session not found: {0}")]
    SessionNotFound(SessionId),

    #[error("Client {client} is pinned to session {bound}")]
    ClientConflict { client: ClientHandle, bound: SessionId },

    #[error("Session teardown failed: {0}")]
    Teardown(String),
}

/// Result of looking up a client's session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSessionLookup {
    pub session_id: SessionId,
    /// The live session, if storage has one under `session_id`.
    pub session: Option<Session>,
    /// Whether the client handle was already pinned to `session_id`.
    pub found: bool,
}

/// Concurrent map of client handle to session.
pub struct ClientMap {
    sessions: Arc<dyn SessionStorage>,
    terminator: Arc<dyn SessionTerminator>,
    clients: RwLock<HashMap<ClientHandle, SessionId>>,
}

impl ClientMap {
    pub fn new(sessions: Arc<dyn SessionStorage>, terminator: Arc<dyn SessionTerminator>) -> Self {
        Self {
            sessions,
            terminator,
            clients: RwLock::new(HashMap::new()),
        }
    }

    /// Looks up `session_id` and whether `client` is already pinned to it.
    ///
    /// `found == false` is not an error: it marks the first login attempt on
    /// this connection.
    ///
    /// # Errors
    ///
    /// `ClientConflict` if `client` is pinned to a different session.
    pub async fn find_client_session(
        &self,
        client: ClientHandle,
        session_id: SessionId,
    ) -> Result<ClientSessionLookup, ClientMapError> {
        let found = match self.clients.read().await.get(&client) {
            Some(bound) if *bound == session_id => true,
            Some(bound) => {
                return Err(ClientMapError::ClientConflict {
                    client,
                    bound: *bound,
                })
            }
            None => false,
        };
        let session = self.sessions.find(session_id).await;

        Ok(ClientSessionLookup {
            session_id,
            session,
            found,
        })
    }

    /// Pins `client` to `session_id`. Returns true if the mapping is new.
    ///
    /// Calling it again with the same pair changes nothing.
    pub async fn update_client_session(&self, client: ClientHandle, session_id: SessionId) -> bool {
        let mut clients = self.clients.write().await;
        match clients.insert(client, session_id) {
            Some(previous) => previous != session_id,
            None => true,
        }
    }

    /// Unpins every client of `session_id` and tears the session down.
    ///
    /// # Errors
    ///
    /// `SessionNotFound` if no such session is live. The mapping is removed
    /// regardless, so callers may treat this as best-effort.
    pub async fn remove_session(&self, session_id: SessionId) -> Result<(), ClientMapError> {
        let unpinned = {
            let mut clients = self.clients.write().await;
            let before = clients.len();
            clients.retain(|_, bound| *bound != session_id);
            before - clients.len()
        };
        debug!(session_id = %session_id, unpinned, "Client mappings removed");

        match self.terminator.terminate(session_id).await {
            Ok(()) => Ok(()),
            Err(SessionError::NotFound(id)) => Err(ClientMapError::SessionNotFound(id)),
            Err(e) => Err(ClientMapError::Teardown(e.to_string())),
        }
    }

    /// Number of pinned client handles.
    pub async fn client_count(&self) -> usize {
        self.clients.read().await.len()
    }
}
