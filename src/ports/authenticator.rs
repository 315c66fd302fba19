//! Client authentication callback exposed to connection-oriented transports.

use async_trait::async_trait;

use crate::domain::foundation::ClientHandle;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid session id '{0}'")]
    InvalidSessionId(String),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Client {client} already bound to session {bound}")]
    ClientConflict { client: ClientHandle, bound: String },

    #[error("Session lookup failed: {0}")]
    Lookup(String),
}

/// Called by the transport for every login attempt and disconnect.
#[async_trait]
pub trait ClientAuthenticator: Send + Sync {
    /// Returns whether `signature` proves the caller owns `session_id`.
    ///
    /// # Errors
    ///
    /// Malformed input or an unverifiable signature is an error, distinct
    /// from a well-formed signature of the wrong identity (`Ok(false)`).
    async fn validate(
        &self,
        client: ClientHandle,
        session_id: &str,
        signature: &str,
    ) -> Result<bool, AuthError>;

    /// Forgets the session after the client disconnected.
    async fn cleanup(&self, session_id: &str) -> Result<(), AuthError>;
}
