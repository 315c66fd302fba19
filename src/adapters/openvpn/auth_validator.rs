//! Login validation for the OpenVPN management interface.
//!
//! Clients log in with the session id as username and a signature of
//! `AUTH_SIGNATURE_PREFIX + session id` as password.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{ClientMap, ClientMapError};
use crate::domain::foundation::{ClientHandle, SessionId};
use crate::domain::payment::Signature;
use crate::ports::{AuthError, ClientAuthenticator, IdentityExtractor};

/// Prefix signed together with the session id.
pub const AUTH_SIGNATURE_PREFIX: &str = "VpnSessionId:";

impl From<ClientMapError> for AuthError {
    fn from(err: ClientMapError) -> Self {
        match err {
            ClientMapError::ClientConflict { client, bound } => AuthError::ClientConflict {
                client,
                bound: bound.to_string(),
            },
            other => AuthError::Lookup(other.to_string()),
        }
    }
}

/// Validates client logins against live sessions.
pub struct AuthValidator {
    client_map: Arc<ClientMap>,
    extractor: Arc<dyn IdentityExtractor>,
}

impl AuthValidator {
    pub fn new(client_map: Arc<ClientMap>, extractor: Arc<dyn IdentityExtractor>) -> Self {
        Self {
            client_map,
            extractor,
        }
    }

    fn parse_session_id(text: &str) -> Result<SessionId, AuthError> {
        text.parse()
            .map_err(|_| AuthError::InvalidSessionId(text.to_string()))
    }
}

#[async_trait]
impl ClientAuthenticator for AuthValidator {
    async fn validate(
        &self,
        client: ClientHandle,
        session_id: &str,
        signature: &str,
    ) -> Result<bool, AuthError> {
        let id = Self::parse_session_id(session_id)?;
        let lookup = self.client_map.find_client_session(client, id).await?;

        if !lookup.found {
            // Pins the connection to the claimed session; does not authenticate.
            self.client_map.update_client_session(client, id).await;
        }

        let signature = Signature::new(signature)
            .map_err(|e| AuthError::InvalidSignature(e.to_string()))?;
        let message = format!("{}{}", AUTH_SIGNATURE_PREFIX, session_id);
        let claimed = self
            .extractor
            .extract(message.as_bytes(), &signature)
            .map_err(|e| AuthError::InvalidSignature(e.to_string()))?;

        let ok = lookup
            .session
            .as_ref()
            .is_some_and(|session| session.consumer_id() == &claimed);
        if !ok {
            warn!(client = %client, session_id = %id, identity = %claimed, "Login rejected");
        }
        Ok(ok)
    }

    async fn cleanup(&self, session_id: &str) -> Result<(), AuthError> {
        let id = Self::parse_session_id(session_id)?;
        match self.client_map.remove_session(id).await {
            Ok(()) => Ok(()),
            Err(ClientMapError::SessionNotFound(_)) => {
                debug!(session_id = %id, "Session already gone during cleanup");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::identity::{DigestIdentityExtractor, DigestSigner};
    use crate::adapters::storage::InMemorySessionStorage;
    use crate::domain::foundation::{Identity, ServiceId};
    use crate::domain::market::{Location, Price, ServiceProposal, ServiceType};
    use crate::domain::session::{Session, SessionError};
    use crate::ports::{SessionStorage, SessionTerminator};

    struct StorageTerminator(Arc<InMemorySessionStorage>);

    #[async_trait]
    impl SessionTerminator for StorageTerminator {
        async fn terminate(&self, session_id: SessionId) -> Result<(), SessionError> {
            self.0
                .remove(session_id)
                .await
                .map(|_| ())
                .ok_or(SessionError::NotFound(session_id))
        }
    }

    struct Fixture {
        validator: AuthValidator,
        client_map: Arc<ClientMap>,
        session: Session,
        consumer: DigestSigner,
    }

    async fn fixture() -> Fixture {
        let storage = Arc::new(InMemorySessionStorage::new());
        let consumer = DigestSigner::new(Identity::new("0xc0ffee").unwrap());
        let proposal = ServiceProposal::new(
            Identity::new("0x01").unwrap(),
            ServiceType::Openvpn,
            Location::in_country("DE"),
            Price::default(),
        );
        let session = Session::new(
            SessionId::new(),
            consumer.identity().clone(),
            ServiceId::new(),
            &proposal,
        );
        storage.add(session.clone()).await.unwrap();
        let client_map = Arc::new(ClientMap::new(
            storage.clone(),
            Arc::new(StorageTerminator(storage)),
        ));
        Fixture {
            validator: AuthValidator::new(client_map.clone(), Arc::new(DigestIdentityExtractor)),
            client_map,
            session,
            consumer,
        }
    }

    fn login_signature(signer: &DigestSigner, session_id: &str) -> String {
        signer
            .sign(format!("{}{}", AUTH_SIGNATURE_PREFIX, session_id).as_bytes())
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn consumer_signature_is_accepted() {
        let f = fixture().await;
        let id = f.session.id().to_string();

        let ok = f
            .validator
            .validate(ClientHandle::new(1), &id, &login_signature(&f.consumer, &id))
            .await
            .unwrap();

        assert!(ok);
    }

    #[tokio::test]
    async fn other_identity_is_rejected_without_error() {
        let f = fixture().await;
        let id = f.session.id().to_string();
        let intruder = DigestSigner::new(Identity::new("0xbad").unwrap());

        let ok = f
            .validator
            .validate(ClientHandle::new(1), &id, &login_signature(&intruder, &id))
            .await
            .unwrap();

        assert!(!ok);
    }

    #[tokio::test]
    async fn unverifiable_signature_is_an_error() {
        let f = fixture().await;
        let id = f.session.id().to_string();

        let result = f
            .validator
            .validate(ClientHandle::new(1), &id, "0xc0ffee.deadbeef")
            .await;

        assert!(matches!(result, Err(AuthError::InvalidSignature(_))));
    }

    #[tokio::test]
    async fn repeated_first_login_pins_client_once() {
        let f = fixture().await;
        let unseen = SessionId::new().to_string();
        let signature = login_signature(&f.consumer, &unseen);
        let client = ClientHandle::new(5);

        let first = f.validator.validate(client, &unseen, &signature).await;
        let second = f.validator.validate(client, &unseen, &signature).await;

        assert_eq!(first, Ok(false));
        assert_eq!(second, Ok(false));
        assert_eq!(f.client_map.client_count().await, 1);
    }

    #[tokio::test]
    async fn malformed_session_id_is_an_error() {
        let f = fixture().await;

        let result = f
            .validator
            .validate(ClientHandle::new(1), "not-a-session", "sig")
            .await;

        assert!(matches!(result, Err(AuthError::InvalidSessionId(_))));
    }

    #[tokio::test]
    async fn cleanup_tolerates_missing_session() {
        let f = fixture().await;
        let id = f.session.id().to_string();

        f.validator.cleanup(&id).await.unwrap();
        f.validator.cleanup(&id).await.unwrap();
    }
}
