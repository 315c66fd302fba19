//! Digest-based development signatures.
//!
//! Signature text is `<identity>.<hex sha256(identity || message)>`. It proves
//! nothing cryptographically and exists so a node and its test consumers can
//! run without a keystore.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::domain::foundation::{Identity, ValidationError};
use crate::domain::payment::Signature;
use crate::ports::{ExtractionError, IdentityExtractor};

fn digest(identity: &Identity, message: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(identity.as_str().as_bytes());
    hasher.update(message);
    format!("{:x}", hasher.finalize())
}

/// Produces development signatures for an identity.
#[derive(Debug, Clone)]
pub struct DigestSigner {
    identity: Identity,
}

impl DigestSigner {
    pub fn new(identity: Identity) -> Self {
        Self { identity }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn sign(&self, message: &[u8]) -> Result<Signature, ValidationError> {
        Signature::new(format!("{}.{}", self.identity, digest(&self.identity, message)))
    }
}

/// Verifies [`DigestSigner`] signatures.
#[derive(Debug, Clone, Copy, Default)]
pub struct DigestIdentityExtractor;

impl IdentityExtractor for DigestIdentityExtractor {
    fn extract(&self, message: &[u8], signature: &Signature) -> Result<Identity, ExtractionError> {
        let (identity, provided) = signature
            .as_str()
            .split_once('.')
            .ok_or_else(|| ExtractionError::Malformed("missing separator".to_string()))?;
        let identity =
            Identity::new(identity).map_err(|e| ExtractionError::Malformed(e.to_string()))?;

        let expected = digest(&identity, message);
        if expected.as_bytes().ct_eq(provided.as_bytes()).unwrap_u8() != 1 {
            return Err(ExtractionError::Unverifiable);
        }
        Ok(identity)
    }
}
