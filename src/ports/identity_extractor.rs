//! Identity extractor port.

use crate::domain::foundation::Identity;
use crate::domain::payment::Signature;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractionError {
    #[error("Malformed signature: {0}")]
    Malformed(String),

    #[error("Signature does not verify")]
    Unverifiable,
}

/// Recovers the identity that signed a message.
///
/// Fails when the signature is malformed or cannot be verified; never
/// returns an arbitrary identity for a bad signature.
pub trait IdentityExtractor: Send + Sync {
    fn extract(&self, message: &[u8], signature: &Signature) -> Result<Identity, ExtractionError>;
}
