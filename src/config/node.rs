//! Node identity configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;
use crate::domain::foundation::Identity;

/// Identity and operating mode of the node.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeSection {
    /// Provider identity address (`0x`-prefixed hex)
    #[serde(default)]
    pub identity: String,

    /// Passphrase unlocking the identity keystore
    #[serde(default = "empty_secret")]
    pub identity_passphrase: SecretString,

    #[serde(default)]
    pub agreed_terms_and_conditions: bool,

    /// Mobile consumer mode: no services, no registration, no settlement
    #[serde(default)]
    pub consumer_only: bool,
}

fn empty_secret() -> SecretString {
    SecretString::new(String::new())
}

impl Default for NodeSection {
    fn default() -> Self {
        Self {
            identity: String::new(),
            identity_passphrase: empty_secret(),
            agreed_terms_and_conditions: false,
            consumer_only: false,
        }
    }
}

impl NodeSection {
    pub fn identity(&self) -> Result<Identity, ValidationError> {
        if self.identity.trim().is_empty() {
            return Err(ValidationError::MissingRequired("node.identity"));
        }
        Identity::new(self.identity.as_str()).map_err(ValidationError::invalid("node.identity"))
    }

    pub fn has_passphrase(&self) -> bool {
        !self.identity_passphrase.expose_secret().is_empty()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.identity()?;
        if !self.consumer_only && !self.agreed_terms_and_conditions {
            return Err(ValidationError::TermsNotAccepted);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(identity: &str) -> NodeSection {
        NodeSection {
            identity: identity.to_string(),
            agreed_terms_and_conditions: true,
            ..Default::default()
        }
    }

    #[test]
    fn identity_is_required() {
        assert!(matches!(
            section("").validate(),
            Err(ValidationError::MissingRequired("node.identity"))
        ));
    }

    #[test]
    fn identity_must_be_hex() {
        assert!(matches!(
            section("provider").validate(),
            Err(ValidationError::InvalidValue { field: "node.identity", .. })
        ));
    }

    #[test]
    fn providers_must_accept_terms() {
        let mut node = section("0xabc");
        node.agreed_terms_and_conditions = false;
        assert!(matches!(node.validate(), Err(ValidationError::TermsNotAccepted)));

        node.consumer_only = true;
        assert!(node.validate().is_ok());
    }

    #[test]
    fn passphrase_is_redacted_in_debug_output() {
        let node = NodeSection {
            identity_passphrase: SecretString::new("hunter2".to_string()),
            ..section("0xabc")
        };

        assert!(node.has_passphrase());
        assert!(!format!("{:?}", node).contains("hunter2"));
    }
}
