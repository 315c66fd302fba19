//! Provider registration handlers.

mod provider_registrar;

pub use provider_registrar::{ProviderRegistrar, RegistrarConfig, RegistrationError};
