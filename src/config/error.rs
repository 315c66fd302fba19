//! Configuration error types

use thiserror::Error;

use crate::domain::foundation::ValidationError as DomainValidationError;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid value for {field}: {source}")]
    InvalidValue {
        field: &'static str,
        #[source]
        source: DomainValidationError,
    },

    #[error("Duration {0} must be greater than zero")]
    ZeroDuration(&'static str),

    #[error("{0} must be at least 1")]
    ZeroCount(&'static str),

    #[error("Terms and conditions must be accepted before running as a provider")]
    TermsNotAccepted,

    #[error("Invalid URL for {field}: {value}")]
    InvalidUrl { field: &'static str, value: String },

    #[error("Unknown service type: {0}")]
    UnknownServiceType(String),

    #[error("No services configured")]
    NoServices,

    #[error("Invalid log level: {0}")]
    InvalidLogLevel(String),
}

impl ValidationError {
    pub(crate) fn invalid(field: &'static str) -> impl FnOnce(DomainValidationError) -> Self {
        move |source| ValidationError::InvalidValue { field, source }
    }
}
