//! Session-specific error types.

use thiserror::Error;

use super::ConnectivityStatus;
use crate::domain::foundation::{DomainError, ErrorCode, SessionId};

/// Session lifecycle errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(SessionId),

    #[error("Session already exists: {0}")]
    AlreadyExists(SessionId),

    #[error("Invalid connectivity transition from {from} to {to}")]
    InvalidTransition {
        from: ConnectivityStatus,
        to: ConnectivityStatus,
    },

    #[error("Payment engine could not be created: {0}")]
    PaymentEngine(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl SessionError {
    pub fn code(&self) -> ErrorCode {
        match self {
            SessionError::NotFound(_) => ErrorCode::SessionNotFound,
            SessionError::AlreadyExists(_) => ErrorCode::ValidationFailed,
            SessionError::InvalidTransition { .. } => ErrorCode::InvalidStateTransition,
            SessionError::PaymentEngine(_) => ErrorCode::InternalError,
            SessionError::Storage(_) => ErrorCode::InternalError,
        }
    }
}

impl From<SessionError> for DomainError {
    fn from(err: SessionError) -> Self {
        DomainError::new(err.code(), err.to_string())
    }
}
