//! Location resolver port.

use async_trait::async_trait;

use crate::domain::market::Location;

#[derive(Debug, Clone, thiserror::Error)]
pub enum LocationError {
    #[error("Location request failed: {0}")]
    Request(String),

    #[error("Location response invalid: {0}")]
    InvalidResponse(String),
}

/// Detects where this node appears to be on the internet.
///
/// Called at every service start, never cached by callers.
#[async_trait]
pub trait LocationResolver: Send + Sync {
    async fn detect_location(&self) -> Result<Location, LocationError>;
}
