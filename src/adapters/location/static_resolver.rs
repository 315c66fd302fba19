use async_trait::async_trait;

use crate::domain::market::Location;
use crate::ports::{LocationError, LocationResolver};

/// Returns the operator-configured location.
#[derive(Debug, Clone)]
pub struct StaticLocationResolver {
    location: Location,
}

impl StaticLocationResolver {
    pub fn new(location: Location) -> Self {
        Self { location }
    }
}

#[async_trait]
impl LocationResolver for StaticLocationResolver {
    async fn detect_location(&self) -> Result<Location, LocationError> {
        Ok(self.location.clone())
    }
}
