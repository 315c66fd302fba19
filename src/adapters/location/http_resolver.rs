//! Location oracle client.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::domain::market::Location;
use crate::ports::{LocationError, LocationResolver};

#[derive(Debug, Deserialize)]
struct LocationResponse {
    #[serde(default)]
    ip: Option<String>,
    #[serde(default)]
    country: String,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    node_type: Option<String>,
}

impl TryFrom<LocationResponse> for Location {
    type Error = LocationError;

    fn try_from(response: LocationResponse) -> Result<Self, Self::Error> {
        let country = response.country.trim().to_uppercase();
        if country.len() != 2 {
            return Err(LocationError::InvalidResponse(format!(
                "country '{}' is not a two-letter code",
                response.country
            )));
        }
        Ok(Location {
            country,
            city: response.city.filter(|c| !c.is_empty()),
            ip: response.ip,
            node_type: response.node_type,
        })
    }
}

/// Asks a location oracle where this node's public address is.
pub struct HttpLocationResolver {
    address: String,
    client: Client,
}

impl HttpLocationResolver {
    pub fn new(address: impl Into<String>, timeout: Duration) -> Result<Self, LocationError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LocationError::Request(e.to_string()))?;
        Ok(Self {
            address: address.into(),
            client,
        })
    }
}

#[async_trait]
impl LocationResolver for HttpLocationResolver {
    async fn detect_location(&self) -> Result<Location, LocationError> {
        let response = self
            .client
            .get(&self.address)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| LocationError::Request(e.to_string()))?;
        let body: LocationResponse = response
            .json()
            .await
            .map_err(|e| LocationError::InvalidResponse(e.to_string()))?;

        let location = Location::try_from(body)?;
        debug!(country = %location.country, "Location detected");
        Ok(location)
    }
}
