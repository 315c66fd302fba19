//! Service without a data plane, used for testing discovery and payments.

use async_trait::async_trait;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::domain::foundation::SessionId;
use crate::domain::market::ServiceProposal;
use crate::ports::{Service, ServiceError, TrafficMeter};

struct NoTraffic;

impl TrafficMeter for NoTraffic {
    fn bytes_transferred(&self, _session_id: SessionId) -> u64 {
        0
    }
}

pub struct NoopService {
    proposal: ServiceProposal,
}

impl NoopService {
    pub fn new(proposal: ServiceProposal) -> Self {
        Self { proposal }
    }
}

#[async_trait]
impl Service for NoopService {
    fn proposal(&self) -> &ServiceProposal {
        &self.proposal
    }

    async fn start(&self) -> Result<(), ServiceError> {
        Ok(())
    }

    async fn stop(&self) -> Result<(), ServiceError> {
        Ok(())
    }

    async fn provide_config(
        &self,
        _session_id: SessionId,
        _consumer_endpoint: Option<SocketAddr>,
    ) -> Result<serde_json::Value, ServiceError> {
        Ok(json!({ "service_type": self.proposal.service_type() }))
    }

    async fn release_session(&self, _session_id: SessionId) {}

    fn traffic_meter(&self) -> Arc<dyn TrafficMeter> {
        Arc::new(NoTraffic)
    }
}
