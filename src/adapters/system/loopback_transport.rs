//! Data plane stand-in that tracks peers without moving traffic.

use async_trait::async_trait;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};

use crate::domain::foundation::SessionId;
use crate::domain::service::Port;
use crate::ports::{ClientAuthenticator, TrafficMeter, TransportBackend, TransportError};

#[derive(Default)]
struct LoopbackState {
    listening: Option<Port>,
    peers: HashMap<SessionId, u64>,
}

/// Transport backend used by the noop service and in development.
///
/// Byte counters can be bumped by tests to exercise per-GiB pricing.
#[derive(Default, Clone)]
pub struct LoopbackTransport {
    state: Arc<Mutex<LoopbackState>>,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn listening_port(&self) -> Option<Port> {
        self.state().listening
    }

    pub fn peer_count(&self) -> usize {
        self.state().peers.len()
    }

    /// Adds transferred bytes to a session's counter.
    pub fn record_traffic(&self, session_id: SessionId, bytes: u64) {
        if let Some(counter) = self.state().peers.get_mut(&session_id) {
            *counter = counter.saturating_add(bytes);
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, LoopbackState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TrafficMeter for LoopbackTransport {
    fn bytes_transferred(&self, session_id: SessionId) -> u64 {
        self.state().peers.get(&session_id).copied().unwrap_or(0)
    }
}

#[async_trait]
impl TransportBackend for LoopbackTransport {
    fn traffic_meter(&self) -> Arc<dyn TrafficMeter> {
        Arc::new(self.clone())
    }
    async fn start(
        &self,
        port: Port,
        _authenticator: Option<Arc<dyn ClientAuthenticator>>,
    ) -> Result<(), TransportError> {
        let mut state = self.state();
        if state.listening.is_some() {
            return Err(TransportError::Start("already listening".to_string()));
        }
        state.listening = Some(port);
        Ok(())
    }

    async fn stop(&self) -> Result<(), TransportError> {
        let mut state = self.state();
        state.listening = None;
        state.peers.clear();
        Ok(())
    }

    async fn add_peer(
        &self,
        session_id: SessionId,
        _consumer_endpoint: Option<SocketAddr>,
    ) -> Result<(), TransportError> {
        let mut state = self.state();
        if state.listening.is_none() {
            return Err(TransportError::NotRunning);
        }
        state.peers.entry(session_id).or_insert(0);
        Ok(())
    }

    async fn remove_peer(&self, session_id: SessionId) -> Result<(), TransportError> {
        self.state().peers.remove(&session_id);
        Ok(())
    }
}
