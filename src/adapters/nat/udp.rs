//! UDP hole-punching pinger.
//!
//! The pinger handle is shared by every service on the dynamic port pool.
//! Requests are served by one background loop that owns the probe tasks.

use async_trait::async_trait;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::domain::service::Port;
use crate::ports::{NatError, NatPinger};

const PING_PAYLOAD: &[u8] = b"continuously pinging to";

/// Probe settings.
#[derive(Debug, Clone)]
pub struct UdpPingerConfig {
    pub probe_count: u32,
    pub probe_interval: Duration,
    pub queue_size: usize,
}

impl Default for UdpPingerConfig {
    fn default() -> Self {
        Self {
            probe_count: 10,
            probe_interval: Duration::from_millis(200),
            queue_size: 64,
        }
    }
}

struct PingRequest {
    local: Port,
    consumer: SocketAddr,
    reply: oneshot::Sender<Result<(), NatError>>,
}

/// Handle used by services to request hole punching.
#[derive(Clone)]
pub struct UdpNatPinger {
    requests: mpsc::Sender<PingRequest>,
}

/// Background loop serving ping requests until shutdown.
pub struct UdpPingerLoop {
    requests: mpsc::Receiver<PingRequest>,
    config: UdpPingerConfig,
}

impl UdpNatPinger {
    pub fn new(config: UdpPingerConfig) -> (Arc<Self>, UdpPingerLoop) {
        let (tx, rx) = mpsc::channel(config.queue_size.max(1));
        (
            Arc::new(Self { requests: tx }),
            UdpPingerLoop {
                requests: rx,
                config,
            },
        )
    }
}

#[async_trait]
impl NatPinger for UdpNatPinger {
    fn is_active(&self) -> bool {
        true
    }

    async fn ping_consumer(&self, local: Port, consumer: SocketAddr) -> Result<(), NatError> {
        let (reply, response) = oneshot::channel();
        self.requests
            .send(PingRequest {
                local,
                consumer,
                reply,
            })
            .await
            .map_err(|_| NatError::Stopped)?;
        response.await.map_err(|_| NatError::Stopped)?
    }
}

impl UdpPingerLoop {
    /// Serves ping requests until `shutdown` flips to true, then cancels and
    /// awaits outstanding probes.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut probes = JoinSet::new();
        info!("NAT pinger started");

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }

                request = self.requests.recv() => {
                    let Some(request) = request else { break };
                    let config = self.config.clone();
                    probes.spawn(async move {
                        let result = punch(request.local, request.consumer, &config).await;
                        if let Err(e) = &result {
                            warn!(consumer = %request.consumer, error = %e, "NAT ping failed");
                        }
                        let _ = request.reply.send(result);
                    });
                }

                Some(done) = probes.join_next(), if !probes.is_empty() => {
                    if let Err(e) = done {
                        warn!(error = %e, "NAT probe task ended abnormally");
                    }
                }
            }
        }

        self.requests.close();
        probes.shutdown().await;
        info!("NAT pinger stopped");
    }
}

async fn punch(local: Port, consumer: SocketAddr, config: &UdpPingerConfig) -> Result<(), NatError> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, local.value()))
        .await
        .map_err(|e| NatError::Io(e.to_string()))?;

    for attempt in 0..config.probe_count {
        socket
            .send_to(PING_PAYLOAD, consumer)
            .await
            .map_err(|e| NatError::Io(e.to_string()))?;
        debug!(local = %local, consumer = %consumer, attempt, "NAT probe sent");
        tokio::time::sleep(config.probe_interval).await;
    }
    Ok(())
}
