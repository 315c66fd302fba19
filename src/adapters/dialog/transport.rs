//! In-process dialog transport.
//!
//! Consumers `dial` a topic; the service listening on it accepts the provider
//! end of a fresh channel pair.

use async_trait::async_trait;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tokio::sync::mpsc;

use super::InMemoryChannel;
use crate::domain::foundation::Identity;
use crate::ports::{DialogError, DialogTransport, DialogWaiter, IncomingDialog};

const BACKLOG: usize = 32;

type Listeners = Mutex<HashMap<String, mpsc::Sender<IncomingDialog>>>;

/// Dialog transport connecting consumers and services within one process.
#[derive(Default)]
pub struct InMemoryDialogTransport {
    listeners: Arc<Listeners>,
}

impl InMemoryDialogTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a dialog to the service listening on `topic` and returns the
    /// consumer end of the channel.
    ///
    /// # Errors
    ///
    /// `Failed` when nobody listens on `topic`.
    pub async fn dial(
        &self,
        topic: &str,
        consumer: Identity,
        consumer_endpoint: Option<SocketAddr>,
    ) -> Result<InMemoryChannel, DialogError> {
        let listener = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(topic)
            .cloned()
            .ok_or_else(|| DialogError::Failed(format!("no listener on {}", topic)))?;

        let provider = topic
            .split('.')
            .next()
            .and_then(|id| Identity::new(id).ok())
            .ok_or_else(|| DialogError::Failed(format!("topic {} has no provider", topic)))?;

        let (provider_end, consumer_end) = InMemoryChannel::pair(provider, consumer.clone());
        listener
            .send(IncomingDialog {
                consumer_id: consumer,
                consumer_endpoint,
                channel: Arc::new(provider_end),
            })
            .await
            .map_err(|_| DialogError::Failed(format!("listener on {} went away", topic)))?;
        Ok(consumer_end)
    }

    pub fn is_listening(&self, topic: &str) -> bool {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(topic)
            .is_some_and(|tx| !tx.is_closed())
    }
}

#[async_trait]
impl DialogTransport for InMemoryDialogTransport {
    async fn listen(&self, topic: &str) -> Result<Box<dyn DialogWaiter>, DialogError> {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        if listeners.get(topic).is_some_and(|tx| !tx.is_closed()) {
            return Err(DialogError::TopicTaken(topic.to_string()));
        }
        let (tx, rx) = mpsc::channel(BACKLOG);
        listeners.insert(topic.to_string(), tx);

        Ok(Box::new(InMemoryDialogWaiter {
            topic: topic.to_string(),
            incoming: rx,
            listeners: Arc::downgrade(&self.listeners),
        }))
    }
}

struct InMemoryDialogWaiter {
    topic: String,
    incoming: mpsc::Receiver<IncomingDialog>,
    listeners: Weak<Listeners>,
}

#[async_trait]
impl DialogWaiter for InMemoryDialogWaiter {
    async fn accept(&mut self) -> Result<IncomingDialog, DialogError> {
        self.incoming.recv().await.ok_or(DialogError::Closed)
    }

    async fn close(&mut self) {
        self.incoming.close();
        if let Some(listeners) = self.listeners.upgrade() {
            listeners
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&self.topic);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{Channel, ChannelMessage};

    const TOPIC: &str = "0x01.wireguard";

    #[tokio::test]
    async fn dial_reaches_listener() {
        let transport = InMemoryDialogTransport::new();
        let mut waiter = transport.listen(TOPIC).await.unwrap();

        let consumer = transport
            .dial(TOPIC, Identity::new("0x02").unwrap(), None)
            .await
            .unwrap();
        let dialog = waiter.accept().await.unwrap();

        assert_eq!(dialog.consumer_id.as_str(), "0x02");
        dialog
            .channel
            .send(ChannelMessage::End { reason: "done".into() })
            .await
            .unwrap();
        assert!(matches!(consumer.recv().await, Ok(ChannelMessage::End { .. })));
    }

    #[tokio::test]
    async fn topic_cannot_be_listened_twice() {
        let transport = InMemoryDialogTransport::new();
        let _waiter = transport.listen(TOPIC).await.unwrap();

        assert!(matches!(
            transport.listen(TOPIC).await,
            Err(DialogError::TopicTaken(_))
        ));
    }

    #[tokio::test]
    async fn closed_waiter_frees_topic_and_rejects_dials() {
        let transport = InMemoryDialogTransport::new();
        let mut waiter = transport.listen(TOPIC).await.unwrap();

        waiter.close().await;

        assert!(matches!(waiter.accept().await, Err(DialogError::Closed)));
        assert!(!transport.is_listening(TOPIC));
        assert!(transport
            .dial(TOPIC, Identity::new("0x02").unwrap(), None)
            .await
            .is_err());
    }
}
