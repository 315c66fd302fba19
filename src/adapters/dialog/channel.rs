//! In-memory session channel.

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

use crate::domain::foundation::Identity;
use crate::ports::{Channel, ChannelError, ChannelMessage};

/// One end of an in-memory channel pair.
pub struct InMemoryChannel {
    peer: Identity,
    outbox: Mutex<Option<mpsc::UnboundedSender<ChannelMessage>>>,
    inbox: Mutex<mpsc::UnboundedReceiver<ChannelMessage>>,
}

impl InMemoryChannel {
    /// Creates connected ends: the first is held by `local`, the second by `remote`.
    pub fn pair(local: Identity, remote: Identity) -> (Self, Self) {
        let (to_remote, from_local) = mpsc::unbounded_channel();
        let (to_local, from_remote) = mpsc::unbounded_channel();
        (
            Self {
                peer: remote,
                outbox: Mutex::new(Some(to_remote)),
                inbox: Mutex::new(from_remote),
            },
            Self {
                peer: local,
                outbox: Mutex::new(Some(to_local)),
                inbox: Mutex::new(from_local),
            },
        )
    }
}

#[async_trait]
impl Channel for InMemoryChannel {
    fn peer(&self) -> &Identity {
        &self.peer
    }

    async fn send(&self, message: ChannelMessage) -> Result<(), ChannelError> {
        let outbox = self.outbox.lock().await;
        let sender = outbox.as_ref().ok_or(ChannelError::Closed)?;
        sender.send(message).map_err(|_| ChannelError::Closed)
    }

    async fn recv(&self) -> Result<ChannelMessage, ChannelError> {
        self.inbox.lock().await.recv().await.ok_or(ChannelError::Closed)
    }

    async fn close(&self) {
        self.outbox.lock().await.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> (Identity, Identity) {
        (Identity::new("0x01").unwrap(), Identity::new("0x02").unwrap())
    }

    #[tokio::test]
    async fn messages_cross_the_pair() {
        let (a, b) = ids();
        let (provider, consumer) = InMemoryChannel::pair(a.clone(), b.clone());

        provider
            .send(ChannelMessage::End { reason: "bye".into() })
            .await
            .unwrap();

        assert_eq!(provider.peer(), &b);
        assert_eq!(consumer.peer(), &a);
        assert_eq!(
            consumer.recv().await.unwrap(),
            ChannelMessage::End { reason: "bye".into() }
        );
    }

    #[tokio::test]
    async fn closing_one_end_closes_the_other() {
        let (a, b) = ids();
        let (provider, consumer) = InMemoryChannel::pair(a, b);

        consumer.close().await;

        assert_eq!(provider.recv().await, Err(ChannelError::Closed));
        assert_eq!(consumer.send(ChannelMessage::End { reason: String::new() }).await, Err(ChannelError::Closed));
    }
}
