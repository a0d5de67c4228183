use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::trace;

/// Broadcast topic with bounded capacity.
/// `T` must be `Send + Sync` because subscribers live on other tasks.
#[derive(Debug, Clone)]
pub struct Topic<T> {
    tx: broadcast::Sender<Arc<T>>,
}

impl<T: Send + Sync + 'static> Topic<T> {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Sends to every current subscriber. Returns how many received it;
    /// publishing without subscribers is not an error.
    pub fn publish(&self, msg: T) -> usize {
        match self.tx.send(Arc::new(msg)) {
            Ok(receivers) => receivers,
            Err(_) => {
                trace!("Published to a topic without subscribers");
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<T>> {
        self.tx.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_every_subscriber_receives() {
        let topic: Topic<u32> = Topic::new(4);
        let mut a = topic.subscribe();
        let mut b = topic.subscribe();

        assert_eq!(topic.publish(7), 2);
        assert_eq!(*a.recv().await.unwrap(), 7);
        assert_eq!(*b.recv().await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let topic: Topic<&'static str> = Topic::new(4);
        assert_eq!(topic.receiver_count(), 0);
        assert_eq!(topic.publish("dropped"), 0);
    }

    #[tokio::test]
    async fn test_closed_when_last_sender_dropped() {
        let topic: Topic<u8> = Topic::new(4);
        let mut rx = topic.subscribe();
        topic.publish(1);
        drop(topic);

        assert_eq!(*rx.recv().await.unwrap(), 1);
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Closed)
        ));
    }
}
