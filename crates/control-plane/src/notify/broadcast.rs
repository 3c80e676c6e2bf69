//! In-process notifier backed by a tokio broadcast channel.
//!
//! Feeds the `/api/events` stream. Events sent while nobody listens are
//! dropped; slow subscribers lose the oldest events once the channel is full.

use async_trait::async_trait;
use tokio::sync::broadcast;

use super::{ExecutionEvent, Notifier};

#[derive(Clone)]
pub struct BroadcastNotifier {
    tx: broadcast::Sender<ExecutionEvent>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ExecutionEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[async_trait]
impl Notifier for BroadcastNotifier {
    async fn broadcast(&self, event: ExecutionEvent) {
        // No receivers is not an error.
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::RunStatus;
    use uuid::Uuid;

    #[test]
    fn test_subscriber_receives_events_in_order() {
        tokio_test::block_on(async {
            let notifier = BroadcastNotifier::new(16);
            let mut rx = notifier.subscribe();
            let id = Uuid::new_v4();

            notifier
                .broadcast(ExecutionEvent::execution(id, RunStatus::Running, None))
                .await;
            notifier
                .broadcast(ExecutionEvent::execution(id, RunStatus::Completed, None))
                .await;

            assert_eq!(rx.recv().await.unwrap().status(), RunStatus::Running);
            assert_eq!(rx.recv().await.unwrap().status(), RunStatus::Completed);
        });
    }

    #[test]
    fn test_broadcast_without_subscribers_is_ok() {
        tokio_test::block_on(async {
            let notifier = BroadcastNotifier::new(4);
            assert_eq!(notifier.subscriber_count(), 0);
            notifier
                .broadcast(ExecutionEvent::execution(Uuid::new_v4(), RunStatus::Running, None))
                .await;
        });
    }
}
