//! Sync completion notifications.
//!
//! Publishing is best-effort: a notifier cannot fail a sync, and a message
//! nobody is listening for is simply dropped.

use serde::Serialize;
use tokio::sync::broadcast;

use crate::SyncSummary;

/// Receives the summary of every committed sync.
pub trait Notifier: Send + Sync + 'static {
    fn publish(&self, topic: &str, summary: &SyncSummary);
}

/// Discards all notifications.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn publish(&self, _topic: &str, _summary: &SyncSummary) {}
}

/// A published summary with its topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncNotification {
    pub topic: String,
    pub summary: SyncSummary,
}

/// Fans notifications out to any number of subscribers.
///
/// Slow subscribers that fall more than `capacity` messages behind miss the
/// oldest ones.
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    sender: broadcast::Sender<SyncNotification>,
}

impl BroadcastNotifier {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to notifications published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SyncNotification> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(16)
    }
}

impl Notifier for BroadcastNotifier {
    fn publish(&self, topic: &str, summary: &SyncSummary) {
        let notification = SyncNotification {
            topic: topic.to_owned(),
            summary: summary.clone(),
        };
        if self.sender.send(notification).is_err() {
            tracing::debug!(topic = %topic, "No subscribers for sync notification");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_broadcast_delivers_to_subscribers() {
        let notifier = BroadcastNotifier::default();
        let mut first = notifier.subscribe();
        let mut second = notifier.subscribe();
        let summary = SyncSummary::from_records(&[], Duration::from_millis(3));

        notifier.publish("content_sync:acme", &summary);

        for rx in [&mut first, &mut second] {
            let received = rx.try_recv().unwrap();
            assert_eq!(received.topic, "content_sync:acme");
            assert_eq!(received.summary, summary);
        }
    }

    #[test]
    fn test_publish_without_subscribers_is_silent() {
        let notifier = BroadcastNotifier::new(1);
        let summary = SyncSummary::from_records(&[], Duration::ZERO);

        notifier.publish("content_sync:acme", &summary);
        NoopNotifier.publish("content_sync:acme", &summary);
    }
}
