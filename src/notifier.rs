//! Pub/sub fan-out of view/click update notifications, keyed by email id.

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::mpsc;

const SUBSCRIBER_BUFFER: usize = 10;

pub type SubscriptionId = u64;

struct Subscriber {
    id: SubscriptionId,
    sender: mpsc::Sender<()>,
}

/// Fan-out notifier for email view/click activity.
///
/// `subscribe`/`unsubscribe` take the per-resource bucket lock, so they're
/// mutually exclusive with each other and with `notify`'s iteration; separate
/// `notify` calls for different (or the same) email may interleave freely.
pub struct ViewNotifier {
    buckets: DashMap<String, Mutex<Vec<Subscriber>>>,
    next_id: std::sync::atomic::AtomicU64,
}

pub struct Subscription {
    pub email_id: String,
    pub id: SubscriptionId,
    pub receiver: mpsc::Receiver<()>,
}

impl ViewNotifier {
    pub fn new() -> Self {
        Self {
            buckets: DashMap::new(),
            next_id: std::sync::atomic::AtomicU64::new(0),
        }
    }

    pub fn subscribe(&self, email_id: &str) -> Subscription {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        let id = self
            .next_id
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);

        let bucket = self
            .buckets
            .entry(email_id.to_string())
            .or_insert_with(|| Mutex::new(Vec::new()));
        bucket.lock().push(Subscriber { id, sender: tx });

        Subscription {
            email_id: email_id.to_string(),
            id,
            receiver: rx,
        }
    }

    pub fn unsubscribe(&self, email_id: &str, id: SubscriptionId) {
        let mut drop_bucket = false;
        if let Some(bucket) = self.buckets.get(email_id) {
            let mut guard = bucket.lock();
            guard.retain(|sub| sub.id != id);
            drop_bucket = guard.is_empty();
        }
        if drop_bucket {
            self.buckets.remove_if(email_id, |_, bucket| bucket.lock().is_empty());
        }
    }

    /// Attempts a non-blocking notify to every subscriber of `email_id`.
    /// A full subscriber buffer means that subscriber's update is dropped —
    /// it will still catch up on the next successfully delivered notify.
    pub fn notify(&self, email_id: &str) {
        if let Some(bucket) = self.buckets.get(email_id) {
            for sub in bucket.lock().iter() {
                let _ = sub.sender.try_send(());
            }
        }
    }
}

impl Default for ViewNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn notify_reaches_subscriber() {
        let notifier = ViewNotifier::new();
        let mut sub = notifier.subscribe("42");
        notifier.notify("42");
        assert!(sub.receiver.recv().await.is_some());
    }

    #[tokio::test]
    async fn unsubscribe_stops_delivery() {
        let notifier = ViewNotifier::new();
        let sub = notifier.subscribe("42");
        notifier.unsubscribe("42", sub.id);
        notifier.notify("42");
        assert!(notifier.buckets.is_empty());
    }

    #[tokio::test]
    async fn full_buffer_drops_notification_without_panic() {
        let notifier = ViewNotifier::new();
        let mut sub = notifier.subscribe("1");
        for _ in 0..(SUBSCRIBER_BUFFER + 5) {
            notifier.notify("1");
        }
        let mut count = 0;
        while sub.receiver.try_recv().is_ok() {
            count += 1;
        }
        assert!(count <= SUBSCRIBER_BUFFER);
    }
}
