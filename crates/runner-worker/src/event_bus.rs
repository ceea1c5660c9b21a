// Per-run pub/sub event bus.
//
// A slow subscriber must never delay the orchestrator: each subscription
// gets a bounded channel and publish uses `try_send`, dropping the event
// (and logging it) on overflow rather than waiting.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use runner_core::Event;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

const SUBSCRIBER_BUFFER: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    run_id: Uuid,
    id: u64,
}

#[derive(Default)]
struct Topic {
    subscribers: HashMap<u64, mpsc::Sender<Event>>,
}

#[derive(Clone)]
pub struct EventBus {
    inner: Arc<EventBusInner>,
}

struct EventBusInner {
    topics: RwLock<HashMap<Uuid, Topic>>,
    next_id: AtomicU64,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(EventBusInner {
                topics: RwLock::new(HashMap::new()),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    pub async fn subscribe(&self, run_id: Uuid) -> (SubscriptionHandle, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);

        self.inner
            .topics
            .write()
            .await
            .entry(run_id)
            .or_default()
            .subscribers
            .insert(id, tx);

        (SubscriptionHandle { run_id, id }, rx)
    }

    pub async fn unsubscribe(&self, handle: SubscriptionHandle) {
        let mut topics = self.inner.topics.write().await;
        if let Some(topic) = topics.get_mut(&handle.run_id) {
            topic.subscribers.remove(&handle.id);
            if topic.subscribers.is_empty() {
                topics.remove(&handle.run_id);
            }
        }
    }

    pub async fn publish(&self, run_id: Uuid, event: Event) {
        let topics = self.inner.topics.read().await;
        let Some(topic) = topics.get(&run_id) else {
            return;
        };

        for (id, sender) in &topic.subscribers {
            if let Err(err) = sender.try_send(event.clone()) {
                tracing::warn!(
                    run_id = %run_id,
                    subscriber = id,
                    error = %err,
                    "dropped event for slow or closed subscriber"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn publish_reaches_subscribed_topic_only() {
        let bus = EventBus::new();
        let run_a = Uuid::now_v7();
        let run_b = Uuid::now_v7();

        let (_handle, mut rx) = bus.subscribe(run_a).await;
        bus.publish(run_b, Event::run_state(json!({"noise": true})))
            .await;
        bus.publish(run_a, Event::run_state(json!({"run": "a"})))
            .await;

        let received = rx.recv().await.unwrap();
        assert_eq!(received.data, json!({"run": "a"}));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn unsubscribe_stops_delivery() {
        let bus = EventBus::new();
        let run_id = Uuid::now_v7();
        let (handle, mut rx) = bus.subscribe(run_id).await;

        bus.unsubscribe(handle).await;
        bus.publish(run_id, Event::run_state(json!({}))).await;

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn overflow_drops_instead_of_blocking() {
        let bus = EventBus::new();
        let run_id = Uuid::now_v7();
        let (_handle, _rx) = bus.subscribe(run_id).await;

        for _ in 0..(SUBSCRIBER_BUFFER + 10) {
            bus.publish(run_id, Event::run_state(json!({}))).await;
        }
        // No receiver draining: publish must return rather than block.
    }
}
