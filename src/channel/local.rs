// In-process channel transport: fans published row changes out to subscribers

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::traits::ChannelTransport;
use super::types::*;

#[derive(Debug)]
struct Subscriber {
    collection: String,
    filter: SubscriptionFilter,
    sender: mpsc::UnboundedSender<ChannelMessage>,
}

#[derive(Debug, Default)]
pub struct LocalChannel {
    subscribers: Mutex<HashMap<SubscriptionId, Subscriber>>,
    failing_subscribes: AtomicUsize,
}

impl LocalChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver an event to every live subscriber of `collection` whose filter matches.
    /// Returns how many subscribers received it.
    pub fn publish(&self, collection: &str, event: RawEvent) -> usize {
        let mut subscribers = self.lock();
        let mut delivered = 0;
        subscribers.retain(|id, subscriber| {
            if subscriber.collection != collection || !subscriber.filter.matches(&event) {
                return true;
            }
            match subscriber.sender.send(ChannelMessage::Event(event.clone())) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(_) => {
                    debug!(subscription = %id, "Dropping subscriber with closed receiver");
                    false
                }
            }
        });
        delivered
    }

    /// Simulate a transport disconnect: every subscriber gets `Closed` and is removed
    pub fn drop_all(&self, reason: &str) {
        let mut subscribers = self.lock();
        info!(count = subscribers.len(), reason, "Dropping all channel subscriptions");
        for (_, subscriber) in subscribers.drain() {
            let _ = subscriber.sender.send(ChannelMessage::Closed {
                reason: reason.to_string(),
            });
        }
    }

    /// Make the next `count` subscribe calls fail
    pub fn fail_next_subscribes(&self, count: usize) {
        self.failing_subscribes.store(count, Ordering::SeqCst);
    }

    pub fn subscriber_count(&self, collection: &str) -> usize {
        self.lock()
            .values()
            .filter(|subscriber| subscriber.collection == collection)
            .count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<SubscriptionId, Subscriber>> {
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ChannelTransport for LocalChannel {
    async fn subscribe(
        &self,
        collection: &str,
        filter: SubscriptionFilter,
    ) -> Result<Subscription, ChannelError> {
        let should_fail = self
            .failing_subscribes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |remaining| {
                remaining.checked_sub(1)
            })
            .is_ok();
        if should_fail {
            return Err(ChannelError::SubscribeFailed {
                collection: collection.to_string(),
                reason: "transport unavailable".to_string(),
            });
        }

        let (sender, events) = mpsc::unbounded_channel();
        let id = SubscriptionId::generate();
        self.lock().insert(
            id.clone(),
            Subscriber {
                collection: collection.to_string(),
                filter,
                sender,
            },
        );
        debug!(subscription = %id, collection, "Channel subscription opened");

        Ok(Subscription {
            id,
            collection: collection.to_string(),
            events,
        })
    }

    async fn unsubscribe(&self, id: &SubscriptionId) {
        if self.lock().remove(id).is_some() {
            debug!(subscription = %id, "Channel subscription closed");
        }
    }
}
