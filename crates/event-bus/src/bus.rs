//! In-process event bus.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::Utc;
use tokio::sync::mpsc;

use crate::{BusError, BusMessage, Notification, Result, Topic};

/// Default per-subscriber queue capacity.
pub const DEFAULT_CAPACITY: usize = 256;

/// Handle identifying one connected subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "subscriber-{}", self.0)
    }
}

/// Delivery counts for one publish call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub delivered: usize,
    pub dropped: usize,
}

/// Fire-and-forget publishing.
///
/// Implementations must never block and never fail the caller; a publish
/// with no subscribers is a no-op.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, topic: Topic, message: BusMessage) -> PublishReport;
}

/// Receiving end of a connection.
///
/// Dropping it disconnects the subscriber; the bus prunes it on the next
/// publish that reaches it.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriberId,
    receiver: mpsc::Receiver<Arc<Notification>>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Waits for the next notification. Returns `None` once disconnected
    /// and drained.
    pub async fn recv(&mut self) -> Option<Arc<Notification>> {
        self.receiver.recv().await
    }

    /// Returns the next queued notification without waiting.
    pub fn try_recv(&mut self) -> Option<Arc<Notification>> {
        self.receiver.try_recv().ok()
    }

    /// Drains everything currently queued.
    pub fn drain(&mut self) -> Vec<Arc<Notification>> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

#[derive(Default)]
struct Registry {
    senders: HashMap<SubscriberId, mpsc::Sender<Arc<Notification>>>,
    topics: HashMap<Topic, HashSet<SubscriberId>>,
}

impl Registry {
    fn remove(&mut self, id: SubscriberId) {
        self.senders.remove(&id);
        self.topics.retain(|_, subscribers| {
            subscribers.remove(&id);
            !subscribers.is_empty()
        });
    }
}

/// Topic-based fan-out with one bounded FIFO queue per subscriber.
///
/// Publishing uses `try_send`: a full queue drops the message for that
/// subscriber only, and a closed queue gets its subscriber pruned. Since a
/// subscriber has a single queue, everything one caller publishes reaches it
/// in publish order.
#[derive(Clone)]
pub struct EventBus {
    registry: Arc<RwLock<Registry>>,
    next_id: Arc<AtomicU64>,
    capacity: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventBus {
    /// Creates a bus whose subscriber queues hold `capacity` notifications.
    pub fn new(capacity: usize) -> Self {
        Self {
            registry: Arc::default(),
            next_id: Arc::new(AtomicU64::new(1)),
            capacity: capacity.max(1),
        }
    }

    /// Registers a new subscriber with no topics.
    pub fn connect(&self) -> Subscription {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (sender, receiver) = mpsc::channel(self.capacity);

        self.write().senders.insert(id, sender);
        tracing::debug!(subscriber = %id, "subscriber connected");

        Subscription { id, receiver }
    }

    /// Adds `topic` to a connected subscriber.
    pub fn subscribe(&self, topic: Topic, subscriber: SubscriberId) -> Result<()> {
        let mut registry = self.write();
        if !registry.senders.contains_key(&subscriber) {
            return Err(BusError::UnknownSubscriber(subscriber));
        }
        tracing::debug!(%subscriber, %topic, "subscribed");
        registry.topics.entry(topic).or_default().insert(subscriber);
        Ok(())
    }

    /// Removes `topic` from a subscriber. Returns false if it was not subscribed.
    pub fn unsubscribe(&self, topic: &Topic, subscriber: SubscriberId) -> bool {
        let mut registry = self.write();
        let Some(subscribers) = registry.topics.get_mut(topic) else {
            return false;
        };
        let removed = subscribers.remove(&subscriber);
        if subscribers.is_empty() {
            registry.topics.remove(topic);
        }
        removed
    }

    /// Drops a subscriber and all of its topics.
    pub fn disconnect(&self, subscriber: SubscriberId) {
        self.write().remove(subscriber);
        tracing::debug!(%subscriber, "subscriber disconnected");
    }

    pub fn subscriber_count(&self, topic: &Topic) -> usize {
        self.read().topics.get(topic).map_or(0, HashSet::len)
    }

    pub fn connection_count(&self) -> usize {
        self.read().senders.len()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Registry> {
        self.registry.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Registry> {
        self.registry.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl EventPublisher for EventBus {
    fn publish(&self, topic: Topic, message: BusMessage) -> PublishReport {
        let name = message.name();
        let notification = Arc::new(Notification {
            topic: topic.clone(),
            message,
            published_at: Utc::now(),
        });

        let mut report = PublishReport::default();
        let mut closed = Vec::new();
        {
            let registry = self.read();
            let Some(subscribers) = registry.topics.get(&topic) else {
                return report;
            };

            for id in subscribers {
                let Some(sender) = registry.senders.get(id) else {
                    continue;
                };
                match sender.try_send(Arc::clone(&notification)) {
                    Ok(()) => report.delivered += 1,
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        report.dropped += 1;
                        metrics::counter!("event_bus_dropped_total", "reason" => "full")
                            .increment(1);
                        tracing::warn!(subscriber = %id, %topic, event = name, "subscriber queue full, event dropped");
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        report.dropped += 1;
                        metrics::counter!("event_bus_dropped_total", "reason" => "closed")
                            .increment(1);
                        closed.push(*id);
                    }
                }
            }
        }

        if !closed.is_empty() {
            let mut registry = self.write();
            for id in closed {
                tracing::debug!(subscriber = %id, "pruning closed subscriber");
                registry.remove(id);
            }
        }

        metrics::counter!("event_bus_published_total", "family" => topic.family()).increment(1);
        report
    }
}

impl<T: EventPublisher + ?Sized> EventPublisher for Arc<T> {
    fn publish(&self, topic: Topic, message: BusMessage) -> PublishReport {
        (**self).publish(topic, message)
    }
}
