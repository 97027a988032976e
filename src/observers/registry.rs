//! Registry of connected observers.
//!
//! # Design Decisions
//! - Sharded concurrent map; no global lock on the request path
//! - Broadcast iterates a snapshot, so membership may change mid-broadcast
//! - Removal is idempotent; [`Subscription`] removes itself on drop

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;

use crate::observability::metrics;

/// Relaxed ordering is enough: IDs only need to be unique.
static OBSERVER_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Serialized event frame shared by every observer queue.
pub type Frame = Arc<str>;

/// Unique identifier for an observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

impl ObserverId {
    pub fn new() -> Self {
        Self(OBSERVER_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ObserverId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ObserverId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "observer-{}", self.0)
    }
}

/// Currently connected observers, keyed by ID.
#[derive(Debug)]
pub struct ObserverRegistry {
    observers: DashMap<ObserverId, mpsc::Sender<Frame>>,
    queue_capacity: usize,
}

impl ObserverRegistry {
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            observers: DashMap::new(),
            queue_capacity: queue_capacity.max(1),
        }
    }

    /// Register an existing channel.
    pub fn add(&self, tx: mpsc::Sender<Frame>) -> ObserverId {
        let id = ObserverId::new();
        self.observers.insert(id, tx);
        metrics::set_observers(self.observers.len());
        tracing::info!(observer = %id, connected = self.observers.len(), "Observer connected");
        id
    }

    /// Remove an observer. Returns false if it was already gone.
    pub fn remove(&self, id: ObserverId) -> bool {
        let removed = self.observers.remove(&id).is_some();
        if removed {
            metrics::set_observers(self.observers.len());
            tracing::info!(observer = %id, connected = self.observers.len(), "Observer disconnected");
        }
        removed
    }

    /// Create a bounded queue, register it, and hand back the receiving end.
    pub fn subscribe(self: &Arc<Self>) -> Subscription {
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        let id = self.add(tx);
        Subscription {
            id,
            rx,
            registry: Arc::clone(self),
        }
    }

    /// Drop every sender. Each [`Subscription`] then sees its queue close
    /// once in-flight frames drain. Returns how many observers were removed.
    pub fn close_all(&self) -> usize {
        let closed = self.observers.len();
        self.observers.clear();
        metrics::set_observers(0);
        if closed > 0 {
            tracing::info!(observers = closed, "Closing all observers");
        }
        closed
    }

    /// Point-in-time copy of the membership.
    pub fn snapshot(&self) -> Vec<(ObserverId, mpsc::Sender<Frame>)> {
        self.observers
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

/// An observer's receiving end. Leaves the registry when dropped.
#[derive(Debug)]
pub struct Subscription {
    id: ObserverId,
    rx: mpsc::Receiver<Frame>,
    registry: Arc<ObserverRegistry>,
}

impl Subscription {
    pub fn id(&self) -> ObserverId {
        self.id
    }

    /// Next event frame, or `None` once every sender has been dropped.
    pub async fn recv(&mut self) -> Option<Frame> {
        self.rx.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.registry.remove(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observer_ids_unique() {
        assert_ne!(ObserverId::new(), ObserverId::new());
    }

    #[test]
    fn add_and_remove() {
        let registry = ObserverRegistry::new(4);
        let (tx, _rx) = mpsc::channel(4);

        let id = registry.add(tx);
        assert_eq!(registry.len(), 1);

        assert!(registry.remove(id));
        assert!(registry.is_empty());
    }

    #[test]
    fn removal_is_idempotent() {
        let registry = ObserverRegistry::new(4);
        let (tx, _rx) = mpsc::channel(4);
        let id = registry.add(tx);

        assert!(registry.remove(id));
        assert!(!registry.remove(id));
        assert!(registry.is_empty());
    }

    #[test]
    fn same_channel_twice_is_two_observers() {
        let registry = ObserverRegistry::new(4);
        let (tx, _rx) = mpsc::channel(4);
        registry.add(tx.clone());
        registry.add(tx);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn subscription_leaves_on_drop() {
        let registry = Arc::new(ObserverRegistry::new(4));
        let sub = registry.subscribe();
        let id = sub.id();
        assert_eq!(registry.len(), 1);

        drop(sub);
        assert!(registry.is_empty());
        assert!(!registry.remove(id));
    }

    #[test]
    fn snapshot_survives_concurrent_removal() {
        let registry = Arc::new(ObserverRegistry::new(4));
        let first = registry.subscribe();
        let _second = registry.subscribe();

        let snapshot = registry.snapshot();
        drop(first);

        assert_eq!(snapshot.len(), 2);
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn close_all_ends_subscriptions() {
        let registry = Arc::new(ObserverRegistry::new(4));
        let mut sub = registry.subscribe();
        let _other = registry.subscribe();

        assert_eq!(registry.close_all(), 2);
        assert!(registry.is_empty());
        assert!(sub.recv().await.is_none());
        assert!(!registry.remove(sub.id()));
    }
}
