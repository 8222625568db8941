//! Notification dispatcher.
//!
//! Routes notifications by [`MessageName`] to registered handlers. Each
//! registration owns an unbounded queue; the receive loop only pushes onto
//! those queues, so a slow handler delays its own queue and nobody else's.
//! Within one registration, notifications arrive in receipt order.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use dipwire_protocol::{MessageName, Notification};
use tokio::sync::mpsc;

/// Identifies one registration, for [`Dispatcher::unregister`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

struct Subscriber {
    id: HandlerId,
    tx: mpsc::UnboundedSender<Notification>,
}

/// Handler registry for one connection.
#[derive(Default)]
pub struct Dispatcher {
    subscribers: Mutex<HashMap<MessageName, Vec<Subscriber>>>,
    next_id: AtomicU64,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an async handler for one notification name.
    ///
    /// The handler runs on its own task and sees notifications one at a
    /// time. It stops after [`unregister`](Self::unregister) or when the
    /// connection closes, once its queue is drained.
    pub fn register<F, Fut>(&self, name: MessageName, handler: F) -> HandlerId
    where
        F: Fn(Notification) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (id, mut rx) = self.subscribe(name);
        tokio::spawn(async move {
            while let Some(notification) = rx.recv().await {
                handler(notification).await;
            }
            tracing::debug!(?id, %name, "notification handler stopped");
        });
        id
    }

    /// Registers a queue for one notification name and returns its receiver.
    pub fn subscribe(
        &self,
        name: MessageName,
    ) -> (HandlerId, mpsc::UnboundedReceiver<Notification>) {
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().entry(name).or_default().push(Subscriber { id, tx });
        tracing::debug!(?id, %name, "notification handler registered");
        (id, rx)
    }

    /// Removes a registration. Returns `true` if it existed.
    pub fn unregister(&self, id: HandlerId) -> bool {
        let mut subscribers = self.lock();
        let mut found = false;
        for list in subscribers.values_mut() {
            list.retain(|s| {
                let keep = s.id != id;
                found |= !keep;
                keep
            });
        }
        subscribers.retain(|_, list| !list.is_empty());
        found
    }

    /// Queues `notification` for every handler of its name.
    ///
    /// Returns how many handlers it was queued for. Never waits.
    pub fn dispatch(&self, notification: &Notification) -> usize {
        let name = notification.name();
        let mut subscribers = self.lock();
        let Some(list) = subscribers.get_mut(&name) else {
            return 0;
        };
        // Receivers that were dropped are pruned here.
        list.retain(|s| s.tx.send(notification.clone()).is_ok());
        list.len()
    }

    /// Number of registrations for `name`.
    pub fn handler_count(&self, name: MessageName) -> usize {
        self.lock().get(&name).map_or(0, Vec::len)
    }

    /// Drops every registration, ending all handler queues.
    pub fn close(&self) {
        self.lock().clear();
    }

    fn lock(
        &self,
    ) -> std::sync::MutexGuard<'_, HashMap<MessageName, Vec<Subscriber>>> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use dipwire_protocol::GameId;

    use super::*;

    fn deleted(id: &str) -> Notification {
        Notification::GameDeleted {
            game_id: GameId::new(id),
        }
    }

    #[tokio::test]
    async fn test_dispatch_routes_by_name() {
        let dispatcher = Dispatcher::new();
        let (_, mut deleted_rx) = dispatcher.subscribe(MessageName::GameDeleted);
        let (_, mut processed_rx) =
            dispatcher.subscribe(MessageName::GameProcessed);

        assert_eq!(dispatcher.dispatch(&deleted("g1")), 1);

        assert_eq!(deleted_rx.recv().await, Some(deleted("g1")));
        assert!(processed_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_dispatch_without_handlers_returns_zero() {
        let dispatcher = Dispatcher::new();
        assert_eq!(dispatcher.dispatch(&deleted("g1")), 0);
    }

    #[tokio::test]
    async fn test_dispatch_preserves_order_per_handler() {
        let dispatcher = Dispatcher::new();
        let (_, mut rx) = dispatcher.subscribe(MessageName::GameDeleted);
        for i in 0..5 {
            dispatcher.dispatch(&deleted(&format!("g{i}")));
        }
        for i in 0..5 {
            assert_eq!(rx.recv().await, Some(deleted(&format!("g{i}"))));
        }
    }

    #[tokio::test]
    async fn test_slow_handler_does_not_block_other_handlers() {
        let dispatcher = Dispatcher::new();
        let gate = Arc::new(tokio::sync::Notify::new());

        // A handler stuck until the gate opens.
        let stuck_gate = Arc::clone(&gate);
        dispatcher.register(MessageName::GameDeleted, move |_| {
            let gate = Arc::clone(&stuck_gate);
            async move { gate.notified().await }
        });
        let (_, mut fast_rx) = dispatcher.subscribe(MessageName::GameDeleted);

        dispatcher.dispatch(&deleted("g1"));
        dispatcher.dispatch(&deleted("g2"));

        let got = tokio::time::timeout(Duration::from_secs(1), async {
            (fast_rx.recv().await, fast_rx.recv().await)
        })
        .await
        .expect("fast handler must not wait on the slow one");
        assert_eq!(got, (Some(deleted("g1")), Some(deleted("g2"))));
        gate.notify_waiters();
    }

    #[tokio::test]
    async fn test_register_runs_handler() {
        let dispatcher = Dispatcher::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        dispatcher.register(MessageName::GameDeleted, move |n| {
            let tx = tx.clone();
            async move {
                let _ = tx.send(n);
            }
        });

        dispatcher.dispatch(&deleted("g7"));
        let got = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap();
        assert_eq!(got, Some(deleted("g7")));
    }

    #[tokio::test]
    async fn test_unregister_stops_delivery() {
        let dispatcher = Dispatcher::new();
        let (id, mut rx) = dispatcher.subscribe(MessageName::GameDeleted);

        assert!(dispatcher.unregister(id));
        assert!(!dispatcher.unregister(id));
        assert_eq!(dispatcher.handler_count(MessageName::GameDeleted), 0);
        assert_eq!(dispatcher.dispatch(&deleted("g1")), 0);
        // Sender side is gone, so the queue ends.
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_dropped_receiver_is_pruned() {
        let dispatcher = Dispatcher::new();
        let (_, rx) = dispatcher.subscribe(MessageName::GameDeleted);
        drop(rx);
        assert_eq!(dispatcher.dispatch(&deleted("g1")), 0);
        assert_eq!(dispatcher.handler_count(MessageName::GameDeleted), 0);
    }

    #[tokio::test]
    async fn test_close_ends_all_queues() {
        let dispatcher = Dispatcher::new();
        let (_, mut rx) = dispatcher.subscribe(MessageName::GameProcessed);
        dispatcher.close();
        assert_eq!(rx.recv().await, None);
    }
}
