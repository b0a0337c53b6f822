// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Synchronous change notification.
//
// Every effective `set` / `remove` on a store publishes one `ChangeEvent`.
// Delivery happens inline on the thread that made the change: there is no
// queue and no background task. Listeners are called with no bus or store
// lock held, so they may read or write the store, or (un)subscribe, from
// inside the callback.
//
// No threading guarantee is given to listeners. A listener that touches
// shared state must synchronise on its own.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

/// Notification that a store's contents changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Name of the store that changed.
    pub store_name: String,
}

impl ChangeEvent {
    /// Create an event for `store_name`.
    pub fn new(store_name: impl Into<String>) -> Self {
        Self {
            store_name: store_name.into(),
        }
    }
}

/// Handle returned by [`NotificationBus::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Listener = Arc<dyn Fn(&ChangeEvent) + Send + Sync>;

struct Subscriber {
    id: SubscriptionId,
    /// `None` receives events for every store.
    store_name: Option<String>,
    listener: Listener,
}

/// Fan-out of [`ChangeEvent`]s to registered listeners.
pub struct NotificationBus {
    subscribers: RwLock<Vec<Subscriber>>,
    next_id: AtomicU64,
}

impl NotificationBus {
    /// Create a bus with no listeners.
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a listener for changes to any store.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        self.add(None, Arc::new(listener))
    }

    /// Register a listener that only sees changes to `store_name`.
    pub fn subscribe_to<F>(&self, store_name: impl Into<String>, listener: F) -> SubscriptionId
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        self.add(Some(store_name.into()), Arc::new(listener))
    }

    /// Remove a listener. Returns `false` if `id` was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = subscribers.len();
        subscribers.retain(|s| s.id != id);
        subscribers.len() != before
    }

    /// Deliver `event` to every matching listener, in subscription order,
    /// on the calling thread.
    ///
    /// The listener list is snapshotted first, so a listener added or
    /// removed during delivery takes effect from the next event.
    pub fn publish(&self, event: &ChangeEvent) {
        let targets: Vec<Listener> = {
            let subscribers = self
                .subscribers
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            subscribers
                .iter()
                .filter(|s| {
                    s.store_name
                        .as_deref()
                        .map_or(true, |name| name == event.store_name)
                })
                .map(|s| Arc::clone(&s.listener))
                .collect()
        };

        debug!(store = %event.store_name, listeners = targets.len(), "Publishing change event");

        for listener in targets {
            listener(event);
        }
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn add(&self, store_name: Option<String>, listener: Listener) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Subscriber {
                id,
                store_name,
                listener,
            });
        id
    }
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for NotificationBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationBus")
            .field("listeners", &self.listener_count())
            .finish()
    }
}
