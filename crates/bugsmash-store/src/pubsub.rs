//! Observer registry shared by every collection store.
//!
//! Replaces the ad hoc "array of callbacks" pattern with an explicit
//! publisher: observers are registered under an id, the registry is
//! snapshotted before a broadcast iterates it, and a [`Subscription`] guard
//! removes the observer on cancel or drop.  Observers may therefore
//! subscribe or unsubscribe from inside a notification without corrupting
//! an in-progress broadcast.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;

use crate::live::SubscriptionHealth;

/// A snapshot callback.  Invoked with the full current collection.
pub type Observer<T> = Arc<dyn Fn(&[T]) + Send + Sync>;

struct Registry<T> {
    next_id: u64,
    observers: Vec<(u64, Observer<T>)>,
}

/// Broadcast point for one collection's snapshots.
pub struct Publisher<T> {
    registry: Arc<Mutex<Registry<T>>>,
}

impl<T> Clone for Publisher<T> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<T: 'static> Default for Publisher<T> {
    fn default() -> Self {
        Self::new()
    }
}

// `'static` because the registry handle is moved into the subscription's
// cancel closure, which can outlive the publisher.
impl<T: 'static> Publisher<T> {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry {
                next_id: 0,
                observers: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Registry<T>> {
        // A poisoned lock only means another thread panicked between lock
        // and unlock; the registry itself is still consistent.
        self.registry.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Register an observer.  The caller is responsible for the immediate
    /// first delivery; the publisher only handles change broadcasts.
    pub fn subscribe(&self, observer: Observer<T>) -> Subscription {
        let id = {
            let mut registry = self.lock();
            let id = registry.next_id;
            registry.next_id += 1;
            registry.observers.push((id, observer));
            id
        };

        let registry = Arc::clone(&self.registry);
        Subscription::new(move || {
            let mut registry = registry.lock().unwrap_or_else(|p| p.into_inner());
            registry.observers.retain(|(entry_id, _)| *entry_id != id);
        })
    }

    /// Notify every currently registered observer with `snapshot`.
    ///
    /// The registry is cloned out of the lock first, so observers are free
    /// to subscribe or cancel while the broadcast runs.
    pub fn broadcast(&self, snapshot: &[T]) {
        let observers: Vec<Observer<T>> = self
            .lock()
            .observers
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();

        for observer in observers {
            observer(snapshot);
        }
    }

    pub fn observer_count(&self) -> usize {
        self.lock().observers.len()
    }
}

/// Handle returned by every `subscribe` call.
///
/// Cancelling (or dropping) the subscription removes the observer, which
/// stops notifications immediately.  Live-store subscriptions additionally
/// expose the health of the underlying push channel.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
    health: Option<watch::Receiver<SubscriptionHealth>>,
}

impl Subscription {
    pub(crate) fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
            health: None,
        }
    }

    pub(crate) fn with_health(mut self, health: watch::Receiver<SubscriptionHealth>) -> Self {
        self.health = Some(health);
        self
    }

    /// Health of the underlying push channel, for live subscriptions.
    /// `None` for in-memory subscriptions, which cannot lose their source.
    pub fn health(&self) -> Option<watch::Receiver<SubscriptionHealth>> {
        self.health.clone()
    }

    /// Stop receiving notifications.  Equivalent to dropping the handle.
    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}
