//! The contract between subscriptions and the store they watch.

use crate::types::Snapshot;
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Zero-argument change listener. Called after every state mutation.
pub type Listener = Arc<dyn Fn() + Send + Sync>;

/// An observable state store.
///
/// Implementations must call every registered listener synchronously after
/// each state mutation, and `get_state` must be free of side effects.
pub trait Observable: Send + Sync {
    /// The current state.
    fn get_state(&self) -> Snapshot;

    /// Register a listener. The returned disposer removes it.
    fn subscribe(&self, listener: Listener) -> Disposer;
}

/// Removes a listener from the store that issued it.
///
/// Dropping a disposer without calling [`Disposer::dispose`] leaves the
/// listener registered.
pub struct Disposer {
    remove: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl Disposer {
    pub fn new<F>(remove: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            remove: Mutex::new(Some(Box::new(remove))),
        }
    }

    /// Disposer for stores that never unregister listeners.
    pub fn noop() -> Self {
        Self {
            remove: Mutex::new(None),
        }
    }

    /// Run the removal. Later calls do nothing.
    pub fn dispose(&self) {
        let remove = self.remove.lock().take();
        if let Some(remove) = remove {
            remove();
        }
    }

    /// True once `dispose` has run (or for a no-op disposer).
    pub fn is_disposed(&self) -> bool {
        self.remove.lock().is_none()
    }
}

impl fmt::Debug for Disposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Disposer")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Identifier of a registered listener.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(pub u64);

/// Listener bookkeeping for store implementations.
///
/// Listeners are notified in registration order.
pub struct ListenerRegistry {
    listeners: RwLock<BTreeMap<ListenerId, Listener>>,
    next_id: AtomicU64,
}

impl ListenerRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            listeners: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
        })
    }

    /// Register a listener and return its disposer.
    ///
    /// The disposer only holds a weak reference, so it never keeps the
    /// registry alive.
    pub fn register(self: &Arc<Self>, listener: Listener) -> Disposer {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.listeners.write().insert(id, listener);

        let registry: Weak<Self> = Arc::downgrade(self);
        Disposer::new(move || {
            if let Some(registry) = registry.upgrade() {
                registry.remove(id);
            }
        })
    }

    /// Remove a listener. Returns false if it was not registered.
    pub fn remove(&self, id: ListenerId) -> bool {
        self.listeners.write().remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.read().is_empty()
    }

    /// Call every listener registered when the round starts.
    ///
    /// The list is copied first, so listeners may subscribe or unsubscribe
    /// while being notified. A listener removed mid-round may still be
    /// called once in that round.
    pub fn notify_all(&self) {
        let listeners: Vec<Listener> = self.listeners.read().values().cloned().collect();
        for listener in listeners {
            listener();
        }
    }
}
