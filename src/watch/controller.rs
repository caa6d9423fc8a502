//! Change-gated subscription controller.

use crate::observable::{Disposer, Observable};
use crate::types::Snapshot;
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, ThreadId};
use tracing::{debug, trace};

use super::scope::{has_changed, WatchScope};

static NEXT_SUBSCRIPTION_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of a subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControllerState {
    /// Only held while `observe` builds the controller; a [`Subscription`]
    /// handle never reports it.
    Uninitialized,
    Active,
    Disposed,
}

type Callback = Box<dyn Fn(&Snapshot) + Send + Sync>;

struct Inner {
    state: ControllerState,
    /// Most recently observed snapshot, whether or not it fired the callback.
    watermark: Option<Snapshot>,
    /// One entry per callback currently running, by calling thread.
    delivering: Vec<ThreadId>,
}

/// Internal controller shared between the handle and the store listener.
struct Controller {
    id: SubscriptionId,
    scope: WatchScope,
    callback: Callback,
    inner: Mutex<Inner>,
    /// Signalled whenever a callback returns.
    delivered: Condvar,
}

/// Marks one callback as running on this thread until dropped.
struct Delivery<'a> {
    controller: &'a Controller,
    thread: ThreadId,
}

impl Drop for Delivery<'_> {
    fn drop(&mut self) {
        let mut inner = self.controller.inner.lock();
        if let Some(pos) = inner.delivering.iter().position(|t| *t == self.thread) {
            inner.delivering.swap_remove(pos);
        }
        self.controller.delivered.notify_all();
    }
}

impl Controller {
    /// Evaluate one notification.
    ///
    /// No lock is held while the callback runs, so it may dispatch to the
    /// same store; the nested notification sees the updated watermark.
    fn handle_change<S: Observable + ?Sized>(&self, store: &S) {
        let current = store.get_state();
        let thread = thread::current().id();

        let fire = {
            let mut inner = self.inner.lock();
            if inner.state != ControllerState::Active {
                trace!(subscription = %self.id, state = ?inner.state, "ignoring notification");
                return;
            }
            let fire = match inner.watermark.as_ref() {
                None => true,
                Some(previous) => has_changed(previous, &current, &self.scope),
            };
            inner.watermark = Some(current.clone());
            if fire {
                inner.delivering.push(thread);
            }
            fire
        };

        trace!(subscription = %self.id, changed = fire, "notification evaluated");
        if fire {
            let _delivery = Delivery {
                controller: self,
                thread,
            };
            (self.callback)(&current);
        }
    }
}

/// Subscribe to `store`, calling `callback` whenever the watched part of the
/// state changes.
///
/// The callback runs once immediately with the current state, then after
/// every notification whose snapshot differs from the previously observed
/// one under `scope`. Each comparison is against the snapshot seen at the
/// previous notification (the watermark), not against the last snapshot
/// that fired the callback.
///
/// The store listener holds only a weak reference to the store.
///
/// # Example
///
/// ```ignore
/// let subscription = observe(&store, |state| render(state), "tree1");
/// // ...
/// subscription.unsubscribe();
/// ```
pub fn observe<S, F>(store: &Arc<S>, callback: F, scope: impl Into<WatchScope>) -> Subscription
where
    S: Observable + 'static,
    F: Fn(&Snapshot) + Send + Sync + 'static,
{
    let controller = Arc::new(Controller {
        id: SubscriptionId(NEXT_SUBSCRIPTION_ID.fetch_add(1, Ordering::SeqCst)),
        scope: scope.into(),
        callback: Box::new(callback),
        inner: Mutex::new(Inner {
            state: ControllerState::Uninitialized,
            watermark: None,
            delivering: Vec::new(),
        }),
        delivered: Condvar::new(),
    });

    controller.inner.lock().state = ControllerState::Active;
    debug!(subscription = %controller.id, scope = ?controller.scope, "subscription started");

    let weak_store: Weak<S> = Arc::downgrade(store);
    let listener_controller = Arc::clone(&controller);
    let disposer = store.subscribe(Arc::new(move || {
        if let Some(store) = weak_store.upgrade() {
            listener_controller.handle_change(&*store);
        }
    }));

    controller.handle_change(&**store);

    Subscription {
        controller,
        disposer,
    }
}

/// Handle to a running subscription. Acts as its disposer.
///
/// Dropping the handle does not unsubscribe.
pub struct Subscription {
    controller: Arc<Controller>,
    disposer: Disposer,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.controller.id
    }

    pub fn scope(&self) -> &WatchScope {
        &self.controller.scope
    }

    pub fn state(&self) -> ControllerState {
        self.controller.inner.lock().state
    }

    pub fn is_active(&self) -> bool {
        self.state() == ControllerState::Active
    }

    /// The watermark: the snapshot seen at the latest notification.
    pub fn last_snapshot(&self) -> Option<Snapshot> {
        self.controller.inner.lock().watermark.clone()
    }

    /// Stop receiving callbacks and remove the listener from the store.
    ///
    /// Safe to call more than once, including from inside the callback. Waits
    /// for callbacks already running on other threads to return; no callback
    /// starts after this returns.
    pub fn unsubscribe(&self) {
        {
            let mut inner = self.controller.inner.lock();
            if inner.state == ControllerState::Disposed {
                return;
            }
            inner.state = ControllerState::Disposed;

            let me = thread::current().id();
            while inner.delivering.iter().any(|t| *t != me) {
                self.controller.delivered.wait(&mut inner);
            }
        }
        self.disposer.dispose();
        debug!(subscription = %self.controller.id, "subscription disposed");
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.controller.id)
            .field("scope", &self.controller.scope)
            .field("state", &self.state())
            .finish()
    }
}
