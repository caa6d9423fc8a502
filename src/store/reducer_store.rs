//! Observable store driven by per-tree reducers.

use crate::error::{Result, WatchError};
use crate::observable::{Disposer, Listener, ListenerRegistry, Observable};
use crate::types::{Action, Snapshot};
use parking_lot::{ReentrantMutex, RwLock};
use std::cell::Cell;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, trace};

use super::reducer::{combine, Reducer};

/// Reducer store configuration.
#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// Max nested dispatches (a listener dispatching while being notified).
    /// Default: 64
    pub max_dispatch_depth: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_dispatch_depth: 64,
        }
    }
}

/// Per-store dispatch bookkeeping, only touched by the thread holding the
/// dispatch lock.
#[derive(Default)]
struct DispatchState {
    reducing: Cell<bool>,
    depth: Cell<usize>,
}

/// Restores the depth counter even if a listener panics.
struct DepthGuard<'a> {
    depth: &'a Cell<usize>,
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.depth.set(self.depth.get() - 1);
    }
}

/// Clears the reducing flag even if a reducer panics.
struct ReducingGuard<'a> {
    reducing: &'a Cell<bool>,
}

impl<'a> ReducingGuard<'a> {
    fn enter(reducing: &'a Cell<bool>) -> Self {
        reducing.set(true);
        Self { reducing }
    }
}

impl Drop for ReducingGuard<'_> {
    fn drop(&mut self) {
        self.reducing.set(false);
    }
}

/// A store whose state is one tree per registered reducer.
///
/// Every dispatch runs all reducers, then notifies every listener, whether or
/// not anything changed. When nothing changed the new state is the same
/// snapshot as before.
///
/// Dispatches are serialized across threads. A listener may dispatch again
/// on the same thread (up to [`StoreConfig::max_dispatch_depth`]); a reducer
/// may not.
pub struct ReducerStore {
    config: StoreConfig,
    reducers: RwLock<BTreeMap<String, Reducer>>,
    state: RwLock<Snapshot>,
    listeners: Arc<ListenerRegistry>,
    dispatch_lock: ReentrantMutex<DispatchState>,
}

impl ReducerStore {
    /// Create a store with default configuration.
    pub fn new<I, K>(reducers: I) -> Arc<Self>
    where
        I: IntoIterator<Item = (K, Reducer)>,
        K: Into<String>,
    {
        Self::with_config(reducers, StoreConfig::default())
    }

    /// Create a store. The initial state comes from an INIT dispatch.
    pub fn with_config<I, K>(reducers: I, config: StoreConfig) -> Arc<Self>
    where
        I: IntoIterator<Item = (K, Reducer)>,
        K: Into<String>,
    {
        let reducers: BTreeMap<String, Reducer> =
            reducers.into_iter().map(|(k, r)| (k.into(), r)).collect();
        let state = combine(&reducers, &Snapshot::new(), &Action::new(Action::INIT));

        Arc::new(Self {
            config,
            reducers: RwLock::new(reducers),
            state: RwLock::new(state),
            listeners: ListenerRegistry::new(),
            dispatch_lock: ReentrantMutex::new(DispatchState::default()),
        })
    }

    /// Reduce `action` into the state, then notify every listener.
    pub fn dispatch(&self, action: Action) -> Result<()> {
        let guard = self.dispatch_lock.lock();

        if guard.reducing.get() {
            return Err(WatchError::DispatchInReducer(action.kind));
        }
        let depth = guard.depth.get() + 1;
        if depth > self.config.max_dispatch_depth {
            return Err(WatchError::DispatchDepthExceeded {
                depth,
                limit: self.config.max_dispatch_depth,
            });
        }
        guard.depth.set(depth);
        let _depth = DepthGuard { depth: &guard.depth };

        trace!(action = %action.kind, depth, "dispatch");

        let next = {
            let _reducing = ReducingGuard::enter(&guard.reducing);
            let reducers = self.reducers.read();
            let current = self.state.read().clone();
            combine(&reducers, &current, &action)
        };
        *self.state.write() = next;

        self.listeners.notify_all();
        Ok(())
    }

    /// Add a reducer for a new top-level tree.
    ///
    /// Dispatches a REPLACE action, so subscribers see the new key.
    pub fn inject_reducer(&self, name: impl Into<String>, reducer: Reducer) -> Result<()> {
        let name = name.into();
        {
            let guard = self.dispatch_lock.lock();
            if guard.reducing.get() {
                return Err(WatchError::DispatchInReducer(Action::REPLACE.to_string()));
            }
            let mut reducers = self.reducers.write();
            if reducers.contains_key(&name) {
                return Err(WatchError::ReducerExists(name));
            }
            reducers.insert(name.clone(), reducer);
        }
        debug!(reducer = %name, "reducer injected");
        self.dispatch(Action::new(Action::REPLACE))
    }

    /// Swap the whole reducer set, then dispatch REPLACE.
    pub fn replace_reducers<I, K>(&self, reducers: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, Reducer)>,
        K: Into<String>,
    {
        let reducers: BTreeMap<String, Reducer> =
            reducers.into_iter().map(|(k, r)| (k.into(), r)).collect();
        {
            let guard = self.dispatch_lock.lock();
            if guard.reducing.get() {
                return Err(WatchError::DispatchInReducer(Action::REPLACE.to_string()));
            }
            debug!(count = reducers.len(), "reducers replaced");
            *self.reducers.write() = reducers;
        }
        self.dispatch(Action::new(Action::REPLACE))
    }

    pub fn reducer_names(&self) -> Vec<String> {
        self.reducers.read().keys().cloned().collect()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }
}

impl Observable for ReducerStore {
    fn get_state(&self) -> Snapshot {
        self.state.read().clone()
    }

    fn subscribe(&self, listener: Listener) -> Disposer {
        self.listeners.register(listener)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::reducer::reducer;
    use crate::types::Slot;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn tree_reducer(default: &'static str, changed: &'static str, on: &'static str) -> Reducer {
        reducer(move |previous, action| match previous {
            None => Slot::new(json!({"person": {"name": default}})),
            Some(_) if action.kind == on => Slot::new(json!({"person": {"name": changed}})),
            Some(slot) => slot.clone(),
        })
    }

    fn test_store() -> Arc<ReducerStore> {
        ReducerStore::new([
            ("tree1", tree_reducer("foo", "fooBar", "CHANGE_TREE_1")),
            ("tree2", tree_reducer("bar", "barFoo", "CHANGE_TREE_2")),
        ])
    }

    #[test]
    fn test_initial_state() {
        let store = test_store();
        assert_eq!(
            store.get_state().to_value(),
            json!({"tree1": {"person": {"name": "foo"}}, "tree2": {"person": {"name": "bar"}}})
        );
        assert_eq!(store.reducer_names(), vec!["tree1", "tree2"]);
    }

    #[test]
    fn test_dispatch_notifies_even_without_change() {
        let store = test_store();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let _disposer = store.subscribe(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        let before = store.get_state();
        store.dispatch(Action::new("CHANGE_NOTHING")).unwrap();
        assert!(store.get_state().ptr_eq(&before));

        store.dispatch(Action::new("CHANGE_TREE_1")).unwrap();
        let after = store.get_state();
        assert!(!after.ptr_eq(&before));
        assert!(after.get("tree2").unwrap().ptr_eq(before.get("tree2").unwrap()));

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_inject_reducer_adds_tree() {
        let store = test_store();
        store
            .inject_reducer("async", tree_reducer("async", "asyncChanged", "CHANGE_ASYNC_TREE"))
            .unwrap();

        assert!(store.get_state().contains_key("async"));

        let result = store.inject_reducer("async", tree_reducer("x", "y", "Z"));
        assert!(matches!(result, Err(WatchError::ReducerExists(name)) if name == "async"));
    }

    #[test]
    fn test_replace_reducers_drops_trees() {
        let store = test_store();
        store
            .replace_reducers([("tree2", tree_reducer("bar", "barFoo", "CHANGE_TREE_2"))])
            .unwrap();

        assert_eq!(store.reducer_names(), vec!["tree2"]);
        assert!(!store.get_state().contains_key("tree1"));
    }

    #[test]
    fn test_dispatch_from_reducer_rejected() {
        let store = ReducerStore::new(Vec::<(String, Reducer)>::new());
        let weak = Arc::downgrade(&store);
        let outcome = Arc::new(parking_lot::Mutex::new(None));

        let sink = Arc::clone(&outcome);
        store
            .inject_reducer(
                "nested",
                reducer(move |previous, action| {
                    if action.kind == "NEST" {
                        if let Some(store) = weak.upgrade() {
                            *sink.lock() = Some(store.dispatch(Action::new("INNER")));
                        }
                    }
                    previous.cloned().unwrap_or_else(|| Slot::new(json!(null)))
                }),
            )
            .unwrap();

        store.dispatch(Action::new("NEST")).unwrap();
        assert!(matches!(
            outcome.lock().take(),
            Some(Err(WatchError::DispatchInReducer(kind))) if kind == "INNER"
        ));
    }

    #[test]
    fn test_nested_dispatch_depth_limit() {
        let store = ReducerStore::with_config(
            [("tree1", tree_reducer("foo", "fooBar", "CHANGE_TREE_1"))],
            StoreConfig {
                max_dispatch_depth: 3,
            },
        );
        let weak = Arc::downgrade(&store);
        let errors = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&errors);
        let _disposer = store.subscribe(Arc::new(move || {
            if let Some(store) = weak.upgrade() {
                if store.dispatch(Action::new("AGAIN")).is_err() {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            }
        }));

        store.dispatch(Action::new("START")).unwrap();
        assert_eq!(errors.load(Ordering::SeqCst), 1);
        assert_eq!(store.config().max_dispatch_depth, 3);
    }

    #[test]
    fn test_default_config() {
        let store = test_store();
        assert_eq!(store.config().max_dispatch_depth, 64);
    }

    #[test]
    fn test_dispatch_recovers_after_reducer_panic() {
        let store = ReducerStore::new([(
            "fragile",
            reducer(|previous, action| {
                if action.kind == "BOOM" {
                    panic!("reducer failed");
                }
                previous.cloned().unwrap_or_else(|| Slot::new(json!(0)))
            }),
        )]);
        let before = store.get_state();

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            store.dispatch(Action::new("BOOM"))
        }));
        assert!(outcome.is_err());
        assert!(store.get_state().ptr_eq(&before));

        store.dispatch(Action::new("OK")).unwrap();
        store
            .inject_reducer("tree1", tree_reducer("foo", "fooBar", "CHANGE_TREE_1"))
            .unwrap();
        assert!(store.get_state().contains_key("tree1"));
    }
}
