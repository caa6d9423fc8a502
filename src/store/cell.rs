//! The simplest observable: a single replaceable snapshot.

use crate::observable::{Disposer, Listener, ListenerRegistry, Observable};
use crate::types::Snapshot;
use parking_lot::RwLock;
use std::sync::Arc;

/// Holds one snapshot and notifies listeners whenever it is written.
///
/// Every write notifies, including writes that leave the state unchanged.
pub struct SnapshotCell {
    state: RwLock<Snapshot>,
    listeners: Arc<ListenerRegistry>,
}

impl SnapshotCell {
    pub fn new(initial: Snapshot) -> Arc<Self> {
        Arc::new(Self {
            state: RwLock::new(initial),
            listeners: ListenerRegistry::new(),
        })
    }

    /// Replace the state and notify.
    pub fn set(&self, state: Snapshot) {
        *self.state.write() = state;
        self.listeners.notify_all();
    }

    /// Derive the next state from the current one and notify.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&Snapshot) -> Snapshot,
    {
        {
            let mut state = self.state.write();
            let next = f(&*state);
            *state = next;
        }
        self.listeners.notify_all();
    }

    /// Notify without touching the state.
    pub fn touch(&self) {
        self.listeners.notify_all();
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl Observable for SnapshotCell {
    fn get_state(&self) -> Snapshot {
        self.state.read().clone()
    }

    fn subscribe(&self, listener: Listener) -> Disposer {
        self.listeners.register(listener)
    }
}
