//! # Pure Subscribe
//!
//! Change-gated subscriptions over an observable state store. A subscription
//! re-runs its callback only when the part of the state it watches actually
//! changed, using shallow (one level deep, identity based) equality.
//!
//! ## Core Concepts
//!
//! - **Snapshots**: Immutable maps from top-level key to a shared value slot
//! - **Equality**: Shallow comparison, globally or on a set of keys
//! - **Watch scopes**: Whole state, one key, or a list of keys
//! - **Subscriptions**: Initial call, change-gated calls, unsubscribe
//!
//! ## Example
//!
//! ```ignore
//! use pure_subscribe::{observe, Action, ReducerStore};
//!
//! let store = ReducerStore::new([("tree1", tree1()), ("tree2", tree2())]);
//!
//! // Called once now, then only when `tree1` is replaced
//! let subscription = observe(&store, |state| println!("{:?}", state), "tree1");
//!
//! store.dispatch(Action::new("CHANGE_TREE_2"))?; // ignored
//! store.dispatch(Action::new("CHANGE_TREE_1"))?; // callback fires
//!
//! subscription.unsubscribe();
//! ```

pub mod equality;
pub mod error;
pub mod observable;
pub mod store;
pub mod types;
pub mod watch;

// Re-exports
pub use equality::{equal_on_keys, shallow_equal};
pub use error::{Result, WatchError};
pub use observable::{Disposer, Listener, ListenerId, ListenerRegistry, Observable};
pub use store::{combine, reducer, Reducer, ReducerStore, SnapshotCell, StoreConfig};
pub use types::*;
pub use watch::{has_changed, observe, ControllerState, Subscription, SubscriptionId, WatchScope};
