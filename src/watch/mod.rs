//! Change-gated subscriptions.
//!
//! A subscription registers one listener with an [`Observable`] store and
//! forwards a notification to its callback only when the watched part of the
//! state changed:
//! - the whole snapshot, compared shallowly ([`WatchScope::Unscoped`])
//! - a single top-level key ([`WatchScope::SingleKey`])
//! - a list of top-level keys ([`WatchScope::KeySet`])
//!
//! # Example
//!
//! ```ignore
//! let subscription = observe(&store, |state| println!("{:?}", state), ["tree1", "tree2"]);
//!
//! store.dispatch(Action::new("CHANGE_TREE_1"))?; // callback fires
//! store.dispatch(Action::new("CHANGE_NOTHING"))?; // absorbed
//!
//! subscription.unsubscribe();
//! ```
//!
//! [`Observable`]: crate::observable::Observable

mod controller;
mod scope;

pub use controller::{observe, ControllerState, Subscription, SubscriptionId};
pub use scope::{has_changed, WatchScope};
