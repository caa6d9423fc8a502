//! Reference observable stores.
//!
//! These are collaborators for [`crate::watch::observe`], not part of the
//! change gate itself:
//! - [`SnapshotCell`]: a single replaceable snapshot
//! - [`ReducerStore`]: one state tree per reducer, with runtime reducer
//!   injection
//!
//! # Example
//!
//! ```ignore
//! let store = ReducerStore::new([("todos", todos_reducer())]);
//! store.inject_reducer("filters", filters_reducer())?;
//! store.dispatch(Action::new("ADD_TODO"))?;
//! ```

mod cell;
mod reducer;
mod reducer_store;

pub use cell::SnapshotCell;
pub use reducer::{combine, reducer, Reducer};
pub use reducer_store::{ReducerStore, StoreConfig};
