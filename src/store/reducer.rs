//! Reducers and per-tree combination.

use crate::types::{Action, Slot, Snapshot};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Computes the next value of one state tree.
///
/// `None` as the previous slot means the tree has no value yet and the
/// reducer must produce its default. Returning the previous slot unchanged
/// marks the tree as untouched.
pub type Reducer = Arc<dyn Fn(Option<&Slot>, &Action) -> Slot + Send + Sync>;

/// Wrap a closure as a [`Reducer`].
pub fn reducer<F>(f: F) -> Reducer
where
    F: Fn(Option<&Slot>, &Action) -> Slot + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Run every reducer over its own tree.
///
/// Returns `state` itself (pointer-equal) when every tree came back as the
/// same slot and no tree was added or dropped. Trees in `state` without a
/// reducer are dropped.
pub fn combine(reducers: &BTreeMap<String, Reducer>, state: &Snapshot, action: &Action) -> Snapshot {
    let mut changed = reducers.len() != state.len();
    let mut next = BTreeMap::new();

    for (key, reduce) in reducers {
        let previous = state.get(key);
        let slot = reduce(previous, action);
        changed = changed || previous.map_or(true, |previous| !previous.same(&slot));
        next.insert(key.clone(), slot);
    }

    if changed {
        next.into_iter().collect()
    } else {
        state.clone()
    }
}
