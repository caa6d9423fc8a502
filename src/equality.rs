//! Shallow snapshot equality.
//!
//! Values are never inspected recursively; only the identity of each
//! top-level slot matters (see [`Slot::same`]).

use crate::types::{Slot, Snapshot};

/// Compare two snapshots key by key.
///
/// True iff every key of `a` maps to the same slot in `b` and every key of
/// `b` also exists in `a`. Changed values, added keys and removed keys all
/// make the snapshots unequal.
pub fn shallow_equal(a: &Snapshot, b: &Snapshot) -> bool {
    if a.ptr_eq(b) {
        return true;
    }

    for (key, slot) in a.iter() {
        if !same_slot(Some(slot), b.get(key)) {
            return false;
        }
    }

    b.keys().all(|key| a.contains_key(key))
}

/// Compare two snapshots on the listed keys only.
///
/// A key missing from one side differs from a key present on the other; a
/// key missing from both is equal. An empty key list is vacuously equal.
pub fn equal_on_keys<K: AsRef<str>>(a: &Snapshot, b: &Snapshot, keys: &[K]) -> bool {
    keys.iter().all(|key| {
        let key = key.as_ref();
        same_slot(a.get(key), b.get(key))
    })
}

fn same_slot(a: Option<&Slot>, b: Option<&Slot>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.same(b),
        (None, None) => true,
        _ => false,
    }
}
