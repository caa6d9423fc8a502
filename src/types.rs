//! Core types: slots, snapshots and actions.

use crate::error::Result;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A top-level value held in a [`Snapshot`].
///
/// Slots are compared by identity: two slots are the same when they share
/// an allocation, or when both hold an equal scalar (null, bool, number,
/// string). Separately built arrays or objects are never the same slot,
/// however alike their contents.
#[derive(Clone)]
pub struct Slot(Arc<Value>);

impl Slot {
    pub fn new(value: Value) -> Self {
        Slot(Arc::new(value))
    }

    /// Borrow the wrapped value.
    pub fn value(&self) -> &Value {
        &self.0
    }

    /// True if both slots point at the same allocation.
    pub fn ptr_eq(&self, other: &Slot) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Identity comparison used by the equality engine.
    pub fn same(&self, other: &Slot) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        match (self.value(), other.value()) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            _ => false,
        }
    }
}

impl From<Value> for Slot {
    fn from(value: Value) -> Self {
        Slot::new(value)
    }
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Slot({:p}: {})", Arc::as_ptr(&self.0), self.0)
    }
}

impl Serialize for Slot {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

/// The full state of a store at one point in time.
///
/// Snapshots are immutable. Cloning is cheap and the clone is
/// pointer-equal to the original.
#[derive(Clone, Default)]
pub struct Snapshot {
    slots: Arc<BTreeMap<String, Slot>>,
}

impl Snapshot {
    /// Empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Slot> {
        self.slots.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.slots.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.slots.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Slot)> {
        self.slots.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Derive a new snapshot with `key` set to `slot`.
    ///
    /// Every other slot is shared with `self`, so only `key` compares as
    /// changed between the two.
    pub fn with(&self, key: impl Into<String>, slot: impl Into<Slot>) -> Self {
        let mut slots = (*self.slots).clone();
        slots.insert(key.into(), slot.into());
        Self {
            slots: Arc::new(slots),
        }
    }

    /// Derive a new snapshot with `key` removed.
    pub fn without(&self, key: &str) -> Self {
        let mut slots = (*self.slots).clone();
        slots.remove(key);
        Self {
            slots: Arc::new(slots),
        }
    }

    /// True if both snapshots are the same allocation.
    pub fn ptr_eq(&self, other: &Snapshot) -> bool {
        Arc::ptr_eq(&self.slots, &other.slots)
    }

    /// Render as a JSON object.
    pub fn to_value(&self) -> Value {
        Value::Object(
            self.slots
                .iter()
                .map(|(k, v)| (k.clone(), v.value().clone()))
                .collect(),
        )
    }
}

impl<K: Into<String>, S: Into<Slot>> FromIterator<(K, S)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (K, S)>>(iter: I) -> Self {
        Self {
            slots: Arc::new(
                iter.into_iter()
                    .map(|(k, s)| (k.into(), s.into()))
                    .collect(),
            ),
        }
    }
}

impl fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.slots.iter()).finish()
    }
}

impl Serialize for Snapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.slots.serialize(serializer)
    }
}

/// An action dispatched to a [`crate::store::ReducerStore`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: Value,
}

impl Action {
    /// Dispatched once when a store is created.
    pub const INIT: &'static str = "@@store/INIT";
    /// Dispatched whenever the reducer set changes.
    pub const REPLACE: &'static str = "@@store/REPLACE";

    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            payload: Value::Null,
        }
    }

    /// Action carrying a serialized payload.
    pub fn with_payload<T: Serialize>(kind: impl Into<String>, payload: &T) -> Result<Self> {
        Ok(Self {
            kind: kind.into(),
            payload: serde_json::to_value(payload)?,
        })
    }
}
