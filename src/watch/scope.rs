//! Watch scopes and the change gate.

use crate::equality::{equal_on_keys, shallow_equal};
use crate::types::Snapshot;

/// The part of a snapshot a subscription cares about.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum WatchScope {
    /// The whole snapshot, compared shallowly.
    #[default]
    Unscoped,
    /// A single top-level key.
    SingleKey(String),
    /// Each listed top-level key. An empty list watches nothing.
    KeySet(Vec<String>),
}

impl WatchScope {
    /// Keys compared by this scope (empty for `Unscoped`).
    pub fn keys(&self) -> &[String] {
        match self {
            WatchScope::Unscoped => &[],
            WatchScope::SingleKey(key) => std::slice::from_ref(key),
            WatchScope::KeySet(keys) => keys.as_slice(),
        }
    }

    pub fn is_unscoped(&self) -> bool {
        matches!(self, WatchScope::Unscoped)
    }
}

impl From<&str> for WatchScope {
    fn from(key: &str) -> Self {
        WatchScope::SingleKey(key.to_string())
    }
}

impl From<String> for WatchScope {
    fn from(key: String) -> Self {
        WatchScope::SingleKey(key)
    }
}

impl From<Vec<String>> for WatchScope {
    fn from(keys: Vec<String>) -> Self {
        WatchScope::KeySet(keys)
    }
}

impl From<Vec<&str>> for WatchScope {
    fn from(keys: Vec<&str>) -> Self {
        WatchScope::KeySet(keys.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for WatchScope {
    fn from(keys: &[&str]) -> Self {
        WatchScope::KeySet(keys.iter().map(|k| k.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for WatchScope {
    fn from(keys: [&str; N]) -> Self {
        WatchScope::KeySet(keys.iter().map(|k| k.to_string()).collect())
    }
}

impl<T: Into<WatchScope>> From<Option<T>> for WatchScope {
    fn from(scope: Option<T>) -> Self {
        scope.map(Into::into).unwrap_or_default()
    }
}

/// Did the watched part of the state change between two snapshots?
pub fn has_changed(previous: &Snapshot, current: &Snapshot, scope: &WatchScope) -> bool {
    match scope {
        WatchScope::Unscoped => !shallow_equal(previous, current),
        WatchScope::SingleKey(_) | WatchScope::KeySet(_) => {
            !equal_on_keys(previous, current, scope.keys())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn composite() -> Snapshot {
        [
            ("tree1", json!({"person": {"name": "foo"}})),
            ("tree2", json!({"person": {"name": "bar"}})),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_scope_from_boundary_values() {
        assert_eq!(WatchScope::default(), WatchScope::Unscoped);
        assert_eq!(
            WatchScope::from("tree1"),
            WatchScope::SingleKey("tree1".to_string())
        );
        assert_eq!(
            WatchScope::from(["tree1"]),
            WatchScope::KeySet(vec!["tree1".to_string()])
        );
        assert_eq!(
            WatchScope::from(vec!["a", "b"]).keys(),
            &["a".to_string(), "b".to_string()]
        );
        assert_eq!(WatchScope::from(None::<&str>), WatchScope::Unscoped);
        assert_eq!(
            WatchScope::from(Some("tree2")),
            WatchScope::SingleKey("tree2".to_string())
        );
        assert!(WatchScope::Unscoped.keys().is_empty());
        assert!(WatchScope::Unscoped.is_unscoped());
        assert!(!WatchScope::from("tree1").is_unscoped());
        assert!(!WatchScope::KeySet(Vec::new()).is_unscoped());
    }

    #[test]
    fn test_unscoped_gate() {
        let state = composite();
        let next = state.with("tree2", json!({"person": {"name": "barFoo"}}));

        assert!(!has_changed(&state, &state.clone(), &WatchScope::Unscoped));
        assert!(has_changed(&state, &next, &WatchScope::Unscoped));
        assert!(has_changed(&state, &state.with("extra", json!(0)), &WatchScope::Unscoped));
    }

    #[test]
    fn test_scoped_gate_isolates_trees() {
        let state = composite();
        let tree2_changed = state.with("tree2", json!({"person": {"name": "barFoo"}}));
        let tree1_changed = state.with("tree1", json!({"person": {"name": "fooBar"}}));

        let single = WatchScope::from("tree1");
        assert!(!has_changed(&state, &tree2_changed, &single));
        assert!(has_changed(&state, &tree1_changed, &single));

        let set = WatchScope::from(["tree1"]);
        assert!(!has_changed(&state, &tree2_changed, &set));
        assert!(has_changed(&state, &tree1_changed, &set));
    }

    #[test]
    fn test_empty_key_set_never_changes() {
        let scope = WatchScope::KeySet(Vec::new());
        assert!(!has_changed(&composite(), &Snapshot::new(), &scope));
    }
}
