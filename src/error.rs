//! Error types for subscriptions and the reference stores.

use thiserror::Error;

/// Main error type.
///
/// The change gate itself never fails; these errors come from the
/// collaborator stores in [`crate::store`].
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("Reducer already registered: {0}")]
    ReducerExists(String),

    #[error("Cannot dispatch {0:?} while reducers are running")]
    DispatchInReducer(String),

    #[error("Nested dispatch depth {depth} exceeds limit {limit}")]
    DispatchDepthExceeded { depth: usize, limit: usize },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for WatchError {
    fn from(e: serde_json::Error) -> Self {
        WatchError::Serialization(e.to_string())
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, WatchError>;
