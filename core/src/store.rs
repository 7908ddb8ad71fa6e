//! Record store abstraction.
//!
//! A record store is a remote document database addressed by slash-separated
//! paths. Collections are JSON objects whose children are records; records
//! are arbitrary JSON documents. The trait is deliberately small: whole
//! collection reads, single path reads and writes, a merge-patch, an
//! equality query and one atomic counter operation.
//!
//! # Implementations
//!
//! - `FirebaseStore` (in `spotbook-firebase`): Realtime Database REST API
//! - `InMemoryRecordStore` (in `spotbook-testing`): JSON tree behind a mutex
//!
//! # Example
//!
//! ```no_run
//! use spotbook_core::store::{RecordStore, StoreError};
//! use serde_json::json;
//!
//! async fn example<S: RecordStore>(store: &S) -> Result<(), StoreError> {
//!     store.set_at_path("reservations/1", json!({ "email": "a@x.com" })).await?;
//!
//!     let hits = store.query_equal("reservations", "email", &json!("a@x.com")).await?;
//!     assert_eq!(hits.len(), 1);
//!     Ok(())
//! }
//! ```

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::future::Future;
use thiserror::Error;

/// Children of a collection keyed by child key.
pub type Records = BTreeMap<String, Value>;

/// Errors that can occur during record store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The request never produced a response (connect, timeout, TLS).
    #[error("Request failed: {0}")]
    Request(String),

    /// The store answered with a non-success status.
    #[error("Store returned status {status}: {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body or reason
        message: String,
    },

    /// The response body was not the JSON shape expected.
    #[error("Decode error: {0}")]
    Decode(String),

    /// A compare-and-set kept losing to concurrent writers.
    #[error("Conflict on {path} after {attempts} attempts")]
    Conflict {
        /// Path of the contended value
        path: String,
        /// Attempts made before giving up
        attempts: u32,
    },

    /// The store cannot be reached or refuses service.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Remote document store used by the reservation service.
///
/// Implementations must be `Send + Sync` and return `Send` futures so the
/// service can run inside multi-threaded HTTP handlers.
pub trait RecordStore: Send + Sync {
    /// Read every child of `collection`.
    ///
    /// Returns an empty map when the collection does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store cannot be read.
    fn get_all(&self, collection: &str) -> impl Future<Output = Result<Records, StoreError>> + Send;

    /// Read the value at `path`, `None` when nothing is stored there.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store cannot be read.
    fn get_by_path(
        &self,
        path: &str,
    ) -> impl Future<Output = Result<Option<Value>, StoreError>> + Send;

    /// Replace the value at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write is rejected.
    fn set_at_path(
        &self,
        path: &str,
        value: Value,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Merge `fields` into the object at `path`, leaving other children intact.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write is rejected.
    fn update_at_path(
        &self,
        path: &str,
        fields: Map<String, Value>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Children of `collection` whose `field` equals `value`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn query_equal(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> impl Future<Output = Result<Records, StoreError>> + Send;

    /// Atomically increment the integer at `path` if it is below `limit`.
    ///
    /// An absent counter counts as `seed`. Returns the new value, or `None`
    /// when the counter is already at or above `limit` (nothing is written).
    ///
    /// # Errors
    ///
    /// - `Conflict`: concurrent writers won every attempt
    /// - `Decode`: the stored value is not a non-negative integer
    /// - any transport error
    fn increment_below(
        &self,
        path: &str,
        limit: u64,
        seed: u64,
    ) -> impl Future<Output = Result<Option<u64>, StoreError>> + Send;
}

/// Join a parent path and a child key with exactly one slash.
#[must_use]
pub fn child_path(parent: &str, key: impl std::fmt::Display) -> String {
    format!("{}/{key}", parent.trim_end_matches('/'))
}

/// Interpret a collection value as records.
///
/// Documents keyed by small integers come back from some stores as JSON
/// arrays with `null` holes; those are turned back into `index → value`
/// maps.
///
/// # Errors
///
/// Returns `StoreError::Decode` for scalar values.
pub fn records_from_value(value: Value) -> Result<Records, StoreError> {
    match value {
        Value::Null => Ok(Records::new()),
        Value::Object(map) => Ok(map.into_iter().filter(|(_, v)| !v.is_null()).collect()),
        Value::Array(items) => Ok(items
            .into_iter()
            .enumerate()
            .filter(|(_, v)| !v.is_null())
            .map(|(index, v)| (index.to_string(), v))
            .collect()),
        other => Err(StoreError::Decode(format!(
            "expected a collection, found {other}"
        ))),
    }
}

/// First key of `records` in numeric order, falling back to lexical order
/// for keys that are not integers.
#[must_use]
pub fn first_key(records: &Records) -> Option<&String> {
    fn rank(key: &str) -> (u8, u64) {
        key.parse::<u64>().map_or((1, 0), |n| (0, n))
    }

    records
        .keys()
        .min_by(|a, b| rank(a).cmp(&rank(b)).then_with(|| a.cmp(b)))
}

/// Read a counter value, accepting integers stored as JSON numbers.
///
/// # Errors
///
/// Returns `StoreError::Decode` when the value is not a non-negative integer.
pub fn counter_value(path: &str, value: &Value) -> Result<u64, StoreError> {
    value
        .as_u64()
        .ok_or_else(|| StoreError::Decode(format!("counter at {path} is not an integer: {value}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_child_path() {
        assert_eq!(child_path("reservations", 3), "reservations/3");
        assert_eq!(child_path("reservations/", "7"), "reservations/7");
    }

    #[test]
    fn test_records_from_array_skips_holes() {
        let records =
            records_from_value(json!([null, { "email": "a@x.com" }, null, { "email": "c@x.com" }]))
                .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records["1"]["email"], "a@x.com");
        assert_eq!(records["3"]["email"], "c@x.com");
    }

    #[test]
    fn test_records_from_null_is_empty() {
        assert!(records_from_value(Value::Null).unwrap().is_empty());
    }

    #[test]
    fn test_records_from_scalar_fails() {
        assert!(matches!(
            records_from_value(json!(42)),
            Err(StoreError::Decode(_))
        ));
    }

    #[test]
    fn test_first_key_is_numeric() {
        let mut records = Records::new();
        records.insert("10".to_string(), json!({}));
        records.insert("2".to_string(), json!({}));
        records.insert("-Nabc".to_string(), json!({}));
        assert_eq!(first_key(&records).unwrap(), "2");
    }

    #[test]
    fn test_counter_value() {
        assert_eq!(counter_value("c", &json!(4)).unwrap(), 4);
        assert!(counter_value("c", &json!("4")).is_err());
        assert!(counter_value("c", &json!(-1)).is_err());
    }
}
