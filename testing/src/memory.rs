//! In-memory record store.
//!
//! Keeps the whole database as one JSON tree behind a mutex, so path reads,
//! writes and merges behave like the hosted document store: writing `null`
//! deletes, intermediate objects are created on write, and collections are
//! plain objects keyed by child key.

use spotbook_core::store::{RecordStore, Records, StoreError, counter_value, records_from_value};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// In-memory [`RecordStore`] for fast, deterministic tests.
///
/// # Example
///
/// ```
/// use spotbook_testing::InMemoryRecordStore;
/// use spotbook_core::store::RecordStore;
/// use serde_json::json;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = InMemoryRecordStore::new();
/// store.set_at_path("reservations/1", json!({ "email": "a@x.com" })).await?;
///
/// let all = store.get_all("reservations").await?;
/// assert_eq!(all.len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryRecordStore {
    root: Arc<Mutex<Value>>,
    unavailable: Arc<AtomicBool>,
    failing_sets: Arc<AtomicUsize>,
    writes: Arc<AtomicUsize>,
}

impl InMemoryRecordStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-loaded with `data` as its root document.
    #[must_use]
    pub fn with_data(data: Value) -> Self {
        Self {
            root: Arc::new(Mutex::new(data)),
            ..Self::default()
        }
    }

    /// Make every subsequent call fail with `StoreError::Unavailable`
    /// (or succeed again with `false`).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make the next `count` calls to `set_at_path` fail with
    /// `StoreError::Unavailable`; every other operation keeps working.
    pub fn fail_next_sets(&self, count: usize) {
        self.failing_sets.store(count, Ordering::SeqCst);
    }

    /// Number of successful write operations so far.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Copy of the whole tree.
    ///
    /// # Panics
    ///
    /// Panics if the mutex was poisoned by a panicking test.
    #[must_use]
    #[allow(clippy::unwrap_used)]
    pub fn snapshot(&self) -> Value {
        self.root.lock().unwrap().clone()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Value>, StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("in-memory store switched off".to_string()));
        }
        self.root
            .lock()
            .map_err(|_| StoreError::Unavailable("in-memory store poisoned".to_string()))
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

fn lookup<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    segments(path)
        .try_fold(root, |node, segment| match node {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
        .filter(|value| !value.is_null())
}

/// Walk to `path`, turning every node on the way into an object.
fn lookup_or_create<'a>(root: &'a mut Value, path: &str) -> &'a mut Value {
    let mut node = root;
    for segment in segments(path) {
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        node = &mut node[segment];
    }
    node
}

fn remove(root: &mut Value, path: &str) {
    let parts: Vec<&str> = segments(path).collect();
    let Some((last, parents)) = parts.split_last() else {
        *root = Value::Null;
        return;
    };
    let mut node = root;
    for segment in parents {
        match node.get_mut(*segment) {
            Some(next) => node = next,
            None => return,
        }
    }
    if let Some(map) = node.as_object_mut() {
        map.remove(*last);
    }
}

fn write(root: &mut Value, path: &str, value: Value) {
    if value.is_null() {
        remove(root, path);
    } else {
        *lookup_or_create(root, path) = value;
    }
}

impl RecordStore for InMemoryRecordStore {
    async fn get_all(&self, collection: &str) -> Result<Records, StoreError> {
        let root = self.lock()?;
        records_from_value(lookup(&root, collection).cloned().unwrap_or(Value::Null))
    }

    async fn get_by_path(&self, path: &str) -> Result<Option<Value>, StoreError> {
        let root = self.lock()?;
        Ok(lookup(&root, path).cloned())
    }

    async fn set_at_path(&self, path: &str, value: Value) -> Result<(), StoreError> {
        let mut root = self.lock()?;
        if self
            .failing_sets
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(StoreError::Unavailable(format!("write to {path} dropped")));
        }
        write(&mut root, path, value);
        self.record_write();
        Ok(())
    }

    async fn update_at_path(&self, path: &str, fields: Map<String, Value>) -> Result<(), StoreError> {
        let mut root = self.lock()?;
        for (field, value) in fields {
            write(&mut root, &format!("{path}/{field}"), value);
        }
        self.record_write();
        Ok(())
    }

    async fn query_equal(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Records, StoreError> {
        let root = self.lock()?;
        let all = records_from_value(lookup(&root, collection).cloned().unwrap_or(Value::Null))?;
        Ok(all
            .into_iter()
            .filter(|(_, record)| record.get(field) == Some(value))
            .collect())
    }

    async fn increment_below(
        &self,
        path: &str,
        limit: u64,
        seed: u64,
    ) -> Result<Option<u64>, StoreError> {
        let mut root = self.lock()?;
        let current = match lookup(&root, path) {
            Some(value) => counter_value(path, value)?,
            None => seed,
        };
        if current >= limit {
            return Ok(None);
        }
        let next = current + 1;
        write(&mut root, path, Value::from(next));
        self.record_write();
        Ok(Some(next))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_set_then_get() {
        let store = InMemoryRecordStore::new();
        store.set_at_path("a/b/c", json!(1)).await.unwrap();
        assert_eq!(store.get_by_path("a/b/c").await.unwrap(), Some(json!(1)));
        assert_eq!(store.get_by_path("a/b").await.unwrap(), Some(json!({ "c": 1 })));
        assert_eq!(store.get_by_path("a/x").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_null_deletes() {
        let store = InMemoryRecordStore::with_data(json!({ "r": { "1": { "x": 1 } } }));
        store.set_at_path("r/1", Value::Null).await.unwrap();
        assert!(store.get_all("r").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_merges() {
        let store = InMemoryRecordStore::with_data(json!({ "r": { "1": { "name": "Ada", "paid": false } } }));
        let mut fields = Map::new();
        fields.insert("paid".to_string(), json!(true));
        store.update_at_path("r/1", fields).await.unwrap();
        assert_eq!(
            store.get_by_path("r/1").await.unwrap(),
            Some(json!({ "name": "Ada", "paid": true }))
        );
    }

    #[tokio::test]
    async fn test_query_equal_filters() {
        let store = InMemoryRecordStore::with_data(json!({
            "r": { "1": { "email": "a@x.com" }, "2": { "email": "b@x.com" } }
        }));
        let hits = store.query_equal("r", "email", &json!("b@x.com")).await.unwrap();
        assert_eq!(hits.keys().collect::<Vec<_>>(), vec!["2"]);
    }

    #[tokio::test]
    async fn test_array_collection_reads_as_records() {
        let store = InMemoryRecordStore::with_data(json!({ "r": [null, { "email": "a@x.com" }] }));
        let all = store.get_all("r").await.unwrap();
        assert_eq!(all.len(), 1);
        assert!(all.contains_key("1"));
    }

    #[tokio::test]
    async fn test_increment_below_respects_limit_and_seed() {
        let store = InMemoryRecordStore::new();
        assert_eq!(store.increment_below("c", 3, 1).await.unwrap(), Some(2));
        assert_eq!(store.increment_below("c", 3, 0).await.unwrap(), Some(3));
        assert_eq!(store.increment_below("c", 3, 0).await.unwrap(), None);
        assert_eq!(store.get_by_path("c").await.unwrap(), Some(json!(3)));
    }

    #[tokio::test]
    async fn test_failing_sets_only_affect_set_at_path() {
        let store = InMemoryRecordStore::new();
        store.fail_next_sets(1);

        assert!(matches!(
            store.set_at_path("r/1", json!(1)).await,
            Err(StoreError::Unavailable(_))
        ));
        assert_eq!(store.increment_below("c", 5, 0).await.unwrap(), Some(1));
        store.set_at_path("r/1", json!(1)).await.unwrap();
        assert_eq!(store.get_by_path("r/1").await.unwrap(), Some(json!(1)));
        assert_eq!(store.write_count(), 2);
    }

    #[tokio::test]
    async fn test_unavailable_fails_everything() {
        let store = InMemoryRecordStore::new();
        store.set_unavailable(true);
        assert!(matches!(
            store.get_all("r").await,
            Err(StoreError::Unavailable(_))
        ));
        store.set_unavailable(false);
        assert!(store.get_all("r").await.is_ok());
    }
}
