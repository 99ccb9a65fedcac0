//! Mock ObjStorage for testing.
//!
//! Records all calls to get(), add(), contains() for assertions.
//! Configurable failure injection to exercise the retry and
//! failure-classification paths.

use objstore_replayer::objstorage::{BoxFuture, ObjStorage, StorageError};
use objstore_replayer::record::ObjectId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// Mock implementation of ObjStorage that records all calls.
///
/// Failure injection is "fail the first N calls of an operation": each
/// failing call burns one unit of the budget, so a retry schedule with a
/// larger attempt budget eventually succeeds and a smaller one exhausts.
pub struct MockObjStorage {
    objects: RwLock<HashMap<ObjectId, Vec<u8>>>,
    get_calls: AtomicUsize,
    add_calls: AtomicUsize,
    contains_calls: AtomicUsize,
    /// Remaining get() calls that fail with a transient error.
    failing_gets: AtomicUsize,
    /// Remaining add() calls that fail with a transient error.
    failing_adds: AtomicUsize,
    /// Remaining contains() calls that fail with a transient error.
    failing_contains: AtomicUsize,
}

impl MockObjStorage {
    /// Create an empty, fully healthy mock.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            get_calls: AtomicUsize::new(0),
            add_calls: AtomicUsize::new(0),
            contains_calls: AtomicUsize::new(0),
            failing_gets: AtomicUsize::new(0),
            failing_adds: AtomicUsize::new(0),
            failing_contains: AtomicUsize::new(0),
        }
    }

    /// Seed an object without going through add() accounting.
    pub async fn seed(&self, id: ObjectId, content: Vec<u8>) {
        self.objects.write().await.insert(id, content);
    }

    /// Make the next `n` get() calls fail with a transient error.
    pub fn fail_next_gets(&self, n: usize) {
        self.failing_gets.store(n, Ordering::SeqCst);
    }

    /// Make the next `n` add() calls fail with a transient error.
    pub fn fail_next_adds(&self, n: usize) {
        self.failing_adds.store(n, Ordering::SeqCst);
    }

    /// Make the next `n` contains() calls fail with a transient error.
    pub fn fail_next_contains(&self, n: usize) {
        self.failing_contains.store(n, Ordering::SeqCst);
    }

    /// Number of get() calls observed (failed ones included).
    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    /// Number of add() calls observed (failed ones included).
    pub fn add_calls(&self) -> usize {
        self.add_calls.load(Ordering::SeqCst)
    }

    /// Number of contains() calls observed (failed ones included).
    pub fn contains_calls(&self) -> usize {
        self.contains_calls.load(Ordering::SeqCst)
    }

    /// Number of objects currently stored.
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    /// Fetch stored bytes directly, bypassing call accounting.
    pub async fn stored(&self, id: ObjectId) -> Option<Vec<u8>> {
        self.objects.read().await.get(&id).cloned()
    }

    /// Burn one unit of a failure budget; true if this call must fail.
    fn take_failure(budget: &AtomicUsize) -> bool {
        budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl Default for MockObjStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjStorage for MockObjStorage {
    fn get(&self, id: ObjectId) -> BoxFuture<'_, Vec<u8>> {
        Box::pin(async move {
            self.get_calls.fetch_add(1, Ordering::SeqCst);
            if Self::take_failure(&self.failing_gets) {
                return Err(StorageError::backend("get", "injected failure"));
            }
            self.objects
                .read()
                .await
                .get(&id)
                .cloned()
                .ok_or_else(|| StorageError::not_found(&id))
        })
    }

    fn add(&self, id: ObjectId, content: Vec<u8>) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            self.add_calls.fetch_add(1, Ordering::SeqCst);
            if Self::take_failure(&self.failing_adds) {
                return Err(StorageError::backend("put", "injected failure"));
            }
            self.objects.write().await.entry(id).or_insert(content);
            Ok(())
        })
    }

    fn contains(&self, id: ObjectId) -> BoxFuture<'_, bool> {
        Box::pin(async move {
            self.contains_calls.fetch_add(1, Ordering::SeqCst);
            if Self::take_failure(&self.failing_contains) {
                return Err(StorageError::backend("contains", "injected failure"));
            }
            Ok(self.objects.read().await.contains_key(&id))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_records_calls() {
        let mock = MockObjStorage::new();
        mock.seed([1u8; 20], b"data".to_vec()).await;

        assert_eq!(mock.get([1u8; 20]).await.unwrap(), b"data");
        assert!(mock.contains([1u8; 20]).await.unwrap());
        assert_eq!(mock.get_calls(), 1);
        assert_eq!(mock.contains_calls(), 1);
        assert_eq!(mock.add_calls(), 0);
    }

    #[tokio::test]
    async fn test_mock_failure_budget() {
        let mock = MockObjStorage::new();
        mock.seed([2u8; 20], b"data".to_vec()).await;
        mock.fail_next_gets(2);

        assert!(mock.get([2u8; 20]).await.is_err());
        assert!(mock.get([2u8; 20]).await.is_err());
        // Budget exhausted: third call succeeds
        assert!(mock.get([2u8; 20]).await.is_ok());
        assert_eq!(mock.get_calls(), 3);
    }

    #[tokio::test]
    async fn test_mock_missing_is_not_found() {
        let mock = MockObjStorage::new();
        let err = mock.get([9u8; 20]).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
