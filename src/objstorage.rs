//! Object store integration traits.
//!
//! Defines the interface the replay engine needs from an object store:
//! content-addressable `get`/`add`/`contains` keyed by [`ObjectId`]. The
//! engine depends only on this trait, never on a specific backend.
//!
//! # Failure classification
//!
//! Storage calls fail with a closed set of variants:
//!
//! - [`StorageError::NotFound`] — the object is confirmed absent. Permanent;
//!   never retried.
//! - [`StorageError::Backend`] — anything else. Treated as transient and
//!   retried with backoff by the transfer layer.
//!
//! # Example
//!
//! ```rust
//! use objstore_replayer::objstorage::{InMemoryObjStorage, ObjStorage};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let store = InMemoryObjStorage::new();
//! let id = [7u8; 20];
//! store.add(id, b"payload".to_vec()).await.unwrap();
//! assert!(store.contains(id).await.unwrap());
//! assert_eq!(store.get(id).await.unwrap(), b"payload");
//! # }
//! ```

use crate::record::{obj_hex, ObjectId};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;
use tokio::sync::RwLock;

/// Result type for storage operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Type alias for boxed async futures (reduces trait signature complexity).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = StorageResult<T>> + Send + 'a>>;

/// Errors raised by an object store.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// The requested object never existed or was removed.
    ///
    /// Permanent: retrying cannot change the outcome. Raised by `get` only;
    /// `add` is idempotent and `contains` answers with a boolean.
    #[error("object {obj_id} not found")]
    NotFound { obj_id: String },

    /// Any other backend failure (network blip, temporary unavailability).
    ///
    /// Transient: the transfer layer retries these with backoff.
    #[error("storage backend error ({operation}): {message}")]
    Backend { operation: String, message: String },
}

impl StorageError {
    /// Create a not-found error for an object id.
    pub fn not_found(id: &ObjectId) -> Self {
        Self::NotFound {
            obj_id: obj_hex(id),
        }
    }

    /// Create a transient backend error.
    pub fn backend(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Backend {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Check for the distinguished permanent-miss condition.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Trait defining what the replay engine needs from an object store.
///
/// Implemented by both the source and the destination. Object ids are
/// passed by value (they are small and `Copy`), which keeps the boxed
/// futures free of borrowed parameters.
pub trait ObjStorage: Send + Sync + 'static {
    /// Fetch an object's bytes by content hash.
    ///
    /// Fails with [`StorageError::NotFound`] if the object is absent.
    fn get(&self, id: ObjectId) -> BoxFuture<'_, Vec<u8>>;

    /// Store an object under its content hash.
    ///
    /// Idempotent: adding an object that already exists is a no-op success.
    fn add(&self, id: ObjectId, content: Vec<u8>) -> BoxFuture<'_, ()>;

    /// Check whether an object is present.
    fn contains(&self, id: ObjectId) -> BoxFuture<'_, bool>;
}

/// An in-memory object store.
///
/// Reference backend for tests and examples; also documents the expected
/// semantics of the trait (idempotent `add`, `NotFound` on missing `get`).
#[derive(Default)]
pub struct InMemoryObjStorage {
    objects: RwLock<HashMap<ObjectId, Vec<u8>>>,
}

impl InMemoryObjStorage {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects.
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    /// Check if the store holds no objects.
    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

impl ObjStorage for InMemoryObjStorage {
    fn get(&self, id: ObjectId) -> BoxFuture<'_, Vec<u8>> {
        Box::pin(async move {
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
            self.objects.write().await.entry(id).or_insert(content);
            Ok(())
        })
    }

    fn contains(&self, id: ObjectId) -> BoxFuture<'_, bool> {
        Box::pin(async move { Ok(self.objects.read().await.contains_key(&id)) })
    }
}
