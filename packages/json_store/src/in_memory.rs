//! In-memory persistence.
//!
//! Keeps collection bytes in a map instead of on disk.  Useful for tests and throwaway stores.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use filedoc_store::{CollectionPath, Error, Persistence};

/// Collections held in process memory.
///
/// # Example
///
/// ```rust
/// use filedoc_json_store::{DocumentStore, InMemory, StoreConfig};
/// use serde_json::json;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let store = DocumentStore::with_persistence(InMemory::new(), StoreConfig::default());
/// store.put("users/alice", json!({"name": "Alice"}), None).await.unwrap();
/// assert_eq!(
///     store.get("users/alice").await.unwrap(),
///     Some(json!({"name": "Alice"}))
/// );
/// # });
/// ```
#[derive(Debug, Default)]
pub struct InMemory {
    collections: Mutex<HashMap<CollectionPath, Vec<u8>>>,
}

impl InMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored collections.
    pub fn len(&self) -> usize {
        self.lock().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<CollectionPath, Vec<u8>>>, Error> {
        self.collections
            .lock()
            .map_err(|_| Error::ImplementationFailure {
                message: "lock poisoned".into(),
            })
    }
}

#[async_trait]
impl Persistence for InMemory {
    async fn read(&self, path: &CollectionPath) -> Result<Option<Vec<u8>>, Error> {
        Ok(self.lock()?.get(path).cloned())
    }

    async fn write(&self, path: &CollectionPath, bytes: Vec<u8>) -> Result<(), Error> {
        self.lock()?.insert(path.clone(), bytes);
        Ok(())
    }

    async fn remove(&self, path: &CollectionPath) -> Result<bool, Error> {
        Ok(self.lock()?.remove(path).is_some())
    }

    async fn exists(&self, path: &CollectionPath) -> Result<bool, Error> {
        Ok(self.lock()?.contains_key(path))
    }
}
