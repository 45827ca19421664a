//! Per-collection mutual exclusion for read-modify-write operations.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use filedoc_store::CollectionPath;

/// Async locks keyed by resolved collection path.
///
/// Entries exist only while some operation holds or waits for them.
#[derive(Debug, Default)]
pub struct CollectionLocks {
    table: Mutex<HashMap<CollectionPath, Arc<AsyncMutex<()>>>>,
}

/// Holds a collection's lock until dropped.
///
/// Dropping it, or cancelling the wait that would produce it, prunes the table entry once no one
/// else holds or awaits it.
#[derive(Debug)]
pub struct CollectionGuard<'locks> {
    locks: &'locks CollectionLocks,
    path: CollectionPath,
    guard: Option<OwnedMutexGuard<()>>,
}

impl CollectionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, path: &CollectionPath) -> CollectionGuard<'_> {
        // Created before the wait so that a cancelled waiter still prunes its entry.
        let mut held = CollectionGuard {
            locks: self,
            path: path.clone(),
            guard: None,
        };

        let entry = {
            let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
            table.entry(path.clone()).or_default().clone()
        };

        held.guard = Some(entry.lock_owned().await);
        held
    }

    /// Number of collections currently locked or awaited.
    pub fn len(&self) -> usize {
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for CollectionGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());

        let mut table = self
            .locks
            .table
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // Waiters clone the entry under the table lock, so a count of one means nobody else
        // needs it.
        if table
            .get(&self.path)
            .is_some_and(|entry| Arc::strong_count(entry) == 1)
        {
            table.remove(&self.path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filedoc_store::collection;
    use std::time::Duration;

    #[tokio::test]
    async fn entries_are_pruned_after_release() {
        let locks = CollectionLocks::new();
        {
            let _guard = locks.lock(&collection!("a")).await;
            assert_eq!(locks.len(), 1);
        }
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn different_collections_do_not_block() {
        let locks = CollectionLocks::new();
        let _a = locks.lock(&collection!("a")).await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.lock(&collection!("b")))
            .await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn same_collection_waits_for_release() {
        let locks = Arc::new(CollectionLocks::new());
        let first = locks.lock(&collection!("users/alice.json")).await;

        let waiting = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _second = locks.lock(&collection!("users/alice")).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiting.is_finished());

        drop(first);
        waiting.await.unwrap();
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn cancelled_waiters_do_not_leak_entries() {
        let locks = Arc::new(CollectionLocks::new());
        let first = locks.lock(&collection!("a")).await;

        let waiting = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _second = locks.lock(&collection!("a")).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        // The waiter still holds the entry, so releasing here cannot prune it.
        drop(first);
        waiting.abort();
        let _ = waiting.await;

        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn timed_out_waits_do_not_leak_entries() {
        let locks = CollectionLocks::new();
        let first = locks.lock(&collection!("a")).await;

        let waited =
            tokio::time::timeout(Duration::from_millis(20), locks.lock(&collection!("a"))).await;
        assert!(waited.is_err());

        drop(first);
        assert!(locks.is_empty());
    }
}
