use std::sync::Arc;

use async_trait::async_trait;

pub use crate::error::Error;
pub use crate::path::CollectionPath;

/// Durable storage for whole collections.
///
/// A `Persistence` implementation maps a `CollectionPath` to one blob of bytes.  It knows nothing
/// about JSON; serialization and sanitizing belong to the document store above it.
///
/// # Object Safety
///
/// This trait is object-safe: you can use `Arc<dyn Persistence>`.
///
/// # Example
///
/// ```
/// use filedoc_store::{collection, Error, Persistence};
///
/// async fn copy(from: &dyn Persistence, to: &dyn Persistence) -> Result<(), Error> {
///     let path = collection!("users/alice");
///     if let Some(bytes) = from.read(&path).await? {
///         to.write(&path, bytes).await?;
///     }
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait Persistence: Send + Sync {
    /// Read the bytes of a collection.
    ///
    /// # Returns
    ///
    /// * `Ok(None)` - The collection does not exist.
    /// * `Ok(Some(bytes))` - The stored bytes.
    /// * `Err(Error)` - An error occurred.
    async fn read(&self, path: &CollectionPath) -> Result<Option<Vec<u8>>, Error>;

    /// Replace the bytes of a collection, creating it (and any parent directories) if needed.
    async fn write(&self, path: &CollectionPath, bytes: Vec<u8>) -> Result<(), Error>;

    /// Remove a collection.  Returns `false` if there was nothing to remove.
    async fn remove(&self, path: &CollectionPath) -> Result<bool, Error>;

    async fn exists(&self, path: &CollectionPath) -> Result<bool, Error>;

    /// Prepare the storage root.  Called once when a store is opened.
    async fn ensure_root(&self) -> Result<(), Error> {
        Ok(())
    }
}

#[async_trait]
impl<T: Persistence + ?Sized> Persistence for Arc<T> {
    async fn read(&self, path: &CollectionPath) -> Result<Option<Vec<u8>>, Error> {
        self.as_ref().read(path).await
    }

    async fn write(&self, path: &CollectionPath, bytes: Vec<u8>) -> Result<(), Error> {
        self.as_ref().write(path, bytes).await
    }

    async fn remove(&self, path: &CollectionPath) -> Result<bool, Error> {
        self.as_ref().remove(path).await
    }

    async fn exists(&self, path: &CollectionPath) -> Result<bool, Error> {
        self.as_ref().exists(path).await
    }

    async fn ensure_root(&self) -> Result<(), Error> {
        self.as_ref().ensure_root().await
    }
}

#[async_trait]
impl<T: Persistence + ?Sized> Persistence for Box<T> {
    async fn read(&self, path: &CollectionPath) -> Result<Option<Vec<u8>>, Error> {
        self.as_ref().read(path).await
    }

    async fn write(&self, path: &CollectionPath, bytes: Vec<u8>) -> Result<(), Error> {
        self.as_ref().write(path, bytes).await
    }

    async fn remove(&self, path: &CollectionPath) -> Result<bool, Error> {
        self.as_ref().remove(path).await
    }

    async fn exists(&self, path: &CollectionPath) -> Result<bool, Error> {
        self.as_ref().exists(path).await
    }

    async fn ensure_root(&self) -> Result<(), Error> {
        self.as_ref().ensure_root().await
    }
}
