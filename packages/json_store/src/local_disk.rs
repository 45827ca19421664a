use std::io;
use std::path;

use async_trait::async_trait;
use tokio::fs;

use filedoc_store::{CollectionPath, Error as StoreError, Persistence};

/// Collections stored as `<root>/<collection>.json` files.
///
/// Parent directories are created lazily on write.  Writes go to a sibling `.tmp` file which is
/// then renamed over the collection, so readers never observe a half-written document.
#[derive(Debug, Clone)]
pub struct LocalDisk {
    root: path::PathBuf,
}

impl LocalDisk {
    /// A store rooted at `root`.  The directory is created by [`Persistence::ensure_root`].
    pub fn new(root: impl Into<path::PathBuf>) -> LocalDisk {
        LocalDisk { root: root.into() }
    }

    pub fn root(&self) -> &path::Path {
        &self.root
    }

    pub fn collection_file_path(&self, path: &CollectionPath) -> path::PathBuf {
        self.root.join(path.to_relative_file())
    }

    fn temporary_file_path(file_path: &path::Path) -> path::PathBuf {
        let mut name = file_path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        file_path.with_file_name(name)
    }
}

#[async_trait]
impl Persistence for LocalDisk {
    async fn read(&self, path: &CollectionPath) -> Result<Option<Vec<u8>>, StoreError> {
        let file_path = self.collection_file_path(path);
        log::debug!("Reading {}...", file_path.display());

        match fs::read(&file_path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StoreError::io(file_path, err)),
        }
    }

    async fn write(&self, path: &CollectionPath, bytes: Vec<u8>) -> Result<(), StoreError> {
        let file_path = self.collection_file_path(path);

        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|err| StoreError::io(parent, err))?;
        }

        log::debug!("Writing {}...", file_path.display());

        let temporary = Self::temporary_file_path(&file_path);
        fs::write(&temporary, &bytes)
            .await
            .map_err(|err| StoreError::io(&temporary, err))?;

        if let Err(err) = fs::rename(&temporary, &file_path).await {
            // Best effort; the rename error is the one worth reporting.
            let _ = fs::remove_file(&temporary).await;
            return Err(StoreError::io(file_path, err));
        }

        Ok(())
    }

    async fn remove(&self, path: &CollectionPath) -> Result<bool, StoreError> {
        let file_path = self.collection_file_path(path);
        log::debug!("Removing {}...", file_path.display());

        match fs::remove_file(&file_path).await {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(StoreError::io(file_path, err)),
        }
    }

    async fn exists(&self, path: &CollectionPath) -> Result<bool, StoreError> {
        let file_path = self.collection_file_path(path);
        fs::try_exists(&file_path)
            .await
            .map_err(|err| StoreError::io(file_path, err))
    }

    async fn ensure_root(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(|err| StoreError::io(&self.root, err))?;

        let attr = fs::metadata(&self.root)
            .await
            .map_err(|err| StoreError::io(&self.root, err))?;

        if !attr.is_dir() {
            return Err(StoreError::io(
                &self.root,
                io::Error::other("Root path must be a directory."),
            ));
        }

        if attr.permissions().readonly() {
            return Err(StoreError::io(
                &self.root,
                io::Error::other("Root directory must be writable"),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod local_disk_tests {
    use super::*;
    use filedoc_store::collection;

    #[tokio::test]
    async fn write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalDisk::new(dir.path());
        store.ensure_root().await.unwrap();

        let path = collection!("example");
        store.write(&path, b"\"Hello, world!\"".to_vec()).await.unwrap();

        assert_eq!(
            store.read(&path).await.unwrap(),
            Some(b"\"Hello, world!\"".to_vec())
        );
        assert_eq!(
            std::fs::read_to_string(dir.path().join("example.json")).unwrap(),
            "\"Hello, world!\""
        );
    }

    #[tokio::test]
    async fn nested_collections_create_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalDisk::new(dir.path());

        store
            .write(&collection!("users/alice/profile"), b"{}".to_vec())
            .await
            .unwrap();

        assert!(dir.path().join("users/alice/profile.json").is_file());
        assert!(!dir.path().join("users/alice/profile.json.tmp").exists());
    }

    #[tokio::test]
    async fn missing_collections_read_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalDisk::new(dir.path());

        assert_eq!(store.read(&collection!("nope")).await.unwrap(), None);
        assert_eq!(store.read(&collection!("no/such/dir")).await.unwrap(), None);
        assert!(!store.exists(&collection!("nope")).await.unwrap());
    }

    #[tokio::test]
    async fn remove_reports_whether_anything_was_removed() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalDisk::new(dir.path());
        let path = collection!("gone");

        store.write(&path, b"1".to_vec()).await.unwrap();
        assert!(store.exists(&path).await.unwrap());
        assert!(store.remove(&path).await.unwrap());
        assert!(!store.remove(&path).await.unwrap());
        assert!(!dir.path().join("gone.json").exists());
    }

    #[tokio::test]
    async fn ensure_root_creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("deep/data");
        let store = LocalDisk::new(&root);

        store.ensure_root().await.unwrap();
        assert!(root.is_dir());
    }

    #[tokio::test]
    async fn ensure_root_rejects_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("not_a_dir");
        std::fs::write(&root, b"x").unwrap();

        let store = LocalDisk::new(&root);
        assert!(matches!(
            store.ensure_root().await,
            Err(StoreError::Io { .. })
        ));
    }

    #[tokio::test]
    async fn reading_a_directory_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("odd.json")).unwrap();

        let store = LocalDisk::new(dir.path());
        assert!(matches!(
            store.read(&collection!("odd")).await,
            Err(StoreError::Io { .. })
        ));
    }
}
