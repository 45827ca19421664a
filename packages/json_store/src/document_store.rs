//! The document store: one JSON collection per file, with nested field updates.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::value::Value as JsonValue;
use serde_json::Map;

use filedoc_store::{CollectionPath, Error, FieldPath, FieldPathError, Persistence};

use crate::config::{Autocatch, StoreConfig};
use crate::escape::escape;
use crate::json_utils;
use crate::local_disk::LocalDisk;
use crate::locks::{CollectionGuard, CollectionLocks};

/// A field key as given by the caller.
///
/// Keys without `.` or `[` are used as a property name directly and never reach the field-path
/// parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKey<'key> {
    Property(&'key str),
    Path(FieldPath),
}

impl<'key> FieldKey<'key> {
    /// Classifies `key`.  An empty key means "no key": the whole collection.
    pub fn parse(key: &'key str) -> Result<Option<Self>, FieldPathError> {
        if key.is_empty() {
            Ok(None)
        } else if FieldPath::is_simple(key) {
            Ok(Some(FieldKey::Property(key)))
        } else {
            Ok(Some(FieldKey::Path(FieldPath::parse(key)?)))
        }
    }

    pub fn get<'doc>(
        &self,
        document: &'doc JsonValue,
    ) -> Result<Option<&'doc JsonValue>, FieldPathError> {
        match self {
            FieldKey::Property(name) => Ok(document.as_object().and_then(|map| map.get(*name))),
            FieldKey::Path(path) => json_utils::get_path(document, path),
        }
    }

    pub fn set(&self, document: &mut JsonValue, value: JsonValue) -> Result<(), FieldPathError> {
        match self {
            FieldKey::Property(name) => {
                json_utils::set_property(document, name, value);
                Ok(())
            }
            FieldKey::Path(path) => json_utils::set_path(document, path, value),
        }
    }

    pub fn delete(&self, document: &mut JsonValue) -> Result<Option<JsonValue>, FieldPathError> {
        match self {
            FieldKey::Property(name) => Ok(json_utils::delete_property(document, name)),
            FieldKey::Path(path) => json_utils::delete_path(document, path),
        }
    }
}

/// Hands a storage failure to the configured autocatch and returns what the caller should see.
fn deliver(autocatch: &Autocatch, error: Error) -> Error {
    if !error.is_storage_failure() {
        return error;
    }

    match autocatch {
        Autocatch::Off => error,
        Autocatch::Exit => {
            log::error!("{}", error);
            std::process::exit(1);
        }
        Autocatch::Handler(handler) => {
            handler(&error);
            Error::Handled
        }
    }
}

/// An embedded JSON document store.
///
/// Each collection is one JSON value persisted whole.  `put` and `del` accept an optional field
/// key (`"name"`, `"user.settings[0].name"`) to change a single nested location; the store loads
/// the collection, applies the change and writes the whole document back.
///
/// Every string leaf is quote-escaped (`"` to `&quot;`, `'` to `&apos;`) before it is written.
///
/// With `lock_collections` enabled, `put` and `del` on the same collection are serialized for
/// their whole read-modify-write; otherwise concurrent writers race and the last to finish wins.
///
/// # Example
///
/// ```rust
/// use filedoc_json_store::{DocumentStore, StoreConfig};
/// use serde_json::json;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let dir = tempfile::tempdir().unwrap();
/// let store = DocumentStore::open(StoreConfig::new(dir.path())).await.unwrap();
///
/// store.put("users/alice", 5.into(), Some("scores[0]")).await.unwrap();
/// assert_eq!(
///     store.get("users/alice").await.unwrap(),
///     Some(json!({"scores": [5]}))
/// );
/// # });
/// ```
pub struct DocumentStore<P: Persistence = LocalDisk> {
    persistence: Arc<P>,
    autocatch: Autocatch,
    locks: Option<Arc<CollectionLocks>>,
}

impl<P: Persistence> Clone for DocumentStore<P> {
    fn clone(&self) -> Self {
        Self {
            persistence: self.persistence.clone(),
            autocatch: self.autocatch.clone(),
            locks: self.locks.clone(),
        }
    }
}

impl<P: Persistence> std::fmt::Debug for DocumentStore<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStore")
            .field("autocatch", &self.autocatch)
            .field("lock_collections", &self.locks.is_some())
            .finish_non_exhaustive()
    }
}

impl DocumentStore<LocalDisk> {
    /// Opens a store over the configured base directory, creating it if absent.
    pub async fn open(config: StoreConfig) -> Result<Self, Error> {
        let root = config
            .resolve_root()
            .map_err(|err| deliver(&config.autocatch, err))?;
        Self::init(LocalDisk::new(root), config).await
    }

    /// The directory holding this store's collection files.
    pub fn root(&self) -> &std::path::Path {
        self.persistence.root()
    }
}

impl<P: Persistence> DocumentStore<P> {
    /// A store over `persistence`.  The persistence root is assumed to be ready; see [`init`].
    ///
    /// [`init`]: DocumentStore::init
    pub fn with_persistence(persistence: P, config: StoreConfig) -> Self {
        DocumentStore {
            persistence: Arc::new(persistence),
            autocatch: config.autocatch,
            locks: config
                .lock_collections
                .then(|| Arc::new(CollectionLocks::new())),
        }
    }

    /// A store over `persistence`, preparing its root first.
    pub async fn init(persistence: P, config: StoreConfig) -> Result<Self, Error> {
        let store = Self::with_persistence(persistence, config);
        store.route(store.persistence.ensure_root().await)?;
        Ok(store)
    }

    pub fn persistence(&self) -> &P {
        &self.persistence
    }

    fn route<T>(&self, result: Result<T, Error>) -> Result<T, Error> {
        result.map_err(|err| deliver(&self.autocatch, err))
    }

    async fn lock(&self, path: &CollectionPath) -> Option<CollectionGuard<'_>> {
        match &self.locks {
            Some(locks) => Some(locks.lock(path).await),
            None => None,
        }
    }

    async fn load(&self, path: &CollectionPath) -> Result<Option<JsonValue>, Error> {
        let bytes = match self.persistence.read(path).await? {
            Some(bytes) => bytes,
            None => return Ok(None),
        };

        // An empty file reads as a missing collection.
        if bytes.is_empty() {
            return Ok(None);
        }

        serde_json::from_slice(&bytes).map(Some).map_err(|source| {
            log::warn!("Collection {} holds malformed JSON: {}", path, source);
            Error::Parse {
                collection: path.to_string(),
                source,
            }
        })
    }

    async fn save(&self, path: &CollectionPath, document: &JsonValue) -> Result<(), Error> {
        let bytes = serde_json::to_vec(document).map_err(|source| Error::Serialize {
            collection: path.to_string(),
            source,
        })?;
        self.persistence.write(path, bytes).await
    }

    /// Reads a whole collection.  A missing collection is `Ok(None)`.
    pub async fn get(&self, id: &str) -> Result<Option<JsonValue>, Error> {
        let path = CollectionPath::resolve(id)?;
        self.route(self.load(&path).await)
    }

    /// Reads a single field of a collection.
    ///
    /// `Ok(None)` when either the collection or the field is missing.
    pub async fn get_field(&self, id: &str, field: &str) -> Result<Option<JsonValue>, Error> {
        let path = CollectionPath::resolve(id)?;
        let key = FieldKey::parse(field)?;

        let document = match self.route(self.load(&path).await)? {
            Some(document) => document,
            None => return Ok(None),
        };

        match key {
            None => Ok(Some(document)),
            Some(key) => Ok(key.get(&document)?.cloned()),
        }
    }

    /// Writes `value` as the whole collection, or at `field` inside it.
    ///
    /// With a field, a missing collection starts out as `{}`.  Returns the whole saved document.
    pub async fn put(
        &self,
        id: &str,
        value: JsonValue,
        field: Option<&str>,
    ) -> Result<JsonValue, Error> {
        let path = CollectionPath::resolve(id)?;
        let key = field.map(FieldKey::parse).transpose()?.flatten();

        let _guard = self.lock(&path).await;

        let mut document = match key {
            None => value,
            Some(key) => {
                let mut document = self
                    .route(self.load(&path).await)?
                    .unwrap_or_else(|| JsonValue::Object(Map::new()));
                key.set(&mut document, value)?;
                document
            }
        };

        escape(&mut document);
        self.route(self.save(&path, &document).await)?;

        Ok(document)
    }

    /// Deletes the whole collection, or the value at `field` inside it.
    ///
    /// Deleting a missing collection (or a field of one) is a successful no-op returning
    /// `Ok(None)`.  Deleting a field returns the updated document.
    pub async fn del(&self, id: &str, field: Option<&str>) -> Result<Option<JsonValue>, Error> {
        let path = CollectionPath::resolve(id)?;
        let key = field.map(FieldKey::parse).transpose()?.flatten();

        let _guard = self.lock(&path).await;

        let key = match key {
            Some(key) => key,
            None => {
                self.route(self.persistence.remove(&path).await)?;
                return Ok(None);
            }
        };

        let mut document = match self.route(self.load(&path).await)? {
            Some(document) => document,
            None => return Ok(None),
        };

        key.delete(&mut document)?;
        escape(&mut document);
        self.route(self.save(&path, &document).await)?;

        Ok(Some(document))
    }

    pub async fn exists(&self, id: &str) -> Result<bool, Error> {
        let path = CollectionPath::resolve(id)?;
        self.route(self.persistence.exists(&path).await)
    }

    /// Reads a collection and deserializes it as `T`.
    pub async fn get_as<T: DeserializeOwned>(&self, id: &str) -> Result<Option<T>, Error> {
        match self.get(id).await? {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|err| Error::Record {
                    message: format!("{}", err),
                }),
            None => Ok(None),
        }
    }

    /// Serializes `record` and writes it like [`put`](DocumentStore::put).
    pub async fn put_record<T: Serialize>(
        &self,
        id: &str,
        record: &T,
        field: Option<&str>,
    ) -> Result<JsonValue, Error> {
        let value = serde_json::to_value(record).map_err(|err| Error::Record {
            message: format!("{}", err),
        })?;
        self.put(id, value, field).await
    }
}
