//! JSON document store.
//!
//! Every collection is one JSON document in one file.  Nested values are addressed with
//! field paths (`user.settings[0].name`) which are parsed and walked, never evaluated.

pub mod config;
pub mod document_store;
pub mod escape;
pub mod in_memory;
pub mod json_utils;
pub mod local_disk;
pub mod locks;

pub use filedoc_store::{
    collection, Accessor, CollectionPath, Error, FieldPath, FieldPathError, PathError, Persistence,
};

pub use config::{Autocatch, ErrorHandler, StoreConfig, StoreOptions};
pub use document_store::{DocumentStore, FieldKey};
pub use in_memory::InMemory;
pub use local_disk::LocalDisk;
