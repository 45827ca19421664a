//! Core filedoc types.
//!
//! - `CollectionPath`: a normalized collection id, mapped to one `.json` file
//! - `FieldPath`: a parsed `a.b[0].c` expression locating a value inside a collection
//! - `Persistence`: async storage of whole collections as bytes
//! - `Error`: failures shared by every store

pub mod error;
pub mod field_path;
pub mod path;
pub mod store;

// Re-export core types (the `collection!` macro is auto-exported by #[macro_export])
pub use error::Error;
pub use field_path::{Accessor, Error as FieldPathError, FieldPath};
pub use path::{CollectionPath, Error as PathError, COLLECTION_EXTENSION};
pub use store::Persistence;
