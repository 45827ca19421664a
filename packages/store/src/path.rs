use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::de::Error as _;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;

static MAX_PATH_BYTES: usize = 4096; // Bytes

/// Suffix of every collection file on disk.
pub const COLLECTION_EXTENSION: &str = "json";

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("The collection id {id:?} names no collection")]
    Empty { id: String },
    #[error("The collection id {id:?} is invalid at component #{position} ({component:?}): {message}")]
    InvalidComponent {
        id: String,
        component: String,
        position: usize,
        message: String,
    },
    #[error("The collection id is invalid: length exceeds max of {max} bytes")]
    TooLong { max: usize },
}

/// A `CollectionPath` names one collection file relative to the store root.
///
/// Collection ids are slash-delimited (`users/alice`).  Resolution normalizes away empty
/// components and a trailing `.json`, so `"users/alice"`, `"/users/alice/"` and
/// `"users/alice.json"` all address the same file.  Components that would let the file escape
/// the store root (`.`, `..`) are rejected.
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct CollectionPath {
    components: Vec<String>,
}

impl Serialize for CollectionPath {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("{}", self))
    }
}

impl<'de> Deserialize<'de> for CollectionPath {
    fn deserialize<D>(deserializer: D) -> Result<CollectionPath, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: String = Deserialize::deserialize(deserializer)?;

        CollectionPath::resolve(&s).map_err(D::Error::custom)
    }
}

#[macro_export]
macro_rules! collection {
    ($id:expr) => {
        $crate::CollectionPath::resolve($id).unwrap()
    };
    ($($args:tt),*) => {
        compile_error!("Expected 1 argument, got something else")
    };
}

impl CollectionPath {
    /// Resolves a collection id into a normalized path.
    ///
    /// Idempotent: resolving the `Display` form of a resolved path, with or without the `.json`
    /// suffix, yields an equal path.
    pub fn resolve(id: &str) -> Result<Self, Error> {
        Self::validate_id_length(id)?;

        let trimmed = id.trim_end_matches(['/', '\\']);
        let without_extension = trimmed.strip_suffix(".json").unwrap_or(trimmed);

        let components: Vec<String> = without_extension
            .split(['/', '\\'])
            .filter(|c| !c.is_empty())
            .map(std::borrow::ToOwned::to_owned)
            .collect();

        if components.is_empty() {
            return Err(Error::Empty { id: id.to_string() });
        }

        for (position, component) in components.iter().enumerate() {
            Self::validate_component(id, component, position)?;
        }

        Ok(CollectionPath { components })
    }

    pub fn validate_id_length(id: &str) -> Result<(), Error> {
        if id.len() < MAX_PATH_BYTES {
            Ok(())
        } else {
            Err(Error::TooLong {
                max: MAX_PATH_BYTES,
            })
        }
    }

    fn validate_component(id: &str, component: &str, position: usize) -> Result<(), Error> {
        let message = if component == "." || component == ".." {
            "relative directory components may not appear in a collection id"
        } else if component.contains('\0') {
            "NUL bytes may not appear in a collection id"
        } else {
            return Ok(());
        };

        Err(Error::InvalidComponent {
            id: id.to_string(),
            component: component.to_string(),
            position,
            message: message.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.components.iter()
    }

    /// The final component, used as the file stem.
    pub fn name(&self) -> &str {
        // Resolution guarantees at least one component.
        self.components.last().map(String::as_str).unwrap_or_default()
    }

    /// Path of the collection file relative to the store root: `a/b/c.json`.
    pub fn to_relative_file(&self) -> PathBuf {
        // Appended rather than set: stems may already contain dots (`v1.2`, `archive.json`).
        let (name, parents) = match self.components.split_last() {
            Some(split) => split,
            None => return PathBuf::new(),
        };
        let mut file: PathBuf = parents.iter().collect();
        file.push(format!("{}.{}", name, COLLECTION_EXTENSION));
        file
    }
}

impl FromStr for CollectionPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CollectionPath::resolve(s)
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.components.join("/"))
    }
}

impl std::ops::Index<usize> for CollectionPath {
    type Output = String;

    fn index(&self, i: usize) -> &Self::Output {
        &self.components[i]
    }
}
