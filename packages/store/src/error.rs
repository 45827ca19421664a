//! Error types shared by every filedoc store.

use std::io;
use std::path::PathBuf;

use crate::field_path::Error as FieldPathError;
use crate::path::Error as PathError;

/// Errors surfaced by store operations.
///
/// An absent collection is not an error: reads of missing collections return `Ok(None)`.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Path(#[from] PathError),

    #[error("invalid field path: {0}")]
    PathExpression(#[from] FieldPathError),

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("collection {collection} holds malformed JSON: {source}")]
    Parse {
        collection: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("collection {collection} could not be serialized: {source}")]
    Serialize {
        collection: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("An error occurred while converting a record: {message}")]
    Record { message: String },

    #[error("An implementation error occurred: {message}")]
    ImplementationFailure { message: String },

    /// The failure was delivered to the store's error handler instead of the caller.
    #[error("the error was delivered to the store's error handler")]
    Handled,
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this failure came from the persistence layer (I/O, parse, serialization).
    ///
    /// Only these are routed to an error handler; path errors are caller mistakes and are always
    /// returned directly.
    pub fn is_storage_failure(&self) -> bool {
        matches!(
            self,
            Error::Io { .. }
                | Error::Parse { .. }
                | Error::Serialize { .. }
                | Error::ImplementationFailure { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as StdError;

    #[test]
    fn io_error_display() {
        let e = Error::io(
            "/tmp/data/users.json",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        let display = format!("{}", e);
        assert!(display.contains("/tmp/data/users.json"));
        assert!(display.contains("denied"));
        assert!(e.source().is_some());
        assert!(e.is_storage_failure());
    }

    #[test]
    fn parse_error_display() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let e = Error::Parse {
            collection: "users/alice".to_string(),
            source,
        };
        let display = format!("{}", e);
        assert!(display.contains("users/alice"));
        assert!(display.contains("malformed"));
        assert!(e.is_storage_failure());
    }

    #[test]
    fn path_errors_are_not_storage_failures() {
        let e = Error::from(FieldPathError::Empty);
        assert!(format!("{}", e).contains("invalid field path"));
        assert!(!e.is_storage_failure());

        let e = Error::from(PathError::TooLong { max: 4096 });
        assert!(!e.is_storage_failure());
        assert!(!Error::Handled.is_storage_failure());
    }
}
