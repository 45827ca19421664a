//! Store configuration.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;

use filedoc_store::Error;

/// Base directory used when none is configured.
pub const DEFAULT_DATA_DIR: &str = "data";

/// Callback receiving storage failures in place of the caller.
pub type ErrorHandler = Arc<dyn Fn(&Error) + Send + Sync>;

/// What happens to I/O, parse and serialization failures.
#[derive(Clone, Default)]
pub enum Autocatch {
    /// Failures are returned to the caller.
    #[default]
    Off,
    /// Failures are logged and the process exits with status 1.
    Exit,
    /// Failures go to the handler; the caller receives `Error::Handled`.
    Handler(ErrorHandler),
}

impl Autocatch {
    pub fn handler(f: impl Fn(&Error) + Send + Sync + 'static) -> Self {
        Autocatch::Handler(Arc::new(f))
    }
}

impl fmt::Debug for Autocatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Autocatch::Off => write!(f, "Off"),
            Autocatch::Exit => write!(f, "Exit"),
            Autocatch::Handler(_) => write!(f, "Handler(..)"),
        }
    }
}

/// Configuration of a [`DocumentStore`](crate::DocumentStore).
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Base directory for collections.  Relative paths are resolved against the directory of the
    /// running executable.
    pub path: PathBuf,
    pub autocatch: Autocatch,
    /// Serialize `put`/`del` calls per collection.
    pub lock_collections: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            path: PathBuf::from(DEFAULT_DATA_DIR),
            autocatch: Autocatch::Off,
            lock_collections: true,
        }
    }
}

impl StoreConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        StoreConfig {
            path: path.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn autocatch(mut self, autocatch: Autocatch) -> Self {
        self.autocatch = autocatch;
        self
    }

    #[must_use]
    pub fn lock_collections(mut self, lock: bool) -> Self {
        self.lock_collections = lock;
        self
    }

    /// The base directory with relative paths anchored at `entry_dir`.
    pub fn resolve_root_from(&self, entry_dir: &Path) -> PathBuf {
        if self.path.is_absolute() {
            self.path.clone()
        } else {
            entry_dir.join(&self.path)
        }
    }

    /// The base directory with relative paths anchored at the running executable's directory.
    pub fn resolve_root(&self) -> Result<PathBuf, Error> {
        if self.path.is_absolute() {
            return Ok(self.path.clone());
        }

        let exe = std::env::current_exe().map_err(|err| Error::io(&self.path, err))?;
        let entry_dir = exe.parent().ok_or_else(|| Error::ImplementationFailure {
            message: format!(
                "Executable path ({}) has no parent directory to resolve {} against",
                exe.display(),
                self.path.display()
            ),
        })?;
        Ok(self.resolve_root_from(entry_dir))
    }
}

/// Serde-friendly form of [`StoreConfig`], e.g. loaded from a JSON file.
///
/// ```json
/// { "path": "data", "autocatch": false, "lock_collections": true }
/// ```
///
/// `autocatch: true` maps to [`Autocatch::Exit`].  Callback handlers can only be set in code.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoreOptions {
    pub path: PathBuf,
    pub autocatch: bool,
    pub lock_collections: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        StoreOptions {
            path: PathBuf::from(DEFAULT_DATA_DIR),
            autocatch: false,
            lock_collections: true,
        }
    }
}

impl From<StoreOptions> for StoreConfig {
    fn from(options: StoreOptions) -> Self {
        StoreConfig {
            path: options.path,
            autocatch: if options.autocatch {
                Autocatch::Exit
            } else {
                Autocatch::Off
            },
            lock_collections: options.lock_collections,
        }
    }
}
