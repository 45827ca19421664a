//! # filedoc-cli
//!
//! Command-line access to a filedoc data directory.
//!
//! ## Usage
//!
//! ```bash
//! filedoc --data ./data put users/alice '{"name": "Alice"}'
//! filedoc --data ./data put users/alice '"dark"' --field settings[0].theme
//! filedoc --data ./data get users/alice --field settings[0]
//! filedoc --data ./data del users/alice --field settings
//! filedoc --data ./data del users/alice
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::Value as JsonValue;

use filedoc_json_store::{DocumentStore, Error as StoreError, StoreConfig};

#[derive(thiserror::Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Store(#[from] StoreError),
    #[error("could not determine the working directory: {0}")]
    WorkingDirectory(std::io::Error),
    #[error("could not render output: {0}")]
    Output(serde_json::Error),
}

/// filedoc - read and write JSON collections in a data directory
#[derive(Parser, Debug)]
#[command(name = "filedoc")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Directory holding the collections (relative to the working directory)
    #[arg(long, short, default_value = "data")]
    pub data: PathBuf,

    /// Serialize writes to the same collection (the default)
    #[arg(long, overrides_with = "no_lock")]
    pub lock: bool,

    /// Do not serialize writes to the same collection
    #[arg(long, overrides_with = "lock")]
    pub no_lock: bool,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Print a collection, or one field of it
    Get {
        id: String,
        #[arg(long, short)]
        field: Option<String>,
    },
    /// Write a collection, or one field of it, and print the saved document
    Put {
        id: String,
        /// JSON text; anything that does not parse is stored as a string
        value: String,
        #[arg(long, short)]
        field: Option<String>,
    },
    /// Delete a collection, or one field of it (printing the updated document)
    Del {
        id: String,
        #[arg(long, short)]
        field: Option<String>,
    },
}

impl Args {
    /// Whether writes take the per-collection lock.  The last of `--lock`/`--no-lock` wins.
    pub fn lock_collections(&self) -> bool {
        !self.no_lock
    }
}

/// Parses a command-line value as JSON, falling back to a plain string.
pub fn parse_value(arg: &str) -> JsonValue {
    serde_json::from_str(arg).unwrap_or_else(|_| JsonValue::String(arg.to_string()))
}

/// Runs `command` and returns what should be printed, if anything.
///
/// A missing collection or field prints as `null`.
pub async fn execute(
    store: &DocumentStore,
    command: &Command,
) -> Result<Option<JsonValue>, CliError> {
    match command {
        Command::Get { id, field: None } => {
            Ok(Some(store.get(id).await?.unwrap_or(JsonValue::Null)))
        }
        Command::Get {
            id,
            field: Some(field),
        } => Ok(Some(
            store.get_field(id, field).await?.unwrap_or(JsonValue::Null),
        )),
        Command::Put { id, value, field } => Ok(Some(
            store.put(id, parse_value(value), field.as_deref()).await?,
        )),
        Command::Del { id, field } => Ok(store.del(id, field.as_deref()).await?),
    }
}

pub fn render(value: &JsonValue, pretty: bool) -> Result<String, CliError> {
    if pretty {
        serde_json::to_string_pretty(value).map_err(CliError::Output)
    } else {
        serde_json::to_string(value).map_err(CliError::Output)
    }
}

pub async fn run(args: Args) -> Result<(), CliError> {
    let data = if args.data.is_absolute() {
        args.data.clone()
    } else {
        std::env::current_dir()
            .map_err(CliError::WorkingDirectory)?
            .join(&args.data)
    };
    log::debug!("Using data directory {}", data.display());

    let config = StoreConfig::new(data).lock_collections(args.lock_collections());
    let store = DocumentStore::open(config).await?;

    if let Some(output) = execute(&store, &args.command).await? {
        println!("{}", render(&output, args.pretty)?);
    }
    Ok(())
}
