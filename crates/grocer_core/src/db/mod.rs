//! Grocery schema storage: connection bootstrap and migrations.
//!
//! # Invariants
//! - `PRAGMA user_version` holds the applied grocery schema version.
//! - A connection is handed out only after its schema is current and every
//!   table the item engine touches exists.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Storage failures below the repository layer.
#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// The file was written by a newer build of the grocery schema.
    SchemaTooNew { found: u32, supported: u32 },
    /// One migration step failed; nothing from the run was committed.
    MigrationFailed {
        version: u32,
        name: &'static str,
        source: rusqlite::Error,
    },
    /// `user_version` claims a current schema but a table is absent.
    MissingTable { table: &'static str, version: u32 },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "sqlite error: {err}"),
            Self::SchemaTooNew { found, supported } => write!(
                f,
                "grocery schema v{found} is newer than this build (v{supported})"
            ),
            Self::MigrationFailed {
                version,
                name,
                source,
            } => write!(f, "grocery migration v{version} `{name}` failed: {source}"),
            Self::MissingTable { table, version } => write!(
                f,
                "grocery schema v{version} is missing table `{table}`"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) | Self::MigrationFailed { source: err, .. } => Some(err),
            Self::SchemaTooNew { .. } | Self::MissingTable { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
