//! Process configuration for embedding the grocery core.
//!
//! # Responsibility
//! - Describe where the database, logs and reference dataset live.
//! - Bring up the process-wide pieces (logging, reference dataset, database)
//!   in a fixed order.
//!
//! # Invariants
//! - `db_path` is never blank; `log_dir`, when set, is absolute.
//! - Without `reference_dataset_path` the bundled dataset is used.

use crate::classify::reference::{
    init_reference_dataset, ReferenceDataset, ReferenceDatasetError, ReferenceSource,
};
use crate::db::{open_db, DbError};
use crate::logging::{default_log_level, init_logging, normalize_level, normalize_log_dir};
use rusqlite::Connection;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Errors from loading configuration or starting the runtime.
#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(serde_json::Error),
    Invalid(String),
    Logging(String),
    Reference(ReferenceDatasetError),
    Db(DbError),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config json: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
            Self::Logging(message) => write!(f, "logging init failed: {message}"),
            Self::Reference(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Reference(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Invalid(_) | Self::Logging(_) => None,
        }
    }
}

impl From<ReferenceDatasetError> for ConfigError {
    fn from(value: ReferenceDatasetError) -> Self {
        Self::Reference(value)
    }
}

impl From<DbError> for ConfigError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

/// Core configuration, usually read from a JSON file.
///
/// ```json
/// {
///   "db_path": "/var/lib/grocer/grocer.sqlite3",
///   "log_level": "info",
///   "log_dir": "/var/log/grocer",
///   "reference_dataset_path": "/etc/grocer/reference_items.json"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CoreConfig {
    pub db_path: PathBuf,
    #[serde(default = "default_level_string")]
    pub log_level: String,
    /// Logging stays off when absent.
    #[serde(default)]
    pub log_dir: Option<String>,
    #[serde(default)]
    pub reference_dataset_path: Option<PathBuf>,
}

/// Handles produced by [`CoreConfig::start`].
pub struct CoreRuntime {
    pub conn: Connection,
    pub dataset: Arc<ReferenceDataset>,
}

fn default_level_string() -> String {
    default_log_level().to_string()
}

impl CoreConfig {
    /// Config with defaults for everything but the database path.
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            log_level: default_level_string(),
            log_dir: None,
            reference_dataset_path: None,
        }
    }

    /// Parses and validates a JSON config document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.db_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("db_path cannot be empty".to_string()));
        }
        normalize_level(&self.log_level).map_err(ConfigError::Invalid)?;
        if let Some(log_dir) = self.log_dir.as_deref() {
            normalize_log_dir(log_dir).map_err(ConfigError::Invalid)?;
        }
        Ok(())
    }

    /// Source the process-wide reference dataset is loaded from.
    pub fn reference_source(&self) -> ReferenceSource {
        match &self.reference_dataset_path {
            Some(path) => ReferenceSource::Path(path.clone()),
            None => ReferenceSource::Builtin,
        }
    }

    /// Starts logging (when configured), installs the reference dataset and
    /// opens the migrated database, in that order.
    pub fn start(&self) -> Result<CoreRuntime, ConfigError> {
        self.validate()?;
        if let Some(log_dir) = self.log_dir.as_deref() {
            init_logging(&self.log_level, log_dir).map_err(ConfigError::Logging)?;
        }
        let dataset = init_reference_dataset(self.reference_source())?;
        let conn = open_db(&self.db_path)?;
        Ok(CoreRuntime { conn, dataset })
    }
}
