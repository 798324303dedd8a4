//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.
//! - Repositories borrow a `Connection`; callers that need atomicity hand
//!   them a `Transaction` (which derefs to one).

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod category_repo;
pub mod item_repo;
pub mod membership;
pub mod store_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Generic repository error for persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// Row addressed by primary key does not exist.
    NotFound { entity: &'static str, id: Uuid },
    /// Persisted row cannot be converted into a valid read model.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::NotFound { .. } => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

pub(crate) fn parse_uuid(value: &str, column: &'static str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

pub(crate) fn parse_optional_uuid(
    value: Option<String>,
    column: &'static str,
) -> RepoResult<Option<Uuid>> {
    value.map(|text| parse_uuid(&text, column)).transpose()
}

pub(crate) fn parse_flag(value: i64, column: &'static str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid flag value `{other}` in {column}"
        ))),
    }
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
