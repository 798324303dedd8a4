//! Service-level error for item ingestion and ordering use-cases.

use crate::model::store::{StoreId, UserId};
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type ServiceResult<T> = Result<T, ItemServiceError>;

/// Errors surfaced to callers of item use-cases.
///
/// Every variant aborts the enclosing transaction; nothing is committed.
#[derive(Debug)]
pub enum ItemServiceError {
    /// User is not an active member of the trip's store.
    Unauthorized { user_id: UserId, store_id: StoreId },
    /// Referenced trip/item/category does not exist.
    NotFound { entity: &'static str, id: Uuid },
    /// Seeded data the engine relies on is missing.
    Configuration(String),
    /// Required input is malformed.
    Validation(String),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for ItemServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unauthorized { user_id, store_id } => {
                write!(f, "user {user_id} is not an active member of store {store_id}")
            }
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::Configuration(message) => write!(f, "configuration error: {message}"),
            Self::Validation(message) => write!(f, "invalid input: {message}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ItemServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ItemServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { entity, id } => Self::NotFound { entity, id },
            other => Self::Repo(other),
        }
    }
}

impl From<rusqlite::Error> for ItemServiceError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(RepoError::from(value))
    }
}

impl ItemServiceError {
    /// Stable short code used in log lines.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized { .. } => "unauthorized",
            Self::NotFound { .. } => "not_found",
            Self::Configuration(_) => "configuration",
            Self::Validation(_) => "validation",
            Self::Repo(_) => "repo",
        }
    }
}
