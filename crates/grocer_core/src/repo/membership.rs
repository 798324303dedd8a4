//! Store membership check used to authorize item creation.

use crate::model::store::{StoreId, UserId};
use crate::repo::RepoResult;
use rusqlite::{params, Connection};

/// Answers whether a user may add items to a store's trips.
pub trait StoreMembership {
    fn is_active_store_member(&self, user_id: UserId, store_id: StoreId) -> RepoResult<bool>;
}

/// Membership backed by the `store_users` table.
pub struct SqliteStoreMembership<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteStoreMembership<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl StoreMembership for SqliteStoreMembership<'_> {
    fn is_active_store_member(&self, user_id: UserId, store_id: StoreId) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM store_users
                WHERE store_id = ?1
                  AND user_id = ?2
                  AND active = 1
            );",
            params![store_id.to_string(), user_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }
}
