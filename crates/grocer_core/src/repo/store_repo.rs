//! Store, membership, trip and staple item persistence.
//!
//! # Responsibility
//! - Create stores with their seeded category taxonomy.
//! - Create and load grocery trips and staple items.
//! - Refresh a trip's `updated_at` whenever one of its items changes.
//!
//! # Invariants
//! - Every store owns the full `DEFAULT_STORE_CATEGORIES` set and an
//!   override settings row from the moment it is created.

use crate::model::store::{
    GroceryTrip, StapleItem, StapleItemId, Store, StoreId, TripId, UserId,
    DEFAULT_STORE_CATEGORIES,
};
use crate::repo::{bool_to_int, parse_flag, parse_uuid, RepoError, RepoResult};
use log::info;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use uuid::Uuid;

/// Repository interface for store-level records.
pub trait StoreRepository {
    /// Creates a store and seeds its default categories atomically.
    fn create_store(&self, name: &str) -> RepoResult<Store>;
    fn get_store(&self, id: StoreId) -> RepoResult<Option<Store>>;
    /// Adds `user_id` as an active member (re-activates a former member).
    fn add_store_member(&self, store_id: StoreId, user_id: UserId) -> RepoResult<()>;
    fn set_store_member_active(
        &self,
        store_id: StoreId,
        user_id: UserId,
        active: bool,
    ) -> RepoResult<()>;
    fn create_trip(&self, store_id: StoreId, name: &str) -> RepoResult<GroceryTrip>;
    fn get_trip(&self, id: TripId) -> RepoResult<Option<GroceryTrip>>;
    /// Bumps `updated_at` of a trip to now.
    fn touch_trip(&self, id: TripId) -> RepoResult<()>;
    fn create_staple_item(&self, store_id: StoreId, name: &str) -> RepoResult<StapleItem>;
    fn get_staple_item(&self, id: StapleItemId) -> RepoResult<Option<StapleItem>>;
}

/// SQLite-backed store repository.
pub struct SqliteStoreRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteStoreRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl StoreRepository for SqliteStoreRepository<'_> {
    fn create_store(&self, name: &str) -> RepoResult<Store> {
        let id = Uuid::new_v4();
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO stores (id, name) VALUES (?1, ?2);",
            params![id.to_string(), name],
        )?;
        for category in DEFAULT_STORE_CATEGORIES {
            tx.execute(
                "INSERT INTO store_categories (id, store_id, name) VALUES (?1, ?2, ?3);",
                params![Uuid::new_v4().to_string(), id.to_string(), category],
            )?;
        }
        tx.execute(
            "INSERT INTO store_item_category_settings (store_id, items) VALUES (?1, '{}');",
            [id.to_string()],
        )?;
        tx.commit()?;

        info!(
            "event=store_create module=repo status=ok store_id={} categories={}",
            id,
            DEFAULT_STORE_CATEGORIES.len()
        );
        self.get_store(id)?
            .ok_or(RepoError::NotFound { entity: "store", id })
    }

    fn get_store(&self, id: StoreId) -> RepoResult<Option<Store>> {
        self.conn
            .query_row(
                "SELECT id, name, created_at, updated_at FROM stores WHERE id = ?1;",
                [id.to_string()],
                |row| Ok(parse_store_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn add_store_member(&self, store_id: StoreId, user_id: UserId) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO store_users (store_id, user_id, active)
             VALUES (?1, ?2, 1)
             ON CONFLICT(store_id, user_id) DO UPDATE SET active = 1;",
            params![store_id.to_string(), user_id.to_string()],
        )?;
        Ok(())
    }

    fn set_store_member_active(
        &self,
        store_id: StoreId,
        user_id: UserId,
        active: bool,
    ) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE store_users SET active = ?3 WHERE store_id = ?1 AND user_id = ?2;",
            params![store_id.to_string(), user_id.to_string(), bool_to_int(active)],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "store member",
                id: user_id,
            });
        }
        Ok(())
    }

    fn create_trip(&self, store_id: StoreId, name: &str) -> RepoResult<GroceryTrip> {
        let id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO grocery_trips (id, store_id, name) VALUES (?1, ?2, ?3);",
            params![id.to_string(), store_id.to_string(), name],
        )?;
        self.get_trip(id)?.ok_or(RepoError::NotFound {
            entity: "grocery trip",
            id,
        })
    }

    fn get_trip(&self, id: TripId) -> RepoResult<Option<GroceryTrip>> {
        self.conn
            .query_row(
                "SELECT id, store_id, name, completed, created_at, updated_at
                 FROM grocery_trips
                 WHERE id = ?1;",
                [id.to_string()],
                |row| Ok(parse_trip_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn touch_trip(&self, id: TripId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE grocery_trips
             SET updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            [id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "grocery trip",
                id,
            });
        }
        Ok(())
    }

    fn create_staple_item(&self, store_id: StoreId, name: &str) -> RepoResult<StapleItem> {
        let id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO store_staple_items (id, store_id, name) VALUES (?1, ?2, ?3);",
            params![id.to_string(), store_id.to_string(), name],
        )?;
        Ok(StapleItem {
            id,
            store_id,
            name: name.to_string(),
        })
    }

    fn get_staple_item(&self, id: StapleItemId) -> RepoResult<Option<StapleItem>> {
        self.conn
            .query_row(
                "SELECT id, store_id, name FROM store_staple_items WHERE id = ?1;",
                [id.to_string()],
                |row| {
                    let id_text: String = row.get("id")?;
                    let store_text: String = row.get("store_id")?;
                    let name: String = row.get("name")?;
                    Ok((id_text, store_text, name))
                },
            )
            .optional()?
            .map(|(id_text, store_text, name)| {
                Ok(StapleItem {
                    id: parse_uuid(&id_text, "store_staple_items.id")?,
                    store_id: parse_uuid(&store_text, "store_staple_items.store_id")?,
                    name,
                })
            })
            .transpose()
    }
}

fn parse_store_row(row: &Row<'_>) -> RepoResult<Store> {
    let id_text: String = row.get("id")?;
    Ok(Store {
        id: parse_uuid(&id_text, "stores.id")?,
        name: row.get("name")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_trip_row(row: &Row<'_>) -> RepoResult<GroceryTrip> {
    let id_text: String = row.get("id")?;
    let store_text: String = row.get("store_id")?;
    Ok(GroceryTrip {
        id: parse_uuid(&id_text, "grocery_trips.id")?,
        store_id: parse_uuid(&store_text, "grocery_trips.store_id")?,
        name: row.get("name")?,
        completed: parse_flag(row.get("completed")?, "grocery_trips.completed")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
