//! Store category, trip category and override-settings persistence.
//!
//! # Responsibility
//! - Look up store categories by id or by name within one store.
//! - Create/delete trip-scoped category join rows.
//! - Read and write the per-store item category override map.
//!
//! # Invariants
//! - `(grocery_trip_id, store_category_id)` is unique, so one trip never
//!   holds two join rows for the same store category.
//! - Override settings are stored as one JSON object per store.

use crate::model::store::{
    GroceryTripCategory, StoreCategory, StoreCategoryId, StoreId, StoreItemCategorySettings,
    TripCategoryId, TripCategorySummary, TripId,
};
use crate::repo::{parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::BTreeMap;
use uuid::Uuid;

const TRIP_CATEGORY_SELECT_SQL: &str = "SELECT
    gtc.id AS id,
    gtc.grocery_trip_id AS grocery_trip_id,
    gtc.store_category_id AS store_category_id,
    sc.name AS name
FROM grocery_trip_categories gtc
INNER JOIN store_categories sc ON sc.id = gtc.store_category_id";

/// Repository interface for category lookups and trip category rows.
pub trait CategoryRepository {
    fn get_store_category(&self, id: StoreCategoryId) -> RepoResult<Option<StoreCategory>>;
    fn find_store_category_by_name(
        &self,
        store_id: StoreId,
        name: &str,
    ) -> RepoResult<Option<StoreCategory>>;
    fn list_store_categories(&self, store_id: StoreId) -> RepoResult<Vec<StoreCategory>>;
    /// Adds an ad hoc category to a store taxonomy.
    fn create_store_category(&self, store_id: StoreId, name: &str) -> RepoResult<StoreCategory>;
    fn get_trip_category(&self, id: TripCategoryId) -> RepoResult<Option<GroceryTripCategory>>;
    /// Finds the trip's join row whose store category carries `name`.
    fn find_trip_category_by_name(
        &self,
        trip_id: TripId,
        name: &str,
    ) -> RepoResult<Option<GroceryTripCategory>>;
    fn create_trip_category(
        &self,
        trip_id: TripId,
        store_category_id: StoreCategoryId,
    ) -> RepoResult<GroceryTripCategory>;
    fn delete_trip_category(&self, id: TripCategoryId) -> RepoResult<()>;
    /// Lists a trip's categories by name with their item counts.
    fn list_trip_categories(&self, trip_id: TripId) -> RepoResult<Vec<TripCategorySummary>>;
    /// Loads the override map; an absent row reads as an empty map.
    fn item_category_settings(&self, store_id: StoreId) -> RepoResult<StoreItemCategorySettings>;
    fn save_item_category_settings(&self, settings: &StoreItemCategorySettings)
        -> RepoResult<()>;
}

/// SQLite-backed category repository.
pub struct SqliteCategoryRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCategoryRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl CategoryRepository for SqliteCategoryRepository<'_> {
    fn get_store_category(&self, id: StoreCategoryId) -> RepoResult<Option<StoreCategory>> {
        self.conn
            .query_row(
                "SELECT id, store_id, name FROM store_categories WHERE id = ?1;",
                [id.to_string()],
                |row| Ok(parse_store_category_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn find_store_category_by_name(
        &self,
        store_id: StoreId,
        name: &str,
    ) -> RepoResult<Option<StoreCategory>> {
        self.conn
            .query_row(
                "SELECT id, store_id, name
                 FROM store_categories
                 WHERE store_id = ?1
                   AND name = ?2;",
                params![store_id.to_string(), name],
                |row| Ok(parse_store_category_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn list_store_categories(&self, store_id: StoreId) -> RepoResult<Vec<StoreCategory>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, store_id, name
             FROM store_categories
             WHERE store_id = ?1
             ORDER BY name ASC;",
        )?;
        let mut rows = stmt.query([store_id.to_string()])?;
        let mut categories = Vec::new();
        while let Some(row) = rows.next()? {
            categories.push(parse_store_category_row(row)?);
        }
        Ok(categories)
    }

    fn create_store_category(&self, store_id: StoreId, name: &str) -> RepoResult<StoreCategory> {
        let id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO store_categories (id, store_id, name) VALUES (?1, ?2, ?3);",
            params![id.to_string(), store_id.to_string(), name],
        )?;
        Ok(StoreCategory {
            id,
            store_id,
            name: name.to_string(),
        })
    }

    fn get_trip_category(&self, id: TripCategoryId) -> RepoResult<Option<GroceryTripCategory>> {
        self.conn
            .query_row(
                &format!("{TRIP_CATEGORY_SELECT_SQL} WHERE gtc.id = ?1;"),
                [id.to_string()],
                |row| Ok(parse_trip_category_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn find_trip_category_by_name(
        &self,
        trip_id: TripId,
        name: &str,
    ) -> RepoResult<Option<GroceryTripCategory>> {
        self.conn
            .query_row(
                &format!(
                    "{TRIP_CATEGORY_SELECT_SQL}
                     WHERE gtc.grocery_trip_id = ?1
                       AND sc.name = ?2;"
                ),
                params![trip_id.to_string(), name],
                |row| Ok(parse_trip_category_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn create_trip_category(
        &self,
        trip_id: TripId,
        store_category_id: StoreCategoryId,
    ) -> RepoResult<GroceryTripCategory> {
        let id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO grocery_trip_categories (id, grocery_trip_id, store_category_id)
             VALUES (?1, ?2, ?3);",
            params![
                id.to_string(),
                trip_id.to_string(),
                store_category_id.to_string()
            ],
        )?;
        self.get_trip_category(id)?.ok_or(RepoError::NotFound {
            entity: "grocery trip category",
            id,
        })
    }

    fn delete_trip_category(&self, id: TripCategoryId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM grocery_trip_categories WHERE id = ?1;",
            [id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "grocery trip category",
                id,
            });
        }
        Ok(())
    }

    fn list_trip_categories(&self, trip_id: TripId) -> RepoResult<Vec<TripCategorySummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                gtc.id AS id,
                gtc.grocery_trip_id AS grocery_trip_id,
                gtc.store_category_id AS store_category_id,
                sc.name AS name,
                (SELECT COUNT(*) FROM items i WHERE i.category_id = gtc.id) AS item_count
             FROM grocery_trip_categories gtc
             INNER JOIN store_categories sc ON sc.id = gtc.store_category_id
             WHERE gtc.grocery_trip_id = ?1
             ORDER BY sc.name ASC, gtc.id ASC;",
        )?;
        let mut rows = stmt.query([trip_id.to_string()])?;
        let mut summaries = Vec::new();
        while let Some(row) = rows.next()? {
            summaries.push(TripCategorySummary {
                category: parse_trip_category_row(row)?,
                item_count: row.get("item_count")?,
            });
        }
        Ok(summaries)
    }

    fn item_category_settings(&self, store_id: StoreId) -> RepoResult<StoreItemCategorySettings> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT items FROM store_item_category_settings WHERE store_id = ?1;",
                [store_id.to_string()],
                |row| row.get(0),
            )
            .optional()?;

        let items = match raw {
            Some(text) => serde_json::from_str::<BTreeMap<String, Option<String>>>(&text)
                .map_err(|err| {
                    RepoError::InvalidData(format!(
                        "invalid json in store_item_category_settings.items: {err}"
                    ))
                })?,
            None => BTreeMap::new(),
        };

        Ok(StoreItemCategorySettings { store_id, items })
    }

    fn save_item_category_settings(
        &self,
        settings: &StoreItemCategorySettings,
    ) -> RepoResult<()> {
        let json = serde_json::to_string(&settings.items).map_err(|err| {
            RepoError::InvalidData(format!("cannot encode item category settings: {err}"))
        })?;
        self.conn.execute(
            "INSERT INTO store_item_category_settings (store_id, items)
             VALUES (?1, ?2)
             ON CONFLICT(store_id) DO UPDATE SET
                items = excluded.items,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![settings.store_id.to_string(), json],
        )?;
        Ok(())
    }
}

fn parse_store_category_row(row: &Row<'_>) -> RepoResult<StoreCategory> {
    let id_text: String = row.get("id")?;
    let store_text: String = row.get("store_id")?;
    Ok(StoreCategory {
        id: parse_uuid(&id_text, "store_categories.id")?,
        store_id: parse_uuid(&store_text, "store_categories.store_id")?,
        name: row.get("name")?,
    })
}

fn parse_trip_category_row(row: &Row<'_>) -> RepoResult<GroceryTripCategory> {
    let id_text: String = row.get("id")?;
    let trip_text: String = row.get("grocery_trip_id")?;
    let store_category_text: String = row.get("store_category_id")?;
    Ok(GroceryTripCategory {
        id: parse_uuid(&id_text, "grocery_trip_categories.id")?,
        grocery_trip_id: parse_uuid(&trip_text, "grocery_trip_categories.grocery_trip_id")?,
        store_category_id: parse_uuid(
            &store_category_text,
            "grocery_trip_categories.store_category_id",
        )?,
        name: row.get("name")?,
    })
}
