//! Item repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD APIs over trip `items`.
//! - Expose the position queries the allocator builds on (bounds, range
//!   shifts, single-row rewrites).
//!
//! # Invariants
//! - Trip listing is deterministic: `position ASC, created_at ASC, id ASC`.
//! - Writes never touch rows of another trip.

use crate::model::item::{Item, ItemId, MealId};
use crate::model::store::{StapleItemId, TripCategoryId, TripId, UserId};
use crate::repo::{
    bool_to_int, parse_flag, parse_optional_uuid, parse_uuid, RepoError, RepoResult,
};
use rusqlite::{params, Connection, OptionalExtension, Row};

const ITEM_SELECT_SQL: &str = "SELECT
    id,
    grocery_trip_id,
    user_id,
    name,
    quantity,
    completed,
    position,
    category_id,
    staple_item_id,
    meal_id,
    created_at,
    updated_at
FROM items";

/// Insert model for one item. Timestamps are assigned by storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    pub id: ItemId,
    pub grocery_trip_id: TripId,
    pub user_id: UserId,
    pub name: String,
    pub quantity: i32,
    pub completed: bool,
    pub position: i64,
    pub category_id: Option<TripCategoryId>,
    pub staple_item_id: Option<StapleItemId>,
    pub meal_id: Option<MealId>,
}

/// Inclusive position window used by reorder shifts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionRange {
    pub low: i64,
    pub high: i64,
}

impl PositionRange {
    pub fn contains(&self, position: i64) -> bool {
        self.low <= position && position <= self.high
    }
}

/// Repository interface for item persistence and position maintenance.
pub trait ItemRepository {
    fn create_item(&self, item: &NewItem) -> RepoResult<Item>;
    fn get_item(&self, id: ItemId) -> RepoResult<Option<Item>>;
    /// Writes name, quantity, completed, position and category of `item`.
    fn update_item(&self, item: &Item) -> RepoResult<Item>;
    fn delete_item(&self, id: ItemId) -> RepoResult<()>;
    /// Lists one trip's items in display order.
    fn list_trip_items(&self, trip_id: TripId) -> RepoResult<Vec<Item>>;
    fn count_items_in_category(&self, category_id: TripCategoryId) -> RepoResult<u32>;
    /// Returns `(min, max)` position of a trip, ignoring `exclude` when set.
    fn position_bounds(
        &self,
        trip_id: TripId,
        exclude: Option<ItemId>,
    ) -> RepoResult<Option<(i64, i64)>>;
    /// Adds `delta` to every position inside `range`, skipping `exclude`.
    fn shift_positions(
        &self,
        trip_id: TripId,
        range: PositionRange,
        delta: i64,
        exclude: ItemId,
    ) -> RepoResult<usize>;
    fn set_position(&self, id: ItemId, position: i64) -> RepoResult<()>;
}

/// SQLite-backed item repository.
pub struct SqliteItemRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteItemRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ItemRepository for SqliteItemRepository<'_> {
    fn create_item(&self, item: &NewItem) -> RepoResult<Item> {
        self.conn.execute(
            "INSERT INTO items (
                id,
                grocery_trip_id,
                user_id,
                name,
                quantity,
                completed,
                position,
                category_id,
                staple_item_id,
                meal_id
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10);",
            params![
                item.id.to_string(),
                item.grocery_trip_id.to_string(),
                item.user_id.to_string(),
                item.name.as_str(),
                item.quantity,
                bool_to_int(item.completed),
                item.position,
                item.category_id.map(|id| id.to_string()),
                item.staple_item_id.map(|id| id.to_string()),
                item.meal_id.map(|id| id.to_string()),
            ],
        )?;
        load_required_item(self.conn, item.id)
    }

    fn get_item(&self, id: ItemId) -> RepoResult<Option<Item>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ITEM_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_item_row(row)?));
        }
        Ok(None)
    }

    fn update_item(&self, item: &Item) -> RepoResult<Item> {
        let changed = self.conn.execute(
            "UPDATE items
             SET
                name = ?2,
                quantity = ?3,
                completed = ?4,
                position = ?5,
                category_id = ?6,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![
                item.id.to_string(),
                item.name.as_str(),
                item.quantity,
                bool_to_int(item.completed),
                item.position,
                item.category_id.map(|id| id.to_string()),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "item",
                id: item.id,
            });
        }
        load_required_item(self.conn, item.id)
    }

    fn delete_item(&self, id: ItemId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM items WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound { entity: "item", id });
        }
        Ok(())
    }

    fn list_trip_items(&self, trip_id: TripId) -> RepoResult<Vec<Item>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ITEM_SELECT_SQL}
             WHERE grocery_trip_id = ?1
             ORDER BY position ASC, created_at ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([trip_id.to_string()])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_item_row(row)?);
        }
        Ok(items)
    }

    fn count_items_in_category(&self, category_id: TripCategoryId) -> RepoResult<u32> {
        let count: u32 = self.conn.query_row(
            "SELECT COUNT(*) FROM items WHERE category_id = ?1;",
            [category_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn position_bounds(
        &self,
        trip_id: TripId,
        exclude: Option<ItemId>,
    ) -> RepoResult<Option<(i64, i64)>> {
        let bounds: (Option<i64>, Option<i64>) = self.conn.query_row(
            "SELECT MIN(position), MAX(position)
             FROM items
             WHERE grocery_trip_id = ?1
               AND (?2 IS NULL OR id <> ?2);",
            params![trip_id.to_string(), exclude.map(|id| id.to_string())],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        match bounds {
            (Some(min), Some(max)) => Ok(Some((min, max))),
            _ => Ok(None),
        }
    }

    fn shift_positions(
        &self,
        trip_id: TripId,
        range: PositionRange,
        delta: i64,
        exclude: ItemId,
    ) -> RepoResult<usize> {
        let changed = self.conn.execute(
            "UPDATE items
             SET position = position + ?4,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE grocery_trip_id = ?1
               AND position BETWEEN ?2 AND ?3
               AND id <> ?5;",
            params![
                trip_id.to_string(),
                range.low,
                range.high,
                delta,
                exclude.to_string(),
            ],
        )?;
        Ok(changed)
    }

    fn set_position(&self, id: ItemId, position: i64) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE items
             SET position = ?2,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![id.to_string(), position],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound { entity: "item", id });
        }
        Ok(())
    }
}

fn load_required_item(conn: &Connection, id: ItemId) -> RepoResult<Item> {
    let item = conn
        .query_row(
            &format!("{ITEM_SELECT_SQL} WHERE id = ?1;"),
            [id.to_string()],
            |row| Ok(parse_item_row(row)),
        )
        .optional()?;
    match item {
        Some(item) => item,
        None => Err(RepoError::NotFound { entity: "item", id }),
    }
}

fn parse_item_row(row: &Row<'_>) -> RepoResult<Item> {
    let id_text: String = row.get("id")?;
    let trip_text: String = row.get("grocery_trip_id")?;
    let user_text: String = row.get("user_id")?;

    let quantity: i32 = row.get("quantity")?;
    if quantity < 1 {
        return Err(RepoError::InvalidData(format!(
            "invalid quantity `{quantity}` in items.quantity"
        )));
    }

    Ok(Item {
        id: parse_uuid(&id_text, "items.id")?,
        grocery_trip_id: parse_uuid(&trip_text, "items.grocery_trip_id")?,
        user_id: parse_uuid(&user_text, "items.user_id")?,
        name: row.get("name")?,
        quantity,
        completed: parse_flag(row.get("completed")?, "items.completed")?,
        position: row.get("position")?,
        category_id: parse_optional_uuid(row.get("category_id")?, "items.category_id")?,
        staple_item_id: parse_optional_uuid(row.get("staple_item_id")?, "items.staple_item_id")?,
        meal_id: parse_optional_uuid(row.get("meal_id")?, "items.meal_id")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
