//! Store, trip and category records.
//!
//! # Invariants
//! - A `GroceryTripCategory` scopes one `StoreCategory` to one trip and is
//!   only persisted while at least one item references it.
//! - Store category names are unique within one store.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

pub type StoreId = Uuid;
pub type UserId = Uuid;
pub type TripId = Uuid;
pub type StoreCategoryId = Uuid;
pub type TripCategoryId = Uuid;
pub type StapleItemId = Uuid;

/// Label every unresolved item falls back to. Seeded in every store.
pub const DEFAULT_CATEGORY_NAME: &str = "Misc.";

/// Category taxonomy seeded into every new store.
pub const DEFAULT_STORE_CATEGORIES: &[&str] = &[
    "Produce",
    "Bakery",
    "Meat",
    "Seafood",
    "Dairy",
    "Cereal",
    "Baking",
    "Dry Goods",
    "Canned Goods",
    "Frozen Foods",
    "Cleaning",
    "Paper Products",
    "Beverages",
    "Candy & Snacks",
    "Condiments & Dressings",
    "Personal Care",
    "Baby",
    "Alcohol",
    "Pharmacy",
    DEFAULT_CATEGORY_NAME,
];

/// Shared household/grocery destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Store {
    pub id: StoreId,
    pub name: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Canonical category of one store's taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreCategory {
    pub id: StoreCategoryId,
    pub store_id: StoreId,
    pub name: String,
}

/// Reusable item template a household can re-add quickly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StapleItem {
    pub id: StapleItemId,
    pub store_id: StoreId,
    pub name: String,
}

/// One shopping instance within a store's ongoing list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroceryTrip {
    pub id: TripId,
    pub store_id: StoreId,
    pub name: String,
    pub completed: bool,
    pub created_at: i64,
    /// Epoch ms; refreshed whenever any item of the trip changes.
    pub updated_at: i64,
}

/// Join record scoping a store category to one trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroceryTripCategory {
    pub id: TripCategoryId,
    pub grocery_trip_id: TripId,
    pub store_category_id: StoreCategoryId,
    /// Denormalized `store_categories.name` for display.
    pub name: String,
}

/// Trip category read model with its current item count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripCategorySummary {
    pub category: GroceryTripCategory,
    pub item_count: u32,
}

/// Per-store item-name overrides maintained by end users.
///
/// Keys are normalized item names (trimmed, lowercased). A `None` value is an
/// explicit "no override" entry. Values are kept as raw id text so a stale or
/// malformed entry degrades to the default category instead of failing reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreItemCategorySettings {
    pub store_id: StoreId,
    pub items: BTreeMap<String, Option<String>>,
}

impl StoreItemCategorySettings {
    pub fn new(store_id: StoreId) -> Self {
        Self {
            store_id,
            items: BTreeMap::new(),
        }
    }

    /// Returns the override entry for `item_name`, normalizing the key.
    pub fn override_for(&self, item_name: &str) -> Option<&str> {
        self.items
            .get(&normalize_item_key(item_name))
            .and_then(|value| value.as_deref())
    }

    /// Records (or clears, with `None`) the override for `item_name`.
    pub fn set_override(&mut self, item_name: &str, category_id: Option<StoreCategoryId>) {
        self.items.insert(
            normalize_item_key(item_name),
            category_id.map(|id| id.to_string()),
        );
    }
}

/// Normalizes an item name into the key shared by overrides and the
/// reference dataset.
pub fn normalize_item_key(name: &str) -> String {
    name.trim().to_lowercase()
}
