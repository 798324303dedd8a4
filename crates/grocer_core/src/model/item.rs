//! Grocery trip item model and update patch.
//!
//! # Invariants
//! - `quantity` is always >= 1 once an item has been through ingestion.
//! - `position` orders items within a trip; ties are allowed transiently and
//!   are broken by `created_at`, then `id`.

use crate::model::store::{StapleItemId, StoreCategoryId, TripCategoryId, TripId, UserId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type ItemId = Uuid;
pub type MealId = Uuid;

/// Persisted trip item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub grocery_trip_id: TripId,
    /// User that added the item.
    pub user_id: UserId,
    pub name: String,
    pub quantity: i32,
    pub completed: bool,
    pub position: i64,
    /// Trip-scoped category (`grocery_trip_categories.id`).
    pub category_id: Option<TripCategoryId>,
    pub staple_item_id: Option<StapleItemId>,
    pub meal_id: Option<MealId>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Where a newly added item lands in its trip.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemPlacement {
    /// Above every existing item.
    #[default]
    Top,
    /// Below every existing item.
    Bottom,
}

/// Request model for adding one item to a trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddItemRequest {
    pub user_id: UserId,
    pub trip_id: TripId,
    /// Free text, may carry an inline quantity such as `"Apples x 5"`.
    pub raw_name: String,
    pub quantity: Option<i32>,
    pub staple_item_id: Option<StapleItemId>,
    pub meal_id: Option<MealId>,
    pub placement: ItemPlacement,
}

impl AddItemRequest {
    pub fn new(user_id: UserId, trip_id: TripId, raw_name: impl Into<String>) -> Self {
        Self {
            user_id,
            trip_id,
            raw_name: raw_name.into(),
            quantity: None,
            staple_item_id: None,
            meal_id: None,
            placement: ItemPlacement::Top,
        }
    }

    pub fn with_quantity(mut self, quantity: i32) -> Self {
        self.quantity = Some(quantity);
        self
    }

    pub fn with_staple_item(mut self, staple_item_id: StapleItemId) -> Self {
        self.staple_item_id = Some(staple_item_id);
        self
    }

    pub fn with_placement(mut self, placement: ItemPlacement) -> Self {
        self.placement = placement;
        self
    }
}

/// Partial update for an item. `None` leaves a field untouched.
///
/// `category_id` is two-level: `Some(None)` clears the category,
/// `Some(Some(id))` moves the item to the given store category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemPatch {
    pub name: Option<String>,
    pub quantity: Option<i32>,
    pub completed: Option<bool>,
    pub position: Option<i64>,
    pub category_id: Option<Option<StoreCategoryId>>,
}

impl ItemPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.quantity.is_none()
            && self.completed.is_none()
            && self.position.is_none()
            && self.category_id.is_none()
    }
}
