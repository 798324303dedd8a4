//! Item lifecycle use-cases: add, update, reorder, delete.
//!
//! # Responsibility
//! - Run ingestion as explicit steps: authorize, parse, categorize, register
//!   the trip category, position, persist, touch the trip.
//! - Keep trip categories and positions consistent across mutations.
//!
//! # Invariants
//! - Each mutation runs in one IMMEDIATE transaction; any error rolls the
//!   whole sequence back.
//! - Authorization is checked before the first write.
//! - The parent trip's `updated_at` is refreshed by every committed mutation.
//! - Deletes leave sibling positions untouched.

use crate::classify::quantity::parse_name_quantity;
use crate::classify::reference::ReferenceDataset;
use crate::classify::resolver::CategoryResolver;
use crate::model::item::{AddItemRequest, Item, ItemId, ItemPatch};
use crate::model::store::{GroceryTrip, TripCategorySummary, TripId};
use crate::repo::category_repo::{CategoryRepository, SqliteCategoryRepository};
use crate::repo::item_repo::{ItemRepository, NewItem, SqliteItemRepository};
use crate::repo::membership::StoreMembership;
use crate::repo::store_repo::{SqliteStoreRepository, StoreRepository};
use crate::service::error::{ItemServiceError, ServiceResult};
use crate::service::position_allocator::PositionAllocator;
use crate::service::trip_category_registry::TripCategoryRegistry;
use log::{error, info, warn};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Repositories bound to one open transaction.
struct TxRepos<'tx> {
    items: SqliteItemRepository<'tx>,
    categories: SqliteCategoryRepository<'tx>,
    stores: SqliteStoreRepository<'tx>,
}

impl<'tx> TxRepos<'tx> {
    fn new(conn: &'tx Connection) -> Self {
        Self {
            items: SqliteItemRepository::new(conn),
            categories: SqliteCategoryRepository::new(conn),
            stores: SqliteStoreRepository::new(conn),
        }
    }

    fn registry(
        &self,
    ) -> TripCategoryRegistry<
        '_,
        SqliteCategoryRepository<'tx>,
        SqliteStoreRepository<'tx>,
        SqliteItemRepository<'tx>,
    > {
        TripCategoryRegistry::new(&self.categories, &self.stores, &self.items)
    }

    fn allocator(&self) -> PositionAllocator<'_, SqliteItemRepository<'tx>> {
        PositionAllocator::new(&self.items)
    }

    fn load_item(&self, item_id: ItemId) -> ServiceResult<Item> {
        self.items
            .get_item(item_id)?
            .ok_or(ItemServiceError::NotFound {
                entity: "item",
                id: item_id,
            })
    }

    fn load_trip(&self, trip_id: TripId) -> ServiceResult<GroceryTrip> {
        self.stores
            .get_trip(trip_id)?
            .ok_or(ItemServiceError::NotFound {
                entity: "grocery trip",
                id: trip_id,
            })
    }
}

/// Orchestrates item ingestion, classification and ordering.
pub struct ItemService<'conn, M: StoreMembership> {
    conn: &'conn Connection,
    membership: M,
    dataset: Arc<ReferenceDataset>,
}

impl<'conn, M: StoreMembership> ItemService<'conn, M> {
    /// Creates a service over a migrated connection.
    ///
    /// `membership` authorizes item creation; `dataset` is the reference
    /// classification table shared by all requests.
    pub fn new(conn: &'conn Connection, membership: M, dataset: Arc<ReferenceDataset>) -> Self {
        Self {
            conn,
            membership,
            dataset,
        }
    }

    /// Adds one item to a trip.
    ///
    /// # Contract
    /// - `raw_name` may carry an inline quantity (`"Orange x 5"`), which wins
    ///   over `quantity`.
    /// - The item is filed under the resolved category and placed at
    ///   `request.placement`.
    ///
    /// # Errors
    /// - `NotFound` for a missing trip or a staple item of another store.
    /// - `Unauthorized` when the user is not an active store member.
    /// - `Validation` when the name is blank after parsing.
    /// - `Configuration` when the resolved category is missing in the store.
    pub fn add_item(&self, request: &AddItemRequest) -> ServiceResult<Item> {
        self.in_transaction("item_add", |repos| {
            let trip = repos.load_trip(request.trip_id)?;
            if !self
                .membership
                .is_active_store_member(request.user_id, trip.store_id)?
            {
                return Err(ItemServiceError::Unauthorized {
                    user_id: request.user_id,
                    store_id: trip.store_id,
                });
            }

            if let Some(staple_item_id) = request.staple_item_id {
                let staple = repos.stores.get_staple_item(staple_item_id)?;
                if staple.map_or(true, |staple| staple.store_id != trip.store_id) {
                    return Err(ItemServiceError::NotFound {
                        entity: "staple item",
                        id: staple_item_id,
                    });
                }
            }

            let fallback_quantity = match request.quantity {
                Some(quantity) if quantity >= 1 => quantity,
                Some(quantity) => {
                    warn!(
                        "event=item_add module=service status=degraded trip_id={} error_code=invalid_quantity quantity={quantity}",
                        trip.id
                    );
                    1
                }
                None => 1,
            };
            let (name, quantity) = parse_name_quantity(&request.raw_name, fallback_quantity);
            let name = required_name(&name)?;

            let resolution = CategoryResolver::new(&repos.categories, &self.dataset)
                .resolve(&name, trip.store_id);
            let category = repos.registry().find_or_create(trip.id, &resolution.name)?;
            let position = repos
                .allocator()
                .allocate(trip.id, request.placement, None)?;

            let item = repos.items.create_item(&NewItem {
                id: Uuid::new_v4(),
                grocery_trip_id: trip.id,
                user_id: request.user_id,
                name,
                quantity,
                completed: false,
                position,
                category_id: Some(category.id),
                staple_item_id: request.staple_item_id,
                meal_id: request.meal_id,
            })?;
            repos.stores.touch_trip(trip.id)?;

            info!(
                "event=item_add module=service status=ok trip_id={} item_id={} category_source={:?} position={}",
                trip.id, item.id, resolution.source, item.position
            );
            Ok(item)
        })
    }

    /// Applies the fields present in `patch` to one item.
    ///
    /// # Contract
    /// - A new name is re-parsed for an inline quantity.
    /// - A quantity below 1 is ignored; the prior value is kept.
    /// - Flipping `completed` moves the item to the bottom (completed) or top
    ///   (reopened); an explicit `position` is applied after that.
    /// - Moving to a store category records a store override for the item
    ///   name, so later adds of the same name land there too.
    /// - A trip category left empty by the change is deleted.
    pub fn update_item(&self, item_id: ItemId, patch: &ItemPatch) -> ServiceResult<Item> {
        self.in_transaction("item_update", |repos| {
            let current = repos.load_item(item_id)?;
            let trip = repos.load_trip(current.grocery_trip_id)?;
            let mut updated = current.clone();

            let quantity = match patch.quantity {
                Some(quantity) if quantity >= 1 => quantity,
                Some(quantity) => {
                    warn!(
                        "event=item_update module=service status=degraded item_id={item_id} error_code=invalid_quantity quantity={quantity}"
                    );
                    current.quantity
                }
                None => current.quantity,
            };
            updated.quantity = quantity;

            if let Some(raw_name) = patch.name.as_deref() {
                let (name, parsed_quantity) = parse_name_quantity(raw_name, quantity);
                updated.name = required_name(&name)?;
                updated.quantity = parsed_quantity;
            }

            if let Some(category_change) = patch.category_id {
                updated.category_id = match category_change {
                    Some(store_category_id) => {
                        let store_category = repos
                            .categories
                            .get_store_category(store_category_id)?
                            .filter(|category| category.store_id == trip.store_id)
                            .ok_or(ItemServiceError::NotFound {
                                entity: "store category",
                                id: store_category_id,
                            })?;
                        let trip_category = repos
                            .registry()
                            .find_or_create(trip.id, &store_category.name)?;

                        let mut settings =
                            repos.categories.item_category_settings(trip.store_id)?;
                        settings.set_override(&updated.name, Some(store_category.id));
                        repos.categories.save_item_category_settings(&settings)?;

                        Some(trip_category.id)
                    }
                    None => None,
                };
            }

            if let Some(completed) = patch.completed {
                if completed != current.completed {
                    updated.completed = completed;
                    updated.position = repos
                        .allocator()
                        .reposition_for_completion(trip.id, item_id, completed)?;
                }
            }

            if let Some(position) = patch.position {
                updated.position =
                    repos
                        .allocator()
                        .reorder(trip.id, item_id, updated.position, position)?;
            }

            let saved = repos.items.update_item(&updated)?;

            if let Some(previous) = current.category_id {
                if saved.category_id != Some(previous) {
                    repos.registry().prune_if_empty(previous)?;
                }
            }
            repos.stores.touch_trip(trip.id)?;

            info!(
                "event=item_update module=service status=ok trip_id={} item_id={} position={} completed={}",
                trip.id, saved.id, saved.position, saved.completed
            );
            Ok(saved)
        })
    }

    /// Moves one item to `new_position`, shifting only the items in between.
    pub fn reorder_item(&self, item_id: ItemId, new_position: i64) -> ServiceResult<Item> {
        self.update_item(
            item_id,
            &ItemPatch {
                position: Some(new_position),
                ..ItemPatch::default()
            },
        )
    }

    /// Deletes one item and returns the removed record.
    ///
    /// The item's trip category is deleted when this was its last item.
    pub fn delete_item(&self, item_id: ItemId) -> ServiceResult<Item> {
        self.in_transaction("item_delete", |repos| {
            let item = repos.load_item(item_id)?;
            repos.items.delete_item(item_id)?;

            let pruned = match item.category_id {
                Some(category_id) => repos.registry().prune_if_empty(category_id)?,
                None => false,
            };
            repos.stores.touch_trip(item.grocery_trip_id)?;

            info!(
                "event=item_delete module=service status=ok trip_id={} item_id={} category_pruned={pruned}",
                item.grocery_trip_id, item.id
            );
            Ok(item)
        })
    }

    /// Renumbers a trip's positions to an evenly spaced sequence.
    pub fn compact_trip_positions(&self, trip_id: TripId) -> ServiceResult<usize> {
        self.in_transaction("trip_compact", |repos| {
            let trip = repos.load_trip(trip_id)?;
            let count = repos.allocator().compact(trip.id)?;
            repos.stores.touch_trip(trip.id)?;
            Ok(count)
        })
    }

    /// Gets one item by id.
    pub fn get_item(&self, item_id: ItemId) -> ServiceResult<Item> {
        TxRepos::new(self.conn).load_item(item_id)
    }

    /// Lists a trip's items in display order.
    pub fn list_trip_items(&self, trip_id: TripId) -> ServiceResult<Vec<Item>> {
        let repos = TxRepos::new(self.conn);
        let trip = repos.load_trip(trip_id)?;
        Ok(repos.items.list_trip_items(trip.id)?)
    }

    /// Lists the categories currently in use by a trip.
    pub fn list_trip_categories(&self, trip_id: TripId) -> ServiceResult<Vec<TripCategorySummary>> {
        let repos = TxRepos::new(self.conn);
        let trip = repos.load_trip(trip_id)?;
        Ok(repos.categories.list_trip_categories(trip.id)?)
    }

    fn in_transaction<T>(
        &self,
        event: &'static str,
        operation: impl FnOnce(&TxRepos<'_>) -> ServiceResult<T>,
    ) -> ServiceResult<T> {
        let started_at = Instant::now();
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        let result = {
            let repos = TxRepos::new(&tx);
            operation(&repos)
        };

        match result {
            Ok(value) => {
                tx.commit()?;
                info!(
                    "event={event} module=service status=committed duration_ms={}",
                    started_at.elapsed().as_millis()
                );
                Ok(value)
            }
            Err(err) => {
                error!(
                    "event={event} module=service status=error duration_ms={} error_code={} error={}",
                    started_at.elapsed().as_millis(),
                    err.code(),
                    err
                );
                Err(err)
            }
        }
    }
}

fn required_name(name: &str) -> ServiceResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ItemServiceError::Validation(
            "item name must not be blank".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}
