//! Lazy trip-scoped category rows.
//!
//! # Responsibility
//! - Map `(trip, category name)` to a `GroceryTripCategory`, creating the
//!   join row the first time an item of that category lands in the trip.
//! - Delete a trip category once its last item is gone.
//!
//! # Invariants
//! - At most one trip category exists per `(trip, store category)`.
//! - A trip category without items does not outlive the operation that
//!   emptied it.
//! - A category name the trip's store does not carry is a configuration
//!   error, never silently replaced.

use crate::model::store::{GroceryTripCategory, TripCategoryId, TripId};
use crate::repo::category_repo::CategoryRepository;
use crate::repo::item_repo::ItemRepository;
use crate::repo::store_repo::StoreRepository;
use crate::repo::RepoResult;
use crate::service::error::{ItemServiceError, ServiceResult};
use log::{debug, info};

/// Find-or-create and cleanup of trip categories.
pub struct TripCategoryRegistry<'a, C, S, I>
where
    C: CategoryRepository,
    S: StoreRepository,
    I: ItemRepository,
{
    categories: &'a C,
    stores: &'a S,
    items: &'a I,
}

impl<'a, C, S, I> TripCategoryRegistry<'a, C, S, I>
where
    C: CategoryRepository,
    S: StoreRepository,
    I: ItemRepository,
{
    pub fn new(categories: &'a C, stores: &'a S, items: &'a I) -> Self {
        Self {
            categories,
            stores,
            items,
        }
    }

    /// Returns the trip's category row for `category_name`, creating it when
    /// the trip has none yet.
    ///
    /// # Errors
    /// - `NotFound` when the trip does not exist.
    /// - `Configuration` when the trip's store has no category of that name.
    pub fn find_or_create(
        &self,
        trip_id: TripId,
        category_name: &str,
    ) -> ServiceResult<GroceryTripCategory> {
        if let Some(existing) = self
            .categories
            .find_trip_category_by_name(trip_id, category_name)?
        {
            return Ok(existing);
        }

        let trip = self
            .stores
            .get_trip(trip_id)?
            .ok_or(ItemServiceError::NotFound {
                entity: "grocery trip",
                id: trip_id,
            })?;

        let store_category = self
            .categories
            .find_store_category_by_name(trip.store_id, category_name)?
            .ok_or_else(|| {
                ItemServiceError::Configuration(format!(
                    "store {} has no category named `{category_name}`",
                    trip.store_id
                ))
            })?;

        let created = self
            .categories
            .create_trip_category(trip_id, store_category.id)?;
        info!(
            "event=trip_category_create module=service status=ok trip_id={trip_id} trip_category_id={} store_category_id={}",
            created.id, store_category.id
        );
        Ok(created)
    }

    /// Deletes `category_id` when no item references it any more.
    ///
    /// Returns `true` when the row was deleted.
    pub fn prune_if_empty(&self, category_id: TripCategoryId) -> RepoResult<bool> {
        let remaining = self.items.count_items_in_category(category_id)?;
        if remaining > 0 {
            debug!(
                "event=trip_category_prune module=service status=skipped trip_category_id={category_id} remaining={remaining}"
            );
            return Ok(false);
        }

        self.categories.delete_trip_category(category_id)?;
        info!(
            "event=trip_category_prune module=service status=ok trip_category_id={category_id}"
        );
        Ok(true)
    }
}
