//! Item ingestion, classification and ordering core for shared grocery lists.
//! This crate is the single source of truth for item/trip invariants.

pub mod classify;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use classify::quantity::parse_name_quantity;
pub use classify::reference::{
    init_reference_dataset, reference_dataset, ReferenceDataset, ReferenceDatasetError,
    ReferenceEntry, ReferenceSource,
};
pub use classify::resolver::{CategoryResolution, CategoryResolver, CategorySource};
pub use config::{ConfigError, CoreConfig, CoreRuntime};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::item::{AddItemRequest, Item, ItemId, ItemPatch, ItemPlacement, MealId};
pub use model::store::{
    GroceryTrip, GroceryTripCategory, StapleItem, StapleItemId, Store, StoreCategory,
    StoreCategoryId, StoreId, StoreItemCategorySettings, TripCategoryId, TripCategorySummary,
    TripId, UserId, DEFAULT_CATEGORY_NAME, DEFAULT_STORE_CATEGORIES,
};
pub use repo::category_repo::{CategoryRepository, SqliteCategoryRepository};
pub use repo::item_repo::{ItemRepository, NewItem, PositionRange, SqliteItemRepository};
pub use repo::membership::{SqliteStoreMembership, StoreMembership};
pub use repo::store_repo::{SqliteStoreRepository, StoreRepository};
pub use repo::{RepoError, RepoResult};
pub use service::error::{ItemServiceError, ServiceResult};
pub use service::item_service::ItemService;
pub use service::position_allocator::{PositionAllocator, BASELINE_POSITION, POSITION_GAP};
pub use service::trip_category_registry::TripCategoryRegistry;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
