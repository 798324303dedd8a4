mod common;

use common::{dataset, Fixture};
use grocer_core::{
    AddItemRequest, CategoryRepository, CategoryResolver, CategorySource, ItemRepository,
    ItemServiceError, NewItem, ReferenceDataset, SqliteCategoryRepository, SqliteItemRepository,
    SqliteStoreRepository, StoreRepository, TripCategoryRegistry, DEFAULT_CATEGORY_NAME,
};
use uuid::Uuid;

fn save_override(fx: &Fixture, item_name: &str, category_id: Option<Uuid>) {
    let categories = SqliteCategoryRepository::new(&fx.conn);
    let mut settings = categories.item_category_settings(fx.store.id).unwrap();
    settings.set_override(item_name, category_id);
    categories.save_item_category_settings(&settings).unwrap();
}

#[test]
fn store_override_wins_over_reference_dataset() {
    let fx = Fixture::new();
    let dairy = fx.store_category("Dairy");
    save_override(&fx, "Eggs", Some(dairy.id));

    let categories = SqliteCategoryRepository::new(&fx.conn);
    let dataset = dataset();
    let resolver = CategoryResolver::new(&categories, &dataset);

    let resolution = resolver.resolve("  eggs ", fx.store.id);
    assert_eq!(resolution.name, "Dairy");
    assert_eq!(resolution.source, CategorySource::StoreOverride);

    let resolution = resolver.resolve("Egg", fx.store.id);
    assert_eq!(resolution.name, "Produce");
    assert_eq!(resolution.source, CategorySource::Reference);
}

#[test]
fn override_does_not_leak_to_other_stores() {
    let fx = Fixture::new();
    save_override(&fx, "eggs", Some(fx.store_category("Dairy").id));
    let other = SqliteStoreRepository::new(&fx.conn)
        .create_store("Cabin")
        .unwrap();

    let categories = SqliteCategoryRepository::new(&fx.conn);
    let dataset = dataset();
    let resolution = CategoryResolver::new(&categories, &dataset).resolve("eggs", other.id);
    assert_eq!(resolution.name, "Produce");
    assert_eq!(resolution.source, CategorySource::Reference);
}

#[test]
fn unmatched_name_resolves_to_default_label() {
    let fx = Fixture::new();
    let categories = SqliteCategoryRepository::new(&fx.conn);
    let dataset = dataset();

    let resolution = CategoryResolver::new(&categories, &dataset).resolve("Lightbulbs", fx.store.id);
    assert_eq!(resolution.name, DEFAULT_CATEGORY_NAME);
    assert_eq!(resolution.source, CategorySource::Default);
}

#[test]
fn stale_override_falls_back_to_default_not_reference() {
    let fx = Fixture::new();
    save_override(&fx, "orange", Some(Uuid::new_v4()));

    let categories = SqliteCategoryRepository::new(&fx.conn);
    let dataset = dataset();
    let resolution = CategoryResolver::new(&categories, &dataset).resolve("Orange", fx.store.id);
    assert_eq!(resolution.name, DEFAULT_CATEGORY_NAME);
    assert_eq!(resolution.source, CategorySource::Default);
}

#[test]
fn override_pointing_at_other_store_category_falls_back_to_default() {
    let fx = Fixture::new();
    let other = SqliteStoreRepository::new(&fx.conn)
        .create_store("Cabin")
        .unwrap();
    let foreign = SqliteCategoryRepository::new(&fx.conn)
        .find_store_category_by_name(other.id, "Dairy")
        .unwrap()
        .unwrap();
    save_override(&fx, "milk", Some(foreign.id));

    let categories = SqliteCategoryRepository::new(&fx.conn);
    let dataset = dataset();
    let resolution = CategoryResolver::new(&categories, &dataset).resolve("Milk", fx.store.id);
    assert_eq!(resolution.source, CategorySource::Default);
}

#[test]
fn cleared_override_continues_to_reference_dataset() {
    let fx = Fixture::new();
    save_override(&fx, "orange", None);

    let categories = SqliteCategoryRepository::new(&fx.conn);
    let dataset = dataset();
    let resolution = CategoryResolver::new(&categories, &dataset).resolve("Orange", fx.store.id);
    assert_eq!(resolution.name, "Produce");
    assert_eq!(resolution.source, CategorySource::Reference);
}

#[test]
fn corrupt_settings_json_does_not_block_resolution() {
    let fx = Fixture::new();
    fx.conn
        .execute(
            "UPDATE store_item_category_settings SET items = 'not json' WHERE store_id = ?1;",
            [fx.store.id.to_string()],
        )
        .unwrap();

    let categories = SqliteCategoryRepository::new(&fx.conn);
    let dataset = dataset();
    let resolution = CategoryResolver::new(&categories, &dataset).resolve("Milk", fx.store.id);
    assert_eq!(resolution.name, "Dairy");
    assert_eq!(resolution.source, CategorySource::Reference);
}

#[test]
fn builtin_dataset_classifies_common_groceries() {
    let fx = Fixture::new();
    let builtin = std::sync::Arc::new(ReferenceDataset::builtin().unwrap());
    let item = fx
        .service_with(builtin)
        .add_item(&AddItemRequest::new(fx.user, fx.trip.id, "Orange x 5"))
        .unwrap();

    let category = SqliteCategoryRepository::new(&fx.conn)
        .get_trip_category(item.category_id.unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(category.name, "Produce");
}

#[test]
fn find_or_create_reuses_existing_trip_category() {
    let fx = Fixture::new();
    let categories = SqliteCategoryRepository::new(&fx.conn);
    let stores = SqliteStoreRepository::new(&fx.conn);
    let items = SqliteItemRepository::new(&fx.conn);
    let registry = TripCategoryRegistry::new(&categories, &stores, &items);

    let first = registry.find_or_create(fx.trip.id, "Produce").unwrap();
    let second = registry.find_or_create(fx.trip.id, "Produce").unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(first.store_category_id, fx.store_category("Produce").id);
    assert_eq!(fx.count_rows("grocery_trip_categories"), 1);
}

#[test]
fn find_or_create_rejects_unknown_store_category_and_trip() {
    let fx = Fixture::new();
    let categories = SqliteCategoryRepository::new(&fx.conn);
    let stores = SqliteStoreRepository::new(&fx.conn);
    let items = SqliteItemRepository::new(&fx.conn);
    let registry = TripCategoryRegistry::new(&categories, &stores, &items);

    let err = registry.find_or_create(fx.trip.id, "Fermented").unwrap_err();
    assert!(matches!(err, ItemServiceError::Configuration(_)));

    let err = registry
        .find_or_create(Uuid::new_v4(), "Produce")
        .unwrap_err();
    assert!(matches!(
        err,
        ItemServiceError::NotFound {
            entity: "grocery trip",
            ..
        }
    ));
    assert_eq!(fx.count_rows("grocery_trip_categories"), 0);
}

#[test]
fn prune_if_empty_only_deletes_unused_categories() {
    let fx = Fixture::new();
    let categories = SqliteCategoryRepository::new(&fx.conn);
    let stores = SqliteStoreRepository::new(&fx.conn);
    let items = SqliteItemRepository::new(&fx.conn);
    let registry = TripCategoryRegistry::new(&categories, &stores, &items);

    let produce = registry.find_or_create(fx.trip.id, "Produce").unwrap();
    let item = items
        .create_item(&NewItem {
            id: Uuid::new_v4(),
            grocery_trip_id: fx.trip.id,
            user_id: fx.user,
            name: "Orange".to_string(),
            quantity: 1,
            completed: false,
            position: 1000,
            category_id: Some(produce.id),
            staple_item_id: None,
            meal_id: None,
        })
        .unwrap();

    assert!(!registry.prune_if_empty(produce.id).unwrap());
    assert!(categories.get_trip_category(produce.id).unwrap().is_some());

    items.delete_item(item.id).unwrap();
    assert!(registry.prune_if_empty(produce.id).unwrap());
    assert!(categories.get_trip_category(produce.id).unwrap().is_none());
}
