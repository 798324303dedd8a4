mod common;

use common::{dataset, Fixture};
use grocer_core::db::open_db;
use grocer_core::{
    AddItemRequest, CategoryRepository, Item, ItemPatch, ItemPlacement, ItemService,
    ItemServiceError, SqliteCategoryRepository, SqliteStoreMembership, SqliteStoreRepository,
    StoreRepository,
};
use std::sync::{Arc, Barrier};
use std::thread;
use uuid::Uuid;

fn trip_category_names(fx: &Fixture) -> Vec<(String, u32)> {
    fx.service()
        .list_trip_categories(fx.trip.id)
        .unwrap()
        .into_iter()
        .map(|summary| (summary.category.name, summary.item_count))
        .collect()
}

#[test]
fn add_item_parses_quantity_and_files_under_reference_category() {
    let fx = Fixture::new();
    let service = fx.service();

    let item = service
        .add_item(&AddItemRequest::new(fx.user, fx.trip.id, "Orange x 5"))
        .unwrap();

    assert_eq!(item.name, "Orange");
    assert_eq!(item.quantity, 5);
    assert!(!item.completed);
    assert_eq!(item.position, grocer_core::BASELINE_POSITION);
    assert_eq!(item.user_id, fx.user);

    let category_id = item.category_id.expect("item should be categorized");
    let category = SqliteCategoryRepository::new(&fx.conn)
        .get_trip_category(category_id)
        .unwrap()
        .unwrap();
    assert_eq!(category.name, "Produce");
    assert_eq!(category.grocery_trip_id, fx.trip.id);
    assert_eq!(trip_category_names(&fx), vec![("Produce".to_string(), 1)]);
}

#[test]
fn add_item_without_suffix_uses_requested_quantity() {
    let fx = Fixture::new();
    let service = fx.service();

    let explicit = service
        .add_item(&AddItemRequest::new(fx.user, fx.trip.id, "  Milk ").with_quantity(3))
        .unwrap();
    assert_eq!(explicit.name, "Milk");
    assert_eq!(explicit.quantity, 3);

    let suffix_wins = service
        .add_item(&AddItemRequest::new(fx.user, fx.trip.id, "Bread x2").with_quantity(7))
        .unwrap();
    assert_eq!(suffix_wins.name, "Bread");
    assert_eq!(suffix_wins.quantity, 2);

    let invalid = service
        .add_item(&AddItemRequest::new(fx.user, fx.trip.id, "Oranges").with_quantity(0))
        .unwrap();
    assert_eq!(invalid.quantity, 1);
}

#[test]
fn unknown_items_land_in_default_category() {
    let fx = Fixture::new();
    let item = fx
        .service()
        .add_item(&AddItemRequest::new(fx.user, fx.trip.id, "Birthday candles"))
        .unwrap();

    let category = SqliteCategoryRepository::new(&fx.conn)
        .get_trip_category(item.category_id.unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(category.name, "Misc.");
}

#[test]
fn blank_name_is_rejected() {
    let fx = Fixture::new();
    let err = fx
        .service()
        .add_item(&AddItemRequest::new(fx.user, fx.trip.id, "   "))
        .unwrap_err();
    assert!(matches!(err, ItemServiceError::Validation(_)));
    assert_eq!(fx.count_rows("items"), 0);
}

#[test]
fn non_member_cannot_add_and_nothing_is_persisted() {
    let fx = Fixture::new();
    fx.reset_trip_timestamp();
    let stranger = Uuid::new_v4();

    let err = fx
        .service()
        .add_item(&AddItemRequest::new(stranger, fx.trip.id, "Orange x 5"))
        .unwrap_err();

    match err {
        ItemServiceError::Unauthorized { user_id, store_id } => {
            assert_eq!(user_id, stranger);
            assert_eq!(store_id, fx.store.id);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(fx.count_rows("items"), 0);
    assert_eq!(fx.count_rows("grocery_trip_categories"), 0);
    assert_eq!(fx.trip_updated_at(), 0);
}

#[test]
fn deactivated_member_cannot_add() {
    let fx = Fixture::new();
    SqliteStoreRepository::new(&fx.conn)
        .set_store_member_active(fx.store.id, fx.user, false)
        .unwrap();

    let err = fx
        .service()
        .add_item(&AddItemRequest::new(fx.user, fx.trip.id, "Milk"))
        .unwrap_err();
    assert_eq!(err.code(), "unauthorized");
}

#[test]
fn add_to_missing_trip_is_not_found() {
    let fx = Fixture::new();
    let err = fx
        .service()
        .add_item(&AddItemRequest::new(fx.user, Uuid::new_v4(), "Milk"))
        .unwrap_err();
    assert!(matches!(
        err,
        ItemServiceError::NotFound {
            entity: "grocery trip",
            ..
        }
    ));
}

#[test]
fn staple_item_must_belong_to_trip_store() {
    let fx = Fixture::new();
    let stores = SqliteStoreRepository::new(&fx.conn);
    let own = stores.create_staple_item(fx.store.id, "Milk").unwrap();
    let other_store = stores.create_store("Cabin").unwrap();
    let foreign = stores.create_staple_item(other_store.id, "Milk").unwrap();

    let item = fx
        .service()
        .add_item(&AddItemRequest::new(fx.user, fx.trip.id, "Milk").with_staple_item(own.id))
        .unwrap();
    assert_eq!(item.staple_item_id, Some(own.id));

    let err = fx
        .service()
        .add_item(&AddItemRequest::new(fx.user, fx.trip.id, "Milk").with_staple_item(foreign.id))
        .unwrap_err();
    assert!(matches!(
        err,
        ItemServiceError::NotFound {
            entity: "staple item",
            ..
        }
    ));
    assert_eq!(fx.count_rows("items"), 1);
}

#[test]
fn category_missing_from_store_rolls_back_add() {
    let fx = Fixture::new();
    fx.reset_trip_timestamp();

    let err = fx
        .service_with(dataset())
        .add_item(&AddItemRequest::new(fx.user, fx.trip.id, "Kimchi"))
        .unwrap_err();

    assert!(matches!(err, ItemServiceError::Configuration(_)));
    assert_eq!(fx.count_rows("items"), 0);
    assert_eq!(fx.count_rows("grocery_trip_categories"), 0);
    assert_eq!(fx.trip_updated_at(), 0);
}

#[test]
fn every_mutation_touches_trip() {
    let fx = Fixture::new();
    let service = fx.service();

    fx.reset_trip_timestamp();
    let item = service
        .add_item(&AddItemRequest::new(fx.user, fx.trip.id, "Milk"))
        .unwrap();
    assert!(fx.trip_updated_at() > 0);

    fx.reset_trip_timestamp();
    service
        .update_item(
            item.id,
            &ItemPatch {
                quantity: Some(2),
                ..ItemPatch::default()
            },
        )
        .unwrap();
    assert!(fx.trip_updated_at() > 0);

    fx.reset_trip_timestamp();
    service.delete_item(item.id).unwrap();
    assert!(fx.trip_updated_at() > 0);
}

#[test]
fn update_quantity_below_one_keeps_previous_value() {
    let fx = Fixture::new();
    let service = fx.service();
    let item = service
        .add_item(&AddItemRequest::new(fx.user, fx.trip.id, "Milk x 4"))
        .unwrap();

    let updated = service
        .update_item(
            item.id,
            &ItemPatch {
                quantity: Some(0),
                ..ItemPatch::default()
            },
        )
        .unwrap();
    assert_eq!(updated.quantity, 4);

    let updated = service
        .update_item(
            item.id,
            &ItemPatch {
                quantity: Some(6),
                ..ItemPatch::default()
            },
        )
        .unwrap();
    assert_eq!(updated.quantity, 6);
}

#[test]
fn rename_reparses_inline_quantity() {
    let fx = Fixture::new();
    let service = fx.service();
    let item = service
        .add_item(&AddItemRequest::new(fx.user, fx.trip.id, "Milk"))
        .unwrap();

    let renamed = service
        .update_item(
            item.id,
            &ItemPatch {
                name: Some("Oat milk x 3".to_string()),
                ..ItemPatch::default()
            },
        )
        .unwrap();
    assert_eq!(renamed.name, "Oat milk");
    assert_eq!(renamed.quantity, 3);

    let err = service
        .update_item(
            item.id,
            &ItemPatch {
                name: Some(" ".to_string()),
                ..ItemPatch::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, ItemServiceError::Validation(_)));
    assert_eq!(service.get_item(item.id).unwrap().name, "Oat milk");
}

#[test]
fn moving_item_to_another_category_records_override_and_prunes() {
    let fx = Fixture::new();
    let service = fx.service();
    let item = service
        .add_item(&AddItemRequest::new(fx.user, fx.trip.id, "Widget"))
        .unwrap();
    assert_eq!(trip_category_names(&fx), vec![("Misc.".to_string(), 1)]);

    let cleaning = fx.store_category("Cleaning");
    let moved = service
        .update_item(
            item.id,
            &ItemPatch {
                category_id: Some(Some(cleaning.id)),
                ..ItemPatch::default()
            },
        )
        .unwrap();

    let category = SqliteCategoryRepository::new(&fx.conn)
        .get_trip_category(moved.category_id.unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(category.store_category_id, cleaning.id);
    assert_eq!(trip_category_names(&fx), vec![("Cleaning".to_string(), 1)]);

    let settings = SqliteCategoryRepository::new(&fx.conn)
        .item_category_settings(fx.store.id)
        .unwrap();
    let cleaning_id = cleaning.id.to_string();
    assert_eq!(settings.override_for("widget"), Some(cleaning_id.as_str()));

    let again = service
        .add_item(&AddItemRequest::new(fx.user, fx.trip.id, "WIDGET x 2"))
        .unwrap();
    assert_eq!(again.category_id, moved.category_id);
}

#[test]
fn moving_item_to_category_of_other_store_is_rejected() {
    let fx = Fixture::new();
    let service = fx.service();
    let item = service
        .add_item(&AddItemRequest::new(fx.user, fx.trip.id, "Milk"))
        .unwrap();
    let other_store = SqliteStoreRepository::new(&fx.conn)
        .create_store("Cabin")
        .unwrap();
    let foreign = SqliteCategoryRepository::new(&fx.conn)
        .find_store_category_by_name(other_store.id, "Dairy")
        .unwrap()
        .unwrap();

    let err = service
        .update_item(
            item.id,
            &ItemPatch {
                category_id: Some(Some(foreign.id)),
                ..ItemPatch::default()
            },
        )
        .unwrap_err();
    assert!(matches!(
        err,
        ItemServiceError::NotFound {
            entity: "store category",
            ..
        }
    ));
    assert_eq!(service.get_item(item.id).unwrap().category_id, item.category_id);
}

#[test]
fn clearing_category_prunes_empty_trip_category() {
    let fx = Fixture::new();
    let service = fx.service();
    let item = service
        .add_item(&AddItemRequest::new(fx.user, fx.trip.id, "Milk"))
        .unwrap();

    let cleared = service
        .update_item(
            item.id,
            &ItemPatch {
                category_id: Some(None),
                ..ItemPatch::default()
            },
        )
        .unwrap();
    assert_eq!(cleared.category_id, None);
    assert!(trip_category_names(&fx).is_empty());
}

#[test]
fn deleting_last_item_of_category_removes_trip_category() {
    let fx = Fixture::new();
    let service = fx.service();
    let orange = service
        .add_item(&AddItemRequest::new(fx.user, fx.trip.id, "Orange"))
        .unwrap();

    let deleted = service.delete_item(orange.id).unwrap();
    assert_eq!(deleted.id, orange.id);
    assert!(trip_category_names(&fx).is_empty());
    assert!(matches!(
        service.get_item(orange.id).unwrap_err(),
        ItemServiceError::NotFound { entity: "item", .. }
    ));
}

#[test]
fn deleting_one_of_two_items_keeps_trip_category_and_positions() {
    let fx = Fixture::new();
    let service = fx.service();
    let first = service
        .add_item(&AddItemRequest::new(fx.user, fx.trip.id, "Orange"))
        .unwrap();
    let second = service
        .add_item(
            &AddItemRequest::new(fx.user, fx.trip.id, "Apples")
                .with_placement(ItemPlacement::Bottom),
        )
        .unwrap();
    let third = service
        .add_item(
            &AddItemRequest::new(fx.user, fx.trip.id, "Banana")
                .with_placement(ItemPlacement::Bottom),
        )
        .unwrap();

    service.delete_item(second.id).unwrap();

    assert_eq!(trip_category_names(&fx), vec![("Produce".to_string(), 2)]);
    let remaining = service.list_trip_items(fx.trip.id).unwrap();
    let positions: Vec<i64> = remaining.iter().map(|item| item.position).collect();
    assert_eq!(positions, vec![first.position, third.position]);
}

#[test]
fn deleting_missing_item_is_not_found() {
    let fx = Fixture::new();
    let err = fx.service().delete_item(Uuid::new_v4()).unwrap_err();
    assert_eq!(err.code(), "not_found");
}

#[test]
fn concurrent_bottom_inserts_from_two_connections_get_distinct_positions() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("grocer.sqlite3");
    let conn = open_db(&path).unwrap();
    let stores = SqliteStoreRepository::new(&conn);
    let store = stores.create_store("Home").unwrap();
    let user = Uuid::new_v4();
    stores.add_store_member(store.id, user).unwrap();
    let trip = stores.create_trip(store.id, "Trip 1").unwrap();

    let service = ItemService::new(&conn, SqliteStoreMembership::new(&conn), dataset());
    let existing = service
        .add_item(&AddItemRequest::new(user, trip.id, "Milk"))
        .unwrap();

    let barrier = Arc::new(Barrier::new(2));
    let workers: Vec<_> = ["Apples", "Banana"]
        .into_iter()
        .map(|name| {
            let path = path.clone();
            let barrier = Arc::clone(&barrier);
            let trip_id = trip.id;
            thread::spawn(move || -> Item {
                let conn = open_db(&path).unwrap();
                let service =
                    ItemService::new(&conn, SqliteStoreMembership::new(&conn), dataset());
                barrier.wait();
                service
                    .add_item(
                        &AddItemRequest::new(user, trip_id, name)
                            .with_placement(ItemPlacement::Bottom),
                    )
                    .unwrap()
            })
        })
        .collect();
    let added: Vec<Item> = workers
        .into_iter()
        .map(|worker| worker.join().unwrap())
        .collect();

    assert_ne!(added[0].position, added[1].position);
    assert!(added.iter().all(|item| item.position > existing.position));
    let mut positions: Vec<i64> = added.iter().map(|item| item.position).collect();
    positions.sort_unstable();
    assert_eq!(positions, vec![existing.position + 2, existing.position + 4]);

    // Both writers filed into one shared trip category.
    let produce: Vec<u32> = service
        .list_trip_categories(trip.id)
        .unwrap()
        .into_iter()
        .filter(|summary| summary.category.name == "Produce")
        .map(|summary| summary.item_count)
        .collect();
    assert_eq!(produce, vec![2]);
}
