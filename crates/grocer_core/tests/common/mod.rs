#![allow(dead_code)]

use grocer_core::db::open_db_in_memory;
use grocer_core::{
    CategoryRepository, GroceryTrip, ItemService, ReferenceDataset, SqliteCategoryRepository,
    SqliteStoreMembership, SqliteStoreRepository, Store, StoreCategory, StoreRepository, UserId,
};
use rusqlite::Connection;
use std::sync::Arc;
use uuid::Uuid;

pub struct Fixture {
    pub conn: Connection,
    pub store: Store,
    pub trip: GroceryTrip,
    pub user: UserId,
}

impl Fixture {
    pub fn new() -> Self {
        let conn = open_db_in_memory().unwrap();
        let (store, trip, user) = {
            let stores = SqliteStoreRepository::new(&conn);
            let store = stores.create_store("Home").unwrap();
            let user = Uuid::new_v4();
            stores.add_store_member(store.id, user).unwrap();
            let trip = stores.create_trip(store.id, "Trip 1").unwrap();
            (store, trip, user)
        };
        Self {
            conn,
            store,
            trip,
            user,
        }
    }

    pub fn service(&self) -> ItemService<'_, SqliteStoreMembership<'_>> {
        self.service_with(dataset())
    }

    pub fn service_with(
        &self,
        dataset: Arc<ReferenceDataset>,
    ) -> ItemService<'_, SqliteStoreMembership<'_>> {
        ItemService::new(&self.conn, SqliteStoreMembership::new(&self.conn), dataset)
    }

    pub fn store_category(&self, name: &str) -> StoreCategory {
        SqliteCategoryRepository::new(&self.conn)
            .find_store_category_by_name(self.store.id, name)
            .unwrap()
            .unwrap_or_else(|| panic!("store category `{name}` should be seeded"))
    }

    pub fn reset_trip_timestamp(&self) {
        self.conn
            .execute(
                "UPDATE grocery_trips SET updated_at = 0 WHERE id = ?1;",
                [self.trip.id.to_string()],
            )
            .unwrap();
    }

    pub fn trip_updated_at(&self) -> i64 {
        SqliteStoreRepository::new(&self.conn)
            .get_trip(self.trip.id)
            .unwrap()
            .unwrap()
            .updated_at
    }

    pub fn count_rows(&self, table: &str) -> i64 {
        self.conn
            .query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
                row.get(0)
            })
            .unwrap()
    }
}

pub fn dataset() -> Arc<ReferenceDataset> {
    Arc::new(
        ReferenceDataset::from_pairs([
            ("orange", "Produce"),
            ("egg", "Produce"),
            ("apple", "Produce"),
            ("banana", "Produce"),
            ("cherries", "Produce"),
            ("milk", "Dairy"),
            ("bread", "Bakery"),
            ("kimchi", "Fermented"),
        ])
        .unwrap(),
    )
}
