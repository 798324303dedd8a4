//! Versioned grocery schema.
//!
//! Steps are applied in order inside one transaction, and the resulting
//! schema is checked against [`REQUIRED_TABLES`] on every open.

use crate::db::{DbError, DbResult};
use log::{debug, info};
use rusqlite::{Connection, OptionalExtension};

struct SchemaStep {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const SCHEMA_STEPS: &[SchemaStep] = &[SchemaStep {
    version: 1,
    name: "stores_trips_items",
    sql: include_str!("0001_init.sql"),
}];

/// Tables the repositories read and write.
pub const REQUIRED_TABLES: &[&str] = &[
    "stores",
    "store_users",
    "store_categories",
    "store_item_category_settings",
    "store_staple_items",
    "grocery_trips",
    "grocery_trip_categories",
    "items",
];

/// Grocery schema version this build writes.
pub fn latest_version() -> u32 {
    SCHEMA_STEPS.last().map_or(0, |step| step.version)
}

/// Reads the schema version recorded in `user_version`.
pub fn schema_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?)
}

/// Brings `conn` up to [`latest_version`] and verifies the table set.
///
/// # Errors
/// - `SchemaTooNew` when the file comes from a newer build.
/// - `MigrationFailed` naming the step that failed; the run is rolled back.
/// - `MissingTable` when the recorded version does not match the tables.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let found = schema_version(conn)?;
    let target = latest_version();
    if found > target {
        return Err(DbError::SchemaTooNew {
            found,
            supported: target,
        });
    }

    if found < target {
        let tx = conn.transaction()?;
        for step in SCHEMA_STEPS.iter().filter(|step| step.version > found) {
            tx.execute_batch(step.sql)
                .and_then(|()| tx.pragma_update(None, "user_version", step.version))
                .map_err(|source| DbError::MigrationFailed {
                    version: step.version,
                    name: step.name,
                    source,
                })?;
            debug!(
                "event=db_migrate module=db status=step version={} name={}",
                step.version, step.name
            );
        }
        tx.commit()?;
        info!("event=db_migrate module=db status=ok schema=grocery from={found} to={target}");
    }

    verify_tables(conn, target)
}

fn verify_tables(conn: &Connection, version: u32) -> DbResult<()> {
    for &table in REQUIRED_TABLES {
        let present = conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1;",
                [table],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        if !present {
            return Err(DbError::MissingTable { table, version });
        }
    }
    Ok(())
}
