//! SQLite persistence
//!
//! WAL journal for concurrent reads, foreign keys on, busy timeout for
//! writer contention. Upserts use `ON CONFLICT .. DO UPDATE` so binding
//! refreshes stay one statement.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous},
    Row, SqlitePool,
};
use tracing::info;
use uuid::Uuid;

use crate::error::{Result, StockError};
use crate::model::{InventoryRecord, Locker, NewInventoryRecord, SheetBinding, TabRole};
use crate::store::{BindingStore, InventoryStore, LockerStore};

const SCHEMA_STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS lockers (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        warehouse_id INTEGER NOT NULL,
        name TEXT NOT NULL,
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
    )
    "#,
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_lockers_warehouse_name ON lockers(warehouse_id, name)",
    r#"
    CREATE TABLE IF NOT EXISTS inventory (
        id TEXT PRIMARY KEY,
        warehouse_id INTEGER NOT NULL,
        locker_id INTEGER NOT NULL REFERENCES lockers(id),
        floor INTEGER NOT NULL DEFAULT 0,
        position INTEGER NOT NULL DEFAULT 0,
        address TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        display_name TEXT NOT NULL DEFAULT '',
        label TEXT NOT NULL DEFAULT '',
        image_ref TEXT,
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_inventory_warehouse_address ON inventory(warehouse_id, address)",
    r#"
    CREATE TABLE IF NOT EXISTS sheet_bindings (
        warehouse_id INTEGER NOT NULL,
        role TEXT NOT NULL,
        spreadsheet_id TEXT NOT NULL,
        tab_id INTEGER NOT NULL,
        last_synced_at TEXT NOT NULL,
        PRIMARY KEY (warehouse_id, role)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_bindings_tab ON sheet_bindings(spreadsheet_id, tab_id)",
];

/// SQLite-backed implementation of the persistence traits
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) a database file
    pub async fn connect(db_path: impl AsRef<Path>) -> Result<Self> {
        if let Some(parent) = db_path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path.as_ref())
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5))
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

        info!(
            "SQLite database connected: {}",
            db_path.as_ref().to_string_lossy()
        );

        Ok(Self { pool })
    }

    /// Private in-memory database, one connection so all queries share it
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::new().filename(":memory:");
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;
        Ok(Self { pool })
    }

    /// Create tables and indexes if they do not exist yet
    pub async fn init_schema(&self) -> Result<()> {
        for statement in SCHEMA_STATEMENTS {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn hydrate_record(row: &SqliteRow) -> Result<InventoryRecord> {
    Ok(InventoryRecord {
        id: row.try_get("id")?,
        warehouse_id: row.try_get("warehouse_id")?,
        locker_id: row.try_get("locker_id")?,
        floor: row.try_get("floor")?,
        position: row.try_get("position")?,
        address: row.try_get("address")?,
        description: row.try_get("description")?,
        display_name: row.try_get("display_name")?,
        label: row.try_get("label")?,
        image_ref: row.try_get("image_ref")?,
    })
}

fn hydrate_binding(row: &SqliteRow) -> Result<SheetBinding> {
    let role_str: String = row.try_get("role")?;
    Ok(SheetBinding {
        warehouse_id: row.try_get("warehouse_id")?,
        role: TabRole::parse(&role_str)?,
        spreadsheet_id: row.try_get("spreadsheet_id")?,
        tab_id: row.try_get("tab_id")?,
        last_synced_at: row.try_get("last_synced_at")?,
    })
}

fn map_unique_violation(err: sqlx::Error, resource: String) -> StockError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.is_unique_violation() {
            return StockError::Conflict { resource };
        }
    }
    StockError::Database(err)
}

#[async_trait]
impl InventoryStore for SqliteStore {
    async fn list(&self, warehouse_id: i64) -> Result<Vec<InventoryRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, warehouse_id, locker_id, floor, position, address,
                   description, display_name, label, image_ref
            FROM inventory
            WHERE warehouse_id = ?
            ORDER BY locker_id, floor, position
            "#,
        )
        .bind(warehouse_id)
        .fetch_all(&self.pool)
        .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            records.push(hydrate_record(row)?);
        }
        Ok(records)
    }

    async fn create(&self, record: NewInventoryRecord) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            r#"
            INSERT INTO inventory (id, warehouse_id, locker_id, floor, position,
                                   address, description, display_name, label, image_ref)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(record.warehouse_id)
        .bind(record.locker_id)
        .bind(record.floor)
        .bind(record.position)
        .bind(&record.address)
        .bind(&record.description)
        .bind(&record.display_name)
        .bind(&record.label)
        .bind(&record.image_ref)
        .execute(&self.pool)
        .await?;
        Ok(id)
    }

    async fn update(&self, record: &InventoryRecord) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE inventory
            SET locker_id = ?, floor = ?, position = ?, address = ?,
                description = ?, display_name = ?, label = ?, image_ref = ?,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
            "#,
        )
        .bind(record.locker_id)
        .bind(record.floor)
        .bind(record.position)
        .bind(&record.address)
        .bind(&record.description)
        .bind(&record.display_name)
        .bind(&record.label)
        .bind(&record.image_ref)
        .bind(&record.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StockError::NotFound {
                resource: format!("inventory record {}", record.id),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl LockerStore for SqliteStore {
    async fn list(&self, warehouse_id: i64) -> Result<Vec<Locker>> {
        let rows = sqlx::query(
            "SELECT id, warehouse_id, name FROM lockers WHERE warehouse_id = ? ORDER BY name",
        )
        .bind(warehouse_id)
        .fetch_all(&self.pool)
        .await?;

        let mut lockers = Vec::with_capacity(rows.len());
        for row in &rows {
            lockers.push(Locker {
                id: row.try_get("id")?,
                warehouse_id: row.try_get("warehouse_id")?,
                name: row.try_get("name")?,
            });
        }
        Ok(lockers)
    }

    async fn create(&self, warehouse_id: i64, name: &str) -> Result<i64> {
        let result = sqlx::query("INSERT INTO lockers (warehouse_id, name) VALUES (?, ?)")
            .bind(warehouse_id)
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                map_unique_violation(e, format!("locker '{name}' in warehouse {warehouse_id}"))
            })?;
        Ok(result.last_insert_rowid())
    }
}

#[async_trait]
impl BindingStore for SqliteStore {
    async fn find_tab_owners(
        &self,
        spreadsheet_id: &str,
        tab_id: i64,
    ) -> Result<Vec<SheetBinding>> {
        let rows = sqlx::query(
            r#"
            SELECT warehouse_id, role, spreadsheet_id, tab_id, last_synced_at
            FROM sheet_bindings
            WHERE spreadsheet_id = ? AND tab_id = ?
            "#,
        )
        .bind(spreadsheet_id)
        .bind(tab_id)
        .fetch_all(&self.pool)
        .await?;

        let mut bindings = Vec::with_capacity(rows.len());
        for row in &rows {
            bindings.push(hydrate_binding(row)?);
        }
        Ok(bindings)
    }

    async fn find(&self, warehouse_id: i64, role: TabRole) -> Result<Option<SheetBinding>> {
        let row = sqlx::query(
            r#"
            SELECT warehouse_id, role, spreadsheet_id, tab_id, last_synced_at
            FROM sheet_bindings
            WHERE warehouse_id = ? AND role = ?
            "#,
        )
        .bind(warehouse_id)
        .bind(role.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(hydrate_binding(&row)?)),
            None => Ok(None),
        }
    }

    async fn upsert(&self, binding: &SheetBinding) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO sheet_bindings (warehouse_id, role, spreadsheet_id, tab_id, last_synced_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(warehouse_id, role) DO UPDATE SET
                spreadsheet_id = excluded.spreadsheet_id,
                tab_id = excluded.tab_id,
                last_synced_at = excluded.last_synced_at
            "#,
        )
        .bind(binding.warehouse_id)
        .bind(binding.role.as_str())
        .bind(&binding.spreadsheet_id)
        .bind(binding.tab_id)
        .bind(binding.last_synced_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use chrono::Utc;

    async fn store() -> SqliteStore {
        let store = SqliteStore::in_memory().await.unwrap();
        store.init_schema().await.unwrap();
        store
    }

    fn new_record(warehouse_id: i64, locker_id: i64, address: &str) -> NewInventoryRecord {
        NewInventoryRecord {
            warehouse_id,
            locker_id,
            floor: 1,
            position: 2,
            address: address.to_string(),
            description: "desc".to_string(),
            display_name: "name".to_string(),
            label: "lbl".to_string(),
            image_ref: None,
        }
    }

    #[tokio::test]
    async fn test_record_round_trip() {
        let store = store().await;
        let locker_id = LockerStore::create(&store, 1, "Shelf-1").await.unwrap();
        let id = InventoryStore::create(&store, new_record(1, locker_id, "A-1-2"))
            .await
            .unwrap();

        let records = InventoryStore::list(&store, 1).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, id);
        assert_eq!(records[0].address, "A-1-2");

        let mut updated = records[0].clone();
        updated.description = "changed".to_string();
        store.update(&updated).await.unwrap();
        let records = InventoryStore::list(&store, 1).await.unwrap();
        assert_eq!(records[0].description, "changed");
    }

    #[tokio::test]
    async fn test_update_unknown_record_is_not_found() {
        let store = store().await;
        let record = InventoryRecord {
            id: "missing".to_string(),
            warehouse_id: 1,
            locker_id: 1,
            floor: 0,
            position: 0,
            address: "A".to_string(),
            description: String::new(),
            display_name: String::new(),
            label: String::new(),
            image_ref: None,
        };
        let err = store.update(&record).await.unwrap_err();
        assert!(matches!(err, StockError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_duplicate_locker_maps_to_conflict() {
        let store = store().await;
        LockerStore::create(&store, 1, "Shelf-1").await.unwrap();
        let err = LockerStore::create(&store, 1, "Shelf-1").await.unwrap_err();
        assert!(matches!(err, StockError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_binding_upsert_and_owner_lookup() {
        let store = store().await;
        let first = SheetBinding {
            warehouse_id: 1,
            role: TabRole::Inventory,
            spreadsheet_id: "sheet-a".to_string(),
            tab_id: 7,
            last_synced_at: Utc::now(),
        };
        store.upsert(&first).await.unwrap();

        // Re-binding the same (warehouse, role) replaces the row
        let moved = SheetBinding {
            tab_id: 9,
            ..first.clone()
        };
        store.upsert(&moved).await.unwrap();

        assert!(store.find_tab_owners("sheet-a", 7).await.unwrap().is_empty());
        let owners = store.find_tab_owners("sheet-a", 9).await.unwrap();
        assert_eq!(owners.len(), 1);
        assert_eq!(owners[0].role, TabRole::Inventory);

        let found = store.find(1, TabRole::Inventory).await.unwrap().unwrap();
        assert_eq!(found.tab_id, 9);
        assert!(store.find(1, TabRole::Brands).await.unwrap().is_none());
    }
}
