//! Persistence traits and their implementations
//!
//! The engine only ever talks to these traits; [`sqlite::SqliteStore`] backs
//! the real service and [`memory::MemoryStore`] backs tests and embedders.

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{InventoryRecord, Locker, NewInventoryRecord, SheetBinding};

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Inventory record persistence
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// All records of one warehouse
    async fn list(&self, warehouse_id: i64) -> Result<Vec<InventoryRecord>>;

    /// Create a record and return the generated id
    async fn create(&self, record: NewInventoryRecord) -> Result<String>;

    /// Update an existing record in place
    async fn update(&self, record: &InventoryRecord) -> Result<()>;
}

/// Locker persistence
#[async_trait]
pub trait LockerStore: Send + Sync {
    /// All lockers of one warehouse
    async fn list(&self, warehouse_id: i64) -> Result<Vec<Locker>>;

    /// Create a locker and return the generated id
    async fn create(&self, warehouse_id: i64, name: &str) -> Result<i64>;
}

/// Warehouse-to-tab binding persistence
#[async_trait]
pub trait BindingStore: Send + Sync {
    /// Every binding that points at the given (spreadsheet, tab) pair,
    /// across all warehouses and tab roles
    async fn find_tab_owners(&self, spreadsheet_id: &str, tab_id: i64)
        -> Result<Vec<SheetBinding>>;

    /// The binding a warehouse holds for one role, if any
    async fn find(&self, warehouse_id: i64, role: crate::model::TabRole)
        -> Result<Option<SheetBinding>>;

    /// Insert or replace the (warehouse, role) binding
    async fn upsert(&self, binding: &SheetBinding) -> Result<()>;
}

/// Object storage for inventory images and other attached assets
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Delete one stored object
    async fn delete(&self, object_ref: &str) -> Result<()>;
}
