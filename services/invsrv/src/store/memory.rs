//! In-memory store for tests and embedders

use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{Result, StockError};
use crate::model::{InventoryRecord, Locker, NewInventoryRecord, SheetBinding, TabRole};
use crate::store::{AssetStore, BindingStore, InventoryStore, LockerStore};

/// Mutex-guarded implementation of all four store traits
///
/// Locker ids are handed out from a counter; record ids are fresh UUIDs,
/// matching what the SQLite store does.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<Vec<InventoryRecord>>,
    lockers: Mutex<Vec<Locker>>,
    next_locker_id: Mutex<i64>,
    bindings: Mutex<Vec<SheetBinding>>,
    deleted_refs: Mutex<Vec<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all records, for assertions
    pub fn records(&self) -> Vec<InventoryRecord> {
        self.records.lock().map(|g| g.clone()).unwrap_or_default()
    }

    /// Snapshot of all lockers, for assertions
    pub fn lockers(&self) -> Vec<Locker> {
        self.lockers.lock().map(|g| g.clone()).unwrap_or_default()
    }

    /// Snapshot of all bindings, for assertions
    pub fn bindings(&self) -> Vec<SheetBinding> {
        self.bindings.lock().map(|g| g.clone()).unwrap_or_default()
    }

    /// Object refs deleted so far, in deletion order
    pub fn deleted_refs(&self) -> Vec<String> {
        self.deleted_refs
            .lock()
            .map(|g| g.clone())
            .unwrap_or_default()
    }

    /// Seed an existing record, for test setup
    pub fn insert_record(&self, record: InventoryRecord) {
        if let Ok(mut guard) = self.records.lock() {
            guard.push(record);
        }
    }

    /// Seed an existing locker, for test setup
    pub fn insert_locker(&self, locker: Locker) {
        if let Ok(mut guard) = self.lockers.lock() {
            if let Ok(mut next) = self.next_locker_id.lock() {
                *next = (*next).max(locker.id);
            }
            guard.push(locker);
        }
    }

    fn poisoned() -> StockError {
        StockError::Internal("memory store lock poisoned".to_string())
    }
}

#[async_trait]
impl InventoryStore for MemoryStore {
    async fn list(&self, warehouse_id: i64) -> Result<Vec<InventoryRecord>> {
        let guard = self.records.lock().map_err(|_| Self::poisoned())?;
        Ok(guard
            .iter()
            .filter(|r| r.warehouse_id == warehouse_id)
            .cloned()
            .collect())
    }

    async fn create(&self, record: NewInventoryRecord) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let mut guard = self.records.lock().map_err(|_| Self::poisoned())?;
        guard.push(InventoryRecord {
            id: id.clone(),
            warehouse_id: record.warehouse_id,
            locker_id: record.locker_id,
            floor: record.floor,
            position: record.position,
            address: record.address,
            description: record.description,
            display_name: record.display_name,
            label: record.label,
            image_ref: record.image_ref,
        });
        Ok(id)
    }

    async fn update(&self, record: &InventoryRecord) -> Result<()> {
        let mut guard = self.records.lock().map_err(|_| Self::poisoned())?;
        match guard.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => {
                *existing = record.clone();
                Ok(())
            }
            None => Err(StockError::NotFound {
                resource: format!("inventory record {}", record.id),
            }),
        }
    }
}

#[async_trait]
impl LockerStore for MemoryStore {
    async fn list(&self, warehouse_id: i64) -> Result<Vec<Locker>> {
        let guard = self.lockers.lock().map_err(|_| Self::poisoned())?;
        Ok(guard
            .iter()
            .filter(|l| l.warehouse_id == warehouse_id)
            .cloned()
            .collect())
    }

    async fn create(&self, warehouse_id: i64, name: &str) -> Result<i64> {
        let mut guard = self.lockers.lock().map_err(|_| Self::poisoned())?;
        if guard
            .iter()
            .any(|l| l.warehouse_id == warehouse_id && l.name == name)
        {
            return Err(StockError::Conflict {
                resource: format!("locker '{name}' in warehouse {warehouse_id}"),
            });
        }
        let mut next = self.next_locker_id.lock().map_err(|_| Self::poisoned())?;
        *next += 1;
        let id = *next;
        guard.push(Locker {
            id,
            warehouse_id,
            name: name.to_string(),
        });
        Ok(id)
    }
}

#[async_trait]
impl BindingStore for MemoryStore {
    async fn find_tab_owners(
        &self,
        spreadsheet_id: &str,
        tab_id: i64,
    ) -> Result<Vec<SheetBinding>> {
        let guard = self.bindings.lock().map_err(|_| Self::poisoned())?;
        Ok(guard
            .iter()
            .filter(|b| b.spreadsheet_id == spreadsheet_id && b.tab_id == tab_id)
            .cloned()
            .collect())
    }

    async fn find(&self, warehouse_id: i64, role: TabRole) -> Result<Option<SheetBinding>> {
        let guard = self.bindings.lock().map_err(|_| Self::poisoned())?;
        Ok(guard
            .iter()
            .find(|b| b.warehouse_id == warehouse_id && b.role == role)
            .cloned())
    }

    async fn upsert(&self, binding: &SheetBinding) -> Result<()> {
        let mut guard = self.bindings.lock().map_err(|_| Self::poisoned())?;
        match guard
            .iter_mut()
            .find(|b| b.warehouse_id == binding.warehouse_id && b.role == binding.role)
        {
            Some(existing) => *existing = binding.clone(),
            None => guard.push(binding.clone()),
        }
        Ok(())
    }
}

#[async_trait]
impl AssetStore for MemoryStore {
    async fn delete(&self, object_ref: &str) -> Result<()> {
        let mut guard = self.deleted_refs.lock().map_err(|_| Self::poisoned())?;
        guard.push(object_ref.to_string());
        Ok(())
    }
}
