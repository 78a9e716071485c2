//! Tab binding conflict guard
//!
//! A (spreadsheet, tab) pair may belong to at most one warehouse at a time,
//! no matter which role the tab plays there. The check is read-then-bind
//! without a transaction, so two concurrent bind attempts for the same tab
//! can both pass it; callers serialize binds per tab.

use std::sync::Arc;

use tracing::warn;

use crate::error::{Result, StockError};
use crate::store::BindingStore;

pub struct ConflictGuard {
    bindings: Arc<dyn BindingStore>,
}

impl ConflictGuard {
    pub fn new(bindings: Arc<dyn BindingStore>) -> Self {
        Self { bindings }
    }

    /// Error if the tab is already bound to a different warehouse
    ///
    /// The requesting warehouse's own bindings never conflict, so re-syncing
    /// an established tab passes.
    pub async fn check(
        &self,
        warehouse_id: i64,
        spreadsheet_id: &str,
        tab_id: i64,
    ) -> Result<()> {
        let owners = self.bindings.find_tab_owners(spreadsheet_id, tab_id).await?;
        if let Some(other) = owners.iter().find(|b| b.warehouse_id != warehouse_id) {
            warn!(
                warehouse_id,
                spreadsheet_id,
                tab_id,
                bound_to = other.warehouse_id,
                role = other.role.as_str(),
                "tab already bound to another warehouse"
            );
            return Err(StockError::TabBound {
                spreadsheet_id: spreadsheet_id.to_string(),
                tab_id,
                warehouse_id: other.warehouse_id,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use crate::model::{SheetBinding, TabRole};
    use crate::store::MemoryStore;
    use chrono::Utc;

    fn binding(warehouse_id: i64, role: TabRole, tab_id: i64) -> SheetBinding {
        SheetBinding {
            warehouse_id,
            role,
            spreadsheet_id: "sheet-a".to_string(),
            tab_id,
            last_synced_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_unbound_tab_passes() {
        let store = Arc::new(MemoryStore::new());
        let guard = ConflictGuard::new(store);
        assert!(guard.check(1, "sheet-a", 0).await.is_ok());
    }

    #[tokio::test]
    async fn test_own_binding_passes() {
        let store = Arc::new(MemoryStore::new());
        store.upsert(&binding(1, TabRole::Inventory, 0)).await.unwrap();
        let guard = ConflictGuard::new(store);
        assert!(guard.check(1, "sheet-a", 0).await.is_ok());
    }

    #[tokio::test]
    async fn test_foreign_binding_conflicts() {
        let store = Arc::new(MemoryStore::new());
        store.upsert(&binding(2, TabRole::Inventory, 0)).await.unwrap();
        let guard = ConflictGuard::new(store);
        let err = guard.check(1, "sheet-a", 0).await.unwrap_err();
        assert!(matches!(
            err,
            StockError::TabBound { warehouse_id: 2, .. }
        ));
    }

    #[tokio::test]
    async fn test_non_inventory_roles_also_conflict() {
        let store = Arc::new(MemoryStore::new());
        store.upsert(&binding(2, TabRole::History, 4)).await.unwrap();
        let guard = ConflictGuard::new(store);
        assert!(guard.check(1, "sheet-a", 4).await.is_err());
    }

    #[tokio::test]
    async fn test_other_tab_of_same_sheet_passes() {
        let store = Arc::new(MemoryStore::new());
        store.upsert(&binding(2, TabRole::Inventory, 0)).await.unwrap();
        let guard = ConflictGuard::new(store);
        assert!(guard.check(1, "sheet-a", 1).await.is_ok());
    }
}
