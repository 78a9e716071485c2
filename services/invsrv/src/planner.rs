//! Reconciliation planning and execution
//!
//! The planner diffs decoded sheet rows against a snapshot of the
//! warehouse's persisted records and decides create, update or skip per
//! row. Execution is strictly sequential in sheet order, so a locker
//! created by an early row is visible to every later row of the same run.
//! One row's persistence failure is recorded in its outcome and the loop
//! moves on; only planning-level errors abort the sync.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::context::SyncContext;
use crate::error::Result;
use crate::model::{InventoryRecord, KeyMode, NewInventoryRecord, SheetRow};
use crate::resolver::LockerResolver;
use crate::store::InventoryStore;
use crate::writeback::IdWriteback;

// ============================================================================
// Outcomes
// ============================================================================

/// Decision for one row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowAction {
    Create,
    Update,
    Skip,
}

/// What actually happened to one row; `row` is the 1-based sheet row number
/// with the header as row 1
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RowOutcome {
    Created { row: usize, id: String },
    Updated { row: usize, id: String },
    Skipped { row: usize },
    Failed { row: usize, error: String },
}

impl RowOutcome {
    pub fn row(&self) -> usize {
        match self {
            Self::Created { row, .. }
            | Self::Updated { row, .. }
            | Self::Skipped { row }
            | Self::Failed { row, .. } => *row,
        }
    }
}

/// Authoritative result of one sync: one outcome per processed row plus
/// running counts. Logs are advisory; callers inspect this.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncReport {
    pub outcomes: Vec<RowOutcome>,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl SyncReport {
    pub fn record(&mut self, outcome: RowOutcome) {
        match &outcome {
            RowOutcome::Created { .. } => self.created += 1,
            RowOutcome::Updated { .. } => self.updated += 1,
            RowOutcome::Skipped { .. } => self.skipped += 1,
            RowOutcome::Failed { .. } => self.failed += 1,
        }
        self.outcomes.push(outcome);
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    /// Restore sheet order after out-of-band failures are merged in
    pub fn sort_by_row(&mut self) {
        self.outcomes.sort_by_key(RowOutcome::row);
    }
}

/// Counts from a read-only planning pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanCounts {
    pub creates: usize,
    pub updates: usize,
    pub skips: usize,
}

// ============================================================================
// Planner
// ============================================================================

pub struct ReconciliationPlanner {
    mode: KeyMode,
}

impl ReconciliationPlanner {
    pub fn new(mode: KeyMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> KeyMode {
        self.mode
    }

    /// The business key a row matches records on, if it has one
    ///
    /// In identifier mode a blank identifier yields `None` and the row is
    /// always a create.
    fn row_key(&self, row: &SheetRow) -> Option<String> {
        match self.mode {
            KeyMode::Address => Some(row.address.clone()),
            KeyMode::Identifier => row.external_id.clone(),
        }
    }

    /// Snapshot of existing records keyed by business key, built once
    /// before iteration
    fn snapshot(&self, records: Vec<InventoryRecord>) -> HashMap<String, InventoryRecord> {
        records
            .into_iter()
            .map(|r| {
                let key = match self.mode {
                    KeyMode::Address => r.address.clone(),
                    KeyMode::Identifier => r.id.clone(),
                };
                (key, r)
            })
            .collect()
    }

    /// Execute the plan row by row
    ///
    /// `writeback` is `Some` in identifier mode only; a created record's id
    /// goes back into the sheet immediately so the next run matches it.
    pub async fn run(
        &self,
        ctx: &SyncContext,
        warehouse_id: i64,
        rows: &[SheetRow],
        resolver: &mut LockerResolver,
        inventory: &dyn InventoryStore,
        mut writeback: Option<&mut IdWriteback>,
    ) -> Result<SyncReport> {
        let existing = inventory.list(warehouse_id).await?;
        let index = self.snapshot(existing);
        debug!(
            trace_id = %ctx.trace_id,
            warehouse_id,
            rows = rows.len(),
            existing = index.len(),
            "reconciliation started"
        );

        let mut report = SyncReport::default();
        for row in rows {
            ctx.check_cancelled()?;
            let sheet_row = row.sheet_row_number();

            let locker_id = match resolver.resolve(&row.locker_name).await {
                Ok(id) => id,
                Err(e) => {
                    error!(
                        trace_id = %ctx.trace_id,
                        row = sheet_row,
                        locker = %row.locker_name,
                        error = %e,
                        "locker resolution failed"
                    );
                    report.record(RowOutcome::Failed {
                        row: sheet_row,
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            let matched = self.row_key(row).and_then(|key| index.get(&key));
            match decide(matched, row, locker_id) {
                RowAction::Create => {
                    let payload = NewInventoryRecord::from_row(warehouse_id, locker_id, row);
                    match inventory.create(payload).await {
                        Ok(id) => {
                            if let Some(wb) = writeback.as_deref_mut() {
                                if let Err(e) = wb.write_id(ctx, row.index, &id).await {
                                    warn!(
                                        trace_id = %ctx.trace_id,
                                        row = sheet_row,
                                        id = %id,
                                        error = %e,
                                        "record created but id writeback failed"
                                    );
                                }
                            }
                            report.record(RowOutcome::Created { row: sheet_row, id });
                        }
                        Err(e) => {
                            error!(
                                trace_id = %ctx.trace_id,
                                row = sheet_row,
                                error = %e,
                                "row create failed"
                            );
                            report.record(RowOutcome::Failed {
                                row: sheet_row,
                                error: e.to_string(),
                            });
                        }
                    }
                }
                RowAction::Update => {
                    // decide() only returns Update when a match exists
                    let Some(current) = matched else { continue };
                    let updated = apply_row(current, row, locker_id);
                    match inventory.update(&updated).await {
                        Ok(()) => report.record(RowOutcome::Updated {
                            row: sheet_row,
                            id: updated.id,
                        }),
                        Err(e) => {
                            error!(
                                trace_id = %ctx.trace_id,
                                row = sheet_row,
                                id = %updated.id,
                                error = %e,
                                "row update failed"
                            );
                            report.record(RowOutcome::Failed {
                                row: sheet_row,
                                error: e.to_string(),
                            });
                        }
                    }
                }
                RowAction::Skip => report.record(RowOutcome::Skipped { row: sheet_row }),
            }
        }

        debug!(
            trace_id = %ctx.trace_id,
            created = report.created,
            updated = report.updated,
            skipped = report.skipped,
            failed = report.failed,
            "reconciliation finished"
        );
        Ok(report)
    }

    /// Plan without writing anything
    ///
    /// Lockers are resolved through cache peeks only. A row naming an
    /// unknown locker would get a fresh locker id in a real run, so a
    /// matched record counts as an update and an unmatched one as a create.
    pub fn dry_run(
        &self,
        rows: &[SheetRow],
        resolver: &LockerResolver,
        existing: Vec<InventoryRecord>,
    ) -> PlanCounts {
        let index = self.snapshot(existing);
        let mut counts = PlanCounts::default();
        for row in rows {
            let matched = self.row_key(row).and_then(|key| index.get(&key));
            let action = match resolver.peek(&row.locker_name) {
                Some(locker_id) => decide(matched, row, locker_id),
                None => match matched {
                    Some(_) => RowAction::Update,
                    None => RowAction::Create,
                },
            };
            match action {
                RowAction::Create => counts.creates += 1,
                RowAction::Update => counts.updates += 1,
                RowAction::Skip => counts.skips += 1,
            }
        }
        counts
    }
}

/// Pure per-row decision
///
/// No match means create. A match with a differing locker or any differing
/// domain field means update. An identical match means skip, no write.
pub fn decide(existing: Option<&InventoryRecord>, row: &SheetRow, locker_id: i64) -> RowAction {
    match existing {
        None => RowAction::Create,
        Some(record) => {
            if record.locker_id != locker_id || fields_differ(record, row) {
                RowAction::Update
            } else {
                RowAction::Skip
            }
        }
    }
}

fn fields_differ(record: &InventoryRecord, row: &SheetRow) -> bool {
    record.floor != row.floor
        || record.position != row.position
        || record.address != row.address
        || record.description != row.description
        || record.display_name != row.display_name
        || record.label != row.label
}

/// Existing record with the row's locker and domain fields applied
///
/// Identity and non-sheet fields (id, warehouse, image ref) stay untouched.
fn apply_row(record: &InventoryRecord, row: &SheetRow, locker_id: i64) -> InventoryRecord {
    InventoryRecord {
        id: record.id.clone(),
        warehouse_id: record.warehouse_id,
        locker_id,
        floor: row.floor,
        position: row.position,
        address: row.address.clone(),
        description: row.description.clone(),
        display_name: row.display_name.clone(),
        label: row.label.clone(),
        image_ref: record.image_ref.clone(),
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use crate::error::StockError;
    use crate::model::Locker;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn sheet_row(index: usize, locker: &str, address: &str) -> SheetRow {
        SheetRow {
            locker_name: locker.to_string(),
            floor: 1,
            position: index as i32 + 1,
            address: address.to_string(),
            description: "desc".to_string(),
            display_name: "name".to_string(),
            label: "lbl".to_string(),
            external_id: None,
            index,
        }
    }

    fn record_for(row: &SheetRow, id: &str, warehouse_id: i64, locker_id: i64) -> InventoryRecord {
        InventoryRecord {
            id: id.to_string(),
            warehouse_id,
            locker_id,
            floor: row.floor,
            position: row.position,
            address: row.address.clone(),
            description: row.description.clone(),
            display_name: row.display_name.clone(),
            label: row.label.clone(),
            image_ref: None,
        }
    }

    #[test]
    fn test_decide_matrix() {
        let row = sheet_row(0, "Shelf-1", "A-1-1");
        let same = record_for(&row, "r1", 1, 5);
        assert_eq!(decide(None, &row, 5), RowAction::Create);
        assert_eq!(decide(Some(&same), &row, 5), RowAction::Skip);
        assert_eq!(decide(Some(&same), &row, 6), RowAction::Update);

        let mut changed = same.clone();
        changed.description = "old desc".to_string();
        assert_eq!(decide(Some(&changed), &row, 5), RowAction::Update);
    }

    #[test]
    fn test_update_preserves_identity_and_image() {
        let row = sheet_row(0, "Shelf-1", "A-1-1");
        let mut record = record_for(&row, "r1", 3, 5);
        record.image_ref = Some("img/123.png".to_string());
        record.description = "stale".to_string();
        let updated = apply_row(&record, &row, 9);
        assert_eq!(updated.id, "r1");
        assert_eq!(updated.warehouse_id, 3);
        assert_eq!(updated.image_ref.as_deref(), Some("img/123.png"));
        assert_eq!(updated.locker_id, 9);
        assert_eq!(updated.description, "desc");
    }

    async fn run_planner(
        mode: KeyMode,
        store: &Arc<MemoryStore>,
        rows: &[SheetRow],
    ) -> SyncReport {
        let ctx = SyncContext::new();
        let mut resolver = LockerResolver::preload(store.clone(), 1).await.unwrap();
        ReconciliationPlanner::new(mode)
            .run(&ctx, 1, rows, &mut resolver, store.as_ref(), None)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_one_create_two_skips() {
        let store = Arc::new(MemoryStore::new());
        store.insert_locker(Locker {
            id: 1,
            warehouse_id: 1,
            name: "Shelf-1".to_string(),
        });
        let rows = vec![
            sheet_row(0, "Shelf-1", "A-1-1"),
            sheet_row(1, "Shelf-1", "A-1-2"),
            sheet_row(2, "Shelf-1", "A-9-9"),
        ];
        store.insert_record(record_for(&rows[0], "r1", 1, 1));
        store.insert_record(record_for(&rows[1], "r2", 1, 1));

        let report = run_planner(KeyMode::Address, &store, &rows).await;
        assert_eq!(report.created, 1);
        assert_eq!(report.updated, 0);
        assert_eq!(report.skipped, 2);
        assert_eq!(report.failed, 0);
        assert_eq!(store.records().len(), 3);
        assert!(matches!(report.outcomes[2], RowOutcome::Created { row: 4, .. }));
    }

    #[tokio::test]
    async fn test_second_run_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let rows = vec![
            sheet_row(0, "Shelf-1", "A-1-1"),
            sheet_row(1, "Shelf-2", "A-1-2"),
        ];
        let first = run_planner(KeyMode::Address, &store, &rows).await;
        assert_eq!(first.created, 2);

        let second = run_planner(KeyMode::Address, &store, &rows).await;
        assert_eq!(second.created, 0);
        assert_eq!(second.updated, 0);
        assert_eq!(second.skipped, 2);
        assert_eq!(store.records().len(), 2);
    }

    #[tokio::test]
    async fn test_locker_created_once_and_reused() {
        let store = Arc::new(MemoryStore::new());
        let rows = vec![
            sheet_row(0, "Shelf-3", "A-1-1"),
            sheet_row(1, "Shelf-3", "A-1-2"),
            sheet_row(2, "Shelf-3", "A-1-3"),
        ];
        run_planner(KeyMode::Address, &store, &rows).await;

        let lockers = store.lockers();
        assert_eq!(lockers.len(), 1);
        assert_eq!(lockers[0].name, "Shelf-3");
        let locker_id = lockers[0].id;
        assert!(store.records().iter().all(|r| r.locker_id == locker_id));
    }

    #[tokio::test]
    async fn test_blank_identifier_always_creates() {
        let store = Arc::new(MemoryStore::new());
        let mut row = sheet_row(0, "Shelf-1", "A-1-1");
        row.external_id = None;
        // A record with the same address exists, but identifier mode must
        // not match on address
        store.insert_record(record_for(&row, "r1", 1, 1));
        store.insert_locker(Locker {
            id: 1,
            warehouse_id: 1,
            name: "Shelf-1".to_string(),
        });

        let report = run_planner(KeyMode::Identifier, &store, &[row]).await;
        assert_eq!(report.created, 1);
        assert_eq!(report.skipped, 0);
        assert_eq!(store.records().len(), 2);
    }

    #[tokio::test]
    async fn test_identifier_match_skips() {
        let store = Arc::new(MemoryStore::new());
        store.insert_locker(Locker {
            id: 1,
            warehouse_id: 1,
            name: "Shelf-1".to_string(),
        });
        let mut row = sheet_row(0, "Shelf-1", "A-1-1");
        row.external_id = Some("rec-1".to_string());
        store.insert_record(record_for(&row, "rec-1", 1, 1));

        let report = run_planner(KeyMode::Identifier, &store, &[row]).await;
        assert_eq!(report.skipped, 1);
        assert_eq!(report.created, 0);
    }

    /// Store whose create fails for chosen addresses
    struct FlakyStore {
        inner: Arc<MemoryStore>,
        fail_addresses: HashSet<String>,
    }

    #[async_trait]
    impl InventoryStore for FlakyStore {
        async fn list(&self, warehouse_id: i64) -> crate::error::Result<Vec<InventoryRecord>> {
            InventoryStore::list(self.inner.as_ref(), warehouse_id).await
        }

        async fn create(&self, record: NewInventoryRecord) -> crate::error::Result<String> {
            if self.fail_addresses.contains(&record.address) {
                return Err(StockError::Database(sqlx::Error::PoolTimedOut));
            }
            InventoryStore::create(self.inner.as_ref(), record).await
        }

        async fn update(&self, record: &InventoryRecord) -> crate::error::Result<()> {
            self.inner.update(record).await
        }
    }

    #[tokio::test]
    async fn test_row_failure_does_not_abort_batch() {
        let memory = Arc::new(MemoryStore::new());
        let store = FlakyStore {
            inner: memory.clone(),
            fail_addresses: HashSet::from(["A-1-2".to_string()]),
        };
        let rows = vec![
            sheet_row(0, "Shelf-1", "A-1-1"),
            sheet_row(1, "Shelf-1", "A-1-2"),
            sheet_row(2, "Shelf-1", "A-1-3"),
        ];

        let ctx = SyncContext::new();
        let mut resolver = LockerResolver::preload(memory.clone(), 1).await.unwrap();
        let report = ReconciliationPlanner::new(KeyMode::Address)
            .run(&ctx, 1, &rows, &mut resolver, &store, None)
            .await
            .unwrap();

        assert_eq!(report.created, 2);
        assert_eq!(report.failed, 1);
        assert!(matches!(report.outcomes[1], RowOutcome::Failed { row: 3, .. }));
        assert_eq!(memory.records().len(), 2);
    }

    #[tokio::test]
    async fn test_cancellation_aborts_run() {
        let store = Arc::new(MemoryStore::new());
        let rows = vec![sheet_row(0, "Shelf-1", "A-1-1")];
        let ctx = SyncContext::new();
        ctx.cancel.cancel();
        let mut resolver = LockerResolver::preload(store.clone(), 1).await.unwrap();
        let result = ReconciliationPlanner::new(KeyMode::Address)
            .run(&ctx, 1, &rows, &mut resolver, store.as_ref(), None)
            .await;
        assert!(matches!(result, Err(StockError::Cancelled(_))));
        assert!(store.records().is_empty());
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let store = Arc::new(MemoryStore::new());
        store.insert_locker(Locker {
            id: 1,
            warehouse_id: 1,
            name: "Shelf-1".to_string(),
        });
        let rows = vec![
            sheet_row(0, "Shelf-1", "A-1-1"),
            sheet_row(1, "Shelf-9", "A-1-2"),
        ];
        store.insert_record(record_for(&rows[0], "r1", 1, 1));

        let resolver = LockerResolver::preload(store.clone(), 1).await.unwrap();
        let existing = InventoryStore::list(store.as_ref(), 1).await.unwrap();
        let counts = ReconciliationPlanner::new(KeyMode::Address)
            .dry_run(&rows, &resolver, existing);

        assert_eq!(counts, PlanCounts { creates: 1, updates: 0, skips: 1 });
        assert_eq!(store.records().len(), 1);
        assert_eq!(store.lockers().len(), 1);
    }

    #[tokio::test]
    async fn test_dry_run_unknown_locker_on_match_is_update() {
        let store = Arc::new(MemoryStore::new());
        let rows = vec![sheet_row(0, "Shelf-New", "A-1-1")];
        store.insert_record(record_for(&rows[0], "r1", 1, 77));

        let resolver = LockerResolver::preload(store.clone(), 1).await.unwrap();
        let existing = InventoryStore::list(store.as_ref(), 1).await.unwrap();
        let counts = ReconciliationPlanner::new(KeyMode::Address)
            .dry_run(&rows, &resolver, existing);
        assert_eq!(counts.updates, 1);
    }

    #[test]
    fn test_report_sorting_and_counts() {
        let mut report = SyncReport::default();
        report.record(RowOutcome::Skipped { row: 4 });
        report.record(RowOutcome::Failed { row: 2, error: "x".to_string() });
        report.sort_by_row();
        assert_eq!(report.outcomes[0].row(), 2);
        assert_eq!(report.total(), 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.skipped, 1);
    }

    #[test]
    fn test_outcome_wire_shape_is_status_tagged() {
        let outcome = RowOutcome::Created {
            row: 2,
            id: "rec-1".to_string(),
        };
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["status"], "created");
        assert_eq!(value["row"], 2);
        assert_eq!(value["id"], "rec-1");

        let skipped: RowOutcome =
            serde_json::from_value(serde_json::json!({ "status": "skipped", "row": 9 })).unwrap();
        assert_eq!(skipped, RowOutcome::Skipped { row: 9 });
    }
}
