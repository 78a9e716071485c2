//! Sync service facade
//!
//! Wires the codec, resolver, planner, writeback and guard into the three
//! public operations: `sync` (sheet to database), `summarize` (read-only
//! diff preview) and `append_records` (database to sheet). Grid URLs are
//! validated by pattern extraction before any network call.

use std::sync::Arc;

use chrono::Utc;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::context::SyncContext;
use crate::error::{Result, StockError};
use crate::grid::{self, a1, DecodeOptions};
use crate::guard::ConflictGuard;
use crate::model::{InventoryRecord, KeyMode, SheetBinding, TabRole};
use crate::planner::{ReconciliationPlanner, RowOutcome, SyncReport};
use crate::resolver::LockerResolver;
use crate::schema::{inventory_schema, SheetSchema};
use crate::settings::SyncSettings;
use crate::sheets::{SpreadsheetClient, Tab, UpdateCellsRequest};
use crate::store::{BindingStore, InventoryStore, LockerStore};
use crate::writeback::IdWriteback;

/// Spreadsheet and tab extracted from a grid URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridTarget {
    pub spreadsheet_id: String,
    pub tab_id: i64,
}

/// Parse a grid URL into its spreadsheet id (`/d/<id>` path segment) and
/// tab id (`gid=<n>` query or fragment parameter)
///
/// Malformed URLs fail here, before any network traffic.
pub fn parse_grid_url(url: &str) -> Result<GridTarget> {
    let id_pattern = Regex::new(r"/d/([A-Za-z0-9_-]+)")
        .map_err(|e| StockError::Internal(format!("spreadsheet id pattern: {e}")))?;
    let gid_pattern = Regex::new(r"[?&#]gid=([0-9]+)")
        .map_err(|e| StockError::Internal(format!("gid pattern: {e}")))?;

    let spreadsheet_id = id_pattern
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| {
            StockError::InvalidSheetUrl(format!("no /d/<spreadsheet-id> segment in '{url}'"))
        })?;

    let tab_id = gid_pattern
        .captures(url)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<i64>().ok())
        .ok_or_else(|| StockError::InvalidSheetUrl(format!("no gid=<tab-id> parameter in '{url}'")))?;

    Ok(GridTarget {
        spreadsheet_id,
        tab_id,
    })
}

/// Read-only sync preview returned by [`SyncService::summarize`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetSummary {
    pub title: String,
    pub tab_name: String,
    pub total_rows: usize,
    pub new_count: usize,
    pub updated_count: usize,
    pub skipped_count: usize,
}

pub struct SyncService {
    client: Arc<dyn SpreadsheetClient>,
    inventory: Arc<dyn InventoryStore>,
    lockers: Arc<dyn LockerStore>,
    bindings: Arc<dyn BindingStore>,
    settings: SyncSettings,
    schema: SheetSchema,
    planner: ReconciliationPlanner,
}

impl SyncService {
    pub fn new(
        client: Arc<dyn SpreadsheetClient>,
        inventory: Arc<dyn InventoryStore>,
        lockers: Arc<dyn LockerStore>,
        bindings: Arc<dyn BindingStore>,
        settings: SyncSettings,
    ) -> Self {
        let planner = ReconciliationPlanner::new(settings.key_mode);
        Self {
            client,
            inventory,
            lockers,
            bindings,
            settings,
            schema: inventory_schema(),
            planner,
        }
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    fn decode_options(&self) -> DecodeOptions {
        DecodeOptions {
            column_count: None,
            use_format_extent: false,
            identifier_label: Some(self.settings.identifier_label.clone()),
        }
    }

    /// Reconcile a warehouse's inventory from its grid tab
    ///
    /// On success the (warehouse, inventory-tab) binding is upserted with a
    /// fresh `last_synced_at`. Per-row failures land in the report; the
    /// sync itself still succeeds.
    pub async fn sync(
        &self,
        ctx: &SyncContext,
        warehouse_id: i64,
        grid_url: &str,
    ) -> Result<SyncReport> {
        let target = parse_grid_url(grid_url)?;
        info!(
            trace_id = %ctx.trace_id,
            warehouse_id,
            spreadsheet_id = %target.spreadsheet_id,
            tab_id = target.tab_id,
            "sync started"
        );

        ConflictGuard::new(self.bindings.clone())
            .check(warehouse_id, &target.spreadsheet_id, target.tab_id)
            .await?;

        ctx.check_cancelled()?;
        let sheet = self.client.fetch_grid(ctx, &target.spreadsheet_id).await?;
        let tab = sheet.tab(target.tab_id).ok_or_else(|| StockError::TabNotFound {
            spreadsheet_id: target.spreadsheet_id.clone(),
            tab_id: target.tab_id,
        })?;

        let (rows, row_errors) = grid::decode(tab, &self.schema, &self.decode_options())?;

        let mut resolver = LockerResolver::preload(self.lockers.clone(), warehouse_id).await?;
        let mut writeback = match self.settings.key_mode {
            KeyMode::Identifier => Some(IdWriteback::new(
                self.client.clone(),
                target.spreadsheet_id.clone(),
                target.tab_id,
                self.settings.identifier_label.clone(),
                self.settings.identifier_width_px,
                &tab.header_labels(),
            )),
            KeyMode::Address => None,
        };

        let mut report = self
            .planner
            .run(
                ctx,
                warehouse_id,
                &rows,
                &mut resolver,
                self.inventory.as_ref(),
                writeback.as_mut(),
            )
            .await?;

        for row_error in row_errors {
            report.record(RowOutcome::Failed {
                row: row_error.row_number,
                error: row_error.error.to_string(),
            });
        }
        report.sort_by_row();

        self.bindings
            .upsert(&SheetBinding {
                warehouse_id,
                role: TabRole::Inventory,
                spreadsheet_id: target.spreadsheet_id.clone(),
                tab_id: target.tab_id,
                last_synced_at: Utc::now(),
            })
            .await?;

        info!(
            trace_id = %ctx.trace_id,
            warehouse_id,
            created = report.created,
            updated = report.updated,
            skipped = report.skipped,
            failed = report.failed,
            "sync finished"
        );
        Ok(report)
    }

    /// Preview what a sync would do, without writing to the sheet, the
    /// database or the binding
    pub async fn summarize(
        &self,
        ctx: &SyncContext,
        warehouse_id: i64,
        grid_url: &str,
    ) -> Result<SheetSummary> {
        let target = parse_grid_url(grid_url)?;

        ctx.check_cancelled()?;
        let sheet = self.client.fetch_grid(ctx, &target.spreadsheet_id).await?;
        let tab = sheet.tab(target.tab_id).ok_or_else(|| StockError::TabNotFound {
            spreadsheet_id: target.spreadsheet_id.clone(),
            tab_id: target.tab_id,
        })?;

        let (rows, row_errors) = grid::decode(tab, &self.schema, &self.decode_options())?;
        let resolver = LockerResolver::preload(self.lockers.clone(), warehouse_id).await?;
        let existing = self.inventory.list(warehouse_id).await?;
        let counts = self.planner.dry_run(&rows, &resolver, existing);

        Ok(SheetSummary {
            title: sheet.title.clone(),
            tab_name: tab.title.clone(),
            total_rows: rows.len() + row_errors.len(),
            new_count: counts.creates,
            updated_count: counts.updates,
            skipped_count: counts.skips,
        })
    }

    /// Push records into the tab starting at its first truly empty row,
    /// returning that row's 1-based number
    ///
    /// In identifier mode the records' ids are written into the identifier
    /// column as well, so the next sync matches the appended rows.
    pub async fn append_records(
        &self,
        ctx: &SyncContext,
        warehouse_id: i64,
        grid_url: &str,
        records: &[InventoryRecord],
    ) -> Result<u32> {
        if records.is_empty() {
            return Err(StockError::InvalidParameter {
                param: "records".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        let target = parse_grid_url(grid_url)?;

        ConflictGuard::new(self.bindings.clone())
            .check(warehouse_id, &target.spreadsheet_id, target.tab_id)
            .await?;

        ctx.check_cancelled()?;
        let sheet = self.client.fetch_grid(ctx, &target.spreadsheet_id).await?;
        let tab = sheet.tab(target.tab_id).ok_or_else(|| StockError::TabNotFound {
            spreadsheet_id: target.spreadsheet_id.clone(),
            tab_id: target.tab_id,
        })?;
        ensure_header(tab)?;

        let resolver = LockerResolver::preload(self.lockers.clone(), warehouse_id).await?;
        let locker_names = resolver.names_by_id();

        let matrix = grid::encode(records, &self.schema, &locker_names);
        let start_row = a1::next_empty_row(&tab.cells);
        let request = UpdateCellsRequest {
            spreadsheet_id: target.spreadsheet_id.clone(),
            tab_id: target.tab_id,
            range: a1::range(1, start_row, matrix.len(), self.schema.len()),
            values: matrix,
        };
        request.validate()?;
        self.client.update_cells(ctx, request).await?;

        if self.settings.key_mode == KeyMode::Identifier {
            let mut writeback = IdWriteback::new(
                self.client.clone(),
                target.spreadsheet_id.clone(),
                target.tab_id,
                self.settings.identifier_label.clone(),
                self.settings.identifier_width_px,
                &tab.header_labels(),
            );
            for (offset, record) in records.iter().enumerate() {
                let row_index = (start_row as usize - 2) + offset;
                writeback.write_id(ctx, row_index, &record.id).await?;
            }
        }

        info!(
            trace_id = %ctx.trace_id,
            warehouse_id,
            rows = records.len(),
            start_row,
            "records appended to sheet"
        );
        Ok(start_row)
    }
}

fn ensure_header(tab: &Tab) -> Result<()> {
    if tab.header_labels().iter().all(String::is_empty) {
        return Err(StockError::Validation(format!(
            "tab '{}' has no header row to append under",
            tab.title
        )));
    }
    Ok(())
}
