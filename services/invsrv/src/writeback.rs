//! Identifier writeback
//!
//! In identifier mode, every created record's generated id is written back
//! into the row that produced it, so the next sync matches that row instead
//! of creating a duplicate. The identifier column is located by its header
//! label; when missing it is appended once at the tab's right edge and the
//! index is remembered for the rest of the run. Identifier cells of
//! existing rows are never rewritten.

use std::sync::Arc;

use tracing::info;

use crate::context::SyncContext;
use crate::error::Result;
use crate::grid::a1;
use crate::sheets::{AppendColumnRequest, SpreadsheetClient, UpdateCellsRequest};

pub struct IdWriteback {
    client: Arc<dyn SpreadsheetClient>,
    spreadsheet_id: String,
    tab_id: i64,
    label: String,
    width_px: u32,
    /// 1-based column index once located or provisioned
    column: Option<u32>,
}

impl IdWriteback {
    /// Set up writeback for one tab, locating the identifier column in the
    /// fetched header if it already exists
    pub fn new(
        client: Arc<dyn SpreadsheetClient>,
        spreadsheet_id: impl Into<String>,
        tab_id: i64,
        label: impl Into<String>,
        width_px: u32,
        header_labels: &[String],
    ) -> Self {
        let label = label.into();
        let column = header_labels
            .iter()
            .position(|l| l == &label)
            .map(|pos| pos as u32 + 1);
        Self {
            client,
            spreadsheet_id: spreadsheet_id.into(),
            tab_id,
            label,
            width_px,
            column,
        }
    }

    /// The identifier column's 1-based index, if already known
    pub fn column(&self) -> Option<u32> {
        self.column
    }

    /// Return the identifier column, appending it if the tab has none
    pub async fn ensure_column(&mut self, ctx: &SyncContext) -> Result<u32> {
        if let Some(column) = self.column {
            return Ok(column);
        }
        ctx.check_cancelled()?;
        let req = AppendColumnRequest {
            spreadsheet_id: self.spreadsheet_id.clone(),
            tab_id: self.tab_id,
            header: self.label.clone(),
            pixel_width: self.width_px,
        };
        req.validate()?;
        let column = self.client.append_column(ctx, req).await?;
        info!(
            trace_id = %ctx.trace_id,
            tab_id = self.tab_id,
            column,
            label = %self.label,
            "identifier column provisioned"
        );
        self.column = Some(column);
        Ok(column)
    }

    /// Write a generated id into the cell of the data row that produced it
    ///
    /// `row_index` is the 0-based position among data rows; the header row
    /// shifts the sheet row by one.
    pub async fn write_id(&mut self, ctx: &SyncContext, row_index: usize, id: &str) -> Result<()> {
        let column = self.ensure_column(ctx).await?;
        let sheet_row = row_index as u32 + 2;
        let req = UpdateCellsRequest {
            spreadsheet_id: self.spreadsheet_id.clone(),
            tab_id: self.tab_id,
            range: a1::cell_ref(column, sheet_row),
            values: vec![vec![id.to_string()]],
        };
        req.validate()?;
        self.client.update_cells(ctx, req).await
    }
}
