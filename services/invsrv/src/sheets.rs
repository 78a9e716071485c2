//! Spreadsheet wire model and transport trait
//!
//! The raw API client (auth, throttling, retries) lives outside this crate;
//! the engine consumes it through [`SpreadsheetClient`]. Each write
//! operation takes a single validated request struct rather than a pile of
//! optional arguments.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::context::SyncContext;
use crate::error::{Result, StockError};

// ============================================================================
// Grid data
// ============================================================================

/// User-applied cell formatting, opaque to the engine
///
/// Carried so that extent scans can optionally treat a formatted-but-empty
/// cell as occupied; never compared when locating columns by label.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CellFormat {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_format: Option<String>,
}

/// One grid cell: the formatted value plus any user format
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CellData {
    #[serde(default)]
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<CellFormat>,
}

impl CellData {
    pub fn text(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            format: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.value.trim().is_empty()
    }
}

/// Per-column metadata reported by the transport
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pixel_width: Option<u32>,
}

/// A single sheet within a spreadsheet
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tab {
    pub id: i64,
    pub title: String,
    /// Row-major cell matrix; row 0 is the header
    pub cells: Vec<Vec<CellData>>,
    /// One entry per grid column; authoritative for tab width since trailing
    /// empty cells may be trimmed from `cells`
    #[serde(default)]
    pub column_meta: Vec<ColumnMeta>,
}

impl Tab {
    /// Header labels, trimmed; empty when the tab has no rows
    pub fn header_labels(&self) -> Vec<String> {
        match self.cells.first() {
            Some(row) => row.iter().map(|c| c.value.trim().to_string()).collect(),
            None => vec![],
        }
    }

    /// Total grid width in columns
    pub fn column_count(&self) -> usize {
        if !self.column_meta.is_empty() {
            return self.column_meta.len();
        }
        self.cells.first().map_or(0, Vec::len)
    }
}

/// A fetched spreadsheet: document title plus all tabs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Spreadsheet {
    pub title: String,
    pub tabs: Vec<Tab>,
}

impl Spreadsheet {
    pub fn tab(&self, tab_id: i64) -> Option<&Tab> {
        self.tabs.iter().find(|t| t.id == tab_id)
    }
}

// ============================================================================
// Write requests
// ============================================================================

/// Cell-range write, values addressed by an A1 range on one tab
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateCellsRequest {
    pub spreadsheet_id: String,
    pub tab_id: i64,
    /// A1 range, e.g. `A2:G9` or a single cell `H3`
    pub range: String,
    pub values: Vec<Vec<String>>,
}

impl UpdateCellsRequest {
    pub fn validate(&self) -> Result<()> {
        if self.spreadsheet_id.is_empty() {
            return Err(StockError::InvalidParameter {
                param: "spreadsheet_id".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if self.range.is_empty() {
            return Err(StockError::InvalidParameter {
                param: "range".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if self.values.is_empty() || self.values.iter().any(Vec::is_empty) {
            return Err(StockError::InvalidParameter {
                param: "values".to_string(),
                reason: "must contain at least one non-empty row".to_string(),
            });
        }
        Ok(())
    }
}

/// Append a new column at the tab's right edge with a header label and a
/// fixed pixel width; the transport returns the new column's 1-based index
#[derive(Debug, Clone, PartialEq)]
pub struct AppendColumnRequest {
    pub spreadsheet_id: String,
    pub tab_id: i64,
    pub header: String,
    pub pixel_width: u32,
}

impl AppendColumnRequest {
    pub fn validate(&self) -> Result<()> {
        if self.header.trim().is_empty() {
            return Err(StockError::InvalidParameter {
                param: "header".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if self.pixel_width == 0 {
            return Err(StockError::InvalidParameter {
                param: "pixel_width".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }
}

// ============================================================================
// Transport trait
// ============================================================================

/// Grid read/write capability consumed by the sync engine
#[async_trait]
pub trait SpreadsheetClient: Send + Sync {
    /// Fetch the whole spreadsheet, all tabs included
    async fn fetch_grid(&self, ctx: &SyncContext, spreadsheet_id: &str) -> Result<Spreadsheet>;

    /// Write a rectangular block of values
    async fn update_cells(&self, ctx: &SyncContext, req: UpdateCellsRequest) -> Result<()>;

    /// Append a header column, returning its 1-based column index
    async fn append_column(&self, ctx: &SyncContext, req: AppendColumnRequest) -> Result<u32>;
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[test]
    fn test_tab_header_labels_trimmed() {
        let tab = Tab {
            id: 0,
            title: "Inventory".to_string(),
            cells: vec![vec![CellData::text(" Locker "), CellData::text("Floor")]],
            column_meta: vec![],
        };
        assert_eq!(tab.header_labels(), vec!["Locker", "Floor"]);
    }

    #[test]
    fn test_column_count_prefers_meta() {
        let tab = Tab {
            id: 0,
            title: String::new(),
            cells: vec![vec![CellData::text("A")]],
            column_meta: vec![ColumnMeta::default(); 4],
        };
        assert_eq!(tab.column_count(), 4);
    }

    #[test]
    fn test_update_request_rejects_empty_values() {
        let req = UpdateCellsRequest {
            spreadsheet_id: "s".to_string(),
            tab_id: 1,
            range: "A1".to_string(),
            values: vec![],
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_append_request_rejects_blank_header() {
        let req = AppendColumnRequest {
            spreadsheet_id: "s".to_string(),
            tab_id: 1,
            header: "  ".to_string(),
            pixel_width: 160,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_spreadsheet_tab_lookup() {
        let sheet = Spreadsheet {
            title: "Main".to_string(),
            tabs: vec![
                Tab { id: 0, ..Tab::default() },
                Tab { id: 77, ..Tab::default() },
            ],
        };
        assert!(sheet.tab(77).is_some());
        assert!(sheet.tab(5).is_none());
    }
}
