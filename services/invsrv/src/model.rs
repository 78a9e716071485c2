//! Domain types shared across the sync engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StockError};

// ============================================================================
// Sync mode
// ============================================================================

/// Matching strategy used to pair sheet rows with persisted records
///
/// Fixed at service construction; the two modes are mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyMode {
    /// Legacy mode: rows match records on the free-text address
    #[default]
    Address,
    /// Rows match records on the system-generated identifier written back
    /// into the sheet
    Identifier,
}

// ============================================================================
// Sheet-side types
// ============================================================================

/// One decoded inventory row, alive only for the duration of a sync call
///
/// `index` is the 0-based position among the tab's data rows and is used
/// solely for writeback targeting; business identity is `address` or
/// `external_id` depending on [`KeyMode`].
#[derive(Debug, Clone, PartialEq)]
pub struct SheetRow {
    pub locker_name: String,
    pub floor: i32,
    pub position: i32,
    pub address: String,
    pub description: String,
    pub display_name: String,
    pub label: String,
    pub external_id: Option<String>,
    pub index: usize,
}

impl SheetRow {
    /// 1-based row number as displayed in the spreadsheet UI (header is row 1)
    pub fn sheet_row_number(&self) -> usize {
        self.index + 2
    }
}

// ============================================================================
// Persisted types
// ============================================================================

/// Persisted inventory record
///
/// `id` is a UUID generated by the store at create time. In address mode
/// `(warehouse_id, address)` is unique; in identifier mode `id` alone is
/// the key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub id: String,
    pub warehouse_id: i64,
    pub locker_id: i64,
    pub floor: i32,
    pub position: i32,
    pub address: String,
    pub description: String,
    pub display_name: String,
    pub label: String,
    pub image_ref: Option<String>,
}

/// Payload for creating an inventory record; the store assigns the id
#[derive(Debug, Clone, PartialEq)]
pub struct NewInventoryRecord {
    pub warehouse_id: i64,
    pub locker_id: i64,
    pub floor: i32,
    pub position: i32,
    pub address: String,
    pub description: String,
    pub display_name: String,
    pub label: String,
    pub image_ref: Option<String>,
}

impl NewInventoryRecord {
    pub fn from_row(warehouse_id: i64, locker_id: i64, row: &SheetRow) -> Self {
        Self {
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
}

/// Named subdivision of a warehouse's storage ("locker")
///
/// `(warehouse_id, name)` is unique; lockers are created lazily on first
/// sight and never deleted during a sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Locker {
    pub id: i64,
    pub warehouse_id: i64,
    pub name: String,
}

// ============================================================================
// Sheet binding
// ============================================================================

/// Role a bound tab plays for its warehouse
///
/// A spreadsheet may carry separate tabs for inventory, lockers, brands and
/// change history; the conflict guard checks ownership across all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TabRole {
    Inventory,
    Lockers,
    Brands,
    History,
}

impl TabRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inventory => "inventory",
            Self::Lockers => "lockers",
            Self::Brands => "brands",
            Self::History => "history",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "inventory" => Ok(Self::Inventory),
            "lockers" => Ok(Self::Lockers),
            "brands" => Ok(Self::Brands),
            "history" => Ok(Self::History),
            other => Err(StockError::Validation(format!(
                "unknown tab role '{other}'"
            ))),
        }
    }
}

/// Persisted association between a warehouse and the exact grid tab it
/// synchronizes, one row per (warehouse, role)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetBinding {
    pub warehouse_id: i64,
    pub role: TabRole,
    pub spreadsheet_id: String,
    pub tab_id: i64,
    pub last_synced_at: DateTime<Utc>,
}
