//! Inventory synchronization service core
//!
//! Keeps a warehouse's externally edited spreadsheet tab and its relational
//! inventory in sync: decodes the grid into typed rows, reconciles them
//! against persisted records row by row, writes generated identifiers back
//! into the sheet, and guards tab bindings against cross-warehouse clashes.

pub mod cleanup;
pub mod context;
pub mod error;
pub mod grid;
pub mod guard;
pub mod model;
pub mod planner;
pub mod resolver;
pub mod schema;
pub mod service;
pub mod settings;
pub mod sheets;
pub mod store;
pub mod writeback;

// Re-export commonly used types
pub use cleanup::{BatchCleanup, CleanupOutcome};
pub use context::SyncContext;
pub use error::{Result, RowError, StockError, StockResult};
pub use model::{
    InventoryRecord, KeyMode, Locker, NewInventoryRecord, SheetBinding, SheetRow, TabRole,
};
pub use planner::{PlanCounts, ReconciliationPlanner, RowAction, RowOutcome, SyncReport};
pub use service::{parse_grid_url, GridTarget, SheetSummary, SyncService};
pub use settings::SyncSettings;
pub use sheets::{
    AppendColumnRequest, CellData, CellFormat, ColumnMeta, Spreadsheet, SpreadsheetClient, Tab,
    UpdateCellsRequest,
};
pub use store::{
    AssetStore, BindingStore, InventoryStore, LockerStore, MemoryStore, SqliteStore,
};
