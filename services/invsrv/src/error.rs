//! Service result alias and row-level error types

use thiserror::Error;

pub use errors::{StockError, StockResult};

pub type Result<T> = std::result::Result<T, StockError>;

/// A single sheet row that could not be decoded
///
/// `row_number` is the 1-based row number as shown in the spreadsheet UI,
/// header row included, so it can be quoted back to whoever edits the sheet.
#[derive(Debug, Error)]
#[error("row {row_number}: {error}")]
pub struct RowError {
    pub row_number: usize,
    pub error: StockError,
}

impl RowError {
    pub fn new(row_number: usize, error: StockError) -> Self {
        Self { row_number, error }
    }
}
