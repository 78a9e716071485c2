//! Grid decode/encode
//!
//! Decoding turns a tab's raw cell matrix into typed inventory rows. Cell
//! values pass through a generic row-parsing stage (the csv reader), so any
//! value containing the field delimiter, a newline or a quote is rewritten
//! with placeholder tokens first and the placeholders are reversed on every
//! string-typed field after parsing. Rows that fail field decoding become
//! [`RowError`]s; only structural problems (no header, missing columns)
//! abort the decode as a whole.

use std::collections::HashMap;

use tracing::warn;

use crate::error::{Result, RowError, StockError};
use crate::model::{InventoryRecord, SheetRow};
use crate::schema::SheetSchema;
use crate::sheets::{CellData, Tab};

const COMMA_TOKEN: &str = "__COMMA__";
const NEWLINE_TOKEN: &str = "__NEWLINE__";
const QUOTE_TOKEN: &str = "__QUOTE__";

/// Per-decode configuration
#[derive(Debug, Clone, Default)]
pub struct DecodeOptions {
    /// Override the column count; defaults to the header row's width
    pub column_count: Option<usize>,
    /// Count a formatted-but-empty cell toward a row's extent
    pub use_format_extent: bool,
    /// Header label of the identifier column, if the sync uses one
    pub identifier_label: Option<String>,
}

/// Replace delimiter, newline and quote characters with placeholder tokens
/// so the row survives the csv stage as a single field
pub fn escape_cell(value: &str) -> String {
    value
        .replace("\r\n", NEWLINE_TOKEN)
        .replace('\n', NEWLINE_TOKEN)
        .replace('\r', NEWLINE_TOKEN)
        .replace(',', COMMA_TOKEN)
        .replace('"', QUOTE_TOKEN)
}

/// Reverse [`escape_cell`]; applied to string-typed fields only
pub fn unescape_cell(value: &str) -> String {
    value
        .replace(NEWLINE_TOKEN, "\n")
        .replace(COMMA_TOKEN, ",")
        .replace(QUOTE_TOKEN, "\"")
}

/// Number of leading cells up to the last one holding a non-empty value, or
/// optionally a non-null format
pub fn row_extent(row: &[CellData], use_format: bool) -> usize {
    row.iter()
        .rposition(|cell| !cell.is_empty() || (use_format && cell.format.is_some()))
        .map_or(0, |idx| idx + 1)
}

/// Decode a tab into typed rows
///
/// Returns the decoded rows in sheet order plus one [`RowError`] per data
/// row that could not be decoded. Blank rows are skipped without an error.
pub fn decode(
    tab: &Tab,
    schema: &SheetSchema,
    opts: &DecodeOptions,
) -> Result<(Vec<SheetRow>, Vec<RowError>)> {
    let Some(header_row) = tab.cells.first() else {
        return Err(StockError::Validation(format!(
            "tab '{}' has no header row",
            tab.title
        )));
    };

    let labels = tab.header_labels();
    let header_extent = row_extent(header_row, false);
    let width = opts.column_count.unwrap_or(header_extent);
    if width == 0 {
        return Err(StockError::Validation(format!(
            "tab '{}' has an empty header row",
            tab.title
        )));
    }

    let report = common::validate_header_labels(&labels, &schema.labels());
    for warning in &report.warnings {
        // The identifier column is expected to show up as an extra label
        if let Some(id_label) = &opts.identifier_label {
            if warning.contains(&format!("'{id_label}'")) {
                continue;
            }
        }
        warn!("tab '{}': {}", tab.title, warning);
    }
    report.into_result(&format!("tab '{}' header mismatch", tab.title))?;

    // Label positions are stable for the whole decode
    let field_positions: Vec<(crate::schema::FieldKind, usize)> = schema
        .columns()
        .iter()
        .filter_map(|col| {
            labels
                .iter()
                .position(|l| l == col.label)
                .map(|pos| (col.field, pos))
        })
        .collect();
    let id_position = opts
        .identifier_label
        .as_ref()
        .and_then(|label| labels.iter().position(|l| l == label));

    // Normalize each data row to `width` fields and escape for the csv stage.
    // Blank rows keep no entry, so the original data index rides along.
    let mut prepared: Vec<(usize, String)> = Vec::new();
    for (cell_row_idx, row) in tab.cells.iter().enumerate().skip(1) {
        let data_index = cell_row_idx - 1;
        let extent = row_extent(row, opts.use_format_extent);
        if extent == 0 {
            continue;
        }
        let line = (0..width)
            .map(|col| {
                row.get(col)
                    .map(|cell| escape_cell(&cell.value))
                    .unwrap_or_default()
            })
            .collect::<Vec<_>>()
            .join(",");
        // A fully empty line would be swallowed by the csv reader and desync
        // the pairing below; such a row is blank within the schema's width
        if line.is_empty() {
            continue;
        }
        prepared.push((data_index, line));
    }

    let joined = prepared
        .iter()
        .map(|(_, line)| line.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    let mut rows = Vec::with_capacity(prepared.len());
    let mut row_errors = Vec::new();

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(joined.as_bytes());

    for ((data_index, _), record) in prepared.iter().zip(reader.records()) {
        let row_number = data_index + 2;
        let record = match record {
            Ok(rec) => rec,
            Err(e) => {
                row_errors.push(RowError::new(
                    row_number,
                    StockError::Validation(format!("row could not be parsed: {e}")),
                ));
                continue;
            }
        };

        match build_row(*data_index, &record, schema, &field_positions, id_position) {
            Ok(row) => rows.push(row),
            Err(e) => row_errors.push(RowError::new(row_number, e)),
        }
    }

    Ok((rows, row_errors))
}

fn build_row(
    data_index: usize,
    record: &csv::StringRecord,
    schema: &SheetSchema,
    field_positions: &[(crate::schema::FieldKind, usize)],
    id_position: Option<usize>,
) -> Result<SheetRow> {
    let row_number = data_index + 2;
    let mut row = SheetRow {
        locker_name: String::new(),
        floor: 0,
        position: 0,
        address: String::new(),
        description: String::new(),
        display_name: String::new(),
        label: String::new(),
        external_id: None,
        index: data_index,
    };

    for (field, pos) in field_positions {
        let raw = record.get(*pos).unwrap_or_default();
        let value = if field.is_numeric() {
            raw.to_string()
        } else {
            unescape_cell(raw)
        };
        schema
            .apply_field(&mut row, *field, &value)
            .map_err(StockError::Validation)?;
    }

    row.external_id = id_position
        .and_then(|pos| record.get(pos))
        .map(unescape_cell)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    if row.locker_name.is_empty() {
        return Err(StockError::MissingField {
            row: row_number,
            field: "locker".to_string(),
        });
    }
    if row.address.is_empty() {
        return Err(StockError::MissingField {
            row: row_number,
            field: "address".to_string(),
        });
    }

    Ok(row)
}

/// Encode records into a cell matrix in schema column order
///
/// Values go to the write API verbatim, so no placeholder escaping here.
/// A record pointing at an unknown locker gets an empty locker cell.
pub fn encode(
    records: &[InventoryRecord],
    schema: &SheetSchema,
    locker_names: &HashMap<i64, String>,
) -> Vec<Vec<String>> {
    records
        .iter()
        .map(|record| {
            let locker_name = match locker_names.get(&record.locker_id) {
                Some(name) => name.as_str(),
                None => {
                    warn!(
                        record_id = %record.id,
                        locker_id = record.locker_id,
                        "record references unknown locker, writing empty cell"
                    );
                    ""
                }
            };
            schema.encode_row(record, locker_name)
        })
        .collect()
}
