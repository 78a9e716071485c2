//! A1 grid geometry: column letters, cell references, write ranges
//!
//! Column numbering is 1-based bijective base-26: A=1 .. Z=26, AA=27. The
//! conversions round-trip exactly for every positive integer.

use crate::sheets::CellData;

/// Column number to letters: 1 -> "A", 26 -> "Z", 27 -> "AA"
///
/// Returns an empty string for 0, which is never a valid column.
pub fn column_letter(mut n: u32) -> String {
    let mut letters: Vec<char> = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Column letters to number: "A" -> 1, "AA" -> 27
///
/// Case-insensitive; returns `None` for empty or non-alphabetic input and on
/// overflow.
pub fn column_number(letters: &str) -> Option<u32> {
    if letters.is_empty() {
        return None;
    }
    let mut n: u32 = 0;
    for c in letters.chars() {
        let c = c.to_ascii_uppercase();
        if !c.is_ascii_uppercase() {
            return None;
        }
        n = n.checked_mul(26)?.checked_add(c as u32 - 'A' as u32 + 1)?;
    }
    Some(n)
}

/// Single cell reference, 1-based column and row: (3, 2) -> "C2"
pub fn cell_ref(column: u32, row: u32) -> String {
    format!("{}{}", column_letter(column), row)
}

/// Rectangular range from a start cell plus the extent of the payload
///
/// A 1x1 extent collapses to a single cell reference.
pub fn range(start_column: u32, start_row: u32, rows: usize, columns: usize) -> String {
    if rows <= 1 && columns <= 1 {
        return cell_ref(start_column, start_row);
    }
    let end_column = start_column + columns.max(1) as u32 - 1;
    let end_row = start_row + rows.max(1) as u32 - 1;
    format!(
        "{}:{}",
        cell_ref(start_column, start_row),
        cell_ref(end_column, end_row)
    )
}

/// 1-based row number of the first row after the last row holding any
/// non-empty cell
///
/// Trailing all-empty rows in the fetched grid do not count, so appends land
/// directly under the real data rather than under the grid's row count.
pub fn next_empty_row(cells: &[Vec<CellData>]) -> u32 {
    let last_used = cells
        .iter()
        .rposition(|row| row.iter().any(|cell| !cell.is_empty()));
    match last_used {
        Some(idx) => idx as u32 + 2,
        None => 1,
    }
}
