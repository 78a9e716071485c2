//! Statically declared sheet column schema
//!
//! The column list is built once at startup; decode and encode dispatch on
//! [`FieldKind`] with no runtime struct introspection. The identifier column
//! is deliberately absent here: it is located by its configured header label
//! at sync time and may not exist at all until the first writeback
//! provisions it.

use crate::model::SheetRow;

/// Domain field a sheet column maps to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    LockerName,
    Floor,
    Position,
    Address,
    Description,
    DisplayName,
    Label,
}

impl FieldKind {
    /// Numeric fields skip placeholder escaping; they can never contain a
    /// delimiter, newline or quote.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Floor | Self::Position)
    }
}

/// One column of the sheet: which field it holds and the header label that
/// identifies it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub field: FieldKind,
    pub label: &'static str,
}

/// Ordered column layout of an inventory tab
#[derive(Debug, Clone)]
pub struct SheetSchema {
    columns: Vec<ColumnSpec>,
}

impl SheetSchema {
    pub fn new(columns: Vec<ColumnSpec>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Header labels in schema order
    pub fn labels(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.label.to_string()).collect()
    }

    /// Encode one record's fields into cell strings in schema order
    ///
    /// `locker_name` is supplied by the caller since persisted records carry
    /// only the locker id.
    pub fn encode_row(&self, record: &crate::model::InventoryRecord, locker_name: &str) -> Vec<String> {
        self.columns
            .iter()
            .map(|col| match col.field {
                FieldKind::LockerName => locker_name.to_string(),
                FieldKind::Floor => record.floor.to_string(),
                FieldKind::Position => record.position.to_string(),
                FieldKind::Address => record.address.clone(),
                FieldKind::Description => record.description.clone(),
                FieldKind::DisplayName => record.display_name.clone(),
                FieldKind::Label => record.label.clone(),
            })
            .collect()
    }

    /// Apply one parsed field value onto the row under construction
    ///
    /// Numeric parse failures surface as errors; blank numeric cells decode
    /// as zero, matching how warehouse staff leave untracked floors empty.
    pub fn apply_field(
        &self,
        row: &mut SheetRow,
        field: FieldKind,
        raw: &str,
    ) -> Result<(), String> {
        let value = raw.trim();
        match field {
            FieldKind::LockerName => row.locker_name = value.to_string(),
            FieldKind::Floor => row.floor = parse_numeric(value, "floor")?,
            FieldKind::Position => row.position = parse_numeric(value, "position")?,
            FieldKind::Address => row.address = value.to_string(),
            FieldKind::Description => row.description = value.to_string(),
            FieldKind::DisplayName => row.display_name = value.to_string(),
            FieldKind::Label => row.label = value.to_string(),
        }
        Ok(())
    }
}

fn parse_numeric(value: &str, field: &str) -> Result<i32, String> {
    if value.is_empty() {
        return Ok(0);
    }
    value
        .parse::<i32>()
        .map_err(|_| format!("field '{field}' is not a number: '{value}'"))
}

/// The canonical inventory tab layout
pub fn inventory_schema() -> SheetSchema {
    SheetSchema::new(vec![
        ColumnSpec { field: FieldKind::LockerName, label: "Locker" },
        ColumnSpec { field: FieldKind::Floor, label: "Floor" },
        ColumnSpec { field: FieldKind::Position, label: "Position" },
        ColumnSpec { field: FieldKind::Address, label: "Address" },
        ColumnSpec { field: FieldKind::Description, label: "Description" },
        ColumnSpec { field: FieldKind::DisplayName, label: "Display Name" },
        ColumnSpec { field: FieldKind::Label, label: "Label" },
    ])
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use crate::model::InventoryRecord;

    fn blank_row() -> SheetRow {
        SheetRow {
            locker_name: String::new(),
            floor: 0,
            position: 0,
            address: String::new(),
            description: String::new(),
            display_name: String::new(),
            label: String::new(),
            external_id: None,
            index: 0,
        }
    }

    #[test]
    fn test_inventory_schema_order() {
        let schema = inventory_schema();
        assert_eq!(schema.len(), 7);
        assert_eq!(schema.columns()[0].field, FieldKind::LockerName);
        assert_eq!(schema.labels()[3], "Address");
    }

    #[test]
    fn test_apply_numeric_field() {
        let schema = inventory_schema();
        let mut row = blank_row();
        schema.apply_field(&mut row, FieldKind::Floor, " 3 ").unwrap();
        assert_eq!(row.floor, 3);
    }

    #[test]
    fn test_blank_numeric_defaults_to_zero() {
        let schema = inventory_schema();
        let mut row = blank_row();
        schema.apply_field(&mut row, FieldKind::Position, "").unwrap();
        assert_eq!(row.position, 0);
    }

    #[test]
    fn test_bad_numeric_is_error() {
        let schema = inventory_schema();
        let mut row = blank_row();
        let err = schema
            .apply_field(&mut row, FieldKind::Floor, "basement")
            .unwrap_err();
        assert!(err.contains("floor"));
    }

    #[test]
    fn test_encode_row_matches_schema_order() {
        let schema = inventory_schema();
        let record = InventoryRecord {
            id: "r1".to_string(),
            warehouse_id: 1,
            locker_id: 9,
            floor: 2,
            position: 14,
            address: "A-2-14".to_string(),
            description: "ibuprofen 200mg".to_string(),
            display_name: "Ibuprofen".to_string(),
            label: "OTC".to_string(),
            image_ref: None,
        };
        let cells = schema.encode_row(&record, "Shelf-3");
        assert_eq!(
            cells,
            vec!["Shelf-3", "2", "14", "A-2-14", "ibuprofen 200mg", "Ibuprofen", "OTC"]
        );
    }

    #[test]
    fn test_numeric_fields_flagged() {
        assert!(FieldKind::Floor.is_numeric());
        assert!(FieldKind::Position.is_numeric());
        assert!(!FieldKind::Address.is_numeric());
    }
}
