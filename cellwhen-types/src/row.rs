use serde::{Deserialize, Serialize};

use crate::timestamp::Timestamp;

/// Column name within a row.
pub type ColumnId = String;

/// Row identity.
pub type RowId = String;

/// Cell payload. Opaque to the visibility engine; it is carried, never inspected.
pub type CellValue = serde_json::Value;

type CellTuple = (ColumnId, CellValue, Timestamp);

/// A single `(column, value, timestamp)` fact.
///
/// Serializes as a three element array, `["x", 9, "2026-01-01T00:00:00Z"]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "CellTuple", into = "CellTuple")]
pub struct Cell {
    pub column: ColumnId,
    pub value: CellValue,
    pub timestamp: Timestamp,
}

impl Cell {
    pub fn new(
        column: impl Into<ColumnId>,
        value: impl Into<CellValue>,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
            timestamp,
        }
    }
}

impl From<CellTuple> for Cell {
    fn from((column, value, timestamp): CellTuple) -> Self {
        Self {
            column,
            value,
            timestamp,
        }
    }
}

impl From<Cell> for CellTuple {
    fn from(cell: Cell) -> Self {
        (cell.column, cell.value, cell.timestamp)
    }
}

/// A named row: the unit of work handed to a row filter.
///
/// Column names are expected to be unique; cell order carries no meaning.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Row {
    #[serde(rename = "rowName")]
    pub name: RowId,
    #[serde(rename = "columns", default)]
    pub cells: Vec<Cell>,
}

impl Row {
    pub fn new(name: impl Into<RowId>) -> Self {
        Self {
            name: name.into(),
            cells: Vec::new(),
        }
    }

    pub fn from_cells(name: impl Into<RowId>, cells: Vec<Cell>) -> Self {
        Self {
            name: name.into(),
            cells,
        }
    }

    /// Builder-style cell append.
    pub fn with_cell(
        mut self,
        column: impl Into<ColumnId>,
        value: impl Into<CellValue>,
        timestamp: Timestamp,
    ) -> Self {
        self.cells.push(Cell::new(column, value, timestamp));
        self
    }

    pub fn push(&mut self, cell: Cell) {
        self.cells.push(cell);
    }

    pub fn get(&self, column: &str) -> Option<&Cell> {
        self.cells.iter().find(|cell| cell.column == column)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Cell> {
        self.cells.iter()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl<'a> IntoIterator for &'a Row {
    type Item = &'a Cell;
    type IntoIter = std::slice::Iter<'a, Cell>;

    fn into_iter(self) -> Self::IntoIter {
        self.cells.iter()
    }
}

/// A row after temporal filtering.
///
/// `columns` is `None` when no cell survived, and also when the input row had
/// no cells at all; both render without a `columns` field. The row identity is
/// always kept so consumers can still count it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FilteredRow {
    #[serde(rename = "rowName")]
    pub name: RowId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<Cell>>,
}

impl FilteredRow {
    /// Build from the retained cells, collapsing an empty set to `None`.
    pub fn from_retained(name: impl Into<RowId>, cells: Vec<Cell>) -> Self {
        Self {
            name: name.into(),
            columns: if cells.is_empty() { None } else { Some(cells) },
        }
    }

    pub fn cells(&self) -> &[Cell] {
        self.columns.as_deref().unwrap_or(&[])
    }

    pub fn has_columns(&self) -> bool {
        self.columns.is_some()
    }

    pub fn column_count(&self) -> usize {
        self.cells().len()
    }

    pub fn get(&self, column: &str) -> Option<&Cell> {
        self.cells().iter().find(|cell| cell.column == column)
    }

    pub fn into_row(self) -> Row {
        Row {
            name: self.name,
            cells: self.columns.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn t0() -> Timestamp {
        Timestamp::parse("2026-01-01").unwrap()
    }

    #[test]
    fn test_row_builder() {
        let row = Row::new("r1")
            .with_cell("x", 1, t0())
            .with_cell("y", "two", t0());
        assert_eq!(row.len(), 2);
        assert_eq!(row.get("y").unwrap().value, json!("two"));
        assert!(row.get("z").is_none());
    }

    #[test]
    fn test_cell_serializes_as_tuple() {
        let cell = Cell::new("x", 9, t0());
        let value = serde_json::to_value(&cell).unwrap();
        assert_eq!(value, json!(["x", 9, "2026-01-01T00:00:00Z"]));
        let back: Cell = serde_json::from_value(value).unwrap();
        assert_eq!(back, cell);
    }

    #[test]
    fn test_empty_filtered_row_has_no_columns_field() {
        let row = FilteredRow::from_retained("9", Vec::new());
        assert!(!row.has_columns());
        assert_eq!(row.column_count(), 0);

        let value = serde_json::to_value(&row).unwrap();
        assert_eq!(value, json!({ "rowName": "9" }));
    }

    #[test]
    fn test_filtered_row_with_cells() {
        let row = FilteredRow::from_retained("3", vec![Cell::new("y", 3, t0())]);
        let value = serde_json::to_value(&row).unwrap();
        assert_eq!(
            value,
            json!({ "rowName": "3", "columns": [["y", 3, "2026-01-01T00:00:00Z"]] })
        );
        assert_eq!(row.into_row().len(), 1);
    }
}
