//! Read-only access to a rectangular grid of cells.
//!
//! Coordinates are 1-based `(column, row)` pairs, the same convention
//! `umya-spreadsheet` uses.

use crate::utils::cell_address;
use std::collections::HashMap;
use std::fmt;

/// The untyped value found at one grid position.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RawCellValue {
    #[default]
    Empty,
    Bool(bool),
    Text(String),
}

impl RawCellValue {
    pub fn is_empty(&self) -> bool {
        match self {
            RawCellValue::Empty => true,
            RawCellValue::Bool(_) => false,
            RawCellValue::Text(text) => text.trim().is_empty(),
        }
    }

    /// Trimmed textual form; booleans render as `true`/`false`.
    pub fn text(&self) -> Option<String> {
        match self {
            RawCellValue::Empty => None,
            RawCellValue::Bool(value) => Some(value.to_string()),
            RawCellValue::Text(text) => {
                let trimmed = text.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
        }
    }

    /// `1`, `true` (any case) or a boolean `true`.
    pub fn is_truthy(&self) -> bool {
        match self {
            RawCellValue::Empty => false,
            RawCellValue::Bool(value) => *value,
            RawCellValue::Text(text) => {
                let text = text.trim();
                text == "1" || text.eq_ignore_ascii_case("true")
            }
        }
    }
}

impl From<&str> for RawCellValue {
    fn from(value: &str) -> Self {
        if value.is_empty() {
            RawCellValue::Empty
        } else {
            RawCellValue::Text(value.to_string())
        }
    }
}

impl From<bool> for RawCellValue {
    fn from(value: bool) -> Self {
        RawCellValue::Bool(value)
    }
}

/// A resolved grid position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRef {
    pub column: u32,
    pub row: u32,
}

impl CellRef {
    pub fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&cell_address(self.column, self.row))
    }
}

pub trait GridReader {
    fn cell_value(&self, column: u32, row: u32) -> RawCellValue;

    fn max_row(&self) -> u32;

    fn max_column(&self) -> u32;

    fn value_at(&self, cell: CellRef) -> RawCellValue {
        self.cell_value(cell.column, cell.row)
    }
}

impl<G: GridReader + ?Sized> GridReader for &G {
    fn cell_value(&self, column: u32, row: u32) -> RawCellValue {
        (**self).cell_value(column, row)
    }

    fn max_row(&self) -> u32 {
        (**self).max_row()
    }

    fn max_column(&self) -> u32 {
        (**self).max_column()
    }
}

/// Sparse in-memory grid.
#[derive(Debug, Clone, Default)]
pub struct MemoryGrid {
    cells: HashMap<(u32, u32), RawCellValue>,
    max_row: u32,
    max_column: u32,
}

impl MemoryGrid {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) fn with(mut self, address: &str, value: impl Into<RawCellValue>) -> Self {
        self.set_address(address, value)
            .expect("valid cell address");
        self
    }

    /// Sets a cell by A1 address; `None` when the address is malformed.
    pub fn set_address(
        &mut self,
        address: &str,
        value: impl Into<RawCellValue>,
    ) -> Option<CellRef> {
        let (column, row) = crate::utils::parse_cell_address(address)?;
        self.set(column, row, value);
        Some(CellRef::new(column, row))
    }

    pub fn set(&mut self, column: u32, row: u32, value: impl Into<RawCellValue>) {
        let value = value.into();
        if value == RawCellValue::Empty {
            self.cells.remove(&(column, row));
            return;
        }
        self.max_row = self.max_row.max(row);
        self.max_column = self.max_column.max(column);
        self.cells.insert((column, row), value);
    }
}

impl GridReader for MemoryGrid {
    fn cell_value(&self, column: u32, row: u32) -> RawCellValue {
        self.cells.get(&(column, row)).cloned().unwrap_or_default()
    }

    fn max_row(&self) -> u32 {
        self.max_row
    }

    fn max_column(&self) -> u32 {
        self.max_column
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_grid_tracks_bounds_and_blanks() {
        let grid = MemoryGrid::new()
            .with("C4", "Wall")
            .with("B7", true)
            .with("A1", "");
        assert_eq!(grid.max_column(), 3);
        assert_eq!(grid.max_row(), 7);
        assert_eq!(grid.cell_value(3, 4), RawCellValue::Text("Wall".into()));
        assert_eq!(grid.cell_value(1, 1), RawCellValue::Empty);
        assert!(grid.cell_value(2, 7).is_truthy());
    }

    #[test]
    fn truthiness_accepts_one_and_true_only() {
        assert!(RawCellValue::from("1").is_truthy());
        assert!(RawCellValue::from(" TRUE ").is_truthy());
        assert!(!RawCellValue::from("yes").is_truthy());
        assert!(!RawCellValue::from("0").is_truthy());
        assert!(!RawCellValue::Bool(false).is_truthy());
        assert!(RawCellValue::from("   ").is_empty());
    }

    #[test]
    fn malformed_addresses_are_refused() {
        let mut grid = MemoryGrid::new();
        assert_eq!(grid.set_address("B3", "Wall"), Some(CellRef::new(2, 3)));
        assert_eq!(grid.set_address("3B", "Wall"), None);
        assert_eq!(grid.set_address("", "Wall"), None);
        assert_eq!((grid.max_column(), grid.max_row()), (2, 3));
    }

    #[test]
    fn cell_ref_displays_as_a1() {
        assert_eq!(CellRef::new(28, 3).to_string(), "AB3");
    }
}
