use crate::grid::{GridReader, MemoryGrid, RawCellValue};
use anyhow::{Context, Result, anyhow};
use std::path::{Path, PathBuf};
use umya_spreadsheet::Worksheet;
use umya_spreadsheet::reader::xlsx;

/// One worksheet of an `.xlsx` file, snapshotted into memory at open time.
///
/// Cells are copied out of the umya model once so the walker never touches
/// the spreadsheet library while resolving coordinates.
#[derive(Debug, Clone)]
pub struct WorkbookGrid {
    path: PathBuf,
    sheet: String,
    cells: MemoryGrid,
    max_row: u32,
    max_column: u32,
}

impl WorkbookGrid {
    pub fn open(path: &Path, sheet_name: &str) -> Result<Self> {
        let book = xlsx::read(path)
            .with_context(|| format!("failed to read workbook {}", path.display()))?;
        let sheet = book.get_sheet_by_name(sheet_name).ok_or_else(|| {
            let available: Vec<&str> = book
                .get_sheet_collection()
                .iter()
                .map(|sheet| sheet.get_name())
                .collect();
            anyhow!(
                "sheet '{}' not found in {} (available: {})",
                sheet_name,
                path.display(),
                available.join(", ")
            )
        })?;
        let grid = Self::from_worksheet(path, sheet);
        tracing::debug!(
            path = %path.display(),
            sheet = sheet_name,
            max_row = grid.max_row,
            max_column = grid.max_column,
            "workbook sheet loaded"
        );
        Ok(grid)
    }

    fn from_worksheet(path: &Path, sheet: &Worksheet) -> Self {
        let mut cells = MemoryGrid::new();
        for cell in sheet.get_cell_collection() {
            let coord = cell.get_coordinate();
            cells.set(*coord.get_col_num(), *coord.get_row_num(), cell_to_raw(cell));
        }
        let (max_column, max_row) = sheet.get_highest_column_and_row();
        Self {
            path: path.to_path_buf(),
            sheet: sheet.get_name().to_string(),
            cells,
            max_row,
            max_column,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn sheet(&self) -> &str {
        &self.sheet
    }
}

impl GridReader for WorkbookGrid {
    fn cell_value(&self, column: u32, row: u32) -> RawCellValue {
        self.cells.cell_value(column, row)
    }

    fn max_row(&self) -> u32 {
        self.max_row
    }

    fn max_column(&self) -> u32 {
        self.max_column
    }
}

/// Formulas contribute their cached value; booleans are recognised by the
/// rendered text umya produces for them.
pub fn cell_to_raw(cell: &umya_spreadsheet::Cell) -> RawCellValue {
    let raw = cell.get_value();
    if raw.trim().is_empty() {
        return RawCellValue::Empty;
    }
    match raw.to_ascii_lowercase().as_str() {
        "true" => RawCellValue::Bool(true),
        "false" => RawCellValue::Bool(false),
        _ => RawCellValue::Text(raw.to_string()),
    }
}
