#![allow(dead_code)]

use std::path::{Path, PathBuf};

use excel2ids::{CoordinateSchema, GridReader, MemoryGrid};
use tempfile::{TempDir, tempdir};
use umya_spreadsheet::{self, Spreadsheet};

/// Layout of the reference requirement matrix: requirement rows start at
/// row 20, applicability columns at column L.
pub const MATRIX_SCHEMA: &str = r#"
sheet: Requirements
matrix:
  start: L20
defaults:
  purpose: General specification
  ifc_version: IFC4X3_ADD2
specification:
  name: { row: 14 }
  purpose: { column: K }
  ifc_version: { row: 4 }
  description: { row: 15 }
applicability:
  entity: { row: 5 }
requirements:
  property_set: { column: C }
  property_name: { column: D }
  property_value: { column: E }
  property_uri: { column: G }
  property_data_type: { column: H }
header:
  title: B1
  author: B2
"#;

pub fn matrix_schema() -> CoordinateSchema {
    CoordinateSchema::from_yaml_str(MATRIX_SCHEMA).expect("reference schema")
}

/// Builder over [`MemoryGrid`] speaking in matrix terms.
#[derive(Debug, Clone, Default)]
pub struct MatrixBuilder {
    grid: MemoryGrid,
}

impl MatrixBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applicability column with its entity and specification name.
    pub fn column(self, column: &str, entity: &str, name: &str) -> Self {
        self.cell(&format!("{column}5"), entity)
            .cell(&format!("{column}14"), name)
    }

    /// Requirement row describing one property.
    pub fn property(self, row: u32, pset: &str, name: &str, data_type: &str) -> Self {
        self.cell(&format!("C{row}"), pset)
            .cell(&format!("D{row}"), name)
            .cell(&format!("H{row}"), data_type)
    }

    pub fn cell(mut self, address: &str, value: &str) -> Self {
        self.grid
            .set_address(address, value)
            .unwrap_or_else(|| panic!("invalid fixture address {address:?}"));
        self
    }

    pub fn assign(self, column: &str, row: u32, value: &str) -> Self {
        self.cell(&format!("{column}{row}"), value)
    }

    pub fn build(self) -> MemoryGrid {
        self.grid
    }
}

/// Copies every non-empty cell of `grid` into the first sheet of `book`,
/// renamed to `sheet_name`.
pub fn fill_sheet(book: &mut Spreadsheet, sheet_name: &str, grid: &MemoryGrid) {
    let sheet = book.get_sheet_mut(&0).expect("default sheet");
    sheet.set_name(sheet_name);
    for row in 1..=grid.max_row() {
        for column in 1..=grid.max_column() {
            if let Some(text) = grid.cell_value(column, row).text() {
                sheet.get_cell_mut((column, row)).set_value(text);
            }
        }
    }
}

pub fn write_workbook_to_path<F>(path: &Path, f: F)
where
    F: FnOnce(&mut Spreadsheet),
{
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create dir");
    }
    let mut book = umya_spreadsheet::new_file();
    f(&mut book);
    umya_spreadsheet::writer::xlsx::write(&book, path).expect("write workbook");
}

pub struct TestWorkspace {
    _tempdir: TempDir,
    root: PathBuf,
}

impl TestWorkspace {
    pub fn new() -> Self {
        let tempdir = tempdir().expect("tempdir");
        let root = tempdir.path().to_path_buf();
        Self {
            _tempdir: tempdir,
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    pub fn create_workbook<F>(&self, name: &str, f: F) -> PathBuf
    where
        F: FnOnce(&mut Spreadsheet),
    {
        let path = self.path(name);
        write_workbook_to_path(&path, f);
        path
    }

    pub fn write_file(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.path(name);
        std::fs::write(&path, contents).expect("write file");
        path
    }
}
