//! Coordinate schema: where each semantic role lives in the grid.
//!
//! A schema document names roles in five families and gives each one a
//! coordinate descriptor:
//!
//! ```yaml
//! matrix:
//!   start: L20
//!   include_column: { row: 3 }
//! specification:
//!   name: { row: 14 }
//!   purpose: { row: 2 }
//! applicability:
//!   entity: { row: 5 }
//! requirements:
//!   property_set: { column: C }
//!   property_name: { column: D }
//! header:
//!   title: { cell: B1 }
//! ```
//!
//! `{ row: N }` means "the current column at row N", `{ column: X }` means
//! "column X at the current row" and `{ cell: A1 }` (or a bare `A1`) is an
//! absolute cell.

use crate::error::SchemaError;
use crate::grid::CellRef;
use crate::model::IFC_VERSIONS;
use crate::utils::{cell_address, column_name_to_number, column_number_to_name, parse_cell_address};
use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::path::Path;
use strum::{AsRefStr, EnumIter};

pub const DEFAULT_ASSIGNMENT_MARKER: &str = "X";
pub const DEFAULT_PLACEHOLDER_MARKER: &str = "REPLACEME";
pub const DEFAULT_PURPOSE: &str = "General specification";
pub const DEFAULT_IFC_VERSION: &str = "IFC4X3_ADD2";

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MatrixField {
    IncludeColumn,
    IncludeRow,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SpecField {
    Name,
    Purpose,
    Description,
    Instructions,
    Identifier,
    IfcVersion,
}

/// Fields a facet can be assembled from, shared by the applicability and
/// requirement sides.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FacetField {
    Entity,
    PredefinedType,
    PropertySet,
    PropertyName,
    PropertyDataType,
    PropertyValue,
    PropertyUri,
    ClassificationSystem,
    ClassificationValue,
    ClassificationUri,
    AttributeName,
    AttributeValue,
    Material,
    MaterialUri,
    Cardinality,
    Instructions,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum HeaderField {
    Title,
    Author,
    Date,
    Version,
    Copyright,
    Description,
    Milestone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Applicability,
    Requirements,
}

impl Side {
    pub fn role(self, field: FacetField) -> Role {
        match self {
            Side::Applicability => Role::Applicability(field),
            Side::Requirements => Role::Requirement(field),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    Matrix(MatrixField),
    Specification(SpecField),
    Applicability(FacetField),
    Requirement(FacetField),
    Header(HeaderField),
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Matrix(field) => write!(f, "matrix.{}", field.as_ref()),
            Role::Specification(field) => write!(f, "specification.{}", field.as_ref()),
            Role::Applicability(field) => write!(f, "applicability.{}", field.as_ref()),
            Role::Requirement(field) => write!(f, "requirements.{}", field.as_ref()),
            Role::Header(field) => write!(f, "header.{}", field.as_ref()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coordinate {
    Absolute(CellRef),
    /// The current column at a fixed row.
    ColumnAt { row: u32 },
    /// A fixed column at the current row.
    RowAt { column: u32 },
}

impl Coordinate {
    pub fn cell(address: &str) -> Option<Self> {
        parse_cell_address(address)
            .map(|(column, row)| Coordinate::Absolute(CellRef::new(column, row)))
    }

    pub fn row(row: u32) -> Self {
        Coordinate::ColumnAt { row }
    }

    pub fn column(name: &str) -> Option<Self> {
        column_name_to_number(name).map(|column| Coordinate::RowAt { column })
    }

    fn kind(&self) -> &'static str {
        match self {
            Coordinate::Absolute(_) => "an absolute cell",
            Coordinate::ColumnAt { .. } => "column-relative",
            Coordinate::RowAt { .. } => "row-relative",
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Coordinate::Absolute(cell) => write!(f, "{cell}"),
            Coordinate::ColumnAt { row } => write!(f, "<column>{row}"),
            Coordinate::RowAt { column } => write!(f, "{}<row>", column_number_to_name(*column)),
        }
    }
}

/// What the caller knows about its position while resolving a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Context {
    Document,
    Column(u32),
    Cell { column: u32, row: u32 },
}

impl Context {
    fn column(&self) -> Option<u32> {
        match self {
            Context::Document => None,
            Context::Column(column) | Context::Cell { column, .. } => Some(*column),
        }
    }

    fn row(&self) -> Option<u32> {
        match self {
            Context::Cell { row, .. } => Some(*row),
            _ => None,
        }
    }

    fn describe(&self) -> String {
        match self {
            Context::Document => "document".to_string(),
            Context::Column(column) => format!("column {}", column_number_to_name(*column)),
            Context::Cell { column, row } => format!("cell {}", cell_address(*column, *row)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CoordinateSchema {
    sheet: Option<String>,
    start: CellRef,
    end: Option<CellRef>,
    assignment_marker: String,
    placeholder_marker: String,
    default_purpose: String,
    default_ifc_version: String,
    roles: HashMap<Role, Coordinate>,
}

impl CoordinateSchema {
    pub fn new(start: CellRef) -> Self {
        Self {
            sheet: None,
            start,
            end: None,
            assignment_marker: DEFAULT_ASSIGNMENT_MARKER.to_string(),
            placeholder_marker: DEFAULT_PLACEHOLDER_MARKER.to_string(),
            default_purpose: DEFAULT_PURPOSE.to_string(),
            default_ifc_version: DEFAULT_IFC_VERSION.to_string(),
            roles: HashMap::new(),
        }
    }

    pub fn with(mut self, role: Role, coordinate: Coordinate) -> Self {
        self.roles.insert(role, coordinate);
        self
    }

    pub fn with_end(mut self, end: CellRef) -> Self {
        self.end = Some(end);
        self
    }

    pub fn with_default_ifc_version(mut self, version: &str) -> Self {
        self.default_ifc_version = version.to_ascii_uppercase();
        self
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!("schema file {:?} does not exist", path);
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read schema file {:?}", path))?;
        let ext = path
            .extension()
            .and_then(|os| os.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        let document: SchemaDocument = match ext.as_str() {
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("failed to parse YAML schema {:?}", path))?,
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("failed to parse JSON schema {:?}", path))?,
            other => anyhow::bail!("unsupported schema extension: {other}"),
        };
        Self::from_document(document).with_context(|| format!("invalid schema {:?}", path))
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, SchemaError> {
        let document: SchemaDocument =
            serde_yaml::from_str(contents).map_err(|e| SchemaError::Document(e.to_string()))?;
        Self::from_document(document)
    }

    fn from_document(document: SchemaDocument) -> Result<Self, SchemaError> {
        let SchemaDocument {
            sheet,
            matrix,
            defaults,
            specification,
            applicability,
            requirements,
            header,
        } = document;

        let start = parse_absolute("matrix.start", &matrix.start)?;
        let end = matrix
            .end
            .as_deref()
            .map(|end| parse_absolute("matrix.end", end))
            .transpose()?;

        let mut schema = Self::new(start);
        schema.sheet = sheet;
        schema.end = end;
        if let Some(marker) = matrix.assignment_marker {
            schema.assignment_marker = marker;
        }
        if let Some(marker) = matrix.placeholder_marker {
            schema.placeholder_marker = marker;
        }
        if let Some(purpose) = defaults.purpose {
            schema.default_purpose = purpose;
        }
        if let Some(version) = defaults.ifc_version {
            schema.default_ifc_version = version.trim().to_ascii_uppercase();
        }

        let mut entries: Vec<(Role, CoordinateDocument)> = Vec::new();
        if let Some(doc) = matrix.include_column {
            entries.push((Role::Matrix(MatrixField::IncludeColumn), doc));
        }
        if let Some(doc) = matrix.include_row {
            entries.push((Role::Matrix(MatrixField::IncludeRow), doc));
        }
        entries.extend(specification.into_iter().map(|(f, d)| (Role::Specification(f), d)));
        entries.extend(applicability.into_iter().map(|(f, d)| (Role::Applicability(f), d)));
        entries.extend(requirements.into_iter().map(|(f, d)| (Role::Requirement(f), d)));
        entries.extend(header.into_iter().map(|(f, d)| (Role::Header(f), d)));

        for (role, doc) in entries {
            let coordinate = doc.into_coordinate(role)?;
            schema.roles.insert(role, coordinate);
        }

        schema.validate()?;
        Ok(schema)
    }

    /// Rejects descriptors that could never be resolved in the context their
    /// role is read in, and a default IFC version outside the allow-list.
    pub fn validate(&self) -> Result<(), SchemaError> {
        if let Some(end) = self.end
            && (end.column < self.start.column || end.row < self.start.row)
        {
            return Err(SchemaError::InvalidCoordinate {
                role: "matrix.end".to_string(),
                value: end.to_string(),
                reason: format!("must not precede matrix.start {}", self.start),
            });
        }

        if !IFC_VERSIONS.contains(&self.default_ifc_version.as_str()) {
            return Err(SchemaError::InvalidValue {
                field: "defaults.ifc_version",
                value: self.default_ifc_version.clone(),
                reason: format!("expected one of {}", IFC_VERSIONS.join(", ")),
            });
        }

        for (role, coordinate) in &self.roles {
            let context = match role {
                Role::Matrix(MatrixField::IncludeColumn)
                | Role::Applicability(_)
                | Role::Header(_) => Context::Column(self.start.column),
                Role::Matrix(MatrixField::IncludeRow) => {
                    if matches!(coordinate, Coordinate::ColumnAt { .. }) {
                        return Err(SchemaError::ContextMismatch {
                            role: *role,
                            found: coordinate.kind(),
                            context: "row".to_string(),
                        });
                    }
                    continue;
                }
                Role::Specification(_) | Role::Requirement(_) => continue,
            };
            self.resolve(*role, context)?;
        }
        Ok(())
    }

    pub fn sheet(&self) -> Option<&str> {
        self.sheet.as_deref()
    }

    pub fn start(&self) -> CellRef {
        self.start
    }

    pub fn end(&self) -> Option<CellRef> {
        self.end
    }

    pub fn assignment_marker(&self) -> &str {
        &self.assignment_marker
    }

    pub fn placeholder_marker(&self) -> &str {
        &self.placeholder_marker
    }

    pub fn default_purpose(&self) -> &str {
        &self.default_purpose
    }

    pub fn default_ifc_version(&self) -> &str {
        &self.default_ifc_version
    }

    pub fn is_configured(&self, role: Role) -> bool {
        self.roles.contains_key(&role)
    }

    pub fn coordinate(&self, role: Role) -> Option<Coordinate> {
        self.roles.get(&role).copied()
    }

    /// `Ok(None)` when the role is not configured, which callers treat as
    /// the feature being switched off for the run.
    pub fn lookup(&self, role: Role, context: Context) -> Result<Option<CellRef>, SchemaError> {
        match self.roles.get(&role) {
            None => Ok(None),
            Some(coordinate) => resolve_coordinate(role, *coordinate, context).map(Some),
        }
    }

    pub fn resolve(&self, role: Role, context: Context) -> Result<CellRef, SchemaError> {
        self.lookup(role, context)?
            .ok_or(SchemaError::MissingRole(role))
    }

    pub fn require(&self, role: Role) -> Result<Coordinate, SchemaError> {
        self.coordinate(role).ok_or(SchemaError::MissingRole(role))
    }
}

fn resolve_coordinate(
    role: Role,
    coordinate: Coordinate,
    context: Context,
) -> Result<CellRef, SchemaError> {
    let mismatch = || SchemaError::ContextMismatch {
        role,
        found: coordinate.kind(),
        context: context.describe(),
    };
    match coordinate {
        Coordinate::Absolute(cell) => Ok(cell),
        Coordinate::ColumnAt { row } => {
            let column = context.column().ok_or_else(mismatch)?;
            Ok(CellRef::new(column, row))
        }
        Coordinate::RowAt { column } => {
            let row = context.row().ok_or_else(mismatch)?;
            Ok(CellRef::new(column, row))
        }
    }
}

fn parse_absolute(role: &str, value: &str) -> Result<CellRef, SchemaError> {
    parse_cell_address(value)
        .map(|(column, row)| CellRef::new(column, row))
        .ok_or_else(|| SchemaError::InvalidCoordinate {
            role: role.to_string(),
            value: value.to_string(),
            reason: "expected an A1-style cell address".to_string(),
        })
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SchemaDocument {
    #[serde(default)]
    sheet: Option<String>,
    matrix: MatrixDocument,
    #[serde(default)]
    defaults: DefaultsDocument,
    #[serde(default)]
    specification: BTreeMap<SpecField, CoordinateDocument>,
    #[serde(default)]
    applicability: BTreeMap<FacetField, CoordinateDocument>,
    #[serde(default)]
    requirements: BTreeMap<FacetField, CoordinateDocument>,
    #[serde(default)]
    header: BTreeMap<HeaderField, CoordinateDocument>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MatrixDocument {
    start: String,
    #[serde(default)]
    end: Option<String>,
    #[serde(default)]
    assignment_marker: Option<String>,
    #[serde(default)]
    placeholder_marker: Option<String>,
    #[serde(default)]
    include_column: Option<CoordinateDocument>,
    #[serde(default)]
    include_row: Option<CoordinateDocument>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct DefaultsDocument {
    #[serde(default)]
    purpose: Option<String>,
    #[serde(default)]
    ifc_version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CoordinateDocument {
    Address(String),
    Cell { cell: String },
    Row { row: u32 },
    Column { column: String },
}

impl CoordinateDocument {
    fn into_coordinate(self, role: Role) -> Result<Coordinate, SchemaError> {
        let invalid = |value: String, reason: &str| SchemaError::InvalidCoordinate {
            role: role.to_string(),
            value,
            reason: reason.to_string(),
        };
        match self {
            CoordinateDocument::Address(cell) | CoordinateDocument::Cell { cell } => {
                Coordinate::cell(&cell)
                    .ok_or_else(|| invalid(cell, "expected an A1-style cell address"))
            }
            CoordinateDocument::Row { row } => {
                if row == 0 {
                    Err(invalid(row.to_string(), "rows are numbered from 1"))
                } else {
                    Ok(Coordinate::row(row))
                }
            }
            CoordinateDocument::Column { column } => Coordinate::column(column.trim())
                .ok_or_else(|| invalid(column, "expected a column name such as D")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const SCHEMA: &str = r#"
sheet: Requirements
matrix:
  start: L20
  include_column: { row: 3 }
  include_row: { column: B }
defaults:
  purpose: General
specification:
  name: { row: 14 }
  purpose: { row: 2 }
applicability:
  entity: { row: 5 }
requirements:
  property_set: { column: C }
  property_name: { column: D }
header:
  title: B1
  author: { cell: B2 }
"#;

    #[test]
    fn loads_all_descriptor_shapes() {
        let schema = CoordinateSchema::from_yaml_str(SCHEMA).unwrap();
        assert_eq!(schema.sheet(), Some("Requirements"));
        assert_eq!(schema.start(), CellRef::new(12, 20));
        assert_eq!(schema.default_purpose(), "General");
        assert_eq!(schema.default_ifc_version(), DEFAULT_IFC_VERSION);
        assert_eq!(
            schema.coordinate(Role::Requirement(FacetField::PropertyName)),
            Some(Coordinate::RowAt { column: 4 })
        );
        assert_eq!(
            schema.coordinate(Role::Header(HeaderField::Title)),
            Some(Coordinate::Absolute(CellRef::new(2, 1)))
        );
    }

    #[test]
    fn resolves_against_context() {
        let schema = CoordinateSchema::from_yaml_str(SCHEMA).unwrap();
        let entity = Role::Applicability(FacetField::Entity);
        assert_eq!(
            schema.resolve(entity, Context::Column(13)).unwrap(),
            CellRef::new(13, 5)
        );
        let pset = Role::Requirement(FacetField::PropertySet);
        assert_eq!(
            schema
                .resolve(pset, Context::Cell { column: 13, row: 22 })
                .unwrap(),
            CellRef::new(3, 22)
        );
        assert_matches!(
            schema.resolve(pset, Context::Column(13)),
            Err(SchemaError::ContextMismatch { .. })
        );
        assert_eq!(
            schema
                .resolve(Role::Header(HeaderField::Author), Context::Document)
                .unwrap(),
            CellRef::new(2, 2)
        );
    }

    #[test]
    fn unconfigured_roles_are_disabled_not_errors() {
        let schema = CoordinateSchema::from_yaml_str(SCHEMA).unwrap();
        let material = Role::Requirement(FacetField::Material);
        assert_eq!(
            schema
                .lookup(material, Context::Cell { column: 12, row: 20 })
                .unwrap(),
            None
        );
        assert_matches!(
            schema.resolve(material, Context::Document),
            Err(SchemaError::MissingRole(role)) if role == material
        );
    }

    #[test]
    fn rejects_row_relative_applicability() {
        let err = CoordinateSchema::from_yaml_str(
            "matrix: { start: C5 }\napplicability:\n  entity: { column: D }\n",
        )
        .unwrap_err();
        assert_matches!(err, SchemaError::ContextMismatch { .. });
    }

    #[test]
    fn rejects_unknown_roles_and_bad_columns() {
        assert_matches!(
            CoordinateSchema::from_yaml_str(
                "matrix: { start: C5 }\nrequirements:\n  colour: { column: D }\n"
            ),
            Err(SchemaError::Document(_))
        );
        assert_matches!(
            CoordinateSchema::from_yaml_str(
                "matrix: { start: C5 }\nrequirements:\n  entity: { column: D4 }\n"
            ),
            Err(SchemaError::InvalidCoordinate { .. })
        );
        assert_matches!(
            CoordinateSchema::from_yaml_str("matrix: { start: C5, end: A1 }\n"),
            Err(SchemaError::InvalidCoordinate { .. })
        );
    }

    #[test]
    fn column_coordinates_need_a_letter_name() {
        assert_eq!(Coordinate::column("D"), Some(Coordinate::RowAt { column: 4 }));
        assert_eq!(Coordinate::column("AA"), Some(Coordinate::RowAt { column: 27 }));
        assert_eq!(Coordinate::column("D4"), None);
        assert_eq!(Coordinate::column(""), None);
    }

    #[test]
    fn rejects_unknown_default_version() {
        assert_matches!(
            CoordinateSchema::from_yaml_str(
                "matrix: { start: C5 }\ndefaults: { ifc_version: IFC5 }\n"
            ),
            Err(SchemaError::InvalidValue { .. })
        );
    }

    #[test]
    fn role_names_read_like_the_document() {
        assert_eq!(
            Role::Requirement(FacetField::PropertyDataType).to_string(),
            "requirements.property_data_type"
        );
        assert_eq!(Role::Matrix(MatrixField::IncludeRow).to_string(), "matrix.include_row");
    }
}
