//! Error and diagnostic types for the compilation engine
//!
//! This module provides:
//! - `SchemaError` for coordinate schemas that cannot shape the facets asked of them
//! - `CompileError` for faults that abort a run before any document is emitted
//! - `Diagnostic` for row- and column-local problems that only skip input

use crate::grid::CellRef;
use crate::schema::{FacetField, Role};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

// =============================================================================
// FATAL ERRORS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("role '{0}' is required here but not configured")]
    MissingRole(Role),

    #[error("role '{role}' is {found} and cannot be resolved in {context} context")]
    ContextMismatch {
        role: Role,
        found: &'static str,
        context: String,
    },

    #[error("invalid coordinate '{value}' for '{role}': {reason}")]
    InvalidCoordinate {
        role: String,
        value: String,
        reason: String,
    },

    #[error("invalid value '{value}' for '{field}': {reason}")]
    InvalidValue {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("schema document could not be parsed: {0}")]
    Document(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(
        "purpose group '{purpose}' has inconsistent document {field}: \
         {first:?} vs {found:?} (column {column})"
    )]
    InconsistentGroupMetadata {
        purpose: String,
        field: &'static str,
        first: Option<String>,
        found: Option<String>,
        column: String,
    },
}

impl CompileError {
    /// Short machine-friendly name, used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            CompileError::Schema(_) => "schema_error",
            CompileError::InconsistentGroupMetadata { .. } => "inconsistent_group_metadata",
        }
    }
}

// =============================================================================
// ROW-LOCAL DIAGNOSTICS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A placeholder-mode row did not mark exactly one requirement field.
    AmbiguousPlaceholder { markers: usize },
    /// The marked field sits on a facet whose primary cell is blank.
    UnusedPlaceholder { field: FacetField },
    /// An included column has no specification name; the whole column is skipped.
    MissingSpecificationName,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub cell: String,
    #[serde(flatten)]
    pub kind: DiagnosticKind,
}

impl Diagnostic {
    pub fn new(cell: CellRef, kind: DiagnosticKind) -> Self {
        Self {
            cell: cell.to_string(),
            kind,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            DiagnosticKind::AmbiguousPlaceholder { markers: 0 } => write!(
                f,
                "{}: assignment value given but no requirement field is marked as placeholder",
                self.cell
            ),
            DiagnosticKind::AmbiguousPlaceholder { markers } => write!(
                f,
                "{}: {} requirement fields are marked as placeholder, expected exactly one",
                self.cell, markers
            ),
            DiagnosticKind::UnusedPlaceholder { field } => write!(
                f,
                "{}: placeholder in '{}' has no facet to land on, assignment ignored",
                self.cell,
                Role::Requirement(*field)
            ),
            DiagnosticKind::MissingSpecificationName => {
                write!(f, "{}: column has no specification name", self.cell)
            }
        }
    }
}
