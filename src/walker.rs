//! Traversal of the requirement matrix.
//!
//! Columns are the outer loop and rows the inner one. Applicability and
//! document metadata are read once per column, before any row of that
//! column, so they can never depend on row content.

use crate::accumulator::{SpecificationAccumulator, SpecificationTuple};
use crate::error::{CompileError, Diagnostic, DiagnosticKind, SchemaError};
use crate::facets::{FacetBuilder, RequirementMode, RequirementOutcome};
use crate::grid::{CellRef, GridReader};
use crate::infer::split_values;
use crate::model::{
    Cardinality, DocumentMetadata, Facet, IFC_VERSIONS, SpecificationGroup, SpecificationMetadata,
};
use crate::schema::{
    Context, CoordinateSchema, FacetField, HeaderField, MatrixField, Role, SpecField,
};
use crate::utils::column_number_to_name;
use chrono::{Days, NaiveDate};
use serde::Serialize;

/// Counters and row-local findings of one walk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WalkReport {
    pub columns_visited: usize,
    pub columns_skipped: usize,
    pub rows_assigned: usize,
    /// Assigned rows dropped because of a row-local error.
    pub skipped_rows: usize,
    pub tuples_emitted: usize,
    pub diagnostics: Vec<Diagnostic>,
    pub notes: Vec<String>,
}

impl WalkReport {
    fn diagnose(&mut self, diagnostic: Diagnostic) {
        if !self.diagnostics.contains(&diagnostic) {
            tracing::warn!(cell = %diagnostic.cell, "{}", diagnostic);
            self.diagnostics.push(diagnostic);
        }
    }

    fn note(&mut self, note: String) {
        if !self.notes.contains(&note) {
            tracing::info!("{}", note);
            self.notes.push(note);
        }
    }
}

/// Result of a walk that finished without a fatal error.
#[derive(Debug, Clone)]
pub struct Compilation {
    pub groups: Vec<SpecificationGroup>,
    pub report: WalkReport,
}

/// Walks `grid` with a fresh accumulator. Groups are only handed out when
/// the whole walk succeeds.
pub fn compile<G: GridReader + ?Sized>(
    schema: &CoordinateSchema,
    grid: &G,
) -> Result<Compilation, CompileError> {
    let mut accumulator = SpecificationAccumulator::new();
    let report = GridWalker::new(schema, grid).walk(&mut accumulator)?;
    Ok(Compilation {
        groups: accumulator.finish(),
        report,
    })
}

pub struct GridWalker<'a, G: ?Sized> {
    schema: &'a CoordinateSchema,
    grid: &'a G,
    builder: FacetBuilder<'a, G>,
}

impl<'a, G: GridReader + ?Sized> GridWalker<'a, G> {
    pub fn new(schema: &'a CoordinateSchema, grid: &'a G) -> Self {
        Self {
            schema,
            grid,
            builder: FacetBuilder::new(schema, grid),
        }
    }

    pub fn walk(
        &self,
        accumulator: &mut SpecificationAccumulator,
    ) -> Result<WalkReport, CompileError> {
        self.schema.require(Role::Specification(SpecField::Name))?;

        let start = self.schema.start();
        let end = self.schema.end();
        let last_column = end.map_or(self.grid.max_column(), |end| end.column);
        let last_row = end.map_or(self.grid.max_row(), |end| end.row);
        let mut report = WalkReport::default();

        for column in start.column..=last_column {
            let context = Context::Column(column);
            if let Some(flag) = self
                .schema
                .lookup(Role::Matrix(MatrixField::IncludeColumn), context)?
                && !self.grid.value_at(flag).is_truthy()
            {
                report.columns_skipped += 1;
                continue;
            }
            report.columns_visited += 1;

            let letter = column_number_to_name(column);
            let span = tracing::debug_span!("column", column = %letter);
            let _entered = span.enter();

            let applicability = self.builder.applicability(column)?;
            let document = self.document(column)?;
            let cardinality = self.applicability_cardinality(column)?;
            tracing::debug!(facets = applicability.len(), "applicability resolved");

            for row in start.row..=last_row {
                self.visit_row(
                    CellRef::new(column, row),
                    &applicability,
                    &document,
                    cardinality,
                    accumulator,
                    &mut report,
                )?;
            }
        }

        tracing::info!(
            columns = report.columns_visited,
            columns_skipped = report.columns_skipped,
            rows = report.rows_assigned,
            skipped_rows = report.skipped_rows,
            groups = accumulator.group_count(),
            specifications = accumulator.record_count(),
            "matrix walk complete"
        );
        Ok(report)
    }

    fn visit_row(
        &self,
        cell: CellRef,
        applicability: &[Facet],
        document: &DocumentMetadata,
        cardinality: Cardinality,
        accumulator: &mut SpecificationAccumulator,
        report: &mut WalkReport,
    ) -> Result<(), CompileError> {
        let context = Context::Cell {
            column: cell.column,
            row: cell.row,
        };
        if let Some(flag) = self
            .schema
            .lookup(Role::Matrix(MatrixField::IncludeRow), context)?
            && !self.grid.value_at(flag).is_truthy()
        {
            return Ok(());
        }

        let Some(assignment) = self.grid.value_at(cell).text() else {
            return Ok(());
        };
        report.rows_assigned += 1;

        let mode = if assignment.eq_ignore_ascii_case(self.schema.assignment_marker()) {
            RequirementMode::Full
        } else {
            RequirementMode::Placeholder(&assignment)
        };

        let requirements = match self.builder.requirements(cell.column, cell.row, mode)? {
            RequirementOutcome::Facets(facets) => facets,
            RequirementOutcome::AmbiguousPlaceholder { markers } => {
                report.skipped_rows += 1;
                report.diagnose(Diagnostic::new(
                    cell,
                    DiagnosticKind::AmbiguousPlaceholder { markers },
                ));
                return Ok(());
            }
            RequirementOutcome::UnusedPlaceholder { field } => {
                report.skipped_rows += 1;
                report.diagnose(Diagnostic::new(
                    cell,
                    DiagnosticKind::UnusedPlaceholder { field },
                ));
                return Ok(());
            }
        };
        if requirements.is_empty() {
            return Ok(());
        }
        debug_assert!(requirements.iter().all(Facet::is_resolved));

        let name_role = Role::Specification(SpecField::Name);
        let Some(name) = self.text(name_role, context)? else {
            report.skipped_rows += 1;
            let name_cell = self.schema.resolve(name_role, context)?;
            report.diagnose(Diagnostic::new(
                name_cell,
                DiagnosticKind::MissingSpecificationName,
            ));
            return Ok(());
        };

        let metadata = SpecificationMetadata {
            description: self.text(Role::Specification(SpecField::Description), context)?,
            instructions: self.text(Role::Specification(SpecField::Instructions), context)?,
            identifier: self.text(Role::Specification(SpecField::Identifier), context)?,
            ifc_versions: self.ifc_versions(context, report)?,
            cardinality,
        };

        let purposes = self.purposes(context)?;
        for purpose in &purposes {
            accumulator.accept(SpecificationTuple {
                purpose,
                name: &name,
                applicability,
                requirements: requirements.clone(),
                metadata: &metadata,
                document,
                origin: cell.to_string(),
            })?;
            report.tuples_emitted += 1;
        }
        Ok(())
    }

    fn text(&self, role: Role, context: Context) -> Result<Option<String>, SchemaError> {
        Ok(self
            .schema
            .lookup(role, context)?
            .and_then(|cell| self.grid.value_at(cell).text()))
    }

    fn purposes(&self, context: Context) -> Result<Vec<String>, SchemaError> {
        let purposes = self
            .text(Role::Specification(SpecField::Purpose), context)?
            .map(|text| split_values(&text))
            .unwrap_or_default();
        if purposes.is_empty() {
            Ok(vec![self.schema.default_purpose().to_string()])
        } else {
            Ok(purposes)
        }
    }

    /// Allow-listed IFC versions named by the version cell. Anything else is
    /// noted and dropped; an empty result becomes the configured default.
    fn ifc_versions(
        &self,
        context: Context,
        report: &mut WalkReport,
    ) -> Result<Vec<String>, SchemaError> {
        let role = Role::Specification(SpecField::IfcVersion);
        let default = self.schema.default_ifc_version();
        let mut versions: Vec<String> = Vec::new();

        if let Some(cell) = self.schema.lookup(role, context)?
            && let Some(text) = self.grid.value_at(cell).text()
        {
            for part in split_values(&text) {
                let version = part.to_ascii_uppercase();
                if IFC_VERSIONS.contains(&version.as_str()) {
                    if !versions.contains(&version) {
                        versions.push(version);
                    }
                } else {
                    report.note(format!(
                        "{cell}: unrecognised IFC version '{part}' ignored, default is {default}"
                    ));
                }
            }
        }

        if versions.is_empty() {
            versions.push(default.to_string());
        }
        Ok(versions)
    }

    fn applicability_cardinality(&self, column: u32) -> Result<Cardinality, SchemaError> {
        let role = Role::Applicability(FacetField::Cardinality);
        let Some(text) = self.text(role, Context::Column(column))? else {
            return Ok(Cardinality::default());
        };
        Ok(text.parse().unwrap_or_else(|reason| {
            tracing::warn!(%reason, "falling back to required applicability");
            Cardinality::default()
        }))
    }

    fn document(&self, column: u32) -> Result<DocumentMetadata, SchemaError> {
        let context = Context::Column(column);
        let read = |field| self.text(Role::Header(field), context);
        Ok(DocumentMetadata {
            title: read(HeaderField::Title)?,
            author: read(HeaderField::Author)?,
            date: read(HeaderField::Date)?.map(|date| normalize_date(&date)),
            version: read(HeaderField::Version)?,
            copyright: read(HeaderField::Copyright)?,
            description: read(HeaderField::Description)?,
            milestone: read(HeaderField::Milestone)?,
        })
    }
}

const EXCEL_MAX_SERIAL: f64 = 2_958_465.0;

/// Header dates typed into a spreadsheet usually arrive as day serials;
/// those become `YYYY-MM-DD`, anything else is kept as written.
fn normalize_date(text: &str) -> String {
    let Ok(serial) = text.parse::<f64>() else {
        return text.to_string();
    };
    if !(1.0..=EXCEL_MAX_SERIAL).contains(&serial) {
        return text.to_string();
    }
    NaiveDate::from_ymd_opt(1899, 12, 30)
        .and_then(|epoch| epoch.checked_add_days(Days::new(serial.trunc() as u64)))
        .map(|date| date.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| text.to_string())
}
