pub mod accumulator;
pub mod config;
pub mod error;
pub mod facets;
pub mod grid;
pub mod ids;
pub mod infer;
pub mod logging;
pub mod model;
pub mod schema;
pub mod utils;
pub mod walker;
pub mod workbook;

pub use accumulator::{SpecificationAccumulator, SpecificationTuple};
pub use config::{CliArgs, ReportFormat, RunConfig};
pub use error::{CompileError, Diagnostic, DiagnosticKind, SchemaError};
pub use facets::{FacetBuilder, RequirementMode, RequirementOutcome};
pub use grid::{CellRef, GridReader, MemoryGrid, RawCellValue};
pub use infer::{InferredValue, infer};
pub use logging::{LoggingConfig, init_logging};
pub use model::{
    Cardinality, DocumentMetadata, Facet, FacetKind, SpecificationGroup, SpecificationRecord,
};
pub use schema::{Coordinate, CoordinateSchema, Role};
pub use walker::{Compilation, GridWalker, WalkReport, compile};
pub use workbook::WorkbookGrid;

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::PathBuf;

/// What a finished run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub input: PathBuf,
    pub sheet: String,
    pub groups: usize,
    pub specifications: usize,
    /// Empty on a dry run.
    pub written: Vec<PathBuf>,
    pub report: WalkReport,
}

/// Loads the schema and workbook named by `config`, compiles the matrix and
/// writes one IDS document per purpose group.
///
/// Nothing is written when compilation fails.
pub fn run(config: &RunConfig) -> Result<RunSummary> {
    let schema = CoordinateSchema::from_path(&config.schema)?;
    let grid = WorkbookGrid::open(&config.input, config.sheet_name(schema.sheet()))?;

    let span = tracing::info_span!(
        "compile",
        input = %utils::path_to_forward_slashes(grid.path()),
        sheet = grid.sheet()
    );
    let compilation = span
        .in_scope(|| compile(&schema, &grid))
        .inspect_err(|err| tracing::error!(kind = err.kind(), "compilation aborted: {err}"))
        .with_context(|| format!("failed to compile {}", config.input.display()))?;

    let Compilation { groups, report } = compilation;
    let specifications = groups.iter().map(|g| g.specifications.len()).sum();

    let written = if config.dry_run {
        tracing::info!(groups = groups.len(), "dry run, no files written");
        Vec::new()
    } else {
        ids::write_groups(&groups, &config.output)?
    };

    tracing::info!(
        groups = groups.len(),
        specifications,
        skipped_rows = report.skipped_rows,
        diagnostics = report.diagnostics.len(),
        "conversion finished"
    );

    Ok(RunSummary {
        input: config.input.clone(),
        sheet: grid.sheet().to_string(),
        groups: groups.len(),
        specifications,
        written,
        report,
    })
}
