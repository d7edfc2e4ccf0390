use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_SHEET: &str = "Requirements";
const INPUT_EXTENSION: &str = "xlsx";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportFormat::Text => write!(f, "text"),
            ReportFormat::Json => write!(f, "json"),
        }
    }
}

/// Fully merged settings for one conversion run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub input: PathBuf,
    pub schema: PathBuf,
    /// Explicit worksheet; when absent the schema's sheet, then [`DEFAULT_SHEET`].
    pub sheet: Option<String>,
    /// Base output path; group files are written next to it.
    pub output: PathBuf,
    pub dry_run: bool,
    pub report: ReportFormat,
}

impl RunConfig {
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let CliArgs {
            config,
            input: cli_input,
            schema: cli_schema,
            sheet: cli_sheet,
            output: cli_output,
            dry_run: cli_dry_run,
            report: cli_report,
        } = args;

        let file_config = if let Some(path) = config.as_ref() {
            load_config_file(path)?
        } else {
            PartialConfig::default()
        };

        let PartialConfig {
            input: file_input,
            schema: file_schema,
            sheet: file_sheet,
            output: file_output,
            dry_run: file_dry_run,
            report: file_report,
        } = file_config;

        // Relative paths from a config file are taken relative to that file.
        let base_dir = config
            .as_ref()
            .and_then(|path| path.parent())
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let from_file = |path: PathBuf| {
            if path.is_absolute() {
                path
            } else {
                base_dir.join(path)
            }
        };

        let input = cli_input
            .or_else(|| file_input.map(&from_file))
            .context("no input workbook given (use --input or EXCEL2IDS_INPUT)")?;
        let schema = cli_schema
            .or_else(|| file_schema.map(&from_file))
            .context("no coordinate schema given (use --schema or EXCEL2IDS_SCHEMA)")?;

        let sheet = cli_sheet
            .or(file_sheet)
            .map(|sheet| sheet.trim().to_string())
            .filter(|sheet| !sheet.is_empty());

        let output = cli_output
            .or_else(|| file_output.map(&from_file))
            .unwrap_or_else(|| input.with_extension("ids"));

        Ok(Self {
            input,
            schema,
            sheet,
            output,
            dry_run: cli_dry_run || file_dry_run.unwrap_or(false),
            report: cli_report.or(file_report).unwrap_or_default(),
        })
    }

    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.input.exists(),
            "input workbook {:?} does not exist",
            self.input
        );
        anyhow::ensure!(
            self.input.is_file(),
            "input workbook {:?} is not a file",
            self.input
        );
        let is_xlsx = self
            .input
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case(INPUT_EXTENSION))
            .unwrap_or(false);
        anyhow::ensure!(
            is_xlsx,
            "input workbook {:?} must be an .{} file",
            self.input,
            INPUT_EXTENSION
        );
        anyhow::ensure!(
            self.schema.exists(),
            "coordinate schema {:?} does not exist",
            self.schema
        );
        anyhow::ensure!(
            self.output != self.input,
            "output path {:?} would overwrite the input workbook",
            self.output
        );
        Ok(())
    }

    /// Worksheet to read: explicit choice, then the schema's, then the default.
    pub fn sheet_name<'a>(&'a self, schema_sheet: Option<&'a str>) -> &'a str {
        self.sheet
            .as_deref()
            .or(schema_sheet)
            .unwrap_or(DEFAULT_SHEET)
    }
}

#[derive(Parser, Debug, Default, Clone)]
#[command(
    name = "excel2ids",
    about = "Compile an Excel requirement matrix into IDS documents",
    version
)]
pub struct CliArgs {
    #[arg(
        long,
        value_name = "FILE",
        help = "Path to a configuration file (YAML or JSON)"
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        env = "EXCEL2IDS_INPUT",
        value_name = "FILE",
        help = "Requirement matrix workbook (.xlsx)"
    )]
    pub input: Option<PathBuf>,

    #[arg(
        long,
        env = "EXCEL2IDS_SCHEMA",
        value_name = "FILE",
        help = "Coordinate schema describing the matrix layout (YAML or JSON)"
    )]
    pub schema: Option<PathBuf>,

    #[arg(
        long,
        env = "EXCEL2IDS_SHEET",
        value_name = "NAME",
        help = "Worksheet holding the matrix [default: Requirements]"
    )]
    pub sheet: Option<String>,

    #[arg(
        long,
        env = "EXCEL2IDS_OUTPUT",
        value_name = "FILE",
        help = "Base .ids path; one file per purpose is written next to it"
    )]
    pub output: Option<PathBuf>,

    #[arg(long, help = "Compile and report without writing any file")]
    pub dry_run: bool,

    #[arg(
        long,
        value_enum,
        value_name = "FORMAT",
        help = "Format of the run report printed to stdout"
    )]
    pub report: Option<ReportFormat>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PartialConfig {
    input: Option<PathBuf>,
    schema: Option<PathBuf>,
    sheet: Option<String>,
    output: Option<PathBuf>,
    dry_run: Option<bool>,
    report: Option<ReportFormat>,
}

fn load_config_file(path: &Path) -> Result<PartialConfig> {
    if !path.exists() {
        anyhow::bail!("config file {:?} does not exist", path);
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {:?}", path))?;
    let ext = path
        .extension()
        .and_then(|os| os.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let parsed = match ext.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse YAML config {:?}", path))?,
        "json" => serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse JSON config {:?}", path))?,
        other => anyhow::bail!("unsupported config extension: {other}"),
    };
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn args(input: &str, schema: &str) -> CliArgs {
        CliArgs {
            input: Some(PathBuf::from(input)),
            schema: Some(PathBuf::from(schema)),
            ..Default::default()
        }
    }

    #[test]
    fn output_defaults_to_input_with_ids_extension() {
        let config = RunConfig::from_args(args("data/matrix.xlsx", "schema.yaml")).unwrap();
        assert_eq!(config.output, PathBuf::from("data/matrix.ids"));
        assert_eq!(config.sheet, None);
        assert_eq!(config.sheet_name(None), DEFAULT_SHEET);
        assert_eq!(config.sheet_name(Some("Matrix")), "Matrix");
        assert!(!config.dry_run);
        assert_eq!(config.report, ReportFormat::Text);
    }

    #[test]
    fn cli_values_override_config_file() {
        let tmp = tempdir().unwrap();
        let config_path = tmp.path().join("run.yaml");
        fs::write(
            &config_path,
            "input: matrix.xlsx\nschema: layout.yaml\nsheet: FromFile\n\
             dry_run: true\nreport: json\n",
        )
        .unwrap();

        let cli = CliArgs {
            config: Some(config_path),
            sheet: Some("FromCli".into()),
            ..Default::default()
        };
        let config = RunConfig::from_args(cli).unwrap();
        assert_eq!(config.input, tmp.path().join("matrix.xlsx"));
        assert_eq!(config.schema, tmp.path().join("layout.yaml"));
        assert_eq!(config.output, tmp.path().join("matrix.ids"));
        assert_eq!(config.sheet.as_deref(), Some("FromCli"));
        assert_eq!(config.sheet_name(Some("FromSchema")), "FromCli");
        assert!(config.dry_run);
        assert_eq!(config.report, ReportFormat::Json);
    }

    #[test]
    fn missing_input_is_an_error() {
        let cli = CliArgs {
            schema: Some(PathBuf::from("schema.yaml")),
            ..Default::default()
        };
        let err = RunConfig::from_args(cli).unwrap_err();
        assert!(err.to_string().contains("no input workbook"));
    }

    #[test]
    fn unknown_config_keys_are_rejected() {
        let tmp = tempdir().unwrap();
        let config_path = tmp.path().join("run.json");
        fs::write(&config_path, r#"{"input": "a.xlsx", "workspace_root": "."}"#).unwrap();
        let cli = CliArgs {
            config: Some(config_path),
            ..Default::default()
        };
        assert!(RunConfig::from_args(cli).is_err());
    }

    #[test]
    fn validate_requires_existing_xlsx() {
        let tmp = tempdir().unwrap();
        let schema = tmp.path().join("schema.yaml");
        fs::write(&schema, "matrix: {start: L20}\n").unwrap();
        let csv = tmp.path().join("matrix.csv");
        fs::write(&csv, "a,b").unwrap();

        let missing = RunConfig::from_args(args(
            tmp.path().join("nope.xlsx").to_str().unwrap(),
            schema.to_str().unwrap(),
        ))
        .unwrap();
        assert!(missing.validate().unwrap_err().to_string().contains("does not exist"));

        let wrong_ext =
            RunConfig::from_args(args(csv.to_str().unwrap(), schema.to_str().unwrap())).unwrap();
        assert!(wrong_ext.validate().unwrap_err().to_string().contains(".xlsx"));
    }

    #[test]
    fn parses_command_line_flags() {
        let cli = CliArgs::parse_from([
            "excel2ids",
            "--input",
            "m.xlsx",
            "--schema",
            "s.yaml",
            "--dry-run",
            "--report",
            "json",
        ]);
        assert!(cli.dry_run);
        assert_eq!(cli.report, Some(ReportFormat::Json));
        assert_eq!(cli.input, Some(PathBuf::from("m.xlsx")));
    }
}
