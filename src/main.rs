use clap::Parser;
use excel2ids::{CliArgs, LoggingConfig, ReportFormat, RunConfig, RunSummary, init_logging, run};

fn main() -> anyhow::Result<()> {
    let logging_config = LoggingConfig::from_env();
    let _guard = init_logging(logging_config)?;

    let cli = CliArgs::parse();
    let config = RunConfig::from_args(cli)?;

    // Fail before touching the workbook
    config.validate()?;

    let summary = run(&config)?;
    match config.report {
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        ReportFormat::Text => print_text(&summary),
    }
    Ok(())
}

fn print_text(summary: &RunSummary) {
    println!(
        "{} [{}]: {} specification(s) in {} group(s)",
        summary.input.display(),
        summary.sheet,
        summary.specifications,
        summary.groups
    );
    for path in &summary.written {
        println!("  wrote {}", path.display());
    }
    let report = &summary.report;
    if report.skipped_rows > 0 {
        println!("  {} row(s) skipped", report.skipped_rows);
    }
    for diagnostic in &report.diagnostics {
        println!("  warning: {diagnostic}");
    }
    for note in &report.notes {
        println!("  note: {note}");
    }
}
