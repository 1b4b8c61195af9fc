use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::error;

use customer_quality::{
    logging::init_logging,
    pipeline::{self, RunOptions},
    AuditConfig, EmailRule, ReportIdentity, SourceLocator,
};

#[derive(Parser, Debug)]
#[command(name = "customer-quality")]
#[command(about = "Process customer data for issues: duplicates, invalid emails and names")]
#[command(version)]
struct Cli {
    /// Record source (e.g. sqlite:///customers.db, csv://export.csv, customers.csv)
    source: String,

    /// Name of the table to query
    table_name: String,

    /// Path to save the output CSV file
    output_file: PathBuf,

    /// JSON config file (email rule, report identity, column names)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Require the whole email value to match, not just its prefix
    #[arg(long)]
    strict_email: bool,

    /// Report identical rows once instead of once per source row
    #[arg(long)]
    collapse_identical: bool,

    /// Append an `issues` column naming the rules behind each row
    #[arg(long)]
    with_reasons: bool,

    /// Write a JSON run summary to this path
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Open the review screen after writing the report
    #[arg(long)]
    review: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose) {
        eprintln!("{:#}", e);
    }

    if let Err(e) = run(cli) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => AuditConfig::from_file(path)?,
        None => AuditConfig::default(),
    };
    if cli.strict_email {
        config.email_rule = EmailRule::Strict;
    }
    if cli.collapse_identical {
        config.report_identity = ReportIdentity::Value;
    }

    let source = SourceLocator::parse(&cli.source).context("Invalid source")?;

    let options = RunOptions {
        source,
        table: cli.table_name,
        output: cli.output_file,
        config,
        with_reasons: cli.with_reasons,
        summary_path: cli.summary,
    };

    let records = match pipeline::fetch(&options)? {
        Some(records) => records,
        None => return Ok(()),
    };

    let (detection, report) = pipeline::evaluate(&records, &options.config);
    pipeline::publish(&records, &detection, &report, &options)?;

    if cli.review {
        review(&records, &report, detection.counts())?;
    }

    Ok(())
}

#[cfg(feature = "tui")]
fn review(
    records: &customer_quality::RecordSet,
    report: &customer_quality::ProblematicEntrySet,
    counts: customer_quality::IssueCounts,
) -> Result<()> {
    let mut app = customer_quality::ui::App::new(records, report, counts);
    customer_quality::ui::run_ui(&mut app)
}

#[cfg(not(feature = "tui"))]
fn review(
    _records: &customer_quality::RecordSet,
    _report: &customer_quality::ProblematicEntrySet,
    _counts: customer_quality::IssueCounts,
) -> Result<()> {
    eprintln!("❌ Review screen not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    Ok(())
}
