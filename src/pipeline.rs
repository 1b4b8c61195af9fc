// 🚦 Audit pipeline - source → detect → aggregate → export
// The only place that logs the run milestones; the engine stays silent at
// info level so it can be embedded elsewhere.

use crate::aggregator::{ProblematicEntrySet, ReportAggregator};
use crate::config::AuditConfig;
use crate::detector::{Detection, IssueDetector};
use crate::export::{save_to_csv, RunSummary};
use crate::record::RecordSet;
use crate::source::{self, SourceLocator};
use anyhow::Result;
use chrono::Utc;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub source: SourceLocator,
    pub table: String,
    pub output: PathBuf,
    pub config: AuditConfig,
    /// Append an `issues` column to the CSV
    pub with_reasons: bool,
    pub summary_path: Option<PathBuf>,
}

impl RunOptions {
    pub fn new(source: SourceLocator, table: &str, output: PathBuf) -> Self {
        RunOptions {
            source,
            table: table.to_string(),
            output,
            config: AuditConfig::default(),
            with_reasons: false,
            summary_path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// Source had no rows; nothing was written
    Empty,
    Reported(RunSummary),
}

/// Load the records; `None` when the source is empty
pub fn fetch(options: &RunOptions) -> Result<Option<RecordSet>> {
    let records = source::load(&options.source, &options.table, &options.config.columns)?;

    if records.is_empty() {
        warn!("No data fetched from the database.");
        return Ok(None);
    }

    Ok(Some(records))
}

/// Run every rule and build the report
pub fn evaluate<'a>(
    records: &'a RecordSet,
    config: &AuditConfig,
) -> (Detection<'a>, ProblematicEntrySet<'a>) {
    let detection = IssueDetector::from_config(config).detect(records);
    let report = ReportAggregator::with_identity(config.report_identity).aggregate_detection(&detection);
    (detection, report)
}

/// Log the counts, write the CSV and the optional JSON summary
pub fn publish(
    records: &RecordSet,
    detection: &Detection,
    report: &ProblematicEntrySet,
    options: &RunOptions,
) -> Result<RunSummary> {
    let counts = detection.counts();
    info!("Found {} duplicate entries", counts.duplicates);
    info!("Found {} entries with invalid emails", counts.invalid_emails);
    info!("Found {} entries with invalid names", counts.invalid_names);

    let digest = save_to_csv(&options.output, records.schema(), report, options.with_reasons)?;
    info!(
        "Saved all problematic entries to '{}'",
        options.output.display()
    );

    let summary = RunSummary {
        run_id: uuid::Uuid::new_v4().to_string(),
        generated_at: Utc::now(),
        source: options.source.to_string(),
        table: options.table.clone(),
        output_file: options.output.display().to_string(),
        total_records: records.len(),
        counts,
        problematic_entries: report.len(),
        email_rule: options.config.email_rule,
        report_identity: options.config.report_identity,
        report_digest: digest,
    };

    if let Some(path) = &options.summary_path {
        summary.save(path)?;
        info!("Saved run summary to '{}'", path.display());
    }

    Ok(summary)
}

/// Full run, equivalent to `fetch` + `evaluate` + `publish`
pub fn run(options: &RunOptions) -> Result<RunOutcome> {
    let records = match fetch(options)? {
        Some(records) => records,
        None => return Ok(RunOutcome::Empty),
    };

    let (detection, report) = evaluate(&records, &options.config);
    let summary = publish(&records, &detection, &report, options)?;

    Ok(RunOutcome::Reported(summary))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::ReportIdentity;
    use crate::detector::IssueCounts;
    use crate::validators::EmailRule;
    use rusqlite::Connection;
    use std::fs;
    use std::path::Path;

    fn seed_database(path: &Path) {
        let conn = Connection::open(path).unwrap();
        conn.execute_batch(
            "CREATE TABLE customers (name TEXT, last_name TEXT, email TEXT);
             INSERT INTO customers VALUES ('Jo', 'Lee', 'jo@x.com');
             INSERT INTO customers VALUES ('Jo', 'Lee', 'jo@x.com');
             INSERT INTO customers VALUES ('Ann', 'Kim', 'not-an-email');
             INSERT INTO customers VALUES ('Ann2', 'Kim', 'ann2@x.com');
             INSERT INTO customers VALUES ('Sam', 'Lee', 'sam@x.com');
             INSERT INTO customers VALUES ('Eve', 'Ray', 'eve@x.co<b>');
             CREATE TABLE empty_customers (name TEXT, last_name TEXT, email TEXT);",
        )
        .unwrap();
    }

    #[test]
    fn test_run_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("crm.db");
        seed_database(&db_path);

        let mut options = RunOptions::new(
            SourceLocator::Sqlite(db_path),
            "customers",
            dir.path().join("problems.csv"),
        );
        options.summary_path = Some(dir.path().join("summary.json"));

        let summary = match run(&options).unwrap() {
            RunOutcome::Reported(summary) => summary,
            RunOutcome::Empty => panic!("expected a report"),
        };

        assert_eq!(
            summary.counts,
            IssueCounts {
                duplicates: 2,
                invalid_emails: 1,
                invalid_names: 1
            }
        );
        assert_eq!(summary.total_records, 6);
        assert_eq!(summary.problematic_entries, 4);

        let csv = fs::read_to_string(&options.output).unwrap();
        assert_eq!(
            csv,
            "name,last_name,email\n\
             Jo,Lee,jo@x.com\n\
             Jo,Lee,jo@x.com\n\
             Ann,Kim,not-an-email\n\
             Ann2,Kim,ann2@x.com\n"
        );
        assert!(dir.path().join("summary.json").exists());
    }

    #[test]
    fn test_strict_config_flags_trailing_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("crm.db");
        seed_database(&db_path);

        let mut options = RunOptions::new(
            SourceLocator::Sqlite(db_path),
            "customers",
            dir.path().join("problems.csv"),
        );
        options.config.email_rule = EmailRule::Strict;
        options.config.report_identity = ReportIdentity::Value;

        let summary = match run(&options).unwrap() {
            RunOutcome::Reported(summary) => summary,
            RunOutcome::Empty => panic!("expected a report"),
        };

        assert_eq!(summary.counts.invalid_emails, 2);
        // The identical Jo Lee rows collapse to one entry
        assert_eq!(summary.problematic_entries, 4);
        assert_eq!(summary.email_rule, EmailRule::Strict);
    }

    #[test]
    fn test_empty_table_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("crm.db");
        seed_database(&db_path);
        let output = dir.path().join("problems.csv");

        let options = RunOptions::new(SourceLocator::Sqlite(db_path), "empty_customers", output.clone());

        assert_eq!(run(&options).unwrap(), RunOutcome::Empty);
        assert!(!output.exists());
    }

    #[test]
    fn test_missing_table_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("crm.db");
        seed_database(&db_path);

        let options = RunOptions::new(
            SourceLocator::Sqlite(db_path),
            "orders",
            dir.path().join("problems.csv"),
        );

        assert!(run(&options).is_err());
    }

    #[test]
    fn test_evaluate_uses_config_identity() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("crm.db");
        seed_database(&db_path);
        let options = RunOptions::new(
            SourceLocator::Sqlite(db_path),
            "customers",
            dir.path().join("problems.csv"),
        );
        let records = fetch(&options).unwrap().unwrap();

        let config = AuditConfig {
            report_identity: ReportIdentity::Value,
            ..AuditConfig::default()
        };
        let (detection, report) = evaluate(&records, &config);

        assert_eq!(detection.counts().duplicates, 2);
        assert_eq!(report.rows().collect::<Vec<_>>(), vec![0, 2, 3]);
    }
}
