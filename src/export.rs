// 📤 Report export - problematic entries → CSV, run metadata → JSON
// The CSV reproduces the source columns in schema order; the digest is the
// SHA-256 of the exact bytes written, so two runs can be compared cheaply.

use crate::aggregator::{ProblematicEntrySet, ReportIdentity};
use crate::detector::IssueCounts;
use crate::record::Schema;
use crate::validators::EmailRule;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::Path;

/// Extra column listing the rules behind each row
pub const ISSUES_COLUMN: &str = "issues";

/// Write `report` as CSV with a header row. NULL values become empty cells.
pub fn write_csv<W: Write>(
    writer: W,
    schema: &Schema,
    report: &ProblematicEntrySet,
    with_reasons: bool,
) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header: Vec<&str> = schema.columns().iter().map(String::as_str).collect();
    if with_reasons {
        header.push(ISSUES_COLUMN);
    }
    wtr.write_record(&header).context("Failed to write CSV header")?;

    for entry in report.iter() {
        let reasons = entry.rules.to_string();
        let mut fields: Vec<&str> = entry
            .record
            .values()
            .iter()
            .map(|v| v.as_deref().unwrap_or(""))
            .collect();
        if with_reasons {
            fields.push(&reasons);
        }
        wtr.write_record(&fields)
            .with_context(|| format!("Failed to write CSV row {}", entry.row))?;
    }

    wtr.flush().context("Failed to flush CSV writer")?;
    Ok(())
}

/// Save `report` to `file_path`, returning the hex SHA-256 of the file
pub fn save_to_csv(
    file_path: &Path,
    schema: &Schema,
    report: &ProblematicEntrySet,
    with_reasons: bool,
) -> Result<String> {
    let mut buffer = Vec::new();
    write_csv(&mut buffer, schema, report, with_reasons)?;

    fs::write(file_path, &buffer)
        .with_context(|| format!("Failed to write CSV file: {:?}", file_path))?;

    let mut hasher = Sha256::new();
    hasher.update(&buffer);
    Ok(format!("{:x}", hasher.finalize()))
}

// ============================================================================
// RUN SUMMARY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub generated_at: DateTime<Utc>,
    pub source: String,
    pub table: String,
    pub output_file: String,
    pub total_records: usize,
    pub counts: IssueCounts,
    pub problematic_entries: usize,
    pub email_rule: EmailRule,
    pub report_identity: ReportIdentity,
    pub report_digest: String,
}

impl RunSummary {
    pub fn summary(&self) -> String {
        format!(
            "{} records: {} | {} problematic entries written to {}",
            self.total_records,
            self.counts.summary(),
            self.problematic_entries,
            self.output_file
        )
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize run summary")?;
        fs::write(path, json).with_context(|| format!("Failed to write summary file: {:?}", path))?;
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::ReportAggregator;
    use crate::detector::detect;
    use crate::record::RecordSet;

    fn sample() -> RecordSet {
        let schema = Schema::new(vec![
            "id".to_string(),
            "name".to_string(),
            "last_name".to_string(),
            "email".to_string(),
        ]);
        RecordSet::from_rows(
            schema,
            vec![
                vec![Some("1".into()), Some("Sam".into()), Some("Lee".into()), Some("sam@x.com".into())],
                vec![Some("2".into()), Some("Ann2".into()), Some("Kim".into()), None],
                vec![Some("3".into()), Some("Bo".into()), Some("Park, Jr".into()), Some("bo@x.com".into())],
            ],
        )
        .unwrap()
    }

    fn render(records: &RecordSet, with_reasons: bool) -> String {
        let detection = detect(records);
        let report = ReportAggregator::new().aggregate_detection(&detection);
        let mut buffer = Vec::new();
        write_csv(&mut buffer, records.schema(), &report, with_reasons).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn test_csv_keeps_original_columns_and_order() {
        let csv = render(&sample(), false);

        assert_eq!(
            csv,
            "id,name,last_name,email\n2,Ann2,Kim,\n3,Bo,\"Park, Jr\",bo@x.com\n"
        );
    }

    #[test]
    fn test_csv_with_reasons_column() {
        let csv = render(&sample(), true);
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines[0], "id,name,last_name,email,issues");
        assert_eq!(lines[1], "2,Ann2,Kim,,invalid_email;invalid_name");
        assert_eq!(lines[2], "3,Bo,\"Park, Jr\",bo@x.com,invalid_name");
    }

    #[test]
    fn test_empty_report_still_has_header() {
        let schema = Schema::new(vec!["first_name".to_string(), "last_name".to_string(), "email".to_string()]);
        let records = RecordSet::new(schema);

        assert_eq!(render(&records, false), "first_name,last_name,email\n");
    }

    #[test]
    fn test_save_to_csv_digest_matches_content() {
        let records = sample();
        let detection = detect(&records);
        let report = ReportAggregator::new().aggregate_detection(&detection);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("problems.csv");

        let digest = save_to_csv(&path, records.schema(), &report, false).unwrap();

        let written = fs::read(&path).unwrap();
        let mut hasher = Sha256::new();
        hasher.update(&written);
        assert_eq!(digest, format!("{:x}", hasher.finalize()));
        assert_eq!(digest.len(), 64);
    }

    #[test]
    fn test_summary_json_round_trip() {
        let summary = RunSummary {
            run_id: "run-1".to_string(),
            generated_at: Utc::now(),
            source: "sqlite:///crm.db".to_string(),
            table: "customers".to_string(),
            output_file: "problems.csv".to_string(),
            total_records: 3,
            counts: IssueCounts {
                duplicates: 0,
                invalid_emails: 1,
                invalid_names: 2,
            },
            problematic_entries: 2,
            email_rule: EmailRule::Legacy,
            report_identity: ReportIdentity::Row,
            report_digest: "abc".to_string(),
        };
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");

        summary.save(&path).unwrap();
        let loaded: RunSummary = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();

        assert_eq!(loaded, summary);
        assert!(summary.summary().contains("2 problematic entries"));
    }
}
