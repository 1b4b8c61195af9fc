// Customer Quality - Core Library
// Exposes the issue-identification engine plus its source/export adapters
// for use in the CLI, the API server and tests

pub mod error;
pub mod record;
pub mod validators;     // Field Validators - email/name predicates
pub mod detector;       // Issue Detector - per-rule Match Sets
pub mod aggregator;     // Report Aggregator - deduplicated union
pub mod config;
pub mod source;         // SQLite / CSV record sources
pub mod export;         // CSV report + JSON run summary
pub mod pipeline;
pub mod logging;

// Only compile the review screen when the TUI feature is enabled
#[cfg(feature = "tui")]
pub mod ui;

// Re-export commonly used types
pub use error::{AuditError, AuditResult};
pub use record::{Field, FieldAliases, Record, RecordSet, Schema};
pub use validators::{is_valid_email, is_valid_email_strict, is_valid_name, EmailRule};
pub use detector::{detect, Detection, Entry, IssueCounts, IssueDetector, MatchSet, Rule};
pub use aggregator::{
    aggregate, ProblematicEntrySet, ReportAggregator, ReportEntry, ReportIdentity, RuleFlags,
};
pub use config::AuditConfig;
pub use source::{fetch_records, load, load_csv, SourceLocator};
pub use export::{save_to_csv, write_csv, RunSummary};
pub use pipeline::{run, RunOptions, RunOutcome};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
