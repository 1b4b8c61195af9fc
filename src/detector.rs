// 🔍 Issue Detector - one Match Set per rule over the full Record Set
// Rules are evaluated independently: a row flagged as a duplicate is still
// checked for email and name problems, so every count stands on its own.

use crate::config::AuditConfig;
use crate::record::{Field, Record, RecordSet};
use crate::validators::{is_valid_name, EmailRule};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, warn};

// ============================================================================
// RULES
// ============================================================================

/// Detection rules, in report order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    Duplicate,
    InvalidEmail,
    InvalidName,
}

impl Rule {
    pub const ALL: [Rule; 3] = [Rule::Duplicate, Rule::InvalidEmail, Rule::InvalidName];

    pub fn name(&self) -> &'static str {
        match self {
            Rule::Duplicate => "duplicate",
            Rule::InvalidEmail => "invalid_email",
            Rule::InvalidName => "invalid_name",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Rule::Duplicate => "Same first name, last name and email as another record",
            Rule::InvalidEmail => "Email is missing or not shaped like local@domain.tld",
            Rule::InvalidName => "First or last name is missing or not 1-50 letters/spaces",
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// MATCH SET
// ============================================================================

/// A row of the Record Set together with its position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry<'a> {
    pub row: usize,
    pub record: &'a Record,
}

/// Rows flagged by one rule, in source order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchSet<'a> {
    rule: Rule,
    entries: Vec<Entry<'a>>,
}

impl<'a> MatchSet<'a> {
    pub fn new(rule: Rule) -> Self {
        MatchSet {
            rule,
            entries: Vec::new(),
        }
    }

    fn push(&mut self, row: usize, record: &'a Record) {
        self.entries.push(Entry { row, record });
    }

    pub fn rule(&self) -> Rule {
        self.rule
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Entry<'a>] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entry<'a>> {
        self.entries.iter()
    }

    pub fn rows(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries.iter().map(|e| e.row)
    }

    pub fn contains_row(&self, row: usize) -> bool {
        // Entries are pushed in ascending row order
        self.entries.binary_search_by_key(&row, |e| e.row).is_ok()
    }
}

// ============================================================================
// COUNTS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IssueCounts {
    pub duplicates: usize,
    pub invalid_emails: usize,
    pub invalid_names: usize,
}

impl IssueCounts {
    pub fn get(&self, rule: Rule) -> usize {
        match rule {
            Rule::Duplicate => self.duplicates,
            Rule::InvalidEmail => self.invalid_emails,
            Rule::InvalidName => self.invalid_names,
        }
    }

    /// Sum of per-rule counts; a row violating two rules counts twice
    pub fn total(&self) -> usize {
        self.duplicates + self.invalid_emails + self.invalid_names
    }

    pub fn summary(&self) -> String {
        format!(
            "{} duplicate, {} invalid email, {} invalid name",
            self.duplicates, self.invalid_emails, self.invalid_names
        )
    }
}

// ============================================================================
// DETECTION RESULT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection<'a> {
    pub duplicates: MatchSet<'a>,
    pub invalid_emails: MatchSet<'a>,
    pub invalid_names: MatchSet<'a>,
}

impl<'a> Detection<'a> {
    pub fn counts(&self) -> IssueCounts {
        IssueCounts {
            duplicates: self.duplicates.len(),
            invalid_emails: self.invalid_emails.len(),
            invalid_names: self.invalid_names.len(),
        }
    }

    /// Match Sets in rule order
    pub fn match_sets(&self) -> [&MatchSet<'a>; 3] {
        [&self.duplicates, &self.invalid_emails, &self.invalid_names]
    }

    pub fn get(&self, rule: Rule) -> &MatchSet<'a> {
        match rule {
            Rule::Duplicate => &self.duplicates,
            Rule::InvalidEmail => &self.invalid_emails,
            Rule::InvalidName => &self.invalid_names,
        }
    }
}

// ============================================================================
// ISSUE DETECTOR
// ============================================================================

type DuplicateKey<'a> = (Option<&'a str>, Option<&'a str>, Option<&'a str>);

#[derive(Debug, Clone, Default)]
pub struct IssueDetector {
    email_rule: EmailRule,
}

impl IssueDetector {
    pub fn new() -> Self {
        IssueDetector::default()
    }

    pub fn with_email_rule(email_rule: EmailRule) -> Self {
        IssueDetector { email_rule }
    }

    pub fn from_config(config: &AuditConfig) -> Self {
        IssueDetector::with_email_rule(config.email_rule)
    }

    pub fn email_rule(&self) -> EmailRule {
        self.email_rule
    }

    /// Run every rule over `records`
    pub fn detect<'a>(&self, records: &'a RecordSet) -> Detection<'a> {
        for field in records.schema().missing_fields() {
            warn!(
                field = field.name(),
                "Column not found; every record will be treated as missing this field"
            );
        }

        let detection = Detection {
            duplicates: self.find_duplicates(records),
            invalid_emails: self.find_invalid_emails(records),
            invalid_names: self.find_invalid_names(records),
        };

        let counts = detection.counts();
        debug!(
            records = records.len(),
            duplicates = counts.duplicates,
            invalid_emails = counts.invalid_emails,
            invalid_names = counts.invalid_names,
            "Detection complete"
        );

        detection
    }

    /// Every member of a (first_name, last_name, email) group of size >= 2.
    /// Missing values compare equal to each other.
    pub fn find_duplicates<'a>(&self, records: &'a RecordSet) -> MatchSet<'a> {
        let mut groups: HashMap<DuplicateKey<'a>, Vec<usize>> = HashMap::new();

        for (row, record) in records.iter().enumerate() {
            let key = (
                records.field(record, Field::FirstName),
                records.field(record, Field::LastName),
                records.field(record, Field::Email),
            );
            groups.entry(key).or_default().push(row);
        }

        let mut duplicate_rows: Vec<usize> = groups
            .into_values()
            .filter(|rows| rows.len() >= 2)
            .flatten()
            .collect();
        duplicate_rows.sort_unstable();

        let mut set = MatchSet::new(Rule::Duplicate);
        for row in duplicate_rows {
            set.push(row, &records.records()[row]);
        }
        set
    }

    pub fn find_invalid_emails<'a>(&self, records: &'a RecordSet) -> MatchSet<'a> {
        let mut set = MatchSet::new(Rule::InvalidEmail);
        for (row, record) in records.iter().enumerate() {
            if !self.email_rule.check(records.field(record, Field::Email)) {
                set.push(row, record);
            }
        }
        set
    }

    /// First name OR last name failing is enough
    pub fn find_invalid_names<'a>(&self, records: &'a RecordSet) -> MatchSet<'a> {
        let mut set = MatchSet::new(Rule::InvalidName);
        for (row, record) in records.iter().enumerate() {
            let first_ok = is_valid_name(records.field(record, Field::FirstName));
            let last_ok = is_valid_name(records.field(record, Field::LastName));
            if !first_ok || !last_ok {
                set.push(row, record);
            }
        }
        set
    }
}

/// Detect with the default (legacy email) rules
pub fn detect(records: &RecordSet) -> Detection<'_> {
    IssueDetector::new().detect(records)
}

// ============================================================================
// TESTS
// ============================================================================
