// 📋 Report Aggregator - union of Match Sets without double reporting
// Order is first appearance across duplicates, then invalid emails, then
// invalid names. Per-rule counts are never touched here.

use crate::detector::{Detection, MatchSet, Rule};
use crate::record::Record;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// ============================================================================
// IDENTITY
// ============================================================================

/// What makes two flagged entries "the same" in the report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportIdentity {
    /// One entry per source row; identical copies are each reported
    #[default]
    Row,
    /// One entry per distinct field tuple; identical copies collapse
    Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum IdentityKey<'a> {
    Row(usize),
    Value(&'a Record),
}

// ============================================================================
// RULE FLAGS
// ============================================================================

/// Rules a reported entry was flagged by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RuleFlags {
    duplicate: bool,
    invalid_email: bool,
    invalid_name: bool,
}

impl RuleFlags {
    pub fn insert(&mut self, rule: Rule) {
        match rule {
            Rule::Duplicate => self.duplicate = true,
            Rule::InvalidEmail => self.invalid_email = true,
            Rule::InvalidName => self.invalid_name = true,
        }
    }

    pub fn contains(&self, rule: Rule) -> bool {
        match rule {
            Rule::Duplicate => self.duplicate,
            Rule::InvalidEmail => self.invalid_email,
            Rule::InvalidName => self.invalid_name,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = Rule> + '_ {
        Rule::ALL.into_iter().filter(|r| self.contains(*r))
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

impl fmt::Display for RuleFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(|r| r.name()).collect();
        f.write_str(&names.join(";"))
    }
}

// ============================================================================
// PROBLEMATIC ENTRY SET
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportEntry<'a> {
    /// First source row this entry was seen at
    pub row: usize,
    pub record: &'a Record,
    pub rules: RuleFlags,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProblematicEntrySet<'a> {
    entries: Vec<ReportEntry<'a>>,
}

impl<'a> ProblematicEntrySet<'a> {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[ReportEntry<'a>] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReportEntry<'a>> {
        self.entries.iter()
    }

    pub fn rows(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries.iter().map(|e| e.row)
    }

    pub fn records(&self) -> impl Iterator<Item = &'a Record> + '_ {
        self.entries.iter().map(|e| e.record)
    }

    /// Entries flagged by `rule`, in report order
    pub fn flagged_by(&self, rule: Rule) -> impl Iterator<Item = &ReportEntry<'a>> {
        self.entries.iter().filter(move |e| e.rules.contains(rule))
    }
}

// ============================================================================
// REPORT AGGREGATOR
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct ReportAggregator {
    identity: ReportIdentity,
}

impl ReportAggregator {
    pub fn new() -> Self {
        ReportAggregator::default()
    }

    pub fn with_identity(identity: ReportIdentity) -> Self {
        ReportAggregator { identity }
    }

    pub fn identity(&self) -> ReportIdentity {
        self.identity
    }

    pub fn aggregate<'a>(
        &self,
        duplicates: &MatchSet<'a>,
        invalid_emails: &MatchSet<'a>,
        invalid_names: &MatchSet<'a>,
    ) -> ProblematicEntrySet<'a> {
        let mut entries: Vec<ReportEntry<'a>> = Vec::new();
        let mut seen: HashMap<IdentityKey<'a>, usize> = HashMap::new();

        for set in [duplicates, invalid_emails, invalid_names] {
            for entry in set.iter() {
                let key = match self.identity {
                    ReportIdentity::Row => IdentityKey::Row(entry.row),
                    ReportIdentity::Value => IdentityKey::Value(entry.record),
                };

                if let Some(&index) = seen.get(&key) {
                    entries[index].rules.insert(set.rule());
                    continue;
                }

                let mut rules = RuleFlags::default();
                rules.insert(set.rule());
                seen.insert(key, entries.len());
                entries.push(ReportEntry {
                    row: entry.row,
                    record: entry.record,
                    rules,
                });
            }
        }

        ProblematicEntrySet { entries }
    }

    pub fn aggregate_detection<'a>(&self, detection: &Detection<'a>) -> ProblematicEntrySet<'a> {
        self.aggregate(
            &detection.duplicates,
            &detection.invalid_emails,
            &detection.invalid_names,
        )
    }
}

/// Aggregate with one entry per source row
pub fn aggregate<'a>(
    duplicates: &MatchSet<'a>,
    invalid_emails: &MatchSet<'a>,
    invalid_names: &MatchSet<'a>,
) -> ProblematicEntrySet<'a> {
    ReportAggregator::new().aggregate(duplicates, invalid_emails, invalid_names)
}

// ============================================================================
// TESTS
// ============================================================================
