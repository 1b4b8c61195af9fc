// ⚙️ Audit configuration - rules as data
// Loaded from a JSON file; every key is optional and falls back to the
// defaults that reproduce existing reports.

use crate::aggregator::ReportIdentity;
use crate::record::FieldAliases;
use crate::validators::EmailRule;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// `legacy` (prefix match) or `strict` (full match)
    pub email_rule: EmailRule,

    /// `row` reports every flagged source row, `value` collapses identical rows
    pub report_identity: ReportIdentity,

    /// Column names accepted for the validated fields
    pub columns: FieldAliases,
}

impl AuditConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("Failed to parse config JSON")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_keep_legacy_behaviour() {
        let config = AuditConfig::default();

        assert_eq!(config.email_rule, EmailRule::Legacy);
        assert_eq!(config.report_identity, ReportIdentity::Row);
        assert_eq!(config.columns.first_name, vec!["first_name", "name"]);
    }

    #[test]
    fn test_empty_object_is_default() {
        let config = AuditConfig::from_json("{}").unwrap();

        assert_eq!(config, AuditConfig::default());
    }

    #[test]
    fn test_partial_config() {
        let config = AuditConfig::from_json(
            r#"{ "email_rule": "strict", "columns": { "email": ["contact_email"] } }"#,
        )
        .unwrap();

        assert_eq!(config.email_rule, EmailRule::Strict);
        assert_eq!(config.report_identity, ReportIdentity::Row);
        assert_eq!(config.columns.email, vec!["contact_email"]);
        assert_eq!(config.columns.last_name, vec!["last_name"]);
    }

    #[test]
    fn test_unknown_rule_rejected() {
        assert!(AuditConfig::from_json(r#"{ "email_rule": "fuzzy" }"#).is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "report_identity": "value" }}"#).unwrap();

        let config = AuditConfig::from_file(file.path()).unwrap();

        assert_eq!(config.report_identity, ReportIdentity::Value);
    }

    #[test]
    fn test_missing_file_has_context() {
        let err = AuditConfig::from_file("/nonexistent/audit.json").unwrap_err();

        assert!(err.to_string().contains("Failed to read config file"));
    }
}
