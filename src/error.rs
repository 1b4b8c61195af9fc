// ⚠️ Typed failures of the I/O edges (sources, record construction)
// The issue-identification core itself never fails.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Unsupported source scheme '{0}' (expected sqlite:// or csv://)")]
    UnsupportedScheme(String),

    #[error("Invalid source locator: {0}")]
    InvalidLocator(String),

    #[error("Invalid table name '{0}': expected an identifier like customers or main.customers")]
    InvalidTableName(String),

    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Row {row} has {found} fields, schema has {expected}")]
    RowWidth {
        row: usize,
        expected: usize,
        found: usize,
    },
}

/// Result type for the typed edges
pub type AuditResult<T> = Result<T, AuditError>;
