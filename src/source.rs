// 🗄️ Record sources - SQLite tables and CSV files → RecordSet
//
// Values are coerced to text at this boundary so the core only ever sees
// strings: integers as decimals, reals keep their fractional part
// (`4.0`), blobs as hex, NULL (and empty CSV cells) as missing. Bytes that
// are not UTF-8 are decoded lossily, never rejected.

use crate::error::AuditError;
use crate::record::{FieldAliases, Record, RecordSet, Schema};
use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

static TABLE_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$")
        .expect("table name pattern is valid")
});

// ============================================================================
// SOURCE LOCATOR
// ============================================================================

/// Where records come from.
///
/// Accepted forms:
/// - `sqlite:///relative/path.db`, `sqlite:////absolute/path.db`
/// - `sqlite://` or `sqlite:///:memory:` (empty in-memory database)
/// - `csv://<path>`
/// - a bare path ending in `.csv`, `.db`, `.sqlite` or `.sqlite3`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocator {
    Sqlite(PathBuf),
    /// Accepted so every `sqlite://` form parses. A fresh in-memory
    /// database holds no tables, so loading from it always ends in
    /// `AuditError::TableNotFound`.
    SqliteMemory,
    Csv(PathBuf),
}

impl SourceLocator {
    pub fn parse(locator: &str) -> Result<Self, AuditError> {
        if let Some(rest) = locator.strip_prefix("sqlite://") {
            return match rest {
                "" | "/:memory:" | ":memory:" => Ok(SourceLocator::SqliteMemory),
                _ => match rest.strip_prefix('/') {
                    Some(path) if !path.is_empty() => Ok(SourceLocator::Sqlite(PathBuf::from(path))),
                    _ => Err(AuditError::InvalidLocator(format!(
                        "'{}' has no database path (use sqlite:///path.db)",
                        locator
                    ))),
                },
            };
        }

        if let Some(rest) = locator.strip_prefix("csv://") {
            if rest.is_empty() {
                return Err(AuditError::InvalidLocator(format!("'{}' has no file path", locator)));
            }
            return Ok(SourceLocator::Csv(PathBuf::from(rest)));
        }

        if let Some((scheme, _)) = locator.split_once("://") {
            return Err(AuditError::UnsupportedScheme(scheme.to_string()));
        }

        let path = PathBuf::from(locator);
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match extension.as_deref() {
            Some("csv") => Ok(SourceLocator::Csv(path)),
            Some("db") | Some("sqlite") | Some("sqlite3") => Ok(SourceLocator::Sqlite(path)),
            _ => Err(AuditError::InvalidLocator(format!(
                "'{}' is neither a sqlite:// / csv:// URL nor a .csv/.db file",
                locator
            ))),
        }
    }
}

impl FromStr for SourceLocator {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SourceLocator::parse(s)
    }
}

impl fmt::Display for SourceLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceLocator::Sqlite(path) => write!(f, "sqlite:///{}", path.display()),
            SourceLocator::SqliteMemory => write!(f, "sqlite://"),
            SourceLocator::Csv(path) => write!(f, "csv://{}", path.display()),
        }
    }
}

// ============================================================================
// TABLE NAMES
// ============================================================================

/// Quote `table` for interpolation into SQL. Only plain identifiers
/// (optionally `schema.table`) are accepted.
pub fn quote_table_name(table: &str) -> Result<String, AuditError> {
    if !TABLE_NAME.is_match(table) {
        return Err(AuditError::InvalidTableName(table.to_string()));
    }

    Ok(table
        .split('.')
        .map(|part| format!("\"{}\"", part))
        .collect::<Vec<_>>()
        .join("."))
}

// ============================================================================
// SQLITE
// ============================================================================

fn coerce_sql(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(format!("{:?}", f)),
        ValueRef::Text(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Some(hex::encode(bytes)),
    }
}

/// `SELECT *` from `table`, columns in declaration order
pub fn fetch_records(conn: &Connection, table: &str, aliases: &FieldAliases) -> Result<RecordSet> {
    let query = format!("SELECT * FROM {}", quote_table_name(table)?);

    let mut stmt = match conn.prepare(&query) {
        Ok(stmt) => stmt,
        Err(rusqlite::Error::SqliteFailure(_, Some(msg))) if msg.starts_with("no such table") => {
            return Err(AuditError::TableNotFound(table.to_string()).into());
        }
        Err(e) => return Err(e).context("Failed to prepare query"),
    };

    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let width = columns.len();
    let mut records = RecordSet::new(Schema::with_aliases(columns, aliases));

    let mut rows = stmt.query([]).context("Failed to fetch data")?;
    while let Some(row) = rows.next()? {
        let mut values = Vec::with_capacity(width);
        for i in 0..width {
            values.push(coerce_sql(row.get_ref(i)?));
        }
        records.push(Record::new(values))?;
    }

    debug!(table, rows = records.len(), "Fetched records");
    Ok(records)
}

// ============================================================================
// CSV
// ============================================================================

/// Load a CSV file; the header row becomes the schema
pub fn load_csv(csv_path: &Path, aliases: &FieldAliases) -> Result<RecordSet> {
    let mut rdr = csv::Reader::from_path(csv_path)
        .with_context(|| format!("Failed to open CSV file: {:?}", csv_path))?;

    let columns: Vec<String> = rdr
        .byte_headers()
        .context("Failed to read CSV header")?
        .iter()
        .map(|h| String::from_utf8_lossy(h).into_owned())
        .collect();
    let mut records = RecordSet::new(Schema::with_aliases(columns, aliases));

    for result in rdr.byte_records() {
        let row = result.context("Failed to read CSV row")?;
        let values = row
            .iter()
            .map(|v| {
                if v.is_empty() {
                    None
                } else {
                    Some(String::from_utf8_lossy(v).into_owned())
                }
            })
            .collect();
        records.push(Record::new(values))?;
    }

    Ok(records)
}

// ============================================================================
// ENTRY POINT
// ============================================================================

/// Open `locator` and read every record of `table`
pub fn load(locator: &SourceLocator, table: &str, aliases: &FieldAliases) -> Result<RecordSet> {
    let records = match locator {
        SourceLocator::Sqlite(path) => {
            if !path.exists() {
                anyhow::bail!("Database not found at {:?}", path);
            }
            let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
                .with_context(|| format!("Error connecting to database {:?}", path))?;
            fetch_records(&conn, table, aliases)?
        }
        SourceLocator::SqliteMemory => {
            let conn = Connection::open_in_memory().context("Error opening in-memory database")?;
            fetch_records(&conn, table, aliases)?
        }
        SourceLocator::Csv(path) => {
            // Table name only labels the run for CSV sources
            quote_table_name(table)?;
            load_csv(path, aliases)?
        }
    };

    info!(source = %locator, table, rows = records.len(), "Loaded records");
    Ok(records)
}

// ============================================================================
// TESTS
// ============================================================================
