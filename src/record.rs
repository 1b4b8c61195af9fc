// 🧾 Customer Records - schema + immutable rows
// A record is its full field tuple: every column is carried through untouched,
// three of them (first name, last name, email) are the ones the rules look at.

use crate::error::{AuditError, AuditResult};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// VALIDATED FIELDS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    FirstName,
    LastName,
    Email,
}

impl Field {
    pub const ALL: [Field; 3] = [Field::FirstName, Field::LastName, Field::Email];

    pub fn name(&self) -> &'static str {
        match self {
            Field::FirstName => "first_name",
            Field::LastName => "last_name",
            Field::Email => "email",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Column names accepted for each validated field, tried in order.
/// Legacy customer tables call the first name column `name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldAliases {
    pub first_name: Vec<String>,
    pub last_name: Vec<String>,
    pub email: Vec<String>,
}

impl Default for FieldAliases {
    fn default() -> Self {
        FieldAliases {
            first_name: vec!["first_name".to_string(), "name".to_string()],
            last_name: vec!["last_name".to_string()],
            email: vec!["email".to_string()],
        }
    }
}

impl FieldAliases {
    pub fn candidates(&self, field: Field) -> &[String] {
        match field {
            Field::FirstName => &self.first_name,
            Field::LastName => &self.last_name,
            Field::Email => &self.email,
        }
    }
}

// ============================================================================
// SCHEMA
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    columns: Vec<String>,
    first_name: Option<usize>,
    last_name: Option<usize>,
    email: Option<usize>,
}

impl Schema {
    pub fn new(columns: Vec<String>) -> Self {
        Self::with_aliases(columns, &FieldAliases::default())
    }

    /// Resolve the validated fields against `columns`. The first alias
    /// present in the column list wins; unresolved fields stay `None`.
    pub fn with_aliases(columns: Vec<String>, aliases: &FieldAliases) -> Self {
        let resolve = |field: Field| {
            aliases
                .candidates(field)
                .iter()
                .find_map(|alias| columns.iter().position(|c| c == alias))
        };

        Schema {
            first_name: resolve(Field::FirstName),
            last_name: resolve(Field::LastName),
            email: resolve(Field::Email),
            columns,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn position(&self, field: Field) -> Option<usize> {
        match field {
            Field::FirstName => self.first_name,
            Field::LastName => self.last_name,
            Field::Email => self.email,
        }
    }

    /// Column name backing `field`, if the schema has one
    pub fn column_for(&self, field: Field) -> Option<&str> {
        self.position(field).map(|i| self.columns[i].as_str())
    }

    pub fn missing_fields(&self) -> Vec<Field> {
        Field::ALL
            .into_iter()
            .filter(|f| self.position(*f).is_none())
            .collect()
    }
}

// ============================================================================
// RECORD
// ============================================================================

/// One customer row. `None` is a NULL / missing value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Record {
    values: Vec<Option<String>>,
}

impl Record {
    pub fn new(values: Vec<Option<String>>) -> Self {
        Record { values }
    }

    pub fn values(&self) -> &[Option<String>] {
        &self.values
    }

    /// Value at `index`; NULL and out-of-range both read as missing
    pub fn get(&self, index: usize) -> Option<&str> {
        self.values.get(index).and_then(|v| v.as_deref())
    }
}

impl<S: Into<String>> FromIterator<Option<S>> for Record {
    fn from_iter<I: IntoIterator<Item = Option<S>>>(iter: I) -> Self {
        Record::new(iter.into_iter().map(|v| v.map(Into::into)).collect())
    }
}

// ============================================================================
// RECORD SET
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSet {
    schema: Schema,
    records: Vec<Record>,
}

impl RecordSet {
    pub fn new(schema: Schema) -> Self {
        RecordSet {
            schema,
            records: Vec::new(),
        }
    }

    /// Build a set from raw rows, rejecting rows whose width differs from the schema
    pub fn from_rows(schema: Schema, rows: Vec<Vec<Option<String>>>) -> AuditResult<Self> {
        let mut set = RecordSet::new(schema);
        for values in rows {
            set.push(Record::new(values))?;
        }
        Ok(set)
    }

    pub fn push(&mut self, record: Record) -> AuditResult<()> {
        if record.values.len() != self.schema.len() {
            return Err(AuditError::RowWidth {
                row: self.records.len(),
                expected: self.schema.len(),
                found: record.values.len(),
            });
        }
        self.records.push(record);
        Ok(())
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn get(&self, row: usize) -> Option<&Record> {
        self.records.get(row)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Value of a validated field for `record`, `None` if missing from the
    /// schema or NULL in the row
    pub fn field<'a>(&self, record: &'a Record, field: Field) -> Option<&'a str> {
        self.schema.position(field).and_then(|i| record.get(i))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_schema_resolves_default_columns() {
        let schema = Schema::new(columns(&["id", "first_name", "last_name", "email"]));

        assert_eq!(schema.position(Field::FirstName), Some(1));
        assert_eq!(schema.position(Field::LastName), Some(2));
        assert_eq!(schema.position(Field::Email), Some(3));
        assert!(schema.missing_fields().is_empty());
    }

    #[test]
    fn test_schema_accepts_legacy_name_column() {
        let schema = Schema::new(columns(&["name", "last_name", "email"]));

        assert_eq!(schema.column_for(Field::FirstName), Some("name"));
    }

    #[test]
    fn test_first_alias_wins_when_both_present() {
        let schema = Schema::new(columns(&["name", "first_name", "last_name", "email"]));

        assert_eq!(schema.position(Field::FirstName), Some(1));
    }

    #[test]
    fn test_custom_aliases() {
        let aliases = FieldAliases {
            email: vec!["contact_email".to_string()],
            ..FieldAliases::default()
        };
        let schema = Schema::with_aliases(
            columns(&["first_name", "last_name", "contact_email"]),
            &aliases,
        );

        assert_eq!(schema.position(Field::Email), Some(2));
    }

    #[test]
    fn test_missing_fields_reported() {
        let schema = Schema::new(columns(&["first_name", "phone"]));

        assert_eq!(schema.missing_fields(), vec![Field::LastName, Field::Email]);
    }

    #[test]
    fn test_push_rejects_wrong_width() {
        let mut set = RecordSet::new(Schema::new(columns(&["first_name", "last_name", "email"])));
        let result = set.push(Record::from_iter([Some("Jo"), Some("Lee")]));

        match result {
            Err(AuditError::RowWidth { row, expected, found }) => {
                assert_eq!((row, expected, found), (0, 3, 2));
            }
            other => panic!("expected RowWidth, got {:?}", other),
        }
        assert!(set.is_empty());
    }

    #[test]
    fn test_field_reads_null_as_missing() {
        let set = RecordSet::from_rows(
            Schema::new(columns(&["first_name", "last_name", "email"])),
            vec![vec![Some("Jo".to_string()), None, Some("jo@x.com".to_string())]],
        )
        .unwrap();
        let record = set.get(0).unwrap();

        assert_eq!(set.field(record, Field::FirstName), Some("Jo"));
        assert_eq!(set.field(record, Field::LastName), None);
        assert_eq!(set.field(record, Field::Email), Some("jo@x.com"));
    }

    #[test]
    fn test_records_compare_by_full_tuple() {
        let a = Record::from_iter([Some("Jo"), Some("Lee"), None]);
        let b = Record::from_iter([Some("Jo"), Some("Lee"), None]);
        let c = Record::from_iter([Some("Jo"), Some("Lee"), Some("")]);

        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
