//! Derived columns and duplicate detection.
//!
//! Each [`Derive`] op is a pure function over one record, applied row by
//! row to attach a new column. A result is absent whenever an operand is
//! absent; a present-but-malformed operand is an error, never a guess.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{DeriveError, DeriveResult, TableError};
use crate::table::{Field, FieldType, KeyValue, Table, Value};

static RATIO_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)\s*/\s*(\d+)$").expect("valid ratio regex"));
static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{4}").expect("valid year regex"));

/// All available derived-column operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Derive {
    /// Parse a ratio string like "3/4" into a fraction (0.75).
    ShareFraction { source: String, target: String },

    /// Age at the event: event year minus the year of a date field.
    /// Absent when either operand is absent.
    AgeAtEvent {
        year_field: String,
        date_field: String,
        target: String,
    },

    /// Extract a 4-digit year from a date or text field.
    ExtractYear { source: String, target: String },
}

impl Derive {
    /// Name of the column this op attaches.
    pub fn target(&self) -> &str {
        match self {
            Derive::ShareFraction { target, .. } => target,
            Derive::AgeAtEvent { target, .. } => target,
            Derive::ExtractYear { target, .. } => target,
        }
    }

    /// Fields this op reads.
    pub fn sources(&self) -> Vec<&str> {
        match self {
            Derive::ShareFraction { source, .. } => vec![source],
            Derive::AgeAtEvent {
                year_field,
                date_field,
                ..
            } => vec![year_field, date_field],
            Derive::ExtractYear { source, .. } => vec![source],
        }
    }

    /// Compute the column and attach it to the table.
    pub fn apply(&self, table: &mut Table) -> DeriveResult<()> {
        if table.schema().contains(self.target()) {
            return Err(DeriveError::TargetExists(self.target().to_string()));
        }

        let (field, cells) = match self {
            Derive::ShareFraction { source, target } => {
                let src = table.schema().index_of(source)?;
                let mut cells = Vec::with_capacity(table.len());
                for (row, record) in table.rows().iter().enumerate() {
                    cells.push(share_fraction(record.get(src), row, source)?);
                }
                (Field::new(target.clone(), FieldType::Float), cells)
            }
            Derive::AgeAtEvent {
                year_field,
                date_field,
                target,
            } => {
                let year_idx = table.schema().index_of(year_field)?;
                let date_idx = table.schema().index_of(date_field)?;
                let mut cells = Vec::with_capacity(table.len());
                for (row, record) in table.rows().iter().enumerate() {
                    cells.push(age_at_event(
                        record.get(year_idx),
                        record.get(date_idx),
                        row,
                        year_field,
                        date_field,
                    )?);
                }
                (Field::new(target.clone(), FieldType::Int), cells)
            }
            Derive::ExtractYear { source, target } => {
                let src = table.schema().index_of(source)?;
                let cells = table
                    .rows()
                    .iter()
                    .map(|r| extract_year(r.get(src)))
                    .collect();
                (Field::new(target.clone(), FieldType::Int), cells)
            }
        };

        table.add_column(field, cells).map_err(DeriveError::from)
    }
}

fn share_fraction(value: &Value, row: usize, field: &str) -> DeriveResult<Value> {
    let text = match value {
        Value::Null => return Ok(Value::Null),
        Value::Text(s) => s,
        _ => {
            return Err(DeriveError::WrongType {
                row,
                field: field.to_string(),
                expected: FieldType::Text,
            })
        }
    };

    let caps = RATIO_RE
        .captures(text.trim())
        .ok_or_else(|| DeriveError::InvalidRatio {
            row,
            field: field.to_string(),
            value: text.clone(),
        })?;
    let numerator: f64 = caps[1].parse().map_err(|_| DeriveError::InvalidRatio {
        row,
        field: field.to_string(),
        value: text.clone(),
    })?;
    let denominator: f64 = caps[2].parse().map_err(|_| DeriveError::InvalidRatio {
        row,
        field: field.to_string(),
        value: text.clone(),
    })?;
    if denominator == 0.0 {
        return Err(DeriveError::InvalidRatio {
            row,
            field: field.to_string(),
            value: text.clone(),
        });
    }
    Ok(Value::Float(numerator / denominator))
}

fn age_at_event(
    year: &Value,
    date: &Value,
    row: usize,
    year_field: &str,
    date_field: &str,
) -> DeriveResult<Value> {
    let event_year = match year {
        Value::Null => return Ok(Value::Null),
        Value::Int(y) => *y,
        _ => {
            return Err(DeriveError::WrongType {
                row,
                field: year_field.to_string(),
                expected: FieldType::Int,
            })
        }
    };
    let birth = match date {
        Value::Null => return Ok(Value::Null),
        Value::Date(d) => *d,
        _ => {
            return Err(DeriveError::WrongType {
                row,
                field: date_field.to_string(),
                expected: FieldType::Date,
            })
        }
    };
    Ok(Value::Int(event_year - i64::from(chrono::Datelike::year(&birth))))
}

fn extract_year(value: &Value) -> Value {
    match value {
        Value::Date(d) => Value::Int(i64::from(chrono::Datelike::year(d))),
        Value::Int(y) => Value::Int(*y),
        Value::Text(s) => YEAR_RE
            .find(s)
            .and_then(|m| m.as_str().parse::<i64>().ok())
            .map(Value::Int)
            .unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

/// Get a description of all derive operations, for `chartprep operations`.
pub fn operations_description() -> String {
    r#"Derived-column operations:

| Operation | Description | Parameters |
|-----------|-------------|------------|
| share_fraction | Parse a ratio string ("3/4") into a fraction (0.75) | source, target |
| age_at_event | Event year minus the year of a date field | year_field, date_field, target |
| extract_year | Extract a 4-digit year from a date or text field | source, target |

A result is absent whenever an operand is absent. Example derives in JSON:
[
  {"type": "share_fraction", "source": "prize_share", "target": "share_pct"},
  {"type": "age_at_event", "year_field": "year", "date_field": "birth_date", "target": "winning_age"}
]"#
    .to_string()
}

// =============================================================================
// Duplicate Detection
// =============================================================================

/// Rows sharing one key over the configured field subset.
#[derive(Debug, Clone, Serialize)]
pub struct DuplicateGroup {
    /// The shared key values, in subset order.
    pub key: Vec<Value>,
    /// All member row indices, the first occurrence included.
    pub rows: Vec<usize>,
}

/// Report of duplicate rows over a field subset.
///
/// The pipeline only ever reports; whether a group is accidental
/// duplication or a legitimate repeat entity (a repeat winner, say) is the
/// analyst's call.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DuplicateReport {
    pub subset: Vec<String>,
    pub groups: Vec<DuplicateGroup>,
}

impl DuplicateReport {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total rows involved in any duplicate group.
    pub fn row_count(&self) -> usize {
        self.groups.iter().map(|g| g.rows.len()).sum()
    }
}

/// Find rows whose values over `subset` coincide. Key order is first
/// appearance; every member row is listed, not just the later ones.
pub fn find_duplicates(table: &Table, subset: &[String]) -> Result<DuplicateReport, TableError> {
    let indices: Vec<usize> = subset
        .iter()
        .map(|name| table.schema().index_of(name))
        .collect::<Result<_, _>>()?;

    let mut seen: HashMap<Vec<KeyValue>, usize> = HashMap::new();
    let mut groups: Vec<DuplicateGroup> = Vec::new();
    let mut order: Vec<Vec<usize>> = Vec::new();

    for (row, record) in table.rows().iter().enumerate() {
        let key: Vec<KeyValue> = indices.iter().map(|&i| record.get(i).key()).collect();
        match seen.get(&key) {
            Some(&slot) => order[slot].push(row),
            None => {
                seen.insert(key, order.len());
                order.push(vec![row]);
            }
        }
    }

    for members in order {
        if members.len() > 1 {
            let first = members[0];
            groups.push(DuplicateGroup {
                key: indices
                    .iter()
                    .map(|&i| table.rows()[first].get(i).clone())
                    .collect(),
                rows: members,
            });
        }
    }

    Ok(DuplicateReport {
        subset: subset.to_vec(),
        groups,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{Record, Schema};
    use chrono::NaiveDate;

    fn laureate_table() -> Table {
        let schema = Schema::new(vec![
            Field::new("year", FieldType::Int),
            Field::new("full_name", FieldType::Text),
            Field::new("prize_share", FieldType::Text),
            Field::new("birth_date", FieldType::Date),
        ]);
        let mut table = Table::new(schema);
        let rows = vec![
            (1901, "Wilhelm Conrad", "1/1", Some((1845, 3, 27))),
            (1903, "Marie Curie", "1/4", Some((1867, 11, 7))),
            (1911, "Marie Curie", "1/1", Some((1867, 11, 7))),
            (1963, "Red Cross", "1/2", None),
        ];
        for (year, name, share, birth) in rows {
            let date = birth
                .map(|(y, m, d)| Value::Date(NaiveDate::from_ymd_opt(y, m, d).unwrap()))
                .unwrap_or(Value::Null);
            table
                .push_record(Record::new(vec![
                    Value::Int(year),
                    Value::Text(name.into()),
                    Value::Text(share.into()),
                    date,
                ]))
                .unwrap();
        }
        table
    }

    #[test]
    fn test_share_fraction() {
        let mut table = laureate_table();
        Derive::ShareFraction {
            source: "prize_share".into(),
            target: "share_pct".into(),
        }
        .apply(&mut table)
        .unwrap();

        let idx = table.schema().index_of("share_pct").unwrap();
        assert_eq!(table.value(0, idx), &Value::Float(1.0));
        assert_eq!(table.value(1, idx), &Value::Float(0.25));
        assert_eq!(table.value(3, idx), &Value::Float(0.5));
    }

    #[test]
    fn test_share_fraction_null_propagates() {
        let mut table = Table::new(Schema::new(vec![Field::new("prize_share", FieldType::Text)]));
        table.push_record(Record::new(vec![Value::Null])).unwrap();
        Derive::ShareFraction {
            source: "prize_share".into(),
            target: "share_pct".into(),
        }
        .apply(&mut table)
        .unwrap();
        assert_eq!(table.value(0, 1), &Value::Null);
    }

    #[test]
    fn test_share_fraction_rejects_garbage() {
        let mut table = Table::new(Schema::new(vec![Field::new("prize_share", FieldType::Text)]));
        table
            .push_record(Record::new(vec![Value::Text("half".into())]))
            .unwrap();
        let err = Derive::ShareFraction {
            source: "prize_share".into(),
            target: "share_pct".into(),
        }
        .apply(&mut table)
        .unwrap_err();
        assert!(matches!(err, DeriveError::InvalidRatio { .. }));
    }

    #[test]
    fn test_share_fraction_rejects_zero_denominator() {
        let mut table = Table::new(Schema::new(vec![Field::new("prize_share", FieldType::Text)]));
        table
            .push_record(Record::new(vec![Value::Text("1/0".into())]))
            .unwrap();
        let err = Derive::ShareFraction {
            source: "prize_share".into(),
            target: "share_pct".into(),
        }
        .apply(&mut table)
        .unwrap_err();
        assert!(matches!(err, DeriveError::InvalidRatio { .. }));
    }

    #[test]
    fn test_age_at_event() {
        let mut table = laureate_table();
        Derive::AgeAtEvent {
            year_field: "year".into(),
            date_field: "birth_date".into(),
            target: "winning_age".into(),
        }
        .apply(&mut table)
        .unwrap();

        let idx = table.schema().index_of("winning_age").unwrap();
        assert_eq!(table.value(0, idx), &Value::Int(1901 - 1845));
        assert_eq!(table.value(1, idx), &Value::Int(1903 - 1867));
        // organization without a birth date: absent, not zero
        assert_eq!(table.value(3, idx), &Value::Null);
    }

    #[test]
    fn test_extract_year() {
        let mut table = Table::new(Schema::new(vec![Field::new("raw", FieldType::Text)]));
        for s in ["2023-12-25", "15/03/2024", "no year here"] {
            table
                .push_record(Record::new(vec![Value::Text(s.into())]))
                .unwrap();
        }
        Derive::ExtractYear {
            source: "raw".into(),
            target: "year".into(),
        }
        .apply(&mut table)
        .unwrap();
        assert_eq!(table.value(0, 1), &Value::Int(2023));
        assert_eq!(table.value(1, 1), &Value::Int(2024));
        assert_eq!(table.value(2, 1), &Value::Null);
    }

    #[test]
    fn test_target_collision() {
        let mut table = laureate_table();
        let err = Derive::ExtractYear {
            source: "birth_date".into(),
            target: "year".into(),
        }
        .apply(&mut table)
        .unwrap_err();
        assert!(matches!(err, DeriveError::TargetExists(_)));
    }

    #[test]
    fn test_find_duplicates_reports_all_members() {
        let table = laureate_table();
        let report = find_duplicates(&table, &["full_name".to_string()]).unwrap();

        assert_eq!(report.groups.len(), 1);
        assert_eq!(report.groups[0].key, vec![Value::Text("Marie Curie".into())]);
        // keep=false semantics: the original row is listed too
        assert_eq!(report.groups[0].rows, vec![1, 2]);
        assert_eq!(report.row_count(), 2);
    }

    #[test]
    fn test_find_duplicates_subset_of_fields() {
        let table = laureate_table();
        // year+name never repeats, so no duplicates
        let report =
            find_duplicates(&table, &["year".to_string(), "full_name".to_string()]).unwrap();
        assert!(report.is_empty());
    }

    #[test]
    fn test_derive_serde_roundtrip() {
        let op = Derive::AgeAtEvent {
            year_field: "year".into(),
            date_field: "birth_date".into(),
            target: "winning_age".into(),
        };
        let json = serde_json::to_string(&op).unwrap();
        assert!(json.contains("age_at_event"));
        let back: Derive = serde_json::from_str(&json).unwrap();
        assert_eq!(back.target(), "winning_age");
    }
}
