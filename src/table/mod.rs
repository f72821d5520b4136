//! Core tabular data model.
//!
//! This module contains the data structures every pipeline stage works on:
//!
//! - [`Value`] - one typed cell; `Value::Null` is the explicit absent marker
//! - [`FieldType`] / [`Field`] / [`Schema`] - the declared field→type mapping
//! - [`Record`] - one row, positional against the schema
//! - [`Table`] - ordered records sharing one schema
//! - [`KeyValue`] - hashable/orderable form of a value, used as a group key
//!
//! Field access goes through the schema by name; there is no untyped
//! attribute-style lookup. Null is a valid, distinct group key.

use chrono::NaiveDate;
use serde::ser::SerializeSeq;
use serde::{Deserialize, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;

use crate::error::TableError;

// =============================================================================
// Field Types
// =============================================================================

/// Semantic type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// Free text.
    Text,
    /// Signed integer.
    Int,
    /// Floating point.
    Float,
    /// Calendar date.
    Date,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::Text => "text",
            FieldType::Int => "int",
            FieldType::Float => "float",
            FieldType::Date => "date",
        };
        write!(f, "{}", name)
    }
}

/// One declared field of a schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Field {
    /// Field name as it appears in the source header.
    pub name: String,
    /// Semantic type every value of this field is coerced to.
    #[serde(rename = "type")]
    pub ty: FieldType,
    /// Whether absent values are expected for this field.
    #[serde(default = "default_nullable")]
    pub nullable: bool,
}

fn default_nullable() -> bool {
    true
}

impl Field {
    /// Create a nullable field.
    pub fn new(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
            nullable: true,
        }
    }

    /// Mark the field as required (absent values are a parse failure).
    pub fn required(mut self) -> Self {
        self.nullable = false;
        self
    }
}

// =============================================================================
// Schema
// =============================================================================

/// The declared field set of a table, validated once at load time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Number of declared fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// All declared fields in order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// All field names in order.
    pub fn names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Position of a field by name.
    pub fn index_of(&self, name: &str) -> Result<usize, TableError> {
        self.fields
            .iter()
            .position(|f| f.name == name)
            .ok_or_else(|| TableError::UnknownField(name.to_string()))
    }

    /// Field descriptor by name.
    pub fn field(&self, name: &str) -> Result<&Field, TableError> {
        self.index_of(name).map(|i| &self.fields[i])
    }

    /// Whether a field of this name is declared.
    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }

    /// Append a field (used when a derived column is attached).
    pub(crate) fn push_field(&mut self, field: Field) {
        self.fields.push(field);
    }
}

// =============================================================================
// Values
// =============================================================================

/// One typed cell value.
///
/// `Null` is the explicit absent marker; a missing value is never omitted
/// from a record.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Text(String),
    Int(i64),
    Float(f64),
    Date(NaiveDate),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view: ints widen to floats, everything else is `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// The semantic type of a present value, `None` for `Null`.
    pub fn type_of(&self) -> Option<FieldType> {
        match self {
            Value::Null => None,
            Value::Text(_) => Some(FieldType::Text),
            Value::Int(_) => Some(FieldType::Int),
            Value::Float(_) => Some(FieldType::Float),
            Value::Date(_) => Some(FieldType::Date),
        }
    }

    /// Hashable/orderable key form, for grouping and sorting.
    pub fn key(&self) -> KeyValue {
        match self {
            Value::Null => KeyValue::Null,
            Value::Text(s) => KeyValue::Text(s.clone()),
            Value::Int(i) => KeyValue::Int(*i),
            Value::Float(f) => KeyValue::Float(f.to_bits()),
            Value::Date(d) => KeyValue::Date(*d),
        }
    }

    /// Interpret a JSON scalar as a value of the given type. Used for
    /// configured fill values; `None` when the scalar does not fit the type.
    pub fn from_json(json: &serde_json::Value, ty: FieldType) -> Option<Value> {
        match json {
            serde_json::Value::Null => Some(Value::Null),
            serde_json::Value::Number(n) => match ty {
                FieldType::Int => n.as_i64().map(Value::Int),
                FieldType::Float => n.as_f64().map(Value::Float),
                _ => None,
            },
            serde_json::Value::String(s) => match ty {
                FieldType::Text => Some(Value::Text(s.clone())),
                FieldType::Date => NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .ok()
                    .map(Value::Date),
                _ => None,
            },
            _ => None,
        }
    }

    /// Human-readable label, used for chart categories and pivot columns.
    pub fn label(&self) -> String {
        match self {
            Value::Null => "(unknown)".to_string(),
            Value::Text(s) => s.clone(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Date(d) => d.format("%Y-%m-%d").to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Text(s) => write!(f, "{}", s),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

/// Serialized as a plain JSON scalar so output tables stay renderer-friendly:
/// null, string, number, or an ISO date string.
impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Text(s) => serializer.serialize_str(s),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::Date(d) => serializer.serialize_str(&d.format("%Y-%m-%d").to_string()),
        }
    }
}

// =============================================================================
// Key Values
// =============================================================================

/// A value in hashable, totally-ordered form.
///
/// Floats are keyed by bit pattern. Cross-type ordering is fixed
/// (Null < Int < Float < Date < Text) so sorts are total; within one
/// well-typed column only the intra-type ordering matters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyValue {
    Null,
    Int(i64),
    Float(u64),
    Date(NaiveDate),
    Text(String),
}

impl KeyValue {
    fn rank(&self) -> u8 {
        match self {
            KeyValue::Null => 0,
            KeyValue::Int(_) => 1,
            KeyValue::Float(_) => 2,
            KeyValue::Date(_) => 3,
            KeyValue::Text(_) => 4,
        }
    }
}

impl Ord for KeyValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (KeyValue::Int(a), KeyValue::Int(b)) => a.cmp(b),
            (KeyValue::Float(a), KeyValue::Float(b)) => {
                let (a, b) = (f64::from_bits(*a), f64::from_bits(*b));
                a.partial_cmp(&b).unwrap_or_else(|| {
                    // NaN sorts last among floats
                    match (a.is_nan(), b.is_nan()) {
                        (true, false) => Ordering::Greater,
                        (false, true) => Ordering::Less,
                        _ => Ordering::Equal,
                    }
                })
            }
            (KeyValue::Date(a), KeyValue::Date(b)) => a.cmp(b),
            (KeyValue::Text(a), KeyValue::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for KeyValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// =============================================================================
// Records and Tables
// =============================================================================

/// One row of a table, positional against its schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub values: Vec<Value>,
}

impl Record {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn get(&self, index: usize) -> &Value {
        &self.values[index]
    }
}

/// Ordered records sharing one schema.
///
/// Created once by the loader, mutated in place by the cleaner (column
/// additions only), and consumed read-only by the aggregator and reshaper.
#[derive(Debug, Clone)]
pub struct Table {
    schema: Schema,
    rows: Vec<Record>,
}

impl Table {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            rows: Vec::new(),
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    /// Append a record, enforcing the schema's arity.
    pub fn push_record(&mut self, record: Record) -> Result<(), TableError> {
        if record.values.len() != self.schema.len() {
            return Err(TableError::SchemaMismatch {
                expected: self.schema.len(),
                found: record.values.len(),
            });
        }
        self.rows.push(record);
        Ok(())
    }

    /// Cell at (row, field index).
    pub fn value(&self, row: usize, col: usize) -> &Value {
        self.rows[row].get(col)
    }

    /// All cells of one field, in row order.
    pub fn column(&self, name: &str) -> Result<Vec<&Value>, TableError> {
        let idx = self.schema.index_of(name)?;
        Ok(self.rows.iter().map(|r| r.get(idx)).collect())
    }

    /// Attach a derived column. The cell count must match the row count.
    pub fn add_column(&mut self, field: Field, cells: Vec<Value>) -> Result<(), TableError> {
        if self.schema.contains(&field.name) {
            return Err(TableError::DuplicateField(field.name));
        }
        if cells.len() != self.rows.len() {
            return Err(TableError::ColumnLength {
                field: field.name,
                expected: self.rows.len(),
                found: cells.len(),
            });
        }
        self.schema.push_field(field);
        for (row, cell) in self.rows.iter_mut().zip(cells) {
            row.values.push(cell);
        }
        Ok(())
    }
}

/// Serialized as `{ "fields": [...], "rows": [[...], ...] }`.
impl Serialize for Table {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        struct Rows<'a>(&'a [Record]);
        impl Serialize for Rows<'_> {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
                for row in self.0 {
                    seq.serialize_element(&row.values)?;
                }
                seq.end()
            }
        }

        let mut out = serializer.serialize_struct("Table", 2)?;
        out.serialize_field("fields", self.schema.fields())?;
        out.serialize_field("rows", &Rows(&self.rows))?;
        out.end()
    }
}
