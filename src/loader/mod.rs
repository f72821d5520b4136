//! Typed CSV loading with encoding and delimiter auto-detection.
//!
//! Reads a delimited source once into a [`Table`], coercing every field to
//! the type its [`Schema`] declares. Unparseable values either fail the
//! load or become an explicit `Null`, depending on [`ParseErrorPolicy`].
//! Dates are never guessed; the only stand-ins allowed are the entries of
//! an explicit, auditable [`DateSubstitution`] list.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{LoadError, LoadResult, TableError};
use crate::table::{Field, FieldType, Record, Schema, Table, Value};

/// Detect the encoding of raw bytes using chardet.
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    // Normalize charset names
    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to string using the specified encoding.
pub fn decode_content(bytes: &[u8], encoding: &str) -> LoadResult<String> {
    match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => String::from_utf8(bytes.to_vec())
            .map_err(|_| LoadError::Encoding("utf-8".to_string())),
        "iso-8859-1" | "latin-1" | "latin1" => {
            Ok(encoding_rs::ISO_8859_15.decode(bytes).0.to_string())
        }
        "windows-1252" | "cp1252" => Ok(encoding_rs::WINDOWS_1252.decode(bytes).0.to_string()),
        _ => {
            // Fallback: UTF-8 with lossy conversion
            Ok(String::from_utf8_lossy(bytes).to_string())
        }
    }
}

/// Detect the delimiter by counting occurrences in the first line.
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [',', ';', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

// =============================================================================
// Options
// =============================================================================

/// What to do when a value cannot be coerced to its declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseErrorPolicy {
    /// Fail the whole load.
    #[default]
    Reject,
    /// Record the cell as absent and continue.
    Null,
}

/// One auditable date stand-in for a named entity lacking date precision,
/// e.g. a mid-year estimate for a laureate whose exact birth date is
/// unknown. Applied only where the loaded cell would otherwise be absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateSubstitution {
    /// Field receiving the stand-in date.
    pub field: String,
    /// Field identifying the entity (e.g. `full_name`).
    pub where_field: String,
    /// Value of `where_field` that selects the entity.
    pub equals: String,
    /// The documented stand-in date.
    pub value: NaiveDate,
}

/// Options for a single load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadOptions {
    /// Delimiter; auto-detected when not set.
    pub delimiter: Option<char>,

    /// Coercion failure policy.
    #[serde(default)]
    pub on_parse_error: ParseErrorPolicy,

    /// Date formats tried in order, chrono syntax.
    #[serde(default = "default_date_formats")]
    pub date_formats: Vec<String>,

    /// Documented date stand-ins.
    #[serde(default)]
    pub substitutions: Vec<DateSubstitution>,

    /// Defensive row ceiling.
    #[serde(default = "default_max_rows")]
    pub max_rows: usize,
}

fn default_date_formats() -> Vec<String> {
    vec!["%Y-%m-%d".to_string(), "%Y/%m/%d".to_string()]
}

fn default_max_rows() -> usize {
    500_000
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            delimiter: None,
            on_parse_error: ParseErrorPolicy::Reject,
            date_formats: default_date_formats(),
            substitutions: Vec::new(),
            max_rows: default_max_rows(),
        }
    }
}

// =============================================================================
// Load Results
// =============================================================================

/// A cell that the lenient policy turned into Null.
#[derive(Debug, Clone, Serialize)]
pub struct NulledCell {
    pub line: u64,
    pub field: String,
    pub value: String,
}

/// Metadata about how a source was read.
#[derive(Debug, Clone, Serialize)]
pub struct SourceInfo {
    /// Detected or configured encoding.
    pub encoding: String,
    /// Detected or configured delimiter.
    pub delimiter: char,
    /// Rows loaded.
    pub row_count: usize,
    /// Cells nulled under [`ParseErrorPolicy::Null`].
    pub nulled: Vec<NulledCell>,
    /// Substitutions that actually fired, as (field, where value) pairs.
    pub substituted: Vec<(String, String)>,
}

/// A loaded table plus its source metadata.
#[derive(Debug)]
pub struct Loaded {
    pub table: Table,
    pub info: SourceInfo,
}

// =============================================================================
// Loading
// =============================================================================

/// Load a CSV file into a typed table.
pub fn load_csv<P: AsRef<Path>>(path: P, schema: &Schema, options: &LoadOptions) -> LoadResult<Loaded> {
    let bytes = std::fs::read(path.as_ref())?;
    load_bytes(&bytes, schema, options)
}

/// Load CSV bytes into a typed table, auto-detecting encoding and
/// delimiter where the options leave them open.
pub fn load_bytes(bytes: &[u8], schema: &Schema, options: &LoadOptions) -> LoadResult<Loaded> {
    if bytes.is_empty() {
        return Err(LoadError::EmptyFile);
    }

    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding)?;
    let delimiter = options.delimiter.unwrap_or_else(|| detect_delimiter(&content));
    debug!(%encoding, %delimiter, "decoded source");

    let parsed = load_str(&content, delimiter, schema, options)?;
    Ok(finish(parsed, encoding, delimiter))
}

fn finish(parsed: Parsed, encoding: String, delimiter: char) -> Loaded {
    let row_count = parsed.table.len();
    if !parsed.nulled.is_empty() {
        warn!(count = parsed.nulled.len(), "cells nulled during load");
    }
    Loaded {
        table: parsed.table,
        info: SourceInfo {
            encoding,
            delimiter,
            row_count,
            nulled: parsed.nulled,
            substituted: parsed.substituted,
        },
    }
}

struct Parsed {
    table: Table,
    nulled: Vec<NulledCell>,
    substituted: Vec<(String, String)>,
}

/// Parse decoded CSV text against a schema with an explicit delimiter.
fn load_str(content: &str, delimiter: char, schema: &Schema, options: &LoadOptions) -> LoadResult<Parsed> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    // Map CSV column positions onto schema positions; the header set must
    // equal the declared field set.
    let headers = reader
        .headers()
        .map_err(|e| LoadError::Malformed(e.to_string()))?
        .clone();
    if headers.is_empty() || (headers.len() == 1 && headers[0].trim().is_empty()) {
        return Err(LoadError::NoHeaders);
    }

    let header_names: Vec<String> = headers.iter().map(|h| h.trim().to_string()).collect();
    let missing: Vec<String> = schema
        .names()
        .into_iter()
        .filter(|n| !header_names.iter().any(|h| h == n))
        .map(String::from)
        .collect();
    let unexpected: Vec<String> = header_names
        .iter()
        .filter(|h| !schema.contains(h))
        .cloned()
        .collect();
    if !missing.is_empty() || !unexpected.is_empty() {
        return Err(LoadError::HeaderMismatch { missing, unexpected });
    }

    // schema index -> csv column index
    let positions: Vec<usize> = schema
        .fields()
        .iter()
        .map(|f| {
            header_names
                .iter()
                .position(|h| h == &f.name)
                .unwrap_or_default()
        })
        .collect();

    let mut table = Table::new(schema.clone());
    let mut nulled = Vec::new();
    let mut substituted = Vec::new();

    for result in reader.records() {
        let record = match result {
            Ok(r) => r,
            Err(e) => return Err(csv_error(e, schema)),
        };
        let line = record.position().map(|p| p.line()).unwrap_or_default();

        if table.len() >= options.max_rows {
            return Err(LoadError::CapacityExceeded {
                limit: options.max_rows,
            });
        }

        let mut values = Vec::with_capacity(schema.len());
        for (field, &pos) in schema.fields().iter().zip(&positions) {
            let raw = record.get(pos).unwrap_or("");
            match coerce(raw, field, &options.date_formats) {
                Ok(v) => values.push(v),
                Err(()) => match options.on_parse_error {
                    ParseErrorPolicy::Reject => {
                        return Err(LoadError::Parse {
                            line,
                            field: field.name.clone(),
                            value: raw.to_string(),
                            expected: field.ty,
                        });
                    }
                    ParseErrorPolicy::Null => {
                        nulled.push(NulledCell {
                            line,
                            field: field.name.clone(),
                            value: raw.to_string(),
                        });
                        values.push(Value::Null);
                    }
                },
            }
        }

        apply_substitutions(schema, &mut values, options, &mut substituted);

        table
            .push_record(Record::new(values))
            .map_err(|source| LoadError::Schema { line, source })?;
    }

    Ok(Parsed {
        table,
        nulled,
        substituted,
    })
}

/// Fill an absent cell from the substitution list when its row matches.
/// Only ever fills Null; a parsed value is never overwritten.
fn apply_substitutions(
    schema: &Schema,
    values: &mut [Value],
    options: &LoadOptions,
    fired: &mut Vec<(String, String)>,
) {
    for sub in &options.substitutions {
        let (Ok(target), Ok(selector)) = (schema.index_of(&sub.field), schema.index_of(&sub.where_field))
        else {
            continue;
        };
        if !values[target].is_null() {
            continue;
        }
        if values[selector].as_str() == Some(sub.equals.as_str()) {
            values[target] = Value::Date(sub.value);
            fired.push((sub.field.clone(), sub.equals.clone()));
        }
    }
}

/// Coerce one raw cell to its declared type. Empty cells of a nullable
/// field are Null; empty cells of a required field are a coercion failure.
fn coerce(raw: &str, field: &Field, date_formats: &[String]) -> Result<Value, ()> {
    let trimmed = raw.trim().trim_matches('"');
    if trimmed.is_empty() {
        return if field.nullable { Ok(Value::Null) } else { Err(()) };
    }

    match field.ty {
        FieldType::Text => Ok(Value::Text(trimmed.to_string())),
        FieldType::Int => trimmed.parse::<i64>().map(Value::Int).map_err(|_| ()),
        FieldType::Float => trimmed.parse::<f64>().map(Value::Float).map_err(|_| ()),
        FieldType::Date => {
            for fmt in date_formats {
                if let Ok(d) = NaiveDate::parse_from_str(trimmed, fmt) {
                    return Ok(Value::Date(d));
                }
            }
            Err(())
        }
    }
}

fn csv_error(err: csv::Error, schema: &Schema) -> LoadError {
    let line = err
        .position()
        .map(|p| p.line())
        .unwrap_or_default();
    match err.kind() {
        csv::ErrorKind::UnequalLengths { len, .. } => LoadError::Schema {
            line,
            source: TableError::SchemaMismatch {
                expected: schema.len(),
                found: *len as usize,
            },
        },
        _ => LoadError::Malformed(err.to_string()),
    }
}

// =============================================================================
// Schema-less preview
// =============================================================================

/// Headers plus the first `limit` rows as raw strings, for `inspect`.
pub fn preview(bytes: &[u8], delimiter: Option<char>, limit: usize) -> LoadResult<(Vec<String>, Vec<Vec<String>>)> {
    if bytes.is_empty() {
        return Err(LoadError::EmptyFile);
    }
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding)?;
    let delimiter = delimiter.unwrap_or_else(|| detect_delimiter(&content));

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| LoadError::Malformed(e.to_string()))?
        .iter()
        .map(String::from)
        .collect();
    if headers.is_empty() {
        return Err(LoadError::NoHeaders);
    }

    let mut rows = Vec::new();
    for result in reader.records().take(limit) {
        let record = result.map_err(|e| LoadError::Malformed(e.to_string()))?;
        rows.push(record.iter().map(String::from).collect());
    }
    Ok((headers, rows))
}
