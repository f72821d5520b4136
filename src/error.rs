//! Error types for the chartprep pipeline.
//!
//! One error enum per pipeline stage:
//!
//! - [`TableError`] - schema/arity violations on the core table type
//! - [`LoadError`] - CSV reading and type coercion errors
//! - [`DeriveError`] - derived-column computation errors
//! - [`AggregateError`] - grouping and reduction errors
//! - [`PivotError`] - reshape errors
//! - [`ConfigError`] - dataset configuration errors
//! - [`PipelineError`] - top-level orchestration errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across stage boundaries.

use thiserror::Error;

use crate::table::FieldType;

// =============================================================================
// Table Errors
// =============================================================================

/// Violations of the table's schema contract.
#[derive(Debug, Error)]
pub enum TableError {
    /// Record width differs from the schema.
    #[error("record has {found} fields, schema declares {expected}")]
    SchemaMismatch { expected: usize, found: usize },

    /// A field name that the schema does not declare.
    #[error("unknown field: {0}")]
    UnknownField(String),

    /// A field name that the schema already declares.
    #[error("field '{0}' already exists")]
    DuplicateField(String),

    /// A column being attached has the wrong number of cells.
    #[error("column '{field}' has {found} cells, table has {expected} rows")]
    ColumnLength {
        field: String,
        expected: usize,
        found: usize,
    },
}

// =============================================================================
// Load Errors
// =============================================================================

/// Errors while reading a delimited source into a typed table.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Failed to read the source.
    #[error("failed to read source: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to decode the source bytes.
    #[error("failed to decode source as {0}")]
    Encoding(String),

    /// Source has no content at all.
    #[error("source is empty")]
    EmptyFile,

    /// Source has no header line.
    #[error("no headers found")]
    NoHeaders,

    /// Header set does not match the declared schema.
    #[error("headers do not match schema (missing: {missing:?}, unexpected: {unexpected:?})")]
    HeaderMismatch {
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    /// A value could not be coerced to its declared type.
    #[error("line {line}, field '{field}': cannot parse '{value}' as {expected}")]
    Parse {
        line: u64,
        field: String,
        value: String,
        expected: FieldType,
    },

    /// A row's field set differs from the schema.
    #[error("line {line}: {source}")]
    Schema {
        line: u64,
        #[source]
        source: TableError,
    },

    /// The defensive row ceiling was hit.
    #[error("row count exceeds the configured limit of {limit}")]
    CapacityExceeded { limit: usize },

    /// Malformed CSV that is not a width mismatch (bad quoting etc).
    #[error("invalid CSV: {0}")]
    Malformed(String),
}

// =============================================================================
// Derive Errors
// =============================================================================

/// Errors while computing a derived column.
#[derive(Debug, Error)]
pub enum DeriveError {
    /// The source field does not exist.
    #[error(transparent)]
    Table(#[from] TableError),

    /// A share value that is not an "n/m" ratio.
    #[error("row {row}, field '{field}': '{value}' is not a ratio like \"1/2\"")]
    InvalidRatio {
        row: usize,
        field: String,
        value: String,
    },

    /// A present operand with the wrong type.
    #[error("row {row}, field '{field}': expected {expected}")]
    WrongType {
        row: usize,
        field: String,
        expected: FieldType,
    },

    /// The derived column name is already taken.
    #[error("target field '{0}' already exists")]
    TargetExists(String),
}

// =============================================================================
// Aggregate Errors
// =============================================================================

/// Errors while grouping and reducing.
#[derive(Debug, Error)]
pub enum AggregateError {
    /// A referenced field does not exist.
    #[error(transparent)]
    Table(#[from] TableError),

    /// Sum/mean over a field holding non-numeric present values.
    #[error("field '{field}' holds non-numeric values")]
    NonNumeric { field: String },

    /// Cumulative accumulation only makes sense for count and sum.
    #[error("reduction '{0}' cannot be accumulated over an ordering field")]
    UnsupportedCumulative(String),

    /// Sort column requested that the aggregation does not produce.
    #[error("sort column '{0}' is not produced by this aggregation")]
    UnknownSortColumn(String),

    /// Rolling window of zero width.
    #[error("rolling window must be at least 1")]
    InvalidWindow,
}

// =============================================================================
// Pivot Errors
// =============================================================================

/// Errors while reshaping long to wide.
#[derive(Debug, Error)]
pub enum PivotError {
    /// A referenced field does not exist.
    #[error(transparent)]
    Table(#[from] TableError),

    /// More than one record maps to the same output cell.
    #[error("duplicate cell for row key '{row_key}', column key '{col_key}'")]
    AmbiguousCell { row_key: String, col_key: String },

    /// Fill value type differs from the value field type.
    #[error("fill value must be null or a {expected}")]
    BadFill { expected: FieldType },
}

// =============================================================================
// Config Errors
// =============================================================================

/// Errors in a dataset configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Malformed JSON.
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A config entry references a field that neither the schema nor a
    /// derive target declares.
    #[error("{context} references unknown field '{field}'")]
    UnknownField { context: String, field: String },

    /// The field list is empty.
    #[error("config declares no fields")]
    NoFields,

    /// Two analyses share one name.
    #[error("duplicate analysis name '{0}'")]
    DuplicateAnalysis(String),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline orchestration errors.
///
/// This is the main error type returned by
/// [`crate::transform::pipeline::run_dataset`]. It wraps all stage errors
/// and adds pipeline-specific variants.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Load error.
    #[error("load error: {0}")]
    Load(#[from] LoadError),

    /// Derived-column error.
    #[error("derive error: {0}")]
    Derive(#[from] DeriveError),

    /// Aggregation error.
    #[error("aggregate error: {0}")]
    Aggregate(#[from] AggregateError),

    /// Reshape error.
    #[error("pivot error: {0}")]
    Pivot(#[from] PivotError),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Table contract violation outside any one stage.
    #[error("table error: {0}")]
    Table(#[from] TableError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Nothing to analyze.
    #[error("no rows to analyze")]
    EmptyInput,
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for load operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// Result type for derive operations.
pub type DeriveResult<T> = Result<T, DeriveError>;

/// Result type for aggregate operations.
pub type AggregateResult<T> = Result<T, AggregateError>;

/// Result type for pivot operations.
pub type PivotResult<T> = Result<T, PivotError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        // LoadError -> PipelineError
        let load_err = LoadError::EmptyFile;
        let pipeline_err: PipelineError = load_err.into();
        assert!(pipeline_err.to_string().contains("empty"));

        // TableError -> AggregateError -> PipelineError
        let table_err = TableError::UnknownField("prize".into());
        let agg_err: AggregateError = table_err.into();
        let pipeline_err: PipelineError = agg_err.into();
        assert!(pipeline_err.to_string().contains("prize"));
    }

    #[test]
    fn test_parse_error_format() {
        let err = LoadError::Parse {
            line: 12,
            field: "year".into(),
            value: "19o1".into(),
            expected: FieldType::Int,
        };
        let msg = err.to_string();
        assert!(msg.contains("line 12"));
        assert!(msg.contains("year"));
        assert!(msg.contains("19o1"));
    }

    #[test]
    fn test_ambiguous_cell_format() {
        let err = PivotError::AmbiguousCell {
            row_key: "2020-01-01".into(),
            col_key: "go".into(),
        };
        assert!(err.to_string().contains("2020-01-01"));
        assert!(err.to_string().contains("go"));
    }
}
