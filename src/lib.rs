//! # chartprep - CSV aggregation and reshaping for chart-ready data
//!
//! chartprep loads a delimited dataset against a declared schema, derives
//! cleaned columns, computes grouped/cumulative aggregates and pivots, and
//! hands plain data structures to whatever renders the charts.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌──────────────────┐     ┌─────────────┐
//! │   CSV File  │────▶│   Loader    │────▶│    Transform     │────▶│ Chart shapes│
//! │ (any enc.)  │     │ (typed rows)│     │ (group/pivot/...)│     │   (JSON)    │
//! └─────────────┘     └─────────────┘     └──────────────────┘     └─────────────┘
//! ```
//!
//! Data flows one way; every stage consumes one table and produces a new
//! one. The renderer is an external collaborator - this crate ends at
//! serializable category slices, line series, and path→value trees.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use chartprep::{run_dataset, DatasetConfig, RunOptions};
//!
//! let config = DatasetConfig::from_json(&std::fs::read_to_string("nobel.json")?)?;
//! let report = run_dataset("nobel_prize_data.csv", &config, &RunOptions::default())?;
//! println!("{} analyses computed", report.outputs.len());
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`table`] - Values, schemas, records, tables
//! - [`loader`] - CSV parsing with auto-detection and typed coercion
//! - [`transform`] - Derives, aggregation, pivot, rolling, join, pipeline
//! - [`chart`] - Renderer-facing output shapes
//! - [`config`] - Dataset configuration

// Core modules
pub mod error;
pub mod table;

// Loading
pub mod loader;

// Transformation
pub mod transform;

// Renderer contract
pub mod chart;

// Configuration
pub mod config;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    AggregateError, ConfigError, DeriveError, LoadError, PipelineError, PivotError, TableError,
};

// =============================================================================
// Re-exports - Data model
// =============================================================================

pub use table::{Field, FieldType, KeyValue, Record, Schema, Table, Value};

// =============================================================================
// Re-exports - Loader
// =============================================================================

pub use loader::{
    decode_content, detect_delimiter, detect_encoding, load_bytes, load_csv, preview,
    DateSubstitution, LoadOptions, Loaded, ParseErrorPolicy, SourceInfo,
};

// =============================================================================
// Re-exports - Transformations
// =============================================================================

pub use transform::aggregate::{
    aggregate, cumulative, describe, idx_of_max, idx_of_min, CumulativeSeries, CumulativeStep,
    GroupOrder, Reduce, Reduction, Summary,
};
pub use transform::derive::{find_duplicates, Derive, DuplicateGroup, DuplicateReport};
pub use transform::join::inner_join;
pub use transform::pivot::{melt, pivot};
pub use transform::rolling::{rolling_mean, rolling_mean_table};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::pipeline::{
    run_dataset, run_dataset_bytes, AnalysisOutput, DatasetReport, NamedOutput, RunOptions,
};

// =============================================================================
// Re-exports - Chart shapes
// =============================================================================

pub use chart::{
    category_slices, series_from_cumulative, series_from_pivot, sunburst, CategorySlice, Series,
    SeriesPoint, SunburstNode,
};

// =============================================================================
// Re-exports - Configuration
// =============================================================================

pub use config::{example_config, Analysis, DatasetConfig};
