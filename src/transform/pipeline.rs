//! Config-driven pipeline.
//!
//! One call runs a whole dataset: load the CSV against the declared
//! schema, attach derived columns, report duplicates, then compute every
//! configured analysis. Data flows strictly one way; each analysis reads
//! the cleaned table and produces its own output.

use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

use crate::chart::{self, CategorySlice, Series, SunburstNode};
use crate::config::{Analysis, DatasetConfig};
use crate::error::{PipelineError, PipelineResult, PivotError};
use crate::loader::{load_bytes, SourceInfo};
use crate::table::{Table, Value};
use crate::transform::aggregate::{aggregate, cumulative, describe, Summary};
use crate::transform::derive::{find_duplicates, DuplicateReport};
use crate::transform::pivot::pivot;
use crate::transform::rolling::rolling_mean_table;

/// Per-run overrides on top of the config.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Delimiter override, e.g. from the command line.
    pub delimiter: Option<char>,
}

/// What one analysis produced.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalysisOutput {
    /// A derived table.
    Table { table: Table },
    /// Category slices for a bar or pie chart.
    Categories { slices: Vec<CategorySlice> },
    /// Line series.
    Series { series: Vec<Series> },
    /// A wide table plus one line series per column.
    Pivot { table: Table, series: Vec<Series> },
    /// A nested path→value tree.
    Sunburst { roots: Vec<SunburstNode> },
    /// Descriptive statistics.
    Summary { summary: Summary },
}

/// One named analysis result.
#[derive(Debug, Serialize)]
pub struct NamedOutput {
    pub name: String,
    #[serde(flatten)]
    pub output: AnalysisOutput,
}

/// Everything one run produced.
#[derive(Debug, Serialize)]
pub struct DatasetReport {
    pub dataset: String,
    pub source: SourceInfo,
    /// Duplicate report over the configured subset; absent when the check
    /// is disabled.
    pub duplicates: Option<DuplicateReport>,
    pub outputs: Vec<NamedOutput>,
}

/// Run a dataset from a file.
pub fn run_dataset<P: AsRef<Path>>(
    path: P,
    config: &DatasetConfig,
    options: &RunOptions,
) -> PipelineResult<DatasetReport> {
    let bytes = std::fs::read(path.as_ref())?;
    run_dataset_bytes(&bytes, config, options)
}

/// Run a dataset from raw bytes.
pub fn run_dataset_bytes(
    bytes: &[u8],
    config: &DatasetConfig,
    options: &RunOptions,
) -> PipelineResult<DatasetReport> {
    config.validate()?;

    let mut load_options = config.load_options();
    if options.delimiter.is_some() {
        load_options.delimiter = options.delimiter;
    }

    let loaded = load_bytes(bytes, &config.schema(), &load_options)?;
    let mut table = loaded.table;
    let source = loaded.info;
    info!(
        dataset = %config.name,
        rows = source.row_count,
        encoding = %source.encoding,
        "loaded source"
    );
    if table.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    for derive in &config.derives {
        derive.apply(&mut table)?;
        info!(target_field = derive.target(), "derived column");
    }

    let duplicates = if config.dedup_subset.is_empty() {
        None
    } else {
        let report = find_duplicates(&table, &config.dedup_subset)?;
        if !report.is_empty() {
            warn!(
                groups = report.groups.len(),
                rows = report.row_count(),
                "duplicate rows over subset {:?}",
                config.dedup_subset
            );
        }
        Some(report)
    };

    let mut outputs = Vec::with_capacity(config.analyses.len());
    for analysis in &config.analyses {
        info!(analysis = analysis.name(), "running analysis");
        outputs.push(NamedOutput {
            name: analysis.name().to_string(),
            output: run_analysis(&table, analysis)?,
        });
    }

    Ok(DatasetReport {
        dataset: config.name.clone(),
        source,
        duplicates,
        outputs,
    })
}

fn run_analysis(table: &Table, analysis: &Analysis) -> PipelineResult<AnalysisOutput> {
    match analysis {
        Analysis::Aggregate {
            group_by,
            reductions,
            sort,
            ..
        } => {
            let out = aggregate(table, group_by, reductions, sort)?;
            Ok(AnalysisOutput::Table { table: out })
        }

        Analysis::Categories {
            group_by,
            reduction,
            sort,
            limit,
            ..
        } => {
            let grouped = aggregate(
                table,
                std::slice::from_ref(group_by),
                std::slice::from_ref(reduction),
                sort,
            )?;
            let slices =
                chart::category_slices(&grouped, group_by, &reduction.output_name(), *limit)?;
            Ok(AnalysisOutput::Categories { slices })
        }

        Analysis::Cumulative {
            group_by,
            order_by,
            reduction,
            ..
        } => {
            let series = cumulative(table, group_by, order_by, reduction)?;
            Ok(AnalysisOutput::Series {
                series: chart::series_from_cumulative(&series),
            })
        }

        Analysis::Pivot {
            row_key,
            col_key,
            value,
            fill,
            rolling_window,
            ..
        } => {
            let value_ty = table
                .schema()
                .field(value)
                .map_err(PivotError::from)?
                .ty;
            let fill = Value::from_json(fill, value_ty)
                .ok_or(PivotError::BadFill { expected: value_ty })?;
            let mut wide = pivot(table, row_key, col_key, value, &fill)?;
            if let Some(window) = rolling_window {
                wide = rolling_mean_table(&wide, *window)?;
            }
            let series = chart::series_from_pivot(&wide);
            Ok(AnalysisOutput::Pivot { table: wide, series })
        }

        Analysis::Sunburst {
            path, reduction, ..
        } => {
            let grouped = aggregate(
                table,
                path,
                std::slice::from_ref(reduction),
                &Default::default(),
            )?;
            let roots = chart::sunburst(&grouped, path, &reduction.output_name())?;
            Ok(AnalysisOutput::Sunburst { roots })
        }

        Analysis::Describe { field, .. } => Ok(AnalysisOutput::Summary {
            summary: describe(table, field)?,
        }),
    }
}
