//! Transformation module.
//!
//! Everything between a loaded table and chart-ready output:
//! - Derive: computed columns and the duplicate report
//! - Aggregate: grouping, reductions, cumulative series, statistics
//! - Pivot: long-to-wide reshaping and its inverse
//! - Rolling: window smoothing
//! - Join: combining two derived tables
//! - Pipeline: config-driven orchestration

pub mod aggregate;
pub mod derive;
pub mod join;
pub mod pipeline;
pub mod pivot;
pub mod rolling;

pub use aggregate::*;
pub use derive::*;
pub use join::inner_join;
pub use pipeline::*;
pub use pivot::{melt, pivot};
pub use rolling::{rolling_mean, rolling_mean_table};
