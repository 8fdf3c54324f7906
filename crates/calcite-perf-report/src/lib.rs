//! Comparison and visualization of Calcite vs Non-Calcite load test results.
//!
//! Two result tables (one per execution mode) are joined on the request name.
//! Each joined row carries both raw values, a percentage change per metric
//! and a winner decided on average latency. The merged table is written as
//! CSV and can be rendered into a fixed set of PNG charts.

pub mod compare;
pub mod interactive;
pub mod results;
pub mod sources;
pub mod summary;
pub mod visualize;

pub use compare::{
    compare_tables, improvement_text, percentage_change, read_comparison, write_comparison,
    Comparison, ComparisonRow, Winner, NOT_AVAILABLE,
};
pub use results::{Metric, ResultTable, AGGREGATED};
pub use sources::{QuerySourceResolver, SourceKind};
pub use summary::{AggregatedSummary, ComparisonSummary};
